// src/models/mod.rs

pub mod attempt;
pub mod profile;
pub mod question;
pub mod recommendation;
pub mod resource;
pub mod response;
pub mod review;
