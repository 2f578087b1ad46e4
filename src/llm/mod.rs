// src/llm/mod.rs

//! Text generation collaborator.

pub mod openai;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExternalError;

pub use openai::OpenAiGenerator;

/// Anything that turns a prompt into a short piece of text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ExternalError>;
}

/// Runs one generation bounded by `limit`.
/// Expiry and blank completions are reported as errors like any other failure.
pub async fn generate_within(
    generator: &dyn TextGenerator,
    prompt: &str,
    max_tokens: u32,
    limit: Duration,
) -> Result<String, ExternalError> {
    let text = tokio::time::timeout(limit, generator.generate(prompt, max_tokens))
        .await
        .map_err(|_| ExternalError::Timeout(limit))??;

    let text = text.trim();
    if text.is_empty() {
        return Err(ExternalError::EmptyCompletion);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ExternalError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ExternalError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_an_error() {
        let err = generate_within(&Slow, "prompt", 10, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::Timeout(d) if d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_blank_completion_is_an_error() {
        let err = generate_within(&Fixed("   \n"), "prompt", 10, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ExternalError::EmptyCompletion));
    }

    #[tokio::test]
    async fn test_completion_is_trimmed() {
        let text = generate_within(&Fixed("  Review loops.\n"), "prompt", 10, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(text, "Review loops.");
    }
}
