// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use remediation::config::Config;
use remediation::llm::{OpenAiGenerator, TextGenerator};
use remediation::routes;
use remediation::services::{Engine, EngineSettings, policy::RecommendationPolicy};
use remediation::state::AppState;
use remediation::store::PgStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let policy = RecommendationPolicy::load(config.recommendation_policy_path.as_deref())
        .expect("Failed to load recommendation policy");

    let generator: Option<Arc<dyn TextGenerator>> = match &config.llm_api_key {
        Some(key) => match OpenAiGenerator::new(
            key,
            &config.llm_base_url,
            &config.llm_model,
            config.llm_timeout(),
        ) {
            Ok(generator) => {
                tracing::info!("Text generation enabled (model {})", config.llm_model);
                Some(Arc::new(generator) as Arc<dyn TextGenerator>)
            }
            Err(e) => {
                tracing::error!("Text generation disabled, client setup failed: {}", e);
                None
            }
        },
        None => {
            tracing::info!("LLM_API_KEY not set, personalized recommendations disabled");
            None
        }
    };

    let store = Arc::new(PgStore::new(pool));
    let engine = Engine::new(
        store.clone(),
        store.clone(),
        store,
        generator,
        EngineSettings::from_config(&config, policy),
    );

    let state = AppState {
        engine: Arc::new(engine),
        config: config.clone(),
    };

    let app = routes::create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    axum::serve(listener, app).await.expect("Server error");
}
