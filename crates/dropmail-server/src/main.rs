mod api;
mod middleware;

use std::sync::Arc;

use dropmail_ai::{Completion, LlmClient};
use dropmail_catalog::ProcessOptions;
use dropmail_core::s3::S3BlobStore;
use dropmail_db::PgStore;
use dropmail_sender::{DispatchConfig, SmtpProvider};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = dropmail_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = dropmail_db::PoolConfig::from_app_config(&config);
    let pool = dropmail_db::connect_pool(&config.database_url, pool_config).await?;
    dropmail_db::run_migrations(&pool).await?;

    let blobs = S3BlobStore::new(&config.s3_bucket, &config.s3_region).await;
    let llm = LlmClient::from_config(&config)?.map(|c| Arc::new(c) as Arc<dyn Completion>);
    if llm.is_none() {
        tracing::warn!("DROPMAIL_LLM_API_KEY not set; AI endpoints limited to pattern edits");
    }
    let email = SmtpProvider::from_config(&config)?;

    let state = AppState {
        store: Arc::new(PgStore::new(pool.clone())),
        blobs: Arc::new(blobs),
        llm,
        email: Arc::new(email),
        dispatch: Arc::new(DispatchConfig::from_app_config(&config)),
        process: Arc::new(ProcessOptions {
            batch_size: config.emails_per_batch,
            product_base_url: config.product_base_url.clone(),
        }),
        pool: Some(pool),
    };

    let auth = AuthState::from_env(config.is_development())?;
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "dropmail-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
