// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, process, sync::Arc};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relational_support_bridge::{
    api::router,
    chat::{ChatPlatform, DiscordClient},
    config::{Config, LogFormat, DEFAULT_LOG_FILTER},
    delivery::{CodeDelivery, DisabledDelivery, HttpMailer},
    state::AppState,
    storage::SupportDatabase,
};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

async fn run(config: Config) -> Result<(), Box<dyn Error>> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        support_channel = %config.support_channel_id,
        mail_enabled = config.mail.is_some(),
        "Starting support bridge"
    );

    let db = Arc::new(SupportDatabase::open(&config.database_path())?);

    let chat: Arc<dyn ChatPlatform> = Arc::new(DiscordClient::new(
        config.discord_api_base.clone(),
        config.discord_token.clone(),
        &config.user_agent,
    )?);

    let delivery: Arc<dyn CodeDelivery> = match &config.mail {
        Some(mail) => Arc::new(HttpMailer::new(
            mail.api_url.clone(),
            mail.api_key.clone(),
            mail.from.clone(),
        )?),
        None => {
            warn!("MAIL_API_URL not set; backup, wipe and restore are unavailable");
            Arc::new(DisabledDelivery)
        }
    };

    let shutdown = CancellationToken::new();
    let state = AppState::new(&config, db, chat, delivery, &shutdown)?;
    let app = router(state);

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "Support bridge listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    info!("Support bridge stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::default());
            error!(error = %e, "Invalid configuration");
            process::exit(1);
        }
    };
    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        error!(error = %e, "Support bridge failed");
        process::exit(1);
    }
}
