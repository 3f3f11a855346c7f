use std::sync::Arc;

use access_relay::access::{
    AccessService, DwellerDirectoryValidator, GrantExecutor, OpeningService, TokenCodec,
    Validators, WhitelistValidator,
};
use access_relay::channels::{ChatProChannel, NotificationGateway};
use access_relay::config::RelayConfig;
use access_relay::panel::{ConverterClient, HttpConverterClient, SegwareClient};
use access_relay::routes::{RelayState, relay_routes};
use access_relay::store::LibSqlBackend;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    eprintln!("🚪 Access Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Webhook: http://0.0.0.0:{}/v1/create/access-through-whatsapp",
        config.server.port
    );
    eprintln!("   Database: {}", config.server.db_path.display());

    // ── Database ─────────────────────────────────────────────────────────
    let db = Arc::new(
        LibSqlBackend::new_local(&config.server.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.server.db_path.display(),
                    e
                );
                std::process::exit(1);
            }),
    );

    // ── Remote collaborators ─────────────────────────────────────────────
    let timeout = config.panel.timeout;
    let segware = Arc::new(SegwareClient::new(config.panel.clone())?);
    let notifier: Arc<dyn NotificationGateway> = Arc::new(ChatProChannel::new(config.chat.clone()));
    let converter: Option<Arc<dyn ConverterClient>> = match &config.server.opening_base_url {
        Some(base_url) => {
            eprintln!("   Direct opening via: {base_url}");
            Some(Arc::new(HttpConverterClient::new(base_url.clone(), timeout)?))
        }
        None => None,
    };

    // ── Access pipeline ──────────────────────────────────────────────────
    let access_config = Arc::new(config.access.clone());
    let codec = TokenCodec::from_config(&config.codec)?;
    let validators = Validators {
        whitelist: WhitelistValidator::new(db.clone()),
        dweller: DwellerDirectoryValidator::new(
            segware.clone(),
            access_config.directory_page_size,
            access_config.directory_max_pages,
        ),
    };
    let executor = GrantExecutor::new(
        segware.clone(),
        notifier.clone(),
        db.clone(),
        access_config.clone(),
    );
    let access = Arc::new(AccessService::new(
        access_config.clone(),
        codec,
        validators,
        executor,
        notifier,
    ));
    let opening = Arc::new(OpeningService::new(converter, segware, access_config));

    let app = relay_routes(RelayState { access, opening });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port)).await?;
    tracing::info!(port = config.server.port, "Access relay listening");
    axum::serve(listener, app).await?;

    Ok(())
}
