use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketdesk_core::{
    create_audit_system, create_authenticator, import_legacy_counter, load_config,
    validate_config, AuditEvent, Authenticator, DiscordClient, Gateway, LifecycleConfig,
    LifecycleEngine, NotificationSink, RoleStaffPolicy, SequenceStore, SqliteSequenceStore,
    StaffPolicy,
};

use ticketdesk_server::api::create_router;
use ticketdesk_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

/// Lower bound on how often expired cooldown records are swept
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TICKETDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Compute config hash for audit (secrets redacted)
    let sanitized_json =
        serde_json::to_string(&ticketdesk_core::SanitizedConfig::from(&config)).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(sanitized_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Ticket number sequence
    let sequence = Arc::new(
        SqliteSequenceStore::new(&config.database.path)
            .context("Failed to open ticket sequence store")?,
    );
    if let Some(ref legacy) = config.database.legacy_counter_file {
        match import_legacy_counter(&sequence, legacy)
            .with_context(|| format!("Failed to import legacy counter {:?}", legacy))?
        {
            Some(value) => info!(value, "Ticket sequence continues from legacy counter"),
            None => warn!(path = ?legacy, "Legacy counter file not found, skipping import"),
        }
    }
    let current = sequence
        .current()
        .context("Failed to read ticket sequence")?;
    info!(current, "Sequence store initialized");

    // Discord REST client serves as both the gateway and the audit sink
    let discord = Arc::new(
        DiscordClient::new(&config.discord).context("Failed to create Discord client")?,
    );
    let gateway: Arc<dyn Gateway> = discord.clone();
    let sink: Arc<dyn NotificationSink> = discord;
    info!("Discord client initialized for guild {}", config.discord.guild_id);

    // Create audit system
    let (audit_handle, audit_forwarder) =
        create_audit_system(sink, config.discord.log_channel_id, AUDIT_BUFFER_SIZE);

    // Spawn audit forwarder task
    let forwarder_handle = tokio::spawn(audit_forwarder.run());

    // Emit ServiceStarted event
    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    // Lifecycle engine
    let staff: Arc<dyn StaffPolicy> = Arc::new(RoleStaffPolicy::new(
        gateway.clone(),
        config.discord.support_role_id,
    ));
    let lifecycle_config = LifecycleConfig::from_config(&config);
    let sweep_every = lifecycle_config.cooldown.max(MIN_SWEEP_INTERVAL);
    let sequence: Arc<dyn SequenceStore> = sequence;
    let engine = Arc::new(LifecycleEngine::new(
        lifecycle_config,
        gateway,
        sequence,
        staff,
        audit_handle.clone(),
    ));
    info!("Lifecycle engine ready");

    let sweeper = spawn_cooldown_sweeper(engine.clone(), sweep_every);

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        engine.clone(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the sweeper; it holds an engine reference
    sweeper.abort();
    let _ = sweeper.await;

    // Emit ServiceStopped event
    info!("Server shutting down...");
    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Drop every holder of an AuditHandle so the forwarder's channel closes.
    // The engine owns a clone; AppState went away with the router.
    drop(engine);
    drop(audit_handle);

    // Wait for forwarder to deliver remaining events
    let _ = forwarder_handle.await;
    info!("Audit forwarder stopped");

    Ok(())
}

/// Periodically drop cooldown records whose window has elapsed.
fn spawn_cooldown_sweeper(engine: Arc<LifecycleEngine>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = engine.cooldown().evict_expired(Utc::now());
            if evicted > 0 {
                debug!(evicted, "Swept expired cooldown records");
            }
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
