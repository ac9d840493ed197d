pub mod archive; // Completed-record hand-off to the archival backend
pub mod call; // Session store, conversation state machine, completion handoff
pub mod config;
pub mod script; // Question catalog + script engine
pub mod telephony; // Inbound events, action interface, Telnyx client

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a host process embedding Careline.
///
/// Honors `RUST_LOG` when set, otherwise falls back to the default
/// filter. Installs a global subscriber, so hosts that configure their
/// own should skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Careline starting v{}", config::APP_VERSION);
}
