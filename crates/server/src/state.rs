use std::sync::Arc;
use ticketdesk_core::{Authenticator, Config, LifecycleEngine, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    engine: Arc<LifecycleEngine>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        engine: Arc<LifecycleEngine>,
    ) -> Self {
        Self {
            config,
            authenticator,
            engine,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn engine(&self) -> &LifecycleEngine {
        self.engine.as_ref()
    }
}
