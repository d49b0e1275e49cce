use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Caller};

/// Accepts every caller as anonymous
///
/// Only for deployments where the command surface is reachable from a trusted
/// network. Must be chosen explicitly in config.
#[derive(Debug, Default)]
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Caller, AuthError> {
        Ok(Caller::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
