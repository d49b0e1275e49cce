//! Authorization.
//!
//! Two separate questions live here:
//! - who may call the HTTP command surface ([`Authenticator`]),
//! - which chat users may close and delete tickets ([`StaffPolicy`]).

mod api_key;
mod none;
mod staff;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use staff::*;
pub use traits::*;
pub use types::*;

use crate::config::AuthConfig;

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::ApiKey => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "api_key must be set when using ApiKey auth method".to_string(),
                )
            })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}
