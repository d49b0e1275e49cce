//! Shared-secret authentication for the command surface.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Caller};

/// Checks a pre-shared key sent as `Authorization: Bearer <key>` or `X-API-Key: <key>`.
pub struct ApiKeyAuthenticator {
    key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(key: String) -> Self {
        Self { key }
    }

    fn presented_key<'a>(request: &'a AuthRequest) -> Option<&'a str> {
        let bearer = request.headers.get("authorization").and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        });
        bearer.or_else(|| request.headers.get("x-api-key").map(String::as_str))
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Caller, AuthError> {
        let presented = Self::presented_key(request).ok_or(AuthError::NotAuthenticated)?;

        if keys_match(presented.as_bytes(), self.key.as_bytes()) {
            Ok(Caller {
                name: "api_key_client".to_string(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Comparison whose running time does not depend on where the inputs differ.
fn keys_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn request_with(headers: &[(&str, &str)]) -> AuthRequest {
        AuthRequest {
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = ApiKeyAuthenticator::new("k-123".to_string());
        let caller = auth
            .authenticate(&request_with(&[("Authorization", "Bearer k-123")]))
            .await
            .unwrap();
        assert_eq!(caller.method, "api_key");
    }

    #[tokio::test]
    async fn test_lowercase_bearer_and_x_api_key() {
        let auth = ApiKeyAuthenticator::new("k-123".to_string());
        assert!(auth
            .authenticate(&request_with(&[("Authorization", "bearer k-123")]))
            .await
            .is_ok());
        assert!(auth
            .authenticate(&request_with(&[("X-API-Key", "k-123")]))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_wrong_key() {
        let auth = ApiKeyAuthenticator::new("k-123".to_string());
        let result = auth
            .authenticate(&request_with(&[("Authorization", "Bearer nope")]))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let auth = ApiKeyAuthenticator::new("k-123".to_string());
        let result = auth.authenticate(&request_with(&[])).await;
        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn test_keys_match() {
        assert!(keys_match(b"abc", b"abc"));
        assert!(!keys_match(b"abc", b"abd"));
        assert!(!keys_match(b"abc", b"ab"));
        assert!(keys_match(b"", b""));
    }
}
