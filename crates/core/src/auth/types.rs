use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// The service calling the command surface (a bot front-end, an interaction relay)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub name: String,
    pub method: String,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_caller() {
        let caller = Caller::anonymous();
        assert_eq!(caller.name, "anonymous");
        assert_eq!(caller.method, "none");
    }
}
