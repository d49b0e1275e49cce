use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::ticket::{ChannelId, GroupId, RoleId};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub tickets: TicketsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication for the HTTP command surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required when method = "api_key"
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Discord connection and guild layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscordConfig {
    /// Bot token
    pub token: String,
    /// Guild the bot manages. Its id doubles as the @everyone role id.
    pub guild_id: u64,
    /// Category holding open tickets
    pub ticket_category_id: GroupId,
    /// Category closed tickets are moved into
    pub closed_category_id: GroupId,
    /// Channel receiving audit lines
    pub log_channel_id: ChannelId,
    /// Role allowed to close and delete tickets
    pub support_role_id: RoleId,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_timeout() -> u64 {
    15
}

/// What happens to the owner's access when a ticket is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePolicy {
    /// Remove the owner's overwrite; the ticket disappears for them.
    #[default]
    Revoke,
    /// Owner can still read the ticket but no longer write.
    ReadOnly,
}

/// Ticket lifecycle tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketsConfig {
    /// Minimum seconds between two ticket creations by the same user
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    /// Upper bound on tracked cooldown records (0 = unbounded)
    #[serde(default = "default_cooldown_entries")]
    pub cooldown_max_entries: usize,
    /// Seconds between accepting a delete and destroying the channel
    #[serde(default = "default_grace")]
    pub delete_grace_secs: u64,
    #[serde(default)]
    pub close_policy: ClosePolicy,
}

impl Default for TicketsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
            cooldown_max_entries: default_cooldown_entries(),
            delete_grace_secs: default_grace(),
            close_policy: ClosePolicy::default(),
        }
    }
}

fn default_cooldown() -> u64 {
    60
}

fn default_cooldown_entries() -> usize {
    10_000
}

fn default_grace() -> u64 {
    3
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Plain-text counter left by earlier deployments, imported at startup
    #[serde(default)]
    pub legacy_counter_file: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            legacy_counter_file: None,
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ticketdesk.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub discord: SanitizedDiscordConfig,
    pub tickets: TicketsConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: AuthMethod,
    pub api_key_configured: bool,
}

/// Discord config with the token hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDiscordConfig {
    pub token_configured: bool,
    pub guild_id: u64,
    pub ticket_category_id: GroupId,
    pub closed_category_id: GroupId,
    pub log_channel_id: ChannelId,
    pub support_role_id: RoleId,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let discord = &config.discord;
        Self {
            auth: SanitizedAuthConfig {
                method: config.auth.method,
                api_key_configured: config
                    .auth
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
            },
            discord: SanitizedDiscordConfig {
                token_configured: !discord.token.is_empty(),
                guild_id: discord.guild_id,
                ticket_category_id: discord.ticket_category_id,
                closed_category_id: discord.closed_category_id,
                log_channel_id: discord.log_channel_id,
                support_role_id: discord.support_role_id,
                api_base: discord.api_base.clone(),
                timeout_secs: discord.timeout_secs,
            },
            tickets: config.tickets.clone(),
            database: config.database.clone(),
            server: config.server.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[auth]
method = "none"

[discord]
token = "bot-token"
guild_id = 1000
ticket_category_id = 2000
closed_category_id = 3000
log_channel_id = 4000
support_role_id = 5000
"#;

    #[test]
    fn test_deserialize_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.discord.ticket_category_id, GroupId(2000));
        assert_eq!(config.discord.support_role_id, RoleId(5000));
        assert_eq!(config.discord.api_base, "https://discord.com/api/v10");
        assert_eq!(config.discord.timeout_secs, 15);
        assert_eq!(config.tickets.cooldown_secs, 60);
        assert_eq!(config.tickets.delete_grace_secs, 3);
        assert_eq!(config.tickets.close_policy, ClosePolicy::Revoke);
        assert_eq!(config.database.path.to_str().unwrap(), "ticketdesk.db");
        assert!(config.database.legacy_counter_file.is_none());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_deserialize_tickets_section() {
        let toml = format!(
            "{}\n[tickets]\ncooldown_secs = 120\ndelete_grace_secs = 0\nclose_policy = \"read_only\"\n",
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.tickets.cooldown_secs, 120);
        assert_eq!(config.tickets.delete_grace_secs, 0);
        assert_eq!(config.tickets.close_policy, ClosePolicy::ReadOnly);
        assert_eq!(config.tickets.cooldown_max_entries, 10_000);
    }

    #[test]
    fn test_deserialize_missing_discord_fails() {
        let toml = r#"
[auth]
method = "none"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.auth = AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret".to_string()),
        };

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.discord.token_configured);
        assert!(sanitized.auth.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("bot-token"));
        assert!(!json.contains("secret"));
    }
}
