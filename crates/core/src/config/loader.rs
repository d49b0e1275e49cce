use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Bare environment variables read by earlier deployments, and the config key
/// each one feeds.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord.token"),
    ("TICKET_CATEGORY_ID", "discord.ticket_category_id"),
    ("CLOSED_CATEGORY_ID", "discord.closed_category_id"),
    ("LOG_CHANNEL_ID", "discord.log_channel_id"),
    ("SUPPORT_ROLE_ID", "discord.support_role_id"),
];

/// Load configuration from file with environment variable overrides
///
/// Precedence, lowest first: the TOML file, `TICKETDESK_` variables
/// (`TICKETDESK_DISCORD__TOKEN`), then the legacy bare variables.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("TICKETDESK_").split("__"))
        .merge(legacy_env())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, target)| *target)
            .unwrap_or("legacy")
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{GroupId, RoleId};
    use figment::Jail;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
[auth]
method = "none"

[discord]
token = "from-file"
guild_id = 1
ticket_category_id = 2
closed_category_id = 3
log_channel_id = 4
support_role_id = 5

[server]
port = 9000
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(VALID).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.discord.token, "from-file");
    }

    #[test]
    fn test_load_config_from_str_missing_auth() {
        let result = load_config_from_str("[server]\nport = 8080\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", VALID).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.discord.ticket_category_id, GroupId(2));
    }

    #[test]
    fn test_prefixed_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", VALID)?;
            jail.set_env("TICKETDESK_DISCORD__TOKEN", "from-env");
            jail.set_env("TICKETDESK_TICKETS__COOLDOWN_SECS", "5");

            let config = load_config(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.discord.token, "from-env");
            assert_eq!(config.tickets.cooldown_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_overrides_everything() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", VALID)?;
            jail.set_env("TICKETDESK_DISCORD__TOKEN", "from-prefixed");
            jail.set_env("DISCORD_TOKEN", "from-legacy");
            jail.set_env("SUPPORT_ROLE_ID", "777");

            let config = load_config(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.discord.token, "from-legacy");
            assert_eq!(config.discord.support_role_id, RoleId(777));
            Ok(())
        });
    }
}
