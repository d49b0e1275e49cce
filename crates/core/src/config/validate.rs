use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
///
/// Rejects settings the service cannot run with: port 0, missing token or
/// api key, zero platform ids, and an open-ticket category that is also the
/// closed one.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().is_none_or(str::is_empty)
    {
        return invalid("auth.api_key must be set when auth.method = \"api_key\"");
    }

    let discord = &config.discord;
    if discord.token.trim().is_empty() {
        return invalid("discord.token cannot be empty");
    }
    if discord.guild_id == 0 {
        return invalid("discord.guild_id cannot be 0");
    }
    if discord.ticket_category_id.get() == 0
        || discord.closed_category_id.get() == 0
        || discord.log_channel_id.get() == 0
        || discord.support_role_id.get() == 0
    {
        return invalid("discord category, channel and role ids cannot be 0");
    }
    if discord.ticket_category_id == discord.closed_category_id {
        return invalid("discord.ticket_category_id and discord.closed_category_id must differ");
    }

    if config.tickets.delete_grace_secs > 60 {
        tracing::warn!(
            grace_secs = config.tickets.delete_grace_secs,
            "Long delete grace delay holds the ticket lock for the whole delay"
        );
    }

    Ok(())
}
