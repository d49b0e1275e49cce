//! Discord REST payloads. Snowflakes travel as decimal strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Discord channel type for text channels.
pub const GUILD_TEXT: u8 = 0;
/// Discord channel type for categories.
pub const GUILD_CATEGORY: u8 = 4;

/// Page size for the guild member listing.
pub const MEMBER_PAGE_LIMIT: usize = 1000;

pub(crate) mod snowflake {
    use super::*;

    pub fn serialize<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match id {
                Some(id) => serializer.serialize_str(&id.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| s.parse().map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelDto {
    #[serde(with = "snowflake")]
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "snowflake::option")]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateChannelRequest<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(with = "snowflake")]
    pub parent_id: u64,
    pub topic: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ModifyChannelRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "snowflake::option"
    )]
    pub parent_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverwriteRequest {
    #[serde(rename = "type")]
    pub kind: u8,
    pub allow: String,
    pub deny: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    #[serde(with = "snowflake")]
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberDto {
    pub user: UserDto,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub content: &'a str,
    pub allowed_mentions: AllowedMentions,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub message: String,
    /// Seconds, present on 429 responses.
    #[serde(default)]
    pub retry_after: Option<f64>,
}

/// JSON error codes the client reacts to.
pub const UNKNOWN_CHANNEL: u64 = 10003;
pub const UNKNOWN_MEMBER: u64 = 10007;
pub const UNKNOWN_OVERWRITE: u64 = 10009;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_snowflakes_parse() {
        let json = r#"{"id":"1100","type":0,"name":"question-1","parent_id":"100","topic":"owner:5"}"#;
        let channel: ChannelDto = serde_json::from_str(json).unwrap();
        assert_eq!(channel.id, 1100);
        assert_eq!(channel.parent_id, Some(100));
        assert_eq!(channel.topic.as_deref(), Some("owner:5"));

        let category = r#"{"id":"100","type":4,"name":"Tickets","parent_id":null}"#;
        let channel: ChannelDto = serde_json::from_str(category).unwrap();
        assert_eq!(channel.kind, GUILD_CATEGORY);
        assert_eq!(channel.parent_id, None);
    }

    #[test]
    fn test_modify_request_skips_unset_fields() {
        let req = ModifyChannelRequest {
            name: Some("closed-ticket-1".into()),
            parent_id: None,
        };
        assert_eq!(
            serde_json::to_string(&req).unwrap(),
            r#"{"name":"closed-ticket-1"}"#
        );

        let req = ModifyChannelRequest {
            name: None,
            parent_id: Some(200),
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"parent_id":"200"}"#);
    }

    #[test]
    fn test_member_roles() {
        let json = r#"[{"user":{"id":"7","username":"staff"},"roles":["300","301"]}]"#;
        let members: Vec<MemberDto> = serde_json::from_str(json).unwrap();
        assert_eq!(members[0].user.id, 7);
        assert!(members[0].roles.contains(&"300".to_string()));
    }

    #[test]
    fn test_rate_limit_body() {
        let json = r#"{"message":"You are being rate limited.","retry_after":1.5,"global":false}"#;
        let body: ErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.retry_after, Some(1.5));
        assert_eq!(body.code, 0);
    }
}
