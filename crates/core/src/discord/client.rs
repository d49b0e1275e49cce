//! Discord REST client.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::permissions::{overwrite_bits, overwrite_target};
use super::types::{
    AllowedMentions, ChannelDto, CreateChannelRequest, CreateMessageRequest, ErrorBody,
    MemberDto, ModifyChannelRequest, OverwriteRequest, GUILD_CATEGORY, GUILD_TEXT,
    MEMBER_PAGE_LIMIT, UNKNOWN_CHANNEL, UNKNOWN_MEMBER, UNKNOWN_OVERWRITE,
};
use crate::audit::{NotificationSink, NotifyError};
use crate::config::DiscordConfig;
use crate::gateway::{
    Access, AccessSubject, ContainerEdit, ContainerSummary, Gateway, GatewayError,
};
use crate::ticket::{ChannelId, GroupId, OwnerMarker, RoleId, UserId};

/// What a request addresses, so a 404 maps to the right error.
#[derive(Debug, Clone, Copy)]
enum Target {
    Channel(ChannelId),
    Group(GroupId),
    Guild,
}

/// Gateway and notification sink backed by the Discord HTTP API.
///
/// Calls are single attempts. A 429 is reported as `RateLimited` with the
/// delay Discord asked for; retrying is left to the caller.
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
    guild_id: u64,
}

impl DiscordClient {
    pub fn new(config: &DiscordConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(
                "DiscordBot (https://github.com/ticketdesk/ticketdesk, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(|e| GatewayError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            guild_id: config.guild_id,
        })
    }

    fn request(&self, method: Method, path: &str, reason: Option<&str>) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(reason) = reason {
            request = request.header("X-Audit-Log-Reason", urlencoding::encode(reason).into_owned());
        }
        request
    }

    async fn send(&self, request: RequestBuilder, target: Target) -> Result<Response, GatewayError> {
        let response = request.send().await.map_err(transport_error)?;

        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response, target).await)
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
        reason: Option<&str>,
        target: Target,
    ) -> Result<Response, GatewayError> {
        self.send(self.request(method, path, reason).json(body), target)
            .await
    }

    async fn guild_channels(&self) -> Result<Vec<ChannelDto>, GatewayError> {
        let path = format!("/guilds/{}/channels", self.guild_id);
        let response = self
            .send(self.request(Method::GET, &path, None), Target::Guild)
            .await?;
        response
            .json()
            .await
            .map_err(|e| GatewayError::ApiError(format!("Failed to parse channel list: {}", e)))
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::ConnectionFailed(e.to_string())
    } else {
        GatewayError::ApiError(e.to_string())
    }
}

/// A member lookup for someone who has left the guild.
fn is_unknown_member(status: StatusCode, body: &ErrorBody) -> bool {
    status == StatusCode::NOT_FOUND && body.code == UNKNOWN_MEMBER
}

fn holds_role(member: &MemberDto, role: RoleId) -> bool {
    let role = role.to_string();
    member.roles.iter().any(|r| *r == role)
}

async fn error_from_response(response: Response, target: Target) -> GatewayError {
    let status = response.status();
    let retry_header = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    classify(status, &body, retry_header, &text, target)
}

fn classify(
    status: StatusCode,
    body: &ErrorBody,
    retry_header: Option<f64>,
    text: &str,
    target: Target,
) -> GatewayError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let secs = body.retry_after.or(retry_header).unwrap_or(1.0);
            GatewayError::RateLimited {
                retry_after_ms: (secs * 1000.0).ceil() as u64,
            }
        }
        StatusCode::UNAUTHORIZED => GatewayError::PermissionDenied("invalid bot token".to_string()),
        StatusCode::FORBIDDEN => GatewayError::PermissionDenied(body.message.clone()),
        StatusCode::NOT_FOUND => match target {
            Target::Channel(handle) if body.code == UNKNOWN_CHANNEL || body.code == 0 => {
                GatewayError::ContainerNotFound(handle)
            }
            Target::Group(group) => GatewayError::GroupNotFound(group),
            _ => GatewayError::ApiError(format!("HTTP 404 (code {}): {}", body.code, body.message)),
        },
        _ => GatewayError::ApiError(format!("HTTP {}: {}", status.as_u16(), text)),
    }
}

#[async_trait]
impl Gateway for DiscordClient {
    fn name(&self) -> &str {
        "discord"
    }

    async fn create_container(
        &self,
        name: &str,
        parent: GroupId,
        marker: &OwnerMarker,
    ) -> Result<ChannelId, GatewayError> {
        let path = format!("/guilds/{}/channels", self.guild_id);
        let body = CreateChannelRequest {
            name,
            kind: GUILD_TEXT,
            parent_id: parent.get(),
            topic: marker.encode(),
        };
        debug!(name, parent = %parent, "Creating ticket channel");

        let response = self
            .send_json(Method::POST, &path, &body, Some("Ticket opened"), Target::Group(parent))
            .await?;
        let channel: ChannelDto = response
            .json()
            .await
            .map_err(|e| GatewayError::ApiError(format!("Failed to parse created channel: {}", e)))?;
        Ok(ChannelId(channel.id))
    }

    async fn edit_container(
        &self,
        handle: ChannelId,
        edit: ContainerEdit,
    ) -> Result<(), GatewayError> {
        if edit.is_empty() {
            return Ok(());
        }
        let path = format!("/channels/{}", handle);
        let body = ModifyChannelRequest {
            name: edit.name,
            parent_id: edit.parent.map(GroupId::get),
        };
        self.send_json(Method::PATCH, &path, &body, Some("Ticket closed"), Target::Channel(handle))
            .await?;
        Ok(())
    }

    async fn set_access(
        &self,
        handle: ChannelId,
        subject: AccessSubject,
        access: Access,
    ) -> Result<(), GatewayError> {
        let (id, kind) = overwrite_target(subject, self.guild_id);
        let (allow, deny) = overwrite_bits(access);
        let path = format!("/channels/{}/permissions/{}", handle, id);
        let body = OverwriteRequest {
            kind,
            allow: allow.to_string(),
            deny: deny.to_string(),
        };
        self.send_json(Method::PUT, &path, &body, Some("Ticket access"), Target::Channel(handle))
            .await?;
        Ok(())
    }

    async fn clear_access(
        &self,
        handle: ChannelId,
        subject: AccessSubject,
    ) -> Result<(), GatewayError> {
        let (id, _) = overwrite_target(subject, self.guild_id);
        let path = format!("/channels/{}/permissions/{}", handle, id);
        let request = self.request(Method::DELETE, &path, Some("Ticket access"));

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::ConnectionFailed(e.to_string())
            }
        })?;
        if response.status().is_success() {
            return Ok(());
        }

        // A missing overwrite is already the desired state.
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        if status == StatusCode::NOT_FOUND && body.code == UNKNOWN_OVERWRITE {
            return Ok(());
        }
        Err(classify(status, &body, None, &text, Target::Channel(handle)))
    }

    async fn destroy_container(&self, handle: ChannelId) -> Result<(), GatewayError> {
        let path = format!("/channels/{}", handle);
        self.send(
            self.request(Method::DELETE, &path, Some("Ticket deleted")),
            Target::Channel(handle),
        )
        .await?;
        Ok(())
    }

    async fn resolve_role_members(&self, role: RoleId) -> Result<HashSet<UserId>, GatewayError> {
        let role_id = role.to_string();
        let mut members = HashSet::new();
        let mut after = 0u64;

        loop {
            let path = format!(
                "/guilds/{}/members?limit={}&after={}",
                self.guild_id, MEMBER_PAGE_LIMIT, after
            );
            let response = self
                .send(self.request(Method::GET, &path, None), Target::Guild)
                .await?;
            let page: Vec<MemberDto> = response
                .json()
                .await
                .map_err(|e| GatewayError::ApiError(format!("Failed to parse member list: {}", e)))?;

            let page_len = page.len();
            for member in page {
                after = after.max(member.user.id);
                if member.roles.contains(&role_id) {
                    members.insert(UserId(member.user.id));
                }
            }
            if page_len < MEMBER_PAGE_LIMIT {
                break;
            }
        }

        debug!(role = %role, count = members.len(), "Resolved role members");
        Ok(members)
    }

    async fn member_has_role(&self, role: RoleId, user: UserId) -> Result<bool, GatewayError> {
        let path = format!("/guilds/{}/members/{}", self.guild_id, user);
        let response = self
            .request(Method::GET, &path, None)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            if is_unknown_member(status, &body) {
                return Ok(false);
            }
            return Err(classify(status, &body, None, &text, Target::Guild));
        }

        let member: MemberDto = response
            .json()
            .await
            .map_err(|e| GatewayError::ApiError(format!("Failed to parse member: {}", e)))?;
        Ok(holds_role(&member, role))
    }

    async fn list_containers(
        &self,
        parent: GroupId,
    ) -> Result<Vec<ContainerSummary>, GatewayError> {
        let channels = self.guild_channels().await?;

        let group_exists = channels
            .iter()
            .any(|c| c.id == parent.get() && c.kind == GUILD_CATEGORY);
        if !group_exists {
            return Err(GatewayError::GroupNotFound(parent));
        }

        Ok(channels
            .into_iter()
            .filter(|c| c.parent_id == Some(parent.get()) && c.kind == GUILD_TEXT)
            .map(|c| ContainerSummary {
                handle: ChannelId(c.id),
                name: c.name,
                owner_marker: c.topic,
            })
            .collect())
    }

    async fn send_message(&self, handle: ChannelId, text: &str) -> Result<(), GatewayError> {
        let path = format!("/channels/{}/messages", handle);
        let body = CreateMessageRequest {
            content: text,
            allowed_mentions: AllowedMentions {
                parse: vec!["users", "roles"],
            },
        };
        self.send_json(Method::POST, &path, &body, None, Target::Channel(handle))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for DiscordClient {
    async fn post(&self, channel: ChannelId, text: &str) -> Result<(), NotifyError> {
        self.send_message(channel, text).await.map_err(|e| {
            if e.is_transient() {
                NotifyError::Unreachable(e.to_string())
            } else {
                NotifyError::Rejected(e.to_string())
            }
        })
    }
}
