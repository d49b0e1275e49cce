//! Ticket API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ticketdesk_core::{
    ChannelId, CloseError, CreateError, DeleteError, OpenContainer, Ticket, TicketCategory,
    TicketHandle, TicketNumber, TicketRef, TicketState, UserId,
};
use tracing::{info, warn};

use super::middleware::AuthCaller;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    /// User the ticket is opened for
    pub user_id: UserId,
    /// Free-text category label; unknown labels become "other"
    #[serde(default)]
    pub category: String,
}

/// Request body for close and delete
#[derive(Debug, Deserialize)]
pub struct TicketActionBody {
    /// Channel the interaction came from
    pub channel_id: ChannelId,
    /// User performing the action
    pub actor_id: UserId,
}

/// Response for a successful create
#[derive(Debug, Serialize)]
pub struct CreatedTicketResponse {
    pub number: TicketNumber,
    pub channel_id: ChannelId,
    pub category: TicketCategory,
}

impl From<TicketHandle> for CreatedTicketResponse {
    fn from(handle: TicketHandle) -> Self {
        Self {
            number: handle.number,
            channel_id: handle.channel_id,
            category: handle.category,
        }
    }
}

/// Engine view of a single ticket
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub number: TicketNumber,
    pub owner_id: UserId,
    pub category: TicketCategory,
    pub state: TicketState,
    pub channel_id: Option<ChannelId>,
    pub opened_at: String,
    pub updated_at: String,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            number: ticket.number,
            owner_id: ticket.owner_id,
            category: ticket.category,
            state: ticket.state,
            channel_id: ticket.channel,
            opened_at: ticket.opened_at.to_rfc3339(),
            updated_at: ticket.updated_at.to_rfc3339(),
        }
    }
}

/// An open ticket as listed on the platform
#[derive(Debug, Serialize)]
pub struct OpenTicketResponse {
    pub channel_id: ChannelId,
    pub name: String,
    pub owner_id: UserId,
}

impl From<OpenContainer> for OpenTicketResponse {
    fn from(container: OpenContainer) -> Self {
        Self {
            channel_id: container.handle,
            name: container.name,
            owner_id: container.owner,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListOpenTicketsResponse {
    pub tickets: Vec<OpenTicketResponse>,
    pub total: usize,
}

/// Response for close and delete
#[derive(Debug, Serialize)]
pub struct TicketActionResponse {
    pub number: TicketNumber,
    pub state: TicketState,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TicketErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    /// The caller's existing open ticket, on a duplicate create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
}

/// Status code and body for a failed ticket request.
pub struct ApiError {
    status: StatusCode,
    body: TicketErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: impl ToString) -> Self {
        Self {
            status,
            body: TicketErrorResponse {
                error: error.to_string(),
                retry_after_secs: None,
                channel_id: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<CreateError> for ApiError {
    fn from(e: CreateError) -> Self {
        let retry_after_secs = e.retry_after_secs();
        let (status, channel_id) = match &e {
            CreateError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, None),
            CreateError::AlreadyOpen { channel_id } => (StatusCode::CONFLICT, Some(*channel_id)),
            CreateError::Gateway(_) => (StatusCode::BAD_GATEWAY, None),
            CreateError::Sequence(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };
        let mut err = ApiError::new(status, &e);
        err.body.retry_after_secs = retry_after_secs;
        err.body.channel_id = channel_id;
        err
    }
}

impl From<CloseError> for ApiError {
    fn from(e: CloseError) -> Self {
        let status = match &e {
            CloseError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CloseError::InvalidState { .. } => StatusCode::CONFLICT,
            CloseError::NotFound(_) => StatusCode::NOT_FOUND,
            CloseError::MalformedMarker(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CloseError::Gateway(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, e)
    }
}

impl From<DeleteError> for ApiError {
    fn from(e: DeleteError) -> Self {
        let status = match &e {
            DeleteError::Forbidden { .. } => StatusCode::FORBIDDEN,
            DeleteError::InvalidState { .. } => StatusCode::CONFLICT,
            DeleteError::NotFound(_) => StatusCode::NOT_FOUND,
            DeleteError::MalformedMarker(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DeleteError::Gateway(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, e)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Open a ticket
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    Json(body): Json<CreateTicketBody>,
) -> Result<(StatusCode, Json<CreatedTicketResponse>), ApiError> {
    let category = TicketCategory::from_label(&body.category);
    info!(caller = %caller.name, user = %body.user_id, category = %category, "Create ticket requested");

    let handle = state
        .engine()
        .create_ticket(body.user_id, category)
        .await
        .map_err(|e| {
            warn!(user = %body.user_id, error = %e, "Create ticket refused");
            ApiError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(CreatedTicketResponse::from(handle))))
}

/// Get the engine's view of a ticket
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(number): Path<u64>,
) -> Result<Json<TicketResponse>, ApiError> {
    match state.engine().ticket(TicketNumber(number)).await {
        Some(ticket) => Ok(Json(TicketResponse::from(ticket))),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Ticket not found: {}", number),
        )),
    }
}

/// List open tickets as the platform shows them
pub async fn list_open_tickets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListOpenTicketsResponse>, ApiError> {
    let open = state
        .engine()
        .open_tickets()
        .await
        .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, e))?;

    let tickets: Vec<OpenTicketResponse> = open.into_iter().map(OpenTicketResponse::from).collect();
    let total = tickets.len();
    Ok(Json(ListOpenTicketsResponse { tickets, total }))
}

/// Close a ticket
pub async fn close_ticket(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    Path(number): Path<u64>,
    Json(body): Json<TicketActionBody>,
) -> Result<Json<TicketActionResponse>, ApiError> {
    let number = TicketNumber(number);
    info!(caller = %caller.name, ticket = %number, actor = %body.actor_id, "Close ticket requested");

    let target = TicketRef {
        number,
        channel_id: body.channel_id,
    };
    state.engine().close_ticket(target, body.actor_id).await?;

    Ok(Json(TicketActionResponse {
        number,
        state: TicketState::Closed,
    }))
}

/// Delete a ticket. Responds once the channel is gone.
pub async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    AuthCaller(caller): AuthCaller,
    Path(number): Path<u64>,
    Json(body): Json<TicketActionBody>,
) -> Result<Json<TicketActionResponse>, ApiError> {
    let number = TicketNumber(number);
    info!(caller = %caller.name, ticket = %number, actor = %body.actor_id, "Delete ticket requested");

    let target = TicketRef {
        number,
        channel_id: body.channel_id,
    };
    state.engine().delete_ticket(target, body.actor_id).await?;

    Ok(Json(TicketActionResponse {
        number,
        state: TicketState::Deleted,
    }))
}
