use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
};
use helpdesk_core::{NewTicket, TicketPatch};
use helpdesk_engine::{TicketService, TicketView};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{ApiError, CurrentUser};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TicketService>,
}

#[derive(Deserialize)]
struct CommentRequest {
    #[serde(default)]
    text: String,
}

pub struct HelpdeskServer {
    state: AppState,
    cors_origins: Vec<String>,
}

impl HelpdeskServer {
    pub fn new(service: Arc<TicketService>, cors_origins: Vec<String>) -> Self {
        Self {
            state: AppState { service },
            cors_origins,
        }
    }

    pub async fn serve(self, host: &str, port: u16) -> anyhow::Result<()> {
        let app = router(self.state, &self.cors_origins);

        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr).await?;

        info!("Help desk API listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Help desk API stopped");
        Ok(())
    }
}

/// Build the REST router. An empty origin list allows any origin.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handle_info))
        .route("/api/tickets", get(api_list_tickets).post(api_create_ticket))
        .route(
            "/api/tickets/:id",
            get(api_get_ticket)
                .put(api_update_ticket)
                .delete(api_delete_ticket),
        )
        .route("/api/tickets/:id/comments", post(api_add_comment))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C signal"),
        Err(e) => {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// GET / - service info, no authentication required
async fn handle_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "helpdesk",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "active",
        "endpoints": {
            "tickets": "/api/tickets"
        }
    }))
}

/// GET /api/tickets - all tickets, newest first
async fn api_list_tickets(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<Json<Vec<TicketView>>> {
    Ok(Json(state.service.list_views().await?))
}

/// GET /api/tickets/:id
async fn api_get_ticket(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<TicketView>> {
    Ok(Json(state.service.get_view(&id).await?))
}

/// POST /api/tickets - open a ticket as the caller
async fn api_create_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TicketView>)> {
    let Json(new) = payload?;
    let ticket = state.service.create_ticket(&user, new).await?;
    let view = state.service.view(ticket, state.service.now()).await;
    Ok((StatusCode::CREATED, Json(view)))
}

/// PUT /api/tickets/:id - patch title, description, status, priority or assignee
async fn api_update_ticket(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<TicketPatch>, JsonRejection>,
) -> ApiResult<Json<TicketView>> {
    let Json(patch) = payload?;
    let ticket = state.service.update_ticket(&id, patch).await?;
    Ok(Json(state.service.view(ticket, state.service.now()).await))
}

/// DELETE /api/tickets/:id
async fn api_delete_ticket(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.service.delete_ticket(&id).await?;
    Ok(Json(serde_json::json!({ "message": "Ticket removed" })))
}

/// POST /api/tickets/:id/comments - comment as the caller
async fn api_add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> ApiResult<Json<TicketView>> {
    let Json(req) = payload?;
    let ticket = state.service.add_comment(&id, &user, req.text).await?;
    Ok(Json(state.service.view(ticket, state.service.now()).await))
}
