use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{PlayerDto, StateResponse};
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

// Operator view of the same snapshot clients get from `getGameState`.
pub async fn state_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.dispatcher.snapshot().await {
        Ok(players) => {
            let players = players.iter().map(PlayerDto::from).collect();
            (StatusCode::OK, Json(StateResponse { players })).into_response()
        }
        Err(err) => {
            error!(error = %err, "failed to load arena state");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: err.client_message(),
                }),
            )
                .into_response()
        }
    }
}
