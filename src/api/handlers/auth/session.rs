//! Logout. Sessions are stateless tokens, so the client just drops its copy.

use axum::Json;

use super::types::MessageResponse;
use crate::api::error::ErrorBody;

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 429, description = "Too many requests", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}
