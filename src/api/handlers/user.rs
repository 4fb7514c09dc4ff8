use axum::{extract::Extension, http::HeaderMap, Json};
use std::sync::Arc;
use tracing::instrument;

use super::auth::{
    authenticate,
    types::{ProfileResponse, ProfileUser},
    AuthState,
};
use crate::api::error::{ApiError, ErrorBody};

#[utoipa::path(
    get,
    path = "/user/profile",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = ProfileResponse),
        (status = 401, description = "Authentication required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip(auth_state, headers))]
pub async fn profile(
    auth_state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = authenticate(&headers, &auth_state).await?;

    Ok(Json(ProfileResponse {
        message: "Welcome to your profile".to_string(),
        user: ProfileUser::from(&user),
    }))
}
