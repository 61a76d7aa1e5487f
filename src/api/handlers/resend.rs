use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::registration::RegistrationService;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResendRequest {
    pub email: String,
}

/// Resend the confirmation link (always returns 204 to avoid user enumeration).
#[utoipa::path(
    post,
    path = "/v1/registration/resend",
    request_body = ResendRequest,
    responses(
        (status = 204, description = "Resend accepted")
    ),
    tag = "registration"
)]
pub async fn resend(
    service: Extension<Arc<RegistrationService>>,
    payload: Option<Json<ResendRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return StatusCode::NO_CONTENT;
    };

    match service.resend(&request.email).await {
        Ok(outcome) => debug!("resend outcome: {:?}", outcome),
        Err(err) => error!("Failed to resend confirmation: {err:#}"),
    }

    StatusCode::NO_CONTENT
}
