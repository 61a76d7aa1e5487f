use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::{fmt, sync::Arc};
use utoipa::IntoParams;

use super::error_response;
use crate::registration::RegistrationService;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmParams {
    /// Token from the confirmation link.
    pub token: Option<String>,
}

impl fmt::Debug for ConfirmParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfirmParams")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Consume a confirmation token and enable its account.
#[utoipa::path(
    get,
    path = "/v1/registration/confirm",
    params(ConfirmParams),
    responses(
        (status = 200, description = "Email confirmed", body = String),
        (status = 404, description = "Unknown token", body = String),
        (status = 409, description = "Token already used", body = String),
        (status = 410, description = "Token expired", body = String)
    ),
    tag = "registration"
)]
pub async fn confirm(
    service: Extension<Arc<RegistrationService>>,
    Query(params): Query<ConfirmParams>,
) -> impl IntoResponse {
    let token = params.token.unwrap_or_default();

    match service.confirm(&token).await {
        Ok(result) => (StatusCode::OK, result.as_str().to_string()).into_response(),
        Err(err) => error_response(&err),
    }
}
