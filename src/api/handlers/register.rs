use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::debug;
use utoipa::ToSchema;

use super::error_response;
use crate::registration::RegistrationService;

#[derive(ToSchema, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    /// Confirmation token; also delivered out of band as a link.
    pub token: String,
}

#[utoipa::path(
    post,
    path= "/v1/registration",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Account created disabled, confirmation token issued", body = RegisterResponse, content_type = "application/json"),
        (status = 400, description = "Missing payload or invalid email", body = String),
        (status = 409, description = "Email already taken", body = String),
    ),
    tag= "registration"
)]
pub async fn register(
    service: Extension<Arc<RegistrationService>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    debug!("register request: {:?}", request);

    let RegisterRequest {
        username,
        email,
        password,
    } = request;
    let password = SecretString::from(password);

    match service.register(&username, &email, &password).await {
        Ok(token) => (StatusCode::CREATED, Json(RegisterResponse { token })).into_response(),
        Err(err) => error_response(&err),
    }
}
