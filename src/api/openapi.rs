#![allow(clippy::needless_for_each)]

use super::handlers::{
    confirm::{self, __path_confirm},
    health::{self, __path_health},
    register::{self, __path_register},
    resend::{self, __path_resend},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(health, register, confirm, resend),
    components(schemas(
        health::Health,
        register::RegisterRequest,
        register::RegisterResponse,
        resend::ResendRequest
    )),
    tags(
        (name = "registration", description = "Sign-up and email confirmation"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = Some(env!("CARGO_PKG_DESCRIPTION").to_string());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );
    }

    #[test]
    fn openapi_tags_and_paths() {
        let doc = openapi();
        let tags = doc.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "registration"));
        for path in [
            "/health",
            "/v1/registration",
            "/v1/registration/confirm",
            "/v1/registration/resend",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}
