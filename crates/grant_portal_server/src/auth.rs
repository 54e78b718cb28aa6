//! Caller identity from gateway headers.
//!
//! The identity gateway in front of the portal verifies the session and
//! forwards `x-user-id`, `x-user-email` and, optionally, `x-user-roles`
//! (comma separated). Without a roles header the role directory is consulted.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use grant_portal_core::principal::{Principal, Role};
use grant_portal_core::PortalService;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn unauthenticated(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// Parse a roles header. Unknown role names are rejected.
pub fn parse_roles(raw: &str) -> Result<Vec<Role>, String> {
    let mut roles = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let role = part.parse::<Role>().map_err(|e| e.to_string())?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    Ok(roles)
}

/// Middleware: resolve the caller and insert a `Principal` extension.
pub async fn identity(
    Extension(service): Extension<Arc<PortalService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let Some(user_id) = header(headers, USER_ID_HEADER).map(str::to_string) else {
        return unauthenticated("missing x-user-id header");
    };
    let Some(email) = header(headers, USER_EMAIL_HEADER).map(str::to_string) else {
        return unauthenticated("missing x-user-email header");
    };

    let roles = match header(headers, USER_ROLES_HEADER) {
        Some(raw) => match parse_roles(raw) {
            Ok(roles) => roles,
            Err(e) => return unauthenticated(&e),
        },
        None => match service.roles_for(&email).await {
            Ok(roles) => roles,
            Err(e) => return crate::error::AppError(e).into_response(),
        },
    };

    tracing::debug!(%user_id, ?roles, "caller resolved");
    request
        .extensions_mut()
        .insert(Principal::new(user_id, email, roles));
    next.run(request).await
}
