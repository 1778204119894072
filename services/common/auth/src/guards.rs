use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::extractors::{authorization_header, extract_bearer, AuthContext};
use crate::verifier::JwtVerifier;

/// Succeeds when `claims` carries `required` in its permission array.
pub fn ensure_permission(claims: &Claims, required: &str) -> AuthResult<()> {
    if claims.permissions.is_none() {
        return Err(AuthError::MissingPermissions);
    }

    if claims.has_permission(required) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            required: required.to_string(),
        })
    }
}

/// Full pipeline for one request: bearer extraction, verification, permission check.
pub async fn authorize(
    verifier: &JwtVerifier,
    header: Option<&str>,
    required: &str,
) -> AuthResult<(Claims, String)> {
    let token = extract_bearer(header)?;
    let claims = verifier.verify(token).await?;
    ensure_permission(&claims, required)?;
    Ok((claims, token.to_owned()))
}

/// Middleware state binding a verifier to the permission one route requires.
#[derive(Clone)]
pub struct PermissionGuard {
    verifier: Arc<JwtVerifier>,
    required: &'static str,
}

impl PermissionGuard {
    pub fn new(verifier: Arc<JwtVerifier>, required: &'static str) -> Self {
        Self { verifier, required }
    }
}

/// Use with `axum::middleware::from_fn_with_state(PermissionGuard::new(..), require_permission)`.
///
/// On success the handler can take an [`AuthContext`]; on failure the handler never runs.
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    mut req: Request,
    next: Next,
) -> Response {
    // Owned copy: the request body is not Sync, so no borrow of `req` may cross an await.
    let header = authorization_header(req.headers()).map(|value| value.map(str::to_owned));
    let outcome = match header {
        Ok(header) => authorize(&guard.verifier, header.as_deref(), guard.required).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok((claims, token)) => {
            req.extensions_mut().insert(AuthContext { claims, token });
            next.run(req).await
        }
        Err(err) => {
            warn!(
                code = err.code(),
                status = err.status().as_u16(),
                required = guard.required,
                path = %req.uri().path(),
                error = %err,
                "rejected request"
            );
            err.into_response()
        }
    }
}
