use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderMap};

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};

/// Verified identity attached to a request by the permission guard.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::MissingAuthorization)
    }
}

/// Raw `Authorization` header value, `None` when absent.
///
/// A header that is not visible ASCII is reported as malformed rather than absent.
pub fn authorization_header(headers: &HeaderMap) -> AuthResult<Option<&str>> {
    headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| AuthError::MalformedAuthorization))
        .transpose()
}

/// Pull the token out of `Bearer <token>`. The token itself is not inspected.
pub fn extract_bearer(header: Option<&str>) -> AuthResult<&str> {
    let header = header.ok_or(AuthError::MissingAuthorization)?;

    let parts: Vec<&str> = header.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(if parts.first() == Some(&"Bearer") {
            AuthError::MalformedAuthorization
        } else {
            AuthError::InvalidScheme
        });
    };

    if *scheme != "Bearer" {
        return Err(AuthError::InvalidScheme);
    }
    if token.is_empty() {
        return Err(AuthError::MalformedAuthorization);
    }

    Ok(*token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extract_bearer_accepts_valid_token() {
        let token = extract_bearer(Some("Bearer abc.def.ghi")).expect("token");
        assert_eq!(token, "abc.def.ghi");
    }

    #[test]
    fn extract_bearer_requires_header() {
        let err = extract_bearer(None).expect_err("should reject");
        assert_eq!(err, AuthError::MissingAuthorization);
        assert_eq!(err.code(), "authorization_header_missing");
        assert_eq!(err.status().as_u16(), 401);
    }

    #[test]
    fn extract_bearer_rejects_wrong_scheme() {
        for header in ["Basic credentials", "bearer abc.def.ghi", "BEARER abc"] {
            let err = extract_bearer(Some(header)).expect_err("should reject");
            assert_eq!(err.code(), "invalid_header", "{header}");
        }
    }

    #[test]
    fn extract_bearer_requires_exactly_two_parts() {
        for header in ["Bearer", "Bearer a b", "Bearer  abc", "Bearer ", "abc.def.ghi", ""] {
            let err = extract_bearer(Some(header)).expect_err("should reject");
            assert_eq!(err.code(), "invalid_header", "{header:?}");
        }
    }

    #[test]
    fn authorization_header_reads_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(authorization_header(&headers).unwrap(), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        assert_eq!(authorization_header(&headers).unwrap(), Some("Bearer t"));

        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xfe").unwrap());
        assert_eq!(
            authorization_header(&headers).unwrap_err(),
            AuthError::MalformedAuthorization
        );
    }
}
