use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common_http_errors::{error_response, ApiError};
use jsonwebtoken::Algorithm;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Every way a protected request can be turned away.
///
/// Each variant maps onto exactly one `(status, code)` pair; the description is the
/// `Display` text and ends up as the `message` of the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    MissingAuthorization,
    #[error("Authorization header must start with \"Bearer\".")]
    InvalidScheme,
    #[error("Authorization header must be bearer token.")]
    MalformedAuthorization,
    #[error("Unable to parse authentication token: {0}")]
    InvalidHeader(String),
    #[error("Token algorithm {found:?} is not accepted; expected {expected:?}.")]
    UnsupportedAlgorithm {
        expected: Algorithm,
        found: Algorithm,
    },
    #[error("Authorization malformed: token missing kid header.")]
    MissingKeyId,
    #[error("Unable to find the appropriate key for kid '{0}'.")]
    UnknownKeyId(String),
    #[error("Token signature is invalid.")]
    InvalidSignature,
    #[error("Token expired.")]
    TokenExpired,
    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,
    #[error("Permissions not included in JWT.")]
    MissingPermissions,
    #[error("Permission not found.")]
    Forbidden { required: String },
    #[error("Unable to fetch signing keys: {0}")]
    JwksFetch(String),
    #[error("Unable to parse signing keys: {0}")]
    JwksDecode(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingPermissions => StatusCode::BAD_REQUEST,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorization => "authorization_header_missing",
            AuthError::InvalidScheme
            | AuthError::MalformedAuthorization
            | AuthError::InvalidHeader(_)
            | AuthError::UnsupportedAlgorithm { .. }
            | AuthError::MissingKeyId
            | AuthError::UnknownKeyId(_)
            | AuthError::InvalidSignature => "invalid_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims | AuthError::MissingPermissions => "invalid_claims",
            AuthError::Forbidden { .. } => "unauthorized",
            AuthError::JwksFetch(_) | AuthError::JwksDecode(_) => "auth_error",
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match value.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => Self::InvalidClaims,
            ErrorKind::MissingRequiredClaim(claim) if claim != "exp" => Self::InvalidClaims,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::InvalidHeader(value.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        ApiError::Status {
            status: value.status(),
            code: value.code(),
            message: value.description(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(self.status(), self.code(), self.description())
    }
}
