pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod jwks;
pub mod key_cache;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use claims::Claims;
pub use config::{parse_algorithm, JwksConfig, JwtConfig};
pub use error::{AuthError, AuthResult};
pub use extractors::{authorization_header, extract_bearer, AuthContext};
pub use guards::{authorize, ensure_permission, require_permission, PermissionGuard};
pub use jwks::{JwksFetcher, KeySet, KeySource, SigningKey, StaticKeySource};
pub use key_cache::KeySetCache;
pub use verifier::{JwtVerifier, JwtVerifierBuilder};
pub use jsonwebtoken::Algorithm;
