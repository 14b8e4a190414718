use josekit::jws::JwsVerifier;
use josekit::jwt::{self, JwtPayload};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::authz::algorithm::JwtAlgorithm;
use crate::authz::errors::AuthError;
use crate::authz::permissions::PermissionSet;
use crate::settings::Auth;

/// Identity of the caller for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub uid: i64,
    pub permissions: PermissionSet,
}

impl AuthContext {
    /// Read `uid` and `permissions` from a verified payload.
    pub fn from_payload(payload: &JwtPayload) -> Result<Self, AuthError> {
        let uid = payload
            .claim("uid")
            .and_then(Value::as_i64)
            .ok_or_else(|| AuthError::MalformedPayload("`uid` must be an integer".into()))?;

        let permissions = match payload.claim("permissions") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        AuthError::MalformedPayload("`permissions` must only hold strings".into())
                    })
                })
                .collect::<Result<PermissionSet, _>>()?,
            _ => {
                return Err(AuthError::MalformedPayload(
                    "`permissions` must be an array".into(),
                ))
            }
        };

        Ok(Self { uid, permissions })
    }
}

/// Verifies `Authorization` header tokens with the process-wide key material.
///
/// Built once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct Authenticator {
    algorithm: JwtAlgorithm,
    verifier: Option<Arc<dyn JwsVerifier>>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("algorithm", &self.algorithm)
            .field("has_key", &self.verifier.is_some())
            .finish()
    }
}

impl Authenticator {
    /// `key` is the HMAC secret or PEM public key. Without a key every
    /// presented token fails verification; anonymous requests still work.
    pub fn new(algorithm: JwtAlgorithm, key: Option<&[u8]>) -> Result<Self, AuthError> {
        if algorithm == JwtAlgorithm::None {
            return Err(AuthError::UnsignedToken);
        }
        let verifier = match key {
            Some(key) => Some(Arc::from(algorithm.verifier(key)?)),
            None => None,
        };
        Ok(Self {
            algorithm,
            verifier,
        })
    }

    /// Resolve key material from configuration: a public key file takes
    /// precedence over a shared secret.
    pub fn from_settings(auth: &Auth) -> Result<Self, AuthError> {
        let algorithm: JwtAlgorithm = auth.algorithm.parse()?;
        let key = if let Some(path) = &auth.public_key_file {
            Some(std::fs::read(path).map_err(|source| AuthError::KeyFile {
                path: path.display().to_string(),
                source,
            })?)
        } else {
            auth.secret_key.as_ref().map(|s| s.as_bytes().to_vec())
        };
        if key.is_none() {
            tracing::warn!("No token verification key configured; only anonymous access will succeed");
        }
        Self::new(algorithm, key.as_deref())
    }

    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    /// Turn the raw `Authorization` header into an identity.
    ///
    /// Only a missing or empty header is an anonymous caller (`Ok(None)`).
    /// Any other value must verify, so whitespace or a bare scheme is an
    /// error, never anonymous.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Option<AuthContext>, AuthError> {
        let Some(raw) = header.filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        let token = strip_scheme(raw);
        if token.is_empty() {
            return Err(AuthError::Verification("authorization header carries no token".into()));
        }
        let verifier = self.verifier.as_ref().ok_or(AuthError::MissingKey)?;

        let (payload, _header) = jwt::decode_with_verifier(token, verifier.as_ref())
            .map_err(|e| AuthError::Verification(e.to_string()))?;
        check_time_claims(&payload, SystemTime::now())?;

        let ctx = AuthContext::from_payload(&payload)?;
        tracing::debug!(uid = ctx.uid, permissions = ctx.permissions.len(), "Authenticated request");
        Ok(Some(ctx))
    }
}

// The header carries the bare token; a `Bearer ` scheme is tolerated.
fn strip_scheme(header: &str) -> &str {
    let header = header.trim();
    match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => header,
    }
}

fn check_time_claims(payload: &JwtPayload, now: SystemTime) -> Result<(), AuthError> {
    if let Some(exp) = payload.expires_at() {
        if now >= exp {
            return Err(AuthError::Expired);
        }
    }
    if let Some(nbf) = payload.not_before() {
        if now < nbf {
            return Err(AuthError::NotYetValid);
        }
    }
    Ok(())
}
