use josekit::jws::{JwsHeader, JwsSigner};
use josekit::jwt::{self, JwtPayload};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::authz::algorithm::JwtAlgorithm;
use crate::authz::errors::AuthError;

/// Named alias for a set of leaf permissions, as found in the permission
/// groups YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub protection_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionGroups(BTreeMap<String, PermissionGroup>);

impl PermissionGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, AuthError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AuthError::KeyFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn insert(&mut self, name: impl Into<String>, group: PermissionGroup) {
        self.0.insert(name.into(), group);
    }

    pub fn get(&self, name: &str) -> Option<&PermissionGroup> {
        self.0.get(name)
    }

    /// Replace every group alias in `requested` with its attributes; other
    /// names pass through as literal permissions. Order is kept and
    /// duplicates are not removed.
    pub fn expand<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        requested
            .iter()
            .flat_map(|name| match self.0.get(name.as_ref()) {
                Some(group) => group.attributes.clone(),
                None => vec![name.as_ref().to_string()],
            })
            .collect()
    }
}

/// Claims carried by an application token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub uid: i64,
    pub permissions: Vec<String>,
}

impl TokenClaims {
    pub fn new<I, S>(uid: i64, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uid,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Signs application tokens. Used by the `vss-token` operator tool.
pub struct TokenIssuer {
    algorithm: JwtAlgorithm,
    signer: Option<Box<dyn JwsSigner>>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl TokenIssuer {
    /// `key` is the HMAC secret or a PEM private key; ignored for `none`.
    pub fn new(algorithm: JwtAlgorithm, key: &[u8]) -> Result<Self, AuthError> {
        let signer = match algorithm {
            JwtAlgorithm::None => None,
            alg => Some(alg.signer(key)?),
        };
        Ok(Self { algorithm, signer })
    }

    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    pub fn issue(&self, claims: &TokenClaims, expires_in: Option<Duration>) -> Result<String, AuthError> {
        let mut payload = JwtPayload::new();
        payload
            .set_claim("uid", Some(json!(claims.uid)))
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        payload
            .set_claim("permissions", Some(json!(claims.permissions)))
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        let now = SystemTime::now();
        payload.set_issued_at(&now);
        if let Some(ttl) = expires_in {
            payload.set_expires_at(&(now + ttl));
        }

        let Some(signer) = &self.signer else {
            return self.algorithm.encode_unsigned(&payload);
        };
        let mut header = JwsHeader::new();
        header.set_token_type("JWT");
        jwt::encode_with_signer(&payload, &header, signer.as_ref())
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}
