use async_graphql::ErrorExtensions;
use miette::Diagnostic;
use thiserror::Error;

/// A presented token could not be turned into an identity.
#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    #[error("No token verification key configured")]
    #[diagnostic(
        code(vss::auth::no_key),
        help("Set auth.secret_key / SECRET_KEY or auth.public_key_file / PUBLIC_KEY_FILE")
    )]
    MissingKey,

    #[error("Unsupported JWT algorithm `{0}`")]
    #[diagnostic(
        code(vss::auth::algorithm),
        help("Use one of HS256, HS384, HS512, RS256, RS384, RS512, ES256, ES384, ES512, PS256, PS384, PS512 or none")
    )]
    UnsupportedAlgorithm(String),

    #[error("Unsigned (`none`) tokens are not accepted")]
    #[diagnostic(code(vss::auth::unsigned))]
    UnsignedToken,

    #[error("Failed to read key file `{path}`")]
    #[diagnostic(code(vss::auth::key_file))]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid key material: {0}")]
    #[diagnostic(code(vss::auth::key))]
    InvalidKey(String),

    #[error("Token verification failed: {0}")]
    #[diagnostic(code(vss::auth::verification))]
    Verification(String),

    #[error("Token has expired")]
    #[diagnostic(code(vss::auth::expired))]
    Expired,

    #[error("Token is not yet valid")]
    #[diagnostic(code(vss::auth::not_before))]
    NotYetValid,

    #[error("Malformed token payload: {0}")]
    #[diagnostic(
        code(vss::auth::payload),
        help("Tokens must carry an integer `uid` and a `permissions` array of strings")
    )]
    MalformedPayload(String),

    #[error("Failed to sign token: {0}")]
    #[diagnostic(code(vss::auth::signing))]
    Signing(String),

    #[error("Invalid permission groups file: {0}")]
    #[diagnostic(
        code(vss::auth::permission_groups),
        help("Expected a YAML mapping of group name to {{ attributes: [..], protection_level: .. }}")
    )]
    PermissionGroups(#[from] serde_yaml::Error),
}

impl AuthError {
    pub const CODE: &'static str = "UNAUTHENTICATED";
}

impl ErrorExtensions for AuthError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", Self::CODE))
    }
}

/// The caller lacks one or more permissions a field requires.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}: {}", .missing.join(", "))]
#[diagnostic(code(vss::auth::permissions))]
pub struct PermissionError {
    pub missing: Vec<String>,
    pub message: String,
}

impl PermissionError {
    pub const CODE: &'static str = "PERMISSIONS_ERROR";

    pub fn new(missing: Vec<String>) -> Self {
        Self {
            missing,
            message: "Missing permissions".to_string(),
        }
    }
}

impl ErrorExtensions for PermissionError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| e.set("code", Self::CODE))
    }
}
