//! Authentication and field-level authorization.
//!
//! Tokens are verified once per request into an [`context::AuthContext`]; the
//! GraphQL layer then checks every permission-gated field against it with
//! [`permissions::authorize`].

pub mod algorithm;
pub mod context;
pub mod errors;
pub mod issuer;
pub mod permissions;

pub use algorithm::JwtAlgorithm;
pub use context::{AuthContext, Authenticator};
pub use errors::{AuthError, PermissionError};
pub use issuer::{PermissionGroup, PermissionGroups, TokenClaims, TokenIssuer};
pub use permissions::{authorize, Decision, PermissionSet};
