use async_graphql::dynamic::ResolverContext;
use async_graphql::ErrorExtensions;

use crate::authz::{authorize, AuthContext, Decision, PermissionError, PermissionSet};

/// Permission check for a single field, built alongside the field when the
/// schema is assembled and run before its resolver.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    field: String,
    required: PermissionSet,
}

impl PermissionGuard {
    pub fn new(field: impl Into<String>, required: PermissionSet) -> Self {
        Self {
            field: field.into(),
            required,
        }
    }

    pub fn required(&self) -> &PermissionSet {
        &self.required
    }

    pub fn evaluate(&self, caller: Option<&AuthContext>) -> Result<(), PermissionError> {
        match authorize(&self.required, caller.map(|c| &c.permissions)) {
            Decision::Allow => Ok(()),
            Decision::Deny { missing } => {
                tracing::debug!(
                    field = %self.field,
                    uid = caller.map(|c| c.uid),
                    missing = ?missing,
                    "Denied field access"
                );
                Err(PermissionError::new(missing))
            }
        }
    }

    /// Evaluate against the request's caller; anonymous requests carry no
    /// [`AuthContext`].
    pub fn check(&self, ctx: &ResolverContext<'_>) -> async_graphql::Result<()> {
        self.evaluate(ctx.data_opt::<AuthContext>())
            .map_err(|e| e.extend())
    }
}
