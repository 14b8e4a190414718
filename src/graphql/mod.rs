pub mod guard;
pub mod schema;

pub use guard::PermissionGuard;
pub use schema::{build_schema, QUERY_TYPE};
