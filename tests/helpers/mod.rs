pub mod db;
pub mod tokens;

pub use db::TestDb;
pub use tokens::{token_for, SECRET};
