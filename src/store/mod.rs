pub mod database;
pub mod sqlite;
pub mod traits;

pub use database::Database;
pub use traits::{ContentStore, ImageStore, SourceStore};
