use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::PageBlock;

/// An image held by the image store, looked up by its title.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct StoredImage {
    pub id: i64,
    pub title: String,
    pub file: String,
    pub created_at: DateTime<Utc>,
}

impl StoredImage {
    pub fn as_block(&self) -> PageBlock {
        PageBlock::Image(self.id)
    }
}
