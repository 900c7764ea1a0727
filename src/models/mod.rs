use serde::{Deserialize, Serialize};

pub mod image;
pub mod page;
pub mod scraped_item;

// Re-exports for convenience
pub use image::*;
pub use page::*;
pub use scraped_item::*;

// Common enums used across models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT")]
pub enum PageType {
    #[sqlx(rename = "generic")]
    Generic,
    #[sqlx(rename = "product_index")]
    ProductIndex,
    #[sqlx(rename = "product")]
    Product,
}

/// One entry of a page's structured image list, stored as
/// `{"type": "image", "value": <image id>}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PageBlock {
    Image(i64),
}

impl PageBlock {
    pub fn image_id(&self) -> i64 {
        match self {
            PageBlock::Image(id) => *id,
        }
    }
}
