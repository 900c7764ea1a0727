use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::error::AppError;

/// A product record produced by the scraper. Never modified by the catalog jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapedItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub description_short: Option<String>,
    pub description_long: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct ScrapedItemRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub price: String,
    pub discount_price: Option<String>,
    pub description_short: Option<String>,
    pub description_long: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ScrapedItemRow> for ScrapedItem {
    type Error = AppError;

    fn try_from(row: ScrapedItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            price: row.price.parse()?,
            discount_price: row
                .discount_price
                .as_deref()
                .map(str::parse::<Decimal>)
                .transpose()?,
            description_short: row.description_short,
            description_long: row.description_long,
            created_at: row.created_at,
        })
    }
}

/// An image file attached to a scraped item. `image` is the stored file name,
/// which doubles as the display name when the image is imported.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ScrapedItemImage {
    pub id: i64,
    pub item_id: i64,
    pub image: String,
}
