use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{PageBlock, PageType, ScrapedItem};
use crate::utils::error::AppError;
use crate::utils::slug::truncate_chars;

/// A node of the content tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Page {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub page_type: PageType,
    pub title: String,
    pub slug: String,
    pub locale: String,

    // Tree position among siblings
    pub sort_order: i64,

    // Publication state
    pub live: bool,
    pub show_in_menus: bool,
    pub first_published_at: Option<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
    pub live_revision_id: Option<i64>,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product page: the tree node plus its product fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductPage {
    #[serde(flatten)]
    pub page: Page,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub description_short: String,
    pub description_long: String,
    pub images: Vec<PageBlock>,
}

impl ProductPage {
    pub fn id(&self) -> i64 {
        self.page.id
    }

    pub fn title(&self) -> &str {
        &self.page.title
    }

    pub fn slug(&self) -> &str {
        &self.page.slug
    }

    pub fn locale(&self) -> &str {
        &self.page.locale
    }

    pub fn parent_id(&self) -> Option<i64> {
        self.page.parent_id
    }
}

/// Raw row shape of `pages JOIN product_pages`; prices and images are still text.
#[derive(Debug, FromRow)]
pub(crate) struct ProductPageRow {
    #[sqlx(flatten)]
    pub page: Page,
    pub price: String,
    pub discount_price: Option<String>,
    pub description_short: String,
    pub description_long: String,
    pub images_json: String,
}

impl TryFrom<ProductPageRow> for ProductPage {
    type Error = AppError;

    fn try_from(row: ProductPageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            page: row.page,
            price: row.price.parse()?,
            discount_price: row
                .discount_price
                .as_deref()
                .map(str::parse::<Decimal>)
                .transpose()?,
            description_short: row.description_short,
            description_long: row.description_long,
            images: serde_json::from_str(&row.images_json)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProductPage {
    pub title: String,
    pub slug: String,
    pub locale: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub description_short: String,
    pub description_long: String,
    pub show_in_menus: bool,
    pub first_published_at: Option<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
}

impl NewProductPage {
    /// Builds the page content for a scraped item. The short description is cut
    /// to `short_limit` characters; missing descriptions become empty strings.
    pub fn from_scraped_item(
        item: &ScrapedItem,
        slug: String,
        locale: &str,
        short_limit: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            title: item.title.clone(),
            slug,
            locale: locale.to_string(),
            price: item.price,
            discount_price: item.discount_price,
            description_short: item
                .description_short
                .as_deref()
                .map(|text| truncate_chars(text, short_limit))
                .unwrap_or_default(),
            description_long: item.description_long.clone().unwrap_or_default(),
            show_in_menus: true,
            first_published_at: Some(now),
            last_published_at: Some(now),
        }
    }
}

/// A plain tree node (site root, section or product index).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPage {
    pub page_type: PageType,
    pub title: String,
    pub slug: String,
    pub locale: String,
    pub show_in_menus: bool,
}

impl NewPage {
    pub fn product_index(title: &str, slug: &str, locale: &str) -> Self {
        Self {
            page_type: PageType::ProductIndex,
            title: title.to_string(),
            slug: slug.to_string(),
            locale: locale.to_string(),
            show_in_menus: true,
        }
    }

    pub fn generic(title: &str, slug: &str, locale: &str) -> Self {
        Self {
            page_type: PageType::Generic,
            title: title.to_string(),
            slug: slug.to_string(),
            locale: locale.to_string(),
            show_in_menus: false,
        }
    }
}

/// A saved snapshot of a page's content.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PageRevision {
    pub id: i64,
    pub page_id: i64,
    pub content_json: String,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}
