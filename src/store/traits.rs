use std::collections::HashSet;

use async_trait::async_trait;

use crate::models::{
    NewPage, NewProductPage, Page, PageBlock, PageRevision, ProductPage, ScrapedItem,
    ScrapedItemImage, StoredImage,
};
use crate::Result;

/// Page tree operations used by the catalog jobs.
#[async_trait]
pub trait ContentStore: Send {
    /// First product index page (lowest id) for `locale`.
    async fn find_index_page(&mut self, locale: &str) -> Result<Option<Page>>;
    async fn get_page(&mut self, page_id: i64) -> Result<Option<Page>>;
    async fn get_parent(&mut self, page_id: i64) -> Result<Option<Page>>;

    /// Creates a plain page, as the last child of `parent_id` or as a root.
    async fn create_page(&mut self, parent_id: Option<i64>, page: &NewPage) -> Result<Page>;

    /// Product pages of every locale, in id order.
    async fn list_product_pages(&mut self) -> Result<Vec<ProductPage>>;
    async fn get_product_page(&mut self, page_id: i64) -> Result<Option<ProductPage>>;
    async fn product_slugs(&mut self) -> Result<HashSet<String>>;
    async fn product_slug_exists(&mut self, slug: &str) -> Result<bool>;

    /// Another product page (not `exclude_id`) already using `slug` in `locale`.
    async fn find_product_in_locale(
        &mut self,
        slug: &str,
        locale: &str,
        exclude_id: i64,
    ) -> Result<Option<Page>>;

    /// Attaches a new, not yet published product page as the last child of `parent_id`.
    async fn add_product_child(
        &mut self,
        parent_id: i64,
        page: &NewProductPage,
    ) -> Result<ProductPage>;

    /// Moves a page (and its subtree) to the last child position of `new_parent_id`.
    async fn move_page(&mut self, page_id: i64, new_parent_id: i64) -> Result<()>;
    async fn set_locale(&mut self, page_id: i64, locale: &str) -> Result<()>;
    async fn set_product_images(&mut self, page_id: i64, images: &[PageBlock]) -> Result<()>;

    /// Saves a revision of the current content and makes it live.
    async fn publish(&mut self, page_id: i64) -> Result<PageRevision>;

    async fn count_product_pages(&mut self) -> Result<u64>;
    async fn delete_product_pages(&mut self) -> Result<u64>;
}

/// Read access to scraped product records.
#[async_trait]
pub trait SourceStore: Send {
    /// All scraped items in id order.
    async fn list_scraped_items(&mut self) -> Result<Vec<ScrapedItem>>;
    async fn list_item_images(&mut self, item_id: i64) -> Result<Vec<ScrapedItemImage>>;
}

#[async_trait]
pub trait ImageStore: Send {
    /// Returns the image titled `title`, creating it from `file` when none exists.
    /// The flag is `true` when a new image was created.
    async fn get_or_create_image(&mut self, title: &str, file: &str) -> Result<(StoredImage, bool)>;
}
