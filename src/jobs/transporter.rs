use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::MigrationConfig;
use crate::jobs::duplicates::{select_untransferred, transfer_slug};
use crate::models::{NewProductPage, Page, ScrapedItem};
use crate::store::{ContentStore, Database, ImageStore, SourceStore};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub enum TransferOutcome {
    /// No product index page exists for the target locale; nothing was written.
    MissingIndexPage { locale: String },
    NothingToDo,
    Transferred(TransferReport),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferReport {
    pub index_page_id: i64,
    pub transferred: Vec<TransferredPage>,
    /// Transfer slugs that turned out to exist when the batch ran.
    pub skipped: Vec<String>,
    pub images_created: usize,
    pub images_reused: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferredPage {
    pub item_id: i64,
    pub page_id: i64,
    pub title: String,
    pub slug: String,
    pub image_ids: Vec<i64>,
}

/// Copies scraped items into published product pages, one bounded batch per run.
pub struct Transporter {
    locale: String,
    batch_size: usize,
    short_description_limit: usize,
}

impl Transporter {
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            locale: config.target_locale.clone(),
            batch_size: config.transfer_batch_size,
            short_description_limit: config.short_description_limit,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn run(&self, db: &Database) -> Result<TransferOutcome> {
        let mut conn = db.acquire().await?;
        let Some(index_page) = conn.find_index_page(&self.locale).await? else {
            error!(
                "No product index page found for locale '{}'. Please create one with that locale first.",
                self.locale
            );
            return Ok(TransferOutcome::MissingIndexPage {
                locale: self.locale.clone(),
            });
        };

        let batch = self.select_batch(&mut *conn).await?;
        // The pool may hold a single connection; release it before opening the transaction.
        drop(conn);

        if batch.is_empty() {
            warn!("No new scraped items to transfer. All items have already been transferred.");
            return Ok(TransferOutcome::NothingToDo);
        }
        info!("Found {} new items to transfer.", batch.len());

        let mut tx = db.begin().await?;
        let report = self.transfer_batch(&mut *tx, &index_page, &batch).await?;
        tx.commit().await?;

        Ok(TransferOutcome::Transferred(report))
    }

    /// Up to `batch_size` items, in id order, that have no product page yet.
    pub async fn select_batch<S>(&self, store: &mut S) -> Result<Vec<ScrapedItem>>
    where
        S: ContentStore + SourceStore,
    {
        let existing_slugs = store.product_slugs().await?;
        let items = store.list_scraped_items().await?;
        Ok(select_untransferred(&items, &existing_slugs, self.batch_size)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Creates and publishes one page per item. Does not roll back on its own;
    /// `run` wraps it in a transaction.
    pub async fn transfer_batch<S>(
        &self,
        store: &mut S,
        index_page: &Page,
        batch: &[ScrapedItem],
    ) -> Result<TransferReport>
    where
        S: ContentStore + SourceStore + ImageStore,
    {
        let mut report = TransferReport {
            index_page_id: index_page.id,
            ..Default::default()
        };

        for item in batch {
            let slug = transfer_slug(item);
            if store.product_slug_exists(&slug).await? {
                warn!("Product page for '{}' already exists. Skipping.", item.title);
                report.skipped.push(slug);
                continue;
            }

            let new_page = NewProductPage::from_scraped_item(
                item,
                slug,
                &self.locale,
                self.short_description_limit,
                Utc::now(),
            );
            let page = store.add_product_child(index_page.id, &new_page).await?;
            // The page needs an id before images can point at it.
            store.publish(page.id()).await?;

            let mut blocks = Vec::new();
            for scraped_image in store.list_item_images(item.id).await? {
                let (image, created) = store
                    .get_or_create_image(&scraped_image.image, &scraped_image.image)
                    .await?;
                if created {
                    report.images_created += 1;
                } else {
                    report.images_reused += 1;
                }
                blocks.push(image.as_block());
            }

            store.set_product_images(page.id(), &blocks).await?;
            store.publish(page.id()).await?;

            info!("Successfully transferred '{}' to product page.", item.title);
            report.transferred.push(TransferredPage {
                item_id: item.id,
                page_id: page.id(),
                title: item.title.clone(),
                slug: page.slug().to_string(),
                image_ids: blocks.iter().map(|block| block.image_id()).collect(),
            });
        }

        Ok(report)
    }
}
