use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::MigrationConfig;
use crate::jobs::duplicates::locale_duplicate;
use crate::models::ProductPage;
use crate::store::{ContentStore, Database};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub enum LocaleFixOutcome {
    /// No product index page exists for the target locale; nothing was written.
    MissingIndexPage { locale: String },
    DeletedAll { deleted: u64 },
    Reconciled(LocaleFixReport),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LocaleFixReport {
    pub index_page_id: i64,
    pub candidates: usize,
    pub fixed_locale: usize,
    pub moved: usize,
    pub skipped_duplicates: usize,
    pub failed_moves: usize,
    pub failed_relabels: usize,
    /// Titles of pages left alone because the target locale already has their slug.
    pub duplicate_titles: Vec<String>,
}

/// Puts every product page into the target locale under that locale's product index.
pub struct LocaleFixer {
    locale: String,
}

impl LocaleFixer {
    pub fn new(config: &MigrationConfig) -> Self {
        Self {
            locale: config.target_locale.clone(),
        }
    }

    pub async fn run(&self, db: &Database, delete_all: bool) -> Result<LocaleFixOutcome> {
        let mut conn = db.acquire().await?;
        if delete_all {
            self.delete_all(&mut *conn).await
        } else {
            self.reconcile(&mut *conn).await
        }
    }

    /// Removes every product page. Used to rebuild the catalog from scratch.
    pub async fn delete_all<S: ContentStore>(&self, store: &mut S) -> Result<LocaleFixOutcome> {
        let count = store.count_product_pages().await?;
        let deleted = store.delete_product_pages().await?;
        // Nested product pages go through the cascade and are not in `deleted`.
        if deleted != count {
            debug!("Counted {} product pages, {} removed directly", count, deleted);
        }
        info!(
            "Deleted {} product pages. Run transfer-scraped-items to recreate them in the '{}' locale.",
            count, self.locale
        );
        Ok(LocaleFixOutcome::DeletedAll { deleted: count })
    }

    pub async fn reconcile<S: ContentStore>(&self, store: &mut S) -> Result<LocaleFixOutcome> {
        let Some(index_page) = store.find_index_page(&self.locale).await? else {
            error!(
                "No product index page found for locale '{}'. Please create one first.",
                self.locale
            );
            return Ok(LocaleFixOutcome::MissingIndexPage {
                locale: self.locale.clone(),
            });
        };
        info!(
            "Found product index page for '{}': {} (ID: {})",
            self.locale, index_page.title, index_page.id
        );

        // Snapshot before any writes.
        let candidates: Vec<ProductPage> = store
            .list_product_pages()
            .await?
            .into_iter()
            .filter(|page| {
                page.locale() != self.locale
                    || page.parent_id().is_some_and(|parent| parent != index_page.id)
            })
            .collect();

        let mut report = LocaleFixReport {
            index_page_id: index_page.id,
            candidates: candidates.len(),
            ..Default::default()
        };

        for page in &candidates {
            let wrong_locale = page.locale() != self.locale;

            if wrong_locale {
                if let Some(existing) = locale_duplicate(store, page, &self.locale).await? {
                    warn!(
                        "  Skipping (duplicate exists): {} (page {} already uses slug '{}')",
                        page.title(),
                        existing.id,
                        page.slug()
                    );
                    report.skipped_duplicates += 1;
                    report.duplicate_titles.push(page.title().to_string());
                    continue;
                }
            }

            // Move before relabelling so a page that cannot move keeps its locale.
            if page.parent_id().is_some_and(|parent| parent != index_page.id) {
                match store.move_page(page.id(), index_page.id).await {
                    Ok(()) => {
                        report.moved += 1;
                        info!("  Moved to '{}' index: {}", self.locale, page.title());
                    }
                    Err(e) => {
                        report.failed_moves += 1;
                        warn!("  Could not move {}: {}", page.title(), e);
                        continue;
                    }
                }
            }

            if wrong_locale {
                match store.set_locale(page.id(), &self.locale).await {
                    Ok(()) => {
                        report.fixed_locale += 1;
                        info!("  Fixed locale for: {}", page.title());
                    }
                    Err(e) => {
                        report.failed_relabels += 1;
                        warn!("  Could not fix locale for {}: {}", page.title(), e);
                    }
                }
            }
        }

        info!("Completed:");
        info!("  - Fixed locale for {} pages", report.fixed_locale);
        info!("  - Moved {} pages to correct parent", report.moved);
        info!("  - Skipped {} duplicates", report.skipped_duplicates);

        if report.skipped_duplicates > 0 {
            warn!(
                "Note: {} pages were skipped because '{}' versions already exist. Review and delete the other-locale duplicates manually.",
                report.skipped_duplicates, self.locale
            );
        }

        Ok(LocaleFixOutcome::Reconciled(report))
    }
}
