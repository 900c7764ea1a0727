//! Slug bookkeeping shared by both catalog jobs.

use std::collections::HashSet;

use crate::models::{Page, ProductPage, ScrapedItem};
use crate::store::ContentStore;
use crate::utils::slug::slugify;
use crate::Result;

/// Slug a scraped item gets as a product page: `slugify("{slug}-{id}")`.
pub fn transfer_slug(item: &ScrapedItem) -> String {
    slugify(&format!("{}-{}", item.slug, item.id))
}

/// Items whose transfer slug is not in `existing_slugs`, in input order,
/// stopping once `limit` have been picked.
pub fn select_untransferred<'a>(
    items: &'a [ScrapedItem],
    existing_slugs: &HashSet<String>,
    limit: usize,
) -> Vec<&'a ScrapedItem> {
    items
        .iter()
        .filter(|item| !existing_slugs.contains(&transfer_slug(item)))
        .take(limit)
        .collect()
}

/// Another product page already living in `locale` under the same slug.
pub async fn locale_duplicate<S: ContentStore>(
    store: &mut S,
    page: &ProductPage,
    locale: &str,
) -> Result<Option<Page>> {
    store
        .find_product_in_locale(page.slug(), locale, page.id())
        .await
}
