use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::models::{
    NewPage, NewProductPage, Page, PageBlock, PageRevision, PageType, ProductPage,
    ProductPageRow, ScrapedItem, ScrapedItemImage, ScrapedItemRow, StoredImage,
};
use crate::store::traits::{ContentStore, ImageStore, SourceStore};
use crate::utils::error::AppError;
use crate::Result;

const PAGE_SELECT: &str = "
    SELECT p.id, p.parent_id, p.page_type, p.title, p.slug, p.locale, p.sort_order,
           p.live, p.show_in_menus, p.first_published_at, p.last_published_at,
           p.live_revision_id, p.created_at, p.updated_at
    FROM pages p";

const PRODUCT_SELECT: &str = "
    SELECT p.id, p.parent_id, p.page_type, p.title, p.slug, p.locale, p.sort_order,
           p.live, p.show_in_menus, p.first_published_at, p.last_published_at,
           p.live_revision_id, p.created_at, p.updated_at,
           pp.price, pp.discount_price, pp.description_short, pp.description_long,
           pp.images_json
    FROM pages p
    JOIN product_pages pp ON pp.page_id = p.id";

async fn next_sort_order(conn: &mut SqliteConnection, parent_id: Option<i64>) -> Result<i64> {
    let next = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM pages WHERE parent_id IS ?",
    )
    .bind(parent_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(next)
}

/// Sibling slugs must be unique under one parent.
async fn ensure_slug_free(
    conn: &mut SqliteConnection,
    parent_id: i64,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<()> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM pages WHERE parent_id = ? AND slug = ? AND id IS NOT ?)",
    )
    .bind(parent_id)
    .bind(slug)
    .bind(exclude_id)
    .fetch_one(&mut *conn)
    .await?;

    if taken {
        return Err(AppError::SlugConflict {
            slug: slug.to_string(),
            parent_id,
        });
    }
    Ok(())
}

async fn is_ancestor_or_self(
    conn: &mut SqliteConnection,
    ancestor_id: i64,
    page_id: i64,
) -> Result<bool> {
    let found = sqlx::query_scalar::<_, bool>(
        "WITH RECURSIVE chain(id, parent_id) AS (
             SELECT id, parent_id FROM pages WHERE id = ?
             UNION ALL
             SELECT p.id, p.parent_id FROM pages p JOIN chain c ON p.id = c.parent_id
         )
         SELECT EXISTS(SELECT 1 FROM chain WHERE id = ?)",
    )
    .bind(page_id)
    .bind(ancestor_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(found)
}

fn page_not_found(page_id: i64) -> AppError {
    AppError::NotFound {
        resource: format!("page {page_id}"),
    }
}

#[async_trait]
impl ContentStore for SqliteConnection {
    async fn find_index_page(&mut self, locale: &str) -> Result<Option<Page>> {
        let sql = format!("{PAGE_SELECT} WHERE p.page_type = ? AND p.locale = ? ORDER BY p.id LIMIT 1");
        let page = sqlx::query_as::<_, Page>(&sql)
            .bind(PageType::ProductIndex)
            .bind(locale)
            .fetch_optional(&mut *self)
            .await?;
        Ok(page)
    }

    async fn get_page(&mut self, page_id: i64) -> Result<Option<Page>> {
        let sql = format!("{PAGE_SELECT} WHERE p.id = ?");
        let page = sqlx::query_as::<_, Page>(&sql)
            .bind(page_id)
            .fetch_optional(&mut *self)
            .await?;
        Ok(page)
    }

    async fn get_parent(&mut self, page_id: i64) -> Result<Option<Page>> {
        let sql = format!("{PAGE_SELECT} JOIN pages child ON child.parent_id = p.id WHERE child.id = ?");
        let parent = sqlx::query_as::<_, Page>(&sql)
            .bind(page_id)
            .fetch_optional(&mut *self)
            .await?;
        Ok(parent)
    }

    async fn create_page(&mut self, parent_id: Option<i64>, page: &NewPage) -> Result<Page> {
        if let Some(parent_id) = parent_id {
            if self.get_page(parent_id).await?.is_none() {
                return Err(page_not_found(parent_id));
            }
            ensure_slug_free(self, parent_id, &page.slug, None).await?;
        }

        let now = Utc::now();
        let sort_order = next_sort_order(self, parent_id).await?;
        let page_id = sqlx::query(
            "INSERT INTO pages
             (parent_id, page_type, title, slug, locale, sort_order, live, show_in_menus, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, FALSE, ?, ?, ?)",
        )
        .bind(parent_id)
        .bind(page.page_type)
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.locale)
        .bind(sort_order)
        .bind(page.show_in_menus)
        .bind(now)
        .bind(now)
        .execute(&mut *self)
        .await?
        .last_insert_rowid();

        debug!("Created {:?} page '{}' ({})", page.page_type, page.slug, page_id);
        self.get_page(page_id).await?.ok_or_else(|| page_not_found(page_id))
    }

    async fn list_product_pages(&mut self) -> Result<Vec<ProductPage>> {
        let sql = format!("{PRODUCT_SELECT} ORDER BY p.id");
        let rows = sqlx::query_as::<_, ProductPageRow>(&sql)
            .fetch_all(&mut *self)
            .await?;
        rows.into_iter().map(ProductPage::try_from).collect()
    }

    async fn get_product_page(&mut self, page_id: i64) -> Result<Option<ProductPage>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, ProductPageRow>(&sql)
            .bind(page_id)
            .fetch_optional(&mut *self)
            .await?;
        row.map(ProductPage::try_from).transpose()
    }

    async fn product_slugs(&mut self) -> Result<HashSet<String>> {
        let slugs = sqlx::query_scalar::<_, String>("SELECT slug FROM pages WHERE page_type = ?")
            .bind(PageType::Product)
            .fetch_all(&mut *self)
            .await?;
        Ok(slugs.into_iter().collect())
    }

    async fn product_slug_exists(&mut self, slug: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM pages WHERE page_type = ? AND slug = ?)",
        )
        .bind(PageType::Product)
        .bind(slug)
        .fetch_one(&mut *self)
        .await?;
        Ok(exists)
    }

    async fn find_product_in_locale(
        &mut self,
        slug: &str,
        locale: &str,
        exclude_id: i64,
    ) -> Result<Option<Page>> {
        let sql = format!(
            "{PAGE_SELECT} WHERE p.page_type = ? AND p.locale = ? AND p.slug = ? AND p.id != ?
             ORDER BY p.id LIMIT 1"
        );
        let page = sqlx::query_as::<_, Page>(&sql)
            .bind(PageType::Product)
            .bind(locale)
            .bind(slug)
            .bind(exclude_id)
            .fetch_optional(&mut *self)
            .await?;
        Ok(page)
    }

    async fn add_product_child(
        &mut self,
        parent_id: i64,
        page: &NewProductPage,
    ) -> Result<ProductPage> {
        if self.get_page(parent_id).await?.is_none() {
            return Err(page_not_found(parent_id));
        }
        ensure_slug_free(self, parent_id, &page.slug, None).await?;

        let now = Utc::now();
        let sort_order = next_sort_order(self, Some(parent_id)).await?;
        let page_id = sqlx::query(
            "INSERT INTO pages
             (parent_id, page_type, title, slug, locale, sort_order, live, show_in_menus,
              first_published_at, last_published_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, FALSE, ?, ?, ?, ?, ?)",
        )
        .bind(parent_id)
        .bind(PageType::Product)
        .bind(&page.title)
        .bind(&page.slug)
        .bind(&page.locale)
        .bind(sort_order)
        .bind(page.show_in_menus)
        .bind(page.first_published_at)
        .bind(page.last_published_at)
        .bind(now)
        .bind(now)
        .execute(&mut *self)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO product_pages
             (page_id, price, discount_price, description_short, description_long, images_json)
             VALUES (?, ?, ?, ?, ?, '[]')",
        )
        .bind(page_id)
        .bind(page.price.to_string())
        .bind(page.discount_price.map(|price| price.to_string()))
        .bind(&page.description_short)
        .bind(&page.description_long)
        .execute(&mut *self)
        .await?;

        debug!("Attached product page '{}' ({}) under {}", page.slug, page_id, parent_id);
        self.get_product_page(page_id)
            .await?
            .ok_or_else(|| page_not_found(page_id))
    }

    async fn move_page(&mut self, page_id: i64, new_parent_id: i64) -> Result<()> {
        let page = self.get_page(page_id).await?.ok_or_else(|| page_not_found(page_id))?;
        if self.get_page(new_parent_id).await?.is_none() {
            return Err(AppError::InvalidMove {
                page_id,
                reason: format!("target page {new_parent_id} does not exist"),
            });
        }
        if is_ancestor_or_self(self, page_id, new_parent_id).await? {
            return Err(AppError::InvalidMove {
                page_id,
                reason: "cannot move a page inside itself or its descendants".to_string(),
            });
        }
        ensure_slug_free(self, new_parent_id, &page.slug, Some(page_id)).await?;

        // One statement, so the parent and position change together.
        sqlx::query(
            "UPDATE pages
             SET parent_id = ?1,
                 sort_order = (SELECT COALESCE(MAX(sort_order), 0) + 1 FROM pages WHERE parent_id = ?1),
                 updated_at = ?2
             WHERE id = ?3",
        )
        .bind(new_parent_id)
        .bind(Utc::now())
        .bind(page_id)
        .execute(&mut *self)
        .await?;

        debug!("Moved page {} under {}", page_id, new_parent_id);
        Ok(())
    }

    async fn set_locale(&mut self, page_id: i64, locale: &str) -> Result<()> {
        let result = sqlx::query("UPDATE pages SET locale = ?, updated_at = ? WHERE id = ?")
            .bind(locale)
            .bind(Utc::now())
            .bind(page_id)
            .execute(&mut *self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(page_not_found(page_id));
        }
        Ok(())
    }

    async fn set_product_images(&mut self, page_id: i64, images: &[PageBlock]) -> Result<()> {
        let images_json = serde_json::to_string(images)?;
        let result = sqlx::query("UPDATE product_pages SET images_json = ? WHERE page_id = ?")
            .bind(images_json)
            .bind(page_id)
            .execute(&mut *self)
            .await?;

        if result.rows_affected() == 0 {
            return Err(page_not_found(page_id));
        }

        sqlx::query("UPDATE pages SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(page_id)
            .execute(&mut *self)
            .await?;
        Ok(())
    }

    async fn publish(&mut self, page_id: i64) -> Result<PageRevision> {
        let content_json = match self.get_product_page(page_id).await? {
            Some(product) => serde_json::to_string(&product)?,
            None => {
                let page = self.get_page(page_id).await?.ok_or_else(|| page_not_found(page_id))?;
                serde_json::to_string(&page)?
            }
        };

        let now = Utc::now();
        let revision = sqlx::query_as::<_, PageRevision>(
            "INSERT INTO page_revisions (page_id, content_json, created_at, published_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, page_id, content_json, created_at, published_at",
        )
        .bind(page_id)
        .bind(content_json)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *self)
        .await?;

        sqlx::query(
            "UPDATE pages
             SET live = TRUE,
                 live_revision_id = ?,
                 first_published_at = COALESCE(first_published_at, ?),
                 last_published_at = ?,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(revision.id)
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(page_id)
        .execute(&mut *self)
        .await?;

        debug!("Published revision {} of page {}", revision.id, page_id);
        Ok(revision)
    }

    async fn count_product_pages(&mut self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pages WHERE page_type = ?")
            .bind(PageType::Product)
            .fetch_one(&mut *self)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_product_pages(&mut self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pages WHERE page_type = ?")
            .bind(PageType::Product)
            .execute(&mut *self)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SourceStore for SqliteConnection {
    async fn list_scraped_items(&mut self) -> Result<Vec<ScrapedItem>> {
        let rows = sqlx::query_as::<_, ScrapedItemRow>(
            "SELECT id, title, slug, price, discount_price, description_short, description_long, created_at
             FROM scraped_items ORDER BY id",
        )
        .fetch_all(&mut *self)
        .await?;
        rows.into_iter().map(ScrapedItem::try_from).collect()
    }

    async fn list_item_images(&mut self, item_id: i64) -> Result<Vec<ScrapedItemImage>> {
        let images = sqlx::query_as::<_, ScrapedItemImage>(
            "SELECT id, item_id, image FROM scraped_item_images WHERE item_id = ? ORDER BY id",
        )
        .bind(item_id)
        .fetch_all(&mut *self)
        .await?;
        Ok(images)
    }
}

#[async_trait]
impl ImageStore for SqliteConnection {
    async fn get_or_create_image(&mut self, title: &str, file: &str) -> Result<(StoredImage, bool)> {
        let existing = sqlx::query_as::<_, StoredImage>(
            "SELECT id, title, file, created_at FROM images WHERE title = ? ORDER BY id LIMIT 1",
        )
        .bind(title)
        .fetch_optional(&mut *self)
        .await?;

        if let Some(image) = existing {
            return Ok((image, false));
        }

        let image = sqlx::query_as::<_, StoredImage>(
            "INSERT INTO images (title, file, created_at) VALUES (?, ?, ?)
             RETURNING id, title, file, created_at",
        )
        .bind(title)
        .bind(file)
        .bind(Utc::now())
        .fetch_one(&mut *self)
        .await?;

        debug!("Stored new image '{}' ({})", image.title, image.id);
        Ok((image, true))
    }
}
