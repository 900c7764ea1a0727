use super::*;
use catalog_porter::jobs::{TransferOutcome, TransferReport, Transporter};
use catalog_porter::models::PageBlock;
use catalog_porter::AppError;

fn transporter() -> Transporter {
    Transporter::new(&get_test_config().migration)
}

async fn transfer(db: &Database, transporter: &Transporter) -> anyhow::Result<TransferReport> {
    match transporter.run(db).await? {
        TransferOutcome::Transferred(report) => Ok(report),
        other => anyhow::bail!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_index_page_makes_no_writes() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    create_test_site(&db, false).await?;
    create_scraped_item(&db, "Çay Demliği", "cay-demligi", "259.00", &["scraped/demlik.jpg"]).await?;

    let outcome = transporter().run(&db).await?;
    assert!(matches!(
        outcome,
        TransferOutcome::MissingIndexPage { ref locale } if locale == "tr"
    ));
    assert_eq!(count_rows(&db, "product_pages").await?, 0);
    assert_eq!(count_rows(&db, "images").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_three_items_become_published_pages() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    let site = create_test_site(&db, true).await?;
    let tr_index = site.tr_index.clone().unwrap();

    let first = create_scraped_item(&db, "Çay Demliği", "cay-demligi", "259.00", &["scraped/demlik.jpg", "scraped/demlik-2.jpg"]).await?;
    let second = create_scraped_item(&db, "Cezve", "cezve", "89.90", &["scraped/cezve.jpg"]).await?;
    let third = create_scraped_item(&db, "Fincan Takımı", "fincan-takimi", "420.00", &[]).await?;

    let report = transfer(&db, &transporter()).await?;
    assert_eq!(report.index_page_id, tr_index.id);
    assert_eq!(report.transferred.len(), 3);
    assert!(report.skipped.is_empty());
    assert_eq!(report.images_created, 3);
    assert_eq!(report.images_reused, 0);

    let slugs: Vec<&str> = report.transferred.iter().map(|page| page.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec![
            format!("cay-demligi-{first}"),
            format!("cezve-{second}"),
            format!("fincan-takimi-{third}"),
        ]
    );

    let pages = product_pages(&db).await?;
    assert_eq!(pages.len(), 3);
    for page in &pages {
        assert_eq!(page.locale(), "tr");
        assert_eq!(page.parent_id(), Some(tr_index.id));
        assert!(page.page.live);
        assert!(page.page.show_in_menus);
        assert!(page.page.first_published_at.is_some());
        assert!(page.page.last_published_at.is_some());
        assert!(page.page.live_revision_id.is_some());
    }

    assert_eq!(pages[0].title(), "Çay Demliği");
    assert_eq!(pages[0].price, "259.00".parse::<Decimal>()?);
    assert_eq!(pages[0].images.len(), 2);
    assert_eq!(pages[1].images.len(), 1);
    assert!(pages[2].images.is_empty());

    // Every page is published twice: once bare, once with its images.
    assert_eq!(count_rows(&db, "page_revisions").await?, 6);

    let rerun = transporter().run(&db).await?;
    assert!(matches!(rerun, TransferOutcome::NothingToDo));
    assert_eq!(product_pages(&db).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_batch_size_caps_each_run() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    create_test_site(&db, true).await?;
    for n in 0..12 {
        create_scraped_item(&db, &format!("Raf {n}"), "raf", "35.00", &[]).await?;
    }

    let transporter = transporter();
    assert_eq!(transporter.batch_size(), 10);

    let first = transfer(&db, &transporter).await?;
    assert_eq!(first.transferred.len(), 10);
    assert_eq!(product_pages(&db).await?.len(), 10);

    let second = transfer(&db, &transporter).await?;
    assert_eq!(second.transferred.len(), 2);

    let third = transporter.run(&db).await?;
    assert!(matches!(third, TransferOutcome::NothingToDo));
    assert_eq!(product_pages(&db).await?.len(), 12);
    Ok(())
}

#[tokio::test]
async fn test_custom_batch_size() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    create_test_site(&db, true).await?;
    for n in 0..4 {
        create_scraped_item(&db, &format!("Kase {n}"), "kase", "12.50", &[]).await?;
    }

    let report = transfer(&db, &transporter().with_batch_size(3)).await?;
    assert_eq!(report.transferred.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_already_transferred_item_is_not_selected() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    let site = create_test_site(&db, true).await?;

    let done = create_scraped_item(&db, "Tabure", "tabure", "150.00", &[]).await?;
    let pending = create_scraped_item(&db, "Puf", "puf", "300.00", &[]).await?;
    // Transferred earlier, then left in another locale: still counts.
    create_product_page(&db, &site.en_index, &format!("tabure-{done}"), "en").await?;

    let report = transfer(&db, &transporter()).await?;
    let item_ids: Vec<i64> = report.transferred.iter().map(|page| page.item_id).collect();
    assert_eq!(item_ids, vec![pending]);
    assert_eq!(product_pages(&db).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_images_are_shared_by_name() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    create_test_site(&db, true).await?;
    create_scraped_item(&db, "Kupa Mavi", "kupa-mavi", "45.00", &["scraped/kupa.jpg", "scraped/mavi.jpg"]).await?;
    create_scraped_item(&db, "Kupa Kırmızı", "kupa-kirmizi", "45.00", &["scraped/kupa.jpg"]).await?;

    let report = transfer(&db, &transporter()).await?;
    assert_eq!(report.images_created, 2);
    assert_eq!(report.images_reused, 1);
    assert_eq!(count_rows(&db, "images").await?, 2);

    let shared = report.transferred[0].image_ids[0];
    assert_eq!(report.transferred[1].image_ids, vec![shared]);

    let pages = product_pages(&db).await?;
    assert_eq!(pages[0].images[0], PageBlock::Image(shared));
    assert_eq!(pages[1].images, vec![PageBlock::Image(shared)]);
    Ok(())
}

#[tokio::test]
async fn test_existing_image_with_same_title_is_reused() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    create_test_site(&db, true).await?;
    let image_id = sqlx::query("INSERT INTO images (title, file, created_at) VALUES (?, ?, ?)")
        .bind("scraped/sepet.jpg")
        .bind("original_images/sepet.jpg")
        .bind(chrono::Utc::now())
        .execute(db.pool())
        .await?
        .last_insert_rowid();
    create_scraped_item(&db, "Hasır Sepet", "hasir-sepet", "75.00", &["scraped/sepet.jpg"]).await?;

    let report = transfer(&db, &transporter()).await?;
    assert_eq!(report.images_created, 0);
    assert_eq!(report.transferred[0].image_ids, vec![image_id]);
    assert_eq!(count_rows(&db, "images").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_descriptions_are_normalised() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    create_test_site(&db, true).await?;
    let item_id = create_scraped_item(&db, "Bambu Kesme Tahtası", "bambu-kesme-tahtasi", "64.90", &[]).await?;
    sqlx::query("UPDATE scraped_items SET description_short = ?, discount_price = ? WHERE id = ?")
        .bind("Doğal bambudan üretilmiş, çift taraflı kullanılabilen, oluklu kesme tahtası.")
        .bind("49.90")
        .bind(item_id)
        .execute(db.pool())
        .await?;

    transfer(&db, &transporter()).await?;

    let pages = product_pages(&db).await?;
    assert_eq!(pages[0].description_short.chars().count(), 50);
    assert!(pages[0].description_short.starts_with("Doğal bambudan"));
    assert_eq!(pages[0].description_long, "");
    assert_eq!(pages[0].discount_price, Some("49.90".parse::<Decimal>()?));
    Ok(())
}

#[tokio::test]
async fn test_failure_mid_batch_rolls_back_the_whole_run() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    let site = create_test_site(&db, true).await?;
    let tr_index = site.tr_index.clone().unwrap();

    create_scraped_item(&db, "Abajur", "abajur", "210.00", &["scraped/abajur.jpg"]).await?;
    let second = create_scraped_item(&db, "Lambader", "lambader", "540.00", &[]).await?;
    // A non-product page already holds the second item's slug under the index.
    {
        let mut conn = db.acquire().await?;
        conn.create_page(
            Some(tr_index.id),
            &NewPage::generic("Lambader rehberi", &format!("lambader-{second}"), "tr"),
        )
        .await?;
    }

    let result = transporter().run(&db).await;
    let err = result.expect_err("slug conflict should abort the batch");
    assert!(matches!(err, AppError::SlugConflict { .. }));

    assert_eq!(count_rows(&db, "product_pages").await?, 0);
    assert_eq!(count_rows(&db, "page_revisions").await?, 0);
    assert_eq!(count_rows(&db, "images").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_batch_rechecks_slugs_before_creating() -> anyhow::Result<()> {
    let db = create_test_db().await?;
    let site = create_test_site(&db, true).await?;
    let tr_index = site.tr_index.clone().unwrap();
    create_scraped_item(&db, "Minder", "minder", "30.00", &[]).await?;

    let transporter = transporter();
    let batch = {
        let mut conn = db.acquire().await?;
        transporter.select_batch(&mut *conn).await?
    };
    assert_eq!(batch.len(), 1);

    // Someone else transfers the item between selection and the batch.
    create_product_page(&db, &tr_index, &format!("minder-{}", batch[0].id), "tr").await?;

    let mut conn = db.acquire().await?;
    let report = transporter.transfer_batch(&mut *conn, &tr_index, &batch).await?;
    assert!(report.transferred.is_empty());
    assert_eq!(report.skipped, vec![format!("minder-{}", batch[0].id)]);
    Ok(())
}
