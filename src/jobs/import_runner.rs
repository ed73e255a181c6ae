// ==================== SITE IMPORT RUNNER ====================
// Background crawl for one import job: discover recipe URLs, then fetch and
// import them one at a time with a politeness delay between requests.

use crate::{
    config::CrawlConfig,
    database::{MongoDB, IMPORT_JOBS},
    importer::{crawler, Importer},
    models::{ImportJob, ImportJobStatus, MAX_JOB_ERRORS},
    utils::AppError,
};
use mongodb::bson::{doc, Document};
use tokio::time::{sleep, Duration};
use url::Url;

/// Outcome of a single page import, as counted on the job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Imported,
    Skipped,
    Failed,
}

impl PageOutcome {
    pub fn from_result<T>(result: &Result<T, AppError>) -> Self {
        match result {
            Ok(_) => PageOutcome::Imported,
            // Already imported or not a recipe page
            Err(AppError::Conflict(_)) | Err(AppError::InvalidRequest(_)) => PageOutcome::Skipped,
            Err(_) => PageOutcome::Failed,
        }
    }

    fn counter(&self) -> &'static str {
        match self {
            PageOutcome::Imported => "imported",
            PageOutcome::Skipped => "skipped",
            PageOutcome::Failed => "failed",
        }
    }
}

/// `$inc` for the outcome counter, plus a capped `$push` of the error line on failure
pub fn progress_update(outcome: PageOutcome, error: Option<String>) -> Document {
    let mut inc = Document::new();
    inc.insert(outcome.counter(), 1);
    let mut update = doc! { "$inc": inc };
    if let Some(error) = error {
        update.insert(
            "$push",
            doc! { "errors": { "$each": [error], "$slice": -(MAX_JOB_ERRORS as i32) } },
        );
    }
    update
}

async fn update_job(db: &MongoDB, job_id: &str, update: Document) {
    if let Err(e) = db
        .collection::<ImportJob>(IMPORT_JOBS)
        .update_one(doc! { "job_id": job_id }, update)
        .await
    {
        log::error!("❌ Failed to update import job {}: {}", job_id, e);
    }
}

async fn finish_job(db: &MongoDB, job_id: &str, status: ImportJobStatus, error: Option<String>) {
    let mut update = doc! {
        "$set": { "status": status.to_string(), "finished_at": chrono::Utc::now().timestamp() }
    };
    if let Some(error) = error {
        update.insert("$push", doc! { "errors": { "$each": [error], "$slice": -(MAX_JOB_ERRORS as i32) } });
    }
    update_job(db, job_id, update).await;
}

/// Starts the crawl for `job_id` on a background task
pub fn spawn_site_import(
    db: MongoDB,
    importer: Importer,
    crawl: CrawlConfig,
    job_id: String,
    site: Url,
    max_pages: usize,
    started_by: String,
) {
    tokio::spawn(async move {
        run_site_import(&db, &importer, &crawl, &job_id, &site, max_pages, &started_by).await;
    });
}

async fn run_site_import(
    db: &MongoDB,
    importer: &Importer,
    crawl: &CrawlConfig,
    job_id: &str,
    site: &Url,
    max_pages: usize,
    started_by: &str,
) {
    log::info!("🚀 Import job {} started for {}", job_id, site);
    update_job(db, job_id, doc! { "$set": { "status": ImportJobStatus::Running.to_string() } }).await;

    let urls = match crawler::discover_recipe_urls(importer.http(), site, max_pages).await {
        Ok(urls) => urls,
        Err(e) => {
            log::error!("❌ Import job {}: sitemap discovery failed: {}", job_id, e);
            finish_job(db, job_id, ImportJobStatus::Failed, Some(format!("Sitemap discovery failed: {}", e.message()))).await;
            return;
        }
    };

    update_job(db, job_id, doc! { "$set": { "discovered": urls.len() as i64 } }).await;
    log::info!("🗺️  Import job {}: {} candidate pages", job_id, urls.len());

    let delay = Duration::from_millis(crawl.delay_ms);
    let (mut imported, mut skipped, mut failed) = (0u32, 0u32, 0u32);

    for (i, url) in urls.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            sleep(delay).await;
        }

        let result = importer.import_page(db, url, Some(started_by.to_string())).await;
        let outcome = PageOutcome::from_result(&result);
        let error = match (&result, outcome) {
            (Err(e), PageOutcome::Failed) => {
                log::warn!("   ⚠️  {}: {}", url, e);
                Some(format!("{}: {}", url, e.message()))
            }
            (Err(e), _) => {
                log::debug!("   ⏭️  {}: {}", url, e);
                None
            }
            _ => None,
        };

        match outcome {
            PageOutcome::Imported => imported += 1,
            PageOutcome::Skipped => skipped += 1,
            PageOutcome::Failed => failed += 1,
        }
        update_job(db, job_id, progress_update(outcome, error)).await;
    }

    log::info!(
        "✅ Import job {} completed: {} imported, {} skipped, {} failed",
        job_id, imported, skipped, failed
    );
    finish_job(db, job_id, ImportJobStatus::Completed, None).await;
}
