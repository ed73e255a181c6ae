use crate::{
    config::AppConfig,
    database::{MongoDB, IMPORT_JOBS},
    importer::{crawler, Importer},
    jobs::import_runner,
    models::{CurrentUser, ImportJob, ImportJobResponse, RecipeResponse},
    utils::AppError,
};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};

const RECENT_JOBS: i64 = 50;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ImportUrlRequest {
    pub url: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ImportSiteRequest {
    pub site: String,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ImportStartedResponse {
    pub success: bool,
    pub job_id: String,
    pub status: String,
}

/// Clamps the requested page count to the configured crawl limit
pub fn effective_max_pages(requested: Option<u32>, configured: usize) -> u32 {
    let configured = configured.max(1) as u32;
    requested.filter(|p| *p > 0).map(|p| p.min(configured)).unwrap_or(configured)
}

pub async fn import_single_url(
    db: &MongoDB,
    importer: &Importer,
    admin: &CurrentUser,
    request: &ImportUrlRequest,
) -> Result<RecipeResponse, AppError> {
    let recipe = importer.import_page(db, &request.url, Some(admin.user_id.clone())).await?;
    Ok(RecipeResponse::from(recipe))
}

/// Records a crawl job and starts it in the background
pub async fn start_site_import(
    db: &MongoDB,
    config: &AppConfig,
    importer: &Importer,
    admin: &CurrentUser,
    request: &ImportSiteRequest,
) -> Result<ImportStartedResponse, AppError> {
    let site = crawler::normalize_site(&request.site)?;
    let max_pages = effective_max_pages(request.max_pages, config.crawl.max_pages);

    let job = ImportJob::new(site.as_str(), max_pages, &admin.user_id);
    db.collection::<ImportJob>(IMPORT_JOBS).insert_one(&job).await?;

    log::info!("🕷️  Import job {} queued for {} (max {} pages)", job.job_id, site, max_pages);

    import_runner::spawn_site_import(
        db.clone(),
        importer.clone(),
        config.crawl.clone(),
        job.job_id.clone(),
        site,
        max_pages as usize,
        admin.user_id.clone(),
    );

    Ok(ImportStartedResponse {
        success: true,
        job_id: job.job_id,
        status: job.status.to_string(),
    })
}

pub async fn list_jobs(db: &MongoDB) -> Result<Vec<ImportJobResponse>, AppError> {
    let jobs: Vec<ImportJob> = db
        .collection::<ImportJob>(IMPORT_JOBS)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .limit(RECENT_JOBS)
        .await?
        .try_collect()
        .await?;

    Ok(jobs.into_iter().map(ImportJobResponse::from).collect())
}

pub async fn get_job(db: &MongoDB, job_id: &str) -> Result<ImportJobResponse, AppError> {
    db.collection::<ImportJob>(IMPORT_JOBS)
        .find_one(doc! { "job_id": job_id })
        .await?
        .map(ImportJobResponse::from)
        .ok_or_else(|| AppError::NotFound("Import job not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_max_pages() {
        assert_eq!(effective_max_pages(None, 50), 50);
        assert_eq!(effective_max_pages(Some(10), 50), 10);
        assert_eq!(effective_max_pages(Some(500), 50), 50);
        assert_eq!(effective_max_pages(Some(0), 50), 50);
        assert_eq!(effective_max_pages(None, 0), 1);
    }
}
