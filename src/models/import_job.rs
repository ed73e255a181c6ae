use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Only the most recent crawl errors are kept on the job document
pub const MAX_JOB_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportJobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for ImportJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportJobStatus::Queued => "queued",
            ImportJobStatus::Running => "running",
            ImportJobStatus::Completed => "completed",
            ImportJobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Site crawl job (armazenado no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub job_id: String,
    pub site: String,
    pub max_pages: u32,
    pub status: ImportJobStatus,
    #[serde(default)]
    pub discovered: u32,
    #[serde(default)]
    pub imported: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub errors: Vec<String>,
    pub started_by: String,
    pub created_at: i64,
    #[serde(default)]
    pub finished_at: Option<i64>,
}

impl ImportJob {
    pub fn new(site: &str, max_pages: u32, started_by: &str) -> Self {
        ImportJob {
            id: None,
            job_id: uuid::Uuid::new_v4().to_string(),
            site: site.to_string(),
            max_pages,
            status: ImportJobStatus::Queued,
            discovered: 0,
            imported: 0,
            skipped: 0,
            failed: 0,
            errors: vec![],
            started_by: started_by.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            finished_at: None,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ImportJobResponse {
    pub job_id: String,
    pub site: String,
    pub max_pages: u32,
    pub status: ImportJobStatus,
    pub discovered: u32,
    pub imported: u32,
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<String>,
    pub started_by: String,
    pub created_at: i64,
    pub finished_at: Option<i64>,
}

impl From<ImportJob> for ImportJobResponse {
    fn from(job: ImportJob) -> Self {
        ImportJobResponse {
            job_id: job.job_id,
            site: job.site,
            max_pages: job.max_pages,
            status: job.status,
            discovered: job.discovered,
            imported: job.imported,
            skipped: job.skipped,
            failed: job.failed,
            errors: job.errors,
            started_by: job.started_by,
            created_at: job.created_at,
            finished_at: job.finished_at,
        }
    }
}
