pub mod crawler;
pub mod extractor;
pub mod html;

use crate::{
    config::LlmConfig,
    database::{MongoDB, RECIPES},
    models::Recipe,
    services::recipe_service,
    utils::{is_duplicate_key, AppError},
};
use extractor::{LlmClient, OpenAiClient};
use std::sync::Arc;

/// Shared HTTP client and optional LLM backend for recipe imports
#[derive(Clone)]
pub struct Importer {
    http: reqwest::Client,
    llm: Option<Arc<dyn LlmClient>>,
}

impl Importer {
    pub fn new(config: &LlmConfig) -> Self {
        let llm = OpenAiClient::from_config(config).map(|c| Arc::new(c) as Arc<dyn LlmClient>);
        if llm.is_none() {
            log::warn!("⚠️  LLM_API_KEY not set, recipe import will only use JSON-LD markup");
        }
        Importer {
            http: crawler::http_client(),
            llm,
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Fetches one page and stores the recipe it contains.
    /// A page whose `source_url` is already stored yields `Conflict`.
    pub async fn import_page(&self, db: &MongoDB, url: &str, author_id: Option<String>) -> Result<Recipe, AppError> {
        let url = crawler::parse_page_url(url)?.to_string();

        if recipe_service::source_url_exists(db, &url).await? {
            return Err(AppError::Conflict(format!("Recipe from {} was already imported", url)));
        }

        let html = crawler::fetch_text(&self.http, &url).await?;
        let scraped = extractor::extract_recipe(&html, &url, self.llm.as_deref()).await?;
        let mut recipe = scraped.into_recipe(&url, author_id)?;

        // Concurrent imports of the same page are settled by the unique source_url index
        match db.collection::<Recipe>(RECIPES).insert_one(&recipe).await {
            Ok(result) => {
                recipe.id = result.inserted_id.as_object_id();
                log::info!("✅ Imported '{}' from {}", recipe.title, url);
                Ok(recipe)
            }
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!("Recipe from {} was already imported", url))),
            Err(e) => Err(e.into()),
        }
    }
}
