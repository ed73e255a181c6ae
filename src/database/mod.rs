use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const USERS: &str = "users";
pub const RECIPES: &str = "recipes";
pub const IMPORT_JOBS: &str = "import_jobs";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db_name = database_name_from_uri(uri);
        let db = client.database(&db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the API relies on (unique emails, unique import sources)
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(USERS);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        // A duplicate email in existing data must stop startup, the unique index is the guarantee
        users.create_index(email_index).await?;
        log::info!("   ✅ Index created: users(email) unique");

        let user_id_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(user_id_index).await?;
        log::info!("   ✅ Index created: users(user_id) unique");

        let verification_index = IndexModel::builder()
            .keys(doc! { "verification_token": 1 })
            .options(IndexOptions::builder().sparse(true).build())
            .build();
        match users.create_index(verification_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(verification_token)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let recipes = self.collection::<mongodb::bson::Document>(RECIPES);

        for (field, label) in [("region", "recipes(region)"), ("title", "recipes(title)"), ("created_at", "recipes(created_at)")] {
            let mut keys = mongodb::bson::Document::new();
            keys.insert(field, 1);
            let index = IndexModel::builder().keys(keys).build();
            match recipes.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
            }
        }

        let source_index = IndexModel::builder()
            .keys(doc! { "source_url": 1 })
            .options(IndexOptions::builder().unique(true).sparse(true).build())
            .build();
        recipes.create_index(source_index).await?;
        log::info!("   ✅ Index created: recipes(source_url) unique sparse");

        let jobs = self.collection::<mongodb::bson::Document>(IMPORT_JOBS);
        let job_index = IndexModel::builder().keys(doc! { "job_id": 1 }).build();
        match jobs.create_index(job_index).await {
            Ok(_) => log::info!("   ✅ Index created: import_jobs(job_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn ping(&self) -> bool {
        self.db
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await
            .is_ok()
    }
}

/// Extracts the database name from a MongoDB URI path, defaulting to `kusinai`
pub fn database_name_from_uri(uri: &str) -> String {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("kusinai")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/recipes_db"), "recipes_db");
        assert_eq!(
            database_name_from_uri("mongodb+srv://u:p@cluster.example.net/kusin?retryWrites=true"),
            "kusin"
        );
        assert_eq!(database_name_from_uri("mongodb://localhost:27017"), "kusinai");
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/?w=majority"), "kusinai");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/kusinai_test".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().ping().await);
    }
}
