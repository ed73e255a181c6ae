use std::env;

const DEFAULT_JWT_SECRET: &str = "default-secret-change-me";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct FdcConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub delay_ms: u64,
    pub max_pages: usize,
}

#[derive(Debug, Clone)]
pub struct AdminSeedConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Application configuration, loaded once from the environment at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub require_email_verification: bool,
    pub seed_sample_recipes: bool,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub fdc: FdcConfig,
    pub vision: VisionConfig,
    pub llm: LlmConfig,
    pub crawl: CrawlConfig,
    pub admin_seed: Option<AdminSeedConfig>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn var_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn var_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let frontend_url = var_or("FRONTEND_URL", "http://localhost:3000");
        let cors_origins = match var_opt("CORS_ORIGINS") {
            Some(list) => parse_origins(&list),
            None => vec![frontend_url.clone(), "http://localhost:5173".to_string()],
        };

        let jwt_secret = var_or("JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            log::warn!("⚠️  JWT_SECRET not set, using the insecure default secret");
        }

        let admin_seed = match (var_opt("ADMIN_EMAIL"), var_opt("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeedConfig {
                email,
                password,
                name: var_or("ADMIN_NAME", "KusinAI Admin"),
            }),
            _ => None,
        };

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: var_parse("PORT", 3002),
            database_url,
            frontend_url,
            cors_origins,
            require_email_verification: var_bool("REQUIRE_EMAIL_VERIFICATION", true),
            seed_sample_recipes: var_bool("SEED_SAMPLE_RECIPES", true),
            jwt: JwtConfig {
                secret: jwt_secret,
                issuer: var_or("JWT_ISSUER", "kusinai-service"),
                audience: var_or("JWT_AUDIENCE", "kusinai-app"),
                expiration_hours: var_parse("JWT_EXPIRATION_HOURS", 24),
            },
            mail: MailConfig {
                api_url: var_opt("MAIL_API_URL"),
                api_key: var_opt("MAIL_API_KEY"),
                from: var_or("MAIL_FROM", "KusinAI <no-reply@kusinai.app>"),
            },
            fdc: FdcConfig {
                api_key: var_or("FDC_API_KEY", "DEMO_KEY"),
                base_url: var_or("FDC_BASE_URL", "https://api.nal.usda.gov/fdc/v1"),
            },
            vision: VisionConfig {
                api_key: var_opt("VISION_API_KEY"),
                api_url: var_or("VISION_API_URL", "https://vision.googleapis.com/v1/images:annotate"),
            },
            llm: LlmConfig {
                api_key: var_opt("LLM_API_KEY"),
                api_url: var_or("LLM_API_URL", "https://api.openai.com/v1/chat/completions"),
                model: var_or("LLM_MODEL", "gpt-4o-mini"),
            },
            crawl: CrawlConfig {
                delay_ms: var_parse("CRAWL_DELAY_MS", 1000),
                max_pages: var_parse("CRAWL_MAX_PAGES", 50),
            },
            admin_seed,
        })
    }

    /// Configuration for tests; never reads the environment
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "mongodb://localhost:27017/kusinai_test".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            require_email_verification: true,
            seed_sample_recipes: false,
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                issuer: "kusinai-service".to_string(),
                audience: "kusinai-app".to_string(),
                expiration_hours: 1,
            },
            mail: MailConfig { api_url: None, api_key: None, from: "test@kusinai.app".to_string() },
            fdc: FdcConfig { api_key: "DEMO_KEY".to_string(), base_url: "http://127.0.0.1:1".to_string() },
            vision: VisionConfig { api_key: None, api_url: "http://127.0.0.1:1".to_string() },
            llm: LlmConfig { api_key: None, api_url: "http://127.0.0.1:1".to_string(), model: "test".to_string() },
            crawl: CrawlConfig { delay_ms: 0, max_pages: 5 },
            admin_seed: None,
        }
    }
}

fn parse_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        let origins = parse_origins("http://localhost:3000/, https://kusinai.app ,,");
        assert_eq!(origins, vec!["http://localhost:3000", "https://kusinai.app"]);
    }
}
