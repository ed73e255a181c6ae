//! Sitemap-based discovery of recipe pages

use crate::utils::AppError;
use regex::Regex;
use std::time::Duration;
use url::Url;

pub const USER_AGENT: &str = "KusinAI-Importer/0.1 (+https://kusinai.app)";
const MAX_CHILD_SITEMAPS: usize = 5;
const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

lazy_static::lazy_static! {
    static ref LOC_RE: Regex = Regex::new(r"(?is)<loc>\s*(?:<!\[CDATA\[)?\s*(.*?)\s*(?:\]\]>)?\s*</loc>").expect("valid regex");
    static ref SITEMAP_INDEX_RE: Regex = Regex::new(r"(?i)<sitemapindex\b").expect("valid regex");
}

const SKIP_SEGMENTS: &[&str] = &[
    "tag", "tags", "category", "categories", "author", "page", "feed", "wp-content", "wp-admin",
    "about", "about-us", "contact", "privacy-policy", "terms", "search", "cart", "shop", "login",
];

const SKIP_EXTENSIONS: &[&str] = &[".xml", ".jpg", ".jpeg", ".png", ".gif", ".webp", ".pdf", ".css", ".js", ".zip"];

#[derive(Debug, Default, PartialEq)]
pub struct Sitemap {
    pub is_index: bool,
    pub locations: Vec<String>,
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(20))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Parses a site argument such as `panlasangpinoy.com` into an origin URL
pub fn normalize_site(site: &str) -> Result<Url, AppError> {
    let site = site.trim();
    if site.is_empty() {
        return Err(AppError::InvalidRequest("Site is required".to_string()));
    }
    let with_scheme = if site.contains("://") {
        site.to_string()
    } else {
        format!("https://{}", site)
    };
    let url = Url::parse(&with_scheme).map_err(|_| AppError::InvalidRequest(format!("Invalid site URL: {}", site)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::InvalidRequest(format!("Invalid site URL: {}", site)));
    }
    Ok(url)
}

/// Parses a single page URL; only absolute http(s) URLs are accepted
pub fn parse_page_url(input: &str) -> Result<Url, AppError> {
    let url = Url::parse(input.trim()).map_err(|_| AppError::InvalidRequest(format!("Invalid URL: {}", input)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::InvalidRequest(format!("Invalid URL: {}", input)));
    }
    Ok(url)
}

fn bare_host(url: &Url) -> String {
    url.host_str()
        .unwrap_or_default()
        .trim_start_matches("www.")
        .to_lowercase()
}

pub fn same_host(a: &Url, b: &Url) -> bool {
    bare_host(a) == bare_host(b)
}

/// `Sitemap:` entries from a robots.txt body
pub fn sitemaps_from_robots(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("sitemap") {
                Some(value.trim().to_string())
            } else {
                None
            }
        })
        .filter(|v| !v.is_empty())
        .collect()
}

pub fn parse_sitemap(xml: &str) -> Sitemap {
    Sitemap {
        is_index: SITEMAP_INDEX_RE.is_match(xml),
        locations: LOC_RE
            .captures_iter(xml)
            .map(|c| c[1].replace("&amp;", "&"))
            .filter(|l| !l.is_empty())
            .collect(),
    }
}

/// Child sitemaps to follow, recipe-named ones first
pub fn pick_child_sitemaps(children: &[String]) -> Vec<String> {
    let mut ordered: Vec<&String> = children.iter().collect();
    ordered.sort_by_key(|c| !c.to_lowercase().contains("recipe"));
    ordered.into_iter().take(MAX_CHILD_SITEMAPS).cloned().collect()
}

/// Heuristic for article-like pages that may hold a recipe
pub fn looks_like_recipe_url(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    if path == "/" || path.is_empty() {
        return false;
    }
    if SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| SKIP_SEGMENTS.contains(s)) {
        return false;
    }
    if path.contains("recipe") {
        // "/recipes/" alone is a listing page
        return segments.last().map(|s| !s.starts_with("recipe")).unwrap_or(false);
    }
    // Slugs like /chicken-adobo/
    segments.last().map(|s| s.matches('-').count() >= 1).unwrap_or(false)
}

/// Same-host recipe-looking URLs, de-duplicated, at most `max_pages`
pub fn select_recipe_urls(site: &Url, locations: &[String], max_pages: usize) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for loc in locations {
        if selected.len() >= max_pages {
            break;
        }
        let mut url = match Url::parse(loc) {
            Ok(u) => u,
            Err(_) => continue,
        };
        url.set_fragment(None);
        if !same_host(site, &url) || !looks_like_recipe_url(&url) {
            continue;
        }
        let url = url.to_string();
        if !selected.contains(&url) {
            selected.push(url);
        }
    }
    selected
}

pub async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<String, AppError> {
    let mut response = http
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to fetch {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(AppError::ExternalService(format!("Fetching {} returned {}", url, response.status())));
    }
    if response.content_length().map(|l| l as usize > MAX_PAGE_BYTES).unwrap_or(false) {
        return Err(AppError::ExternalService(format!("Page too large: {}", url)));
    }

    // Chunked responses carry no length, so the cap is enforced while reading
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to read {}: {}", url, e)))?
    {
        append_capped(&mut body, &chunk, MAX_PAGE_BYTES, url)?;
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn append_capped(body: &mut Vec<u8>, chunk: &[u8], limit: usize, url: &str) -> Result<(), AppError> {
    if body.len() + chunk.len() > limit {
        return Err(AppError::ExternalService(format!("Page too large: {}", url)));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

/// Finds candidate recipe URLs through robots.txt or `/sitemap.xml`
pub async fn discover_recipe_urls(http: &reqwest::Client, site: &Url, max_pages: usize) -> Result<Vec<String>, AppError> {
    let origin = site.origin().ascii_serialization();

    let mut roots = match fetch_text(http, &format!("{}/robots.txt", origin)).await {
        Ok(robots) => sitemaps_from_robots(&robots),
        Err(e) => {
            log::debug!("No robots.txt for {}: {}", origin, e);
            vec![]
        }
    };
    if roots.is_empty() {
        roots.push(format!("{}/sitemap.xml", origin));
    }
    log::info!("🗺️  Sitemaps for {}: {:?}", origin, roots);

    let mut locations: Vec<String> = Vec::new();
    let mut last_error = None;

    for root in roots.iter().take(MAX_CHILD_SITEMAPS) {
        let sitemap = match fetch_text(http, root).await {
            Ok(xml) => parse_sitemap(&xml),
            Err(e) => {
                log::warn!("⚠️  {}", e);
                last_error = Some(e);
                continue;
            }
        };

        if sitemap.is_index {
            for child in pick_child_sitemaps(&sitemap.locations) {
                match fetch_text(http, &child).await {
                    Ok(xml) => locations.extend(parse_sitemap(&xml).locations),
                    Err(e) => log::warn!("⚠️  {}", e),
                }
                if select_recipe_urls(site, &locations, max_pages).len() >= max_pages {
                    break;
                }
            }
        } else {
            locations.extend(sitemap.locations);
        }

        if select_recipe_urls(site, &locations, max_pages).len() >= max_pages {
            break;
        }
    }

    if locations.is_empty() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    Ok(select_recipe_urls(site, &locations, max_pages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_site() {
        assert_eq!(normalize_site("panlasangpinoy.com").unwrap().as_str(), "https://panlasangpinoy.com/");
        assert_eq!(normalize_site("http://example.com/x").unwrap().host_str(), Some("example.com"));
        assert!(normalize_site("").is_err());
        assert!(normalize_site("ftp://example.com").is_err());
    }

    #[test]
    fn test_robots_sitemaps() {
        let robots = "User-agent: *\nDisallow: /wp-admin/\nSitemap: https://example.com/sitemap_index.xml\nsitemap:https://example.com/post-sitemap.xml\n";
        assert_eq!(
            sitemaps_from_robots(robots),
            vec!["https://example.com/sitemap_index.xml", "https://example.com/post-sitemap.xml"]
        );
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = r#"<?xml version="1.0"?>
            <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <sitemap><loc>https://example.com/page-sitemap.xml</loc></sitemap>
              <sitemap><loc><![CDATA[https://example.com/recipe-sitemap.xml]]></loc></sitemap>
            </sitemapindex>"#;
        let sitemap = parse_sitemap(xml);
        assert!(sitemap.is_index);
        assert_eq!(sitemap.locations.len(), 2);
        assert_eq!(
            pick_child_sitemaps(&sitemap.locations)[0],
            "https://example.com/recipe-sitemap.xml"
        );
    }

    #[test]
    fn test_child_sitemaps_are_capped() {
        let children: Vec<String> = (0..8).map(|i| format!("https://example.com/post-sitemap{}.xml", i)).collect();
        assert_eq!(pick_child_sitemaps(&children).len(), 5);
    }

    #[test]
    fn test_recipe_url_heuristic() {
        let yes = ["https://example.com/chicken-adobo/", "https://example.com/recipes/sinigang-na-baboy", "https://example.com/recipe/123"];
        let no = [
            "https://example.com/",
            "https://example.com/recipes/",
            "https://example.com/about-us/",
            "https://example.com/category/pork-recipes/",
            "https://example.com/wp-content/uploads/adobo-1.jpg",
            "https://example.com/contact",
        ];
        for u in yes {
            assert!(looks_like_recipe_url(&Url::parse(u).unwrap()), "{}", u);
        }
        for u in no {
            assert!(!looks_like_recipe_url(&Url::parse(u).unwrap()), "{}", u);
        }
    }

    #[test]
    fn test_select_recipe_urls() {
        let site = normalize_site("example.com").unwrap();
        let locs: Vec<String> = vec![
            "https://www.example.com/pork-adobo/".to_string(),
            "https://www.example.com/pork-adobo/#comments".to_string(),
            "https://other.com/beef-tapa/".to_string(),
            "https://example.com/kare-kare/".to_string(),
            "https://example.com/bulalo-soup/".to_string(),
            "not a url".to_string(),
        ];
        let selected = select_recipe_urls(&site, &locs, 2);
        assert_eq!(selected, vec!["https://www.example.com/pork-adobo/", "https://example.com/kare-kare/"]);
    }

    #[test]
    fn test_body_is_capped_across_chunks() {
        let mut body = Vec::new();
        append_capped(&mut body, b"<html>", 10, "https://example.com").unwrap();
        append_capped(&mut body, b"abcd", 10, "https://example.com").unwrap();
        assert_eq!(body.len(), 10);

        let err = append_capped(&mut body, b"x", 10, "https://example.com").unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
        assert_eq!(body.len(), 10);
    }
}
