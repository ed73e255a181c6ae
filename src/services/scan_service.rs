//! Ingredient detection from photos through a label-detection vision API

use crate::{
    config::VisionConfig,
    database::MongoDB,
    models::RecipeSummary,
    services::recipe_service,
    utils::AppError,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const MIN_LABEL_SCORE: f64 = 0.6;
const MAX_LABELS: u32 = 20;
const MAX_SCAN_RESULTS: usize = 10;

const GENERIC_LABELS: &[&str] = &[
    "food",
    "ingredient",
    "dish",
    "recipe",
    "cuisine",
    "produce",
    "natural foods",
    "whole food",
    "local food",
    "vegan nutrition",
    "superfood",
    "staple food",
    "tableware",
    "plate",
    "bowl",
    "cooking",
    "meal",
    "vegetable",
    "fruit",
    "plant",
    "fast food",
    "comfort food",
    "finger food",
];

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ScanRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScanMatch {
    pub recipe: RecipeSummary,
    pub matched_ingredients: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScanResponse {
    pub success: bool,
    pub ingredients: Vec<String>,
    pub recipes: Vec<ScanMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelAnnotation {
    description: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResult>,
}

/// Decodes a base64 image, accepting an optional `data:image/...;base64,` prefix
pub fn decode_image(input: &str) -> Result<Vec<u8>, AppError> {
    let payload = match input.find("base64,") {
        Some(pos) if input.starts_with("data:") => &input[pos + "base64,".len()..],
        _ => input,
    };
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    if payload.is_empty() {
        return Err(AppError::InvalidRequest("Image is required".to_string()));
    }
    // Reject before decoding when the encoded size alone is too large
    if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
        return Err(AppError::InvalidRequest("Image must be at most 5 MB".to_string()));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.as_bytes())
        .map_err(|_| AppError::InvalidRequest("Image is not valid base64".to_string()))?;

    if bytes.is_empty() {
        return Err(AppError::InvalidRequest("Image is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::InvalidRequest("Image must be at most 5 MB".to_string()));
    }
    Ok(bytes)
}

/// Keeps confident, specific labels as lower-case ingredient names
fn filter_labels(labels: Vec<LabelAnnotation>) -> Vec<String> {
    let mut ingredients: Vec<String> = Vec::new();
    for label in labels {
        if label.score < MIN_LABEL_SCORE {
            continue;
        }
        let name = label.description.trim().to_lowercase();
        if name.is_empty() || GENERIC_LABELS.contains(&name.as_str()) {
            continue;
        }
        if !ingredients.contains(&name) {
            ingredients.push(name);
        }
    }
    ingredients
}

fn parse_annotate_response(body: AnnotateResponse) -> Result<Vec<String>, AppError> {
    let result = match body.responses.into_iter().next() {
        Some(r) => r,
        None => return Ok(vec![]),
    };
    if let Some(error) = result.error {
        let message = error.get("message").and_then(|m| m.as_str()).unwrap_or("unknown error");
        return Err(AppError::ExternalService(format!("Vision API error: {}", message)));
    }
    Ok(filter_labels(result.label_annotations))
}

pub async fn detect_ingredients(config: &VisionConfig, image: &[u8]) -> Result<Vec<String>, AppError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Image scanning is not configured".to_string()))?;

    let body = json!({
        "requests": [{
            "image": { "content": base64::engine::general_purpose::STANDARD.encode(image) },
            "features": [{ "type": "LABEL_DETECTION", "maxResults": MAX_LABELS }]
        }]
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .post(&config.api_url)
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to reach vision API: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::ExternalService(format!("Vision API error: {}", response.status())));
    }

    let body: AnnotateResponse = response
        .json()
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to parse vision response: {}", e)))?;

    parse_annotate_response(body)
}

pub async fn scan_image(db: &MongoDB, config: &VisionConfig, request: &ScanRequest) -> Result<ScanResponse, AppError> {
    if config.api_key.is_none() {
        return Err(AppError::ServiceUnavailable("Image scanning is not configured".to_string()));
    }

    let image = decode_image(&request.image_base64)?;
    let ingredients = detect_ingredients(config, &image).await?;
    log::info!("📷 Detected {} ingredients: {:?}", ingredients.len(), ingredients);

    let recipes = recipe_service::find_by_ingredients(db, &ingredients, MAX_SCAN_RESULTS)
        .await?
        .into_iter()
        .map(|(recipe, matched_ingredients)| ScanMatch { recipe, matched_ingredients })
        .collect();

    Ok(ScanResponse {
        success: true,
        ingredients,
        recipes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_and_data_url() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"fake-jpeg-bytes");
        assert_eq!(decode_image(&encoded).unwrap(), b"fake-jpeg-bytes");

        let data_url = format!("data:image/jpeg;base64,{}", encoded);
        assert_eq!(decode_image(&data_url).unwrap(), b"fake-jpeg-bytes");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_image("").is_err());
        assert!(decode_image("data:image/png;base64,").is_err());
        assert!(decode_image("not base64 !!!").is_err());
    }

    #[test]
    fn test_decode_rejects_large_image() {
        let big = vec![0u8; MAX_IMAGE_BYTES + 1];
        let encoded = base64::engine::general_purpose::STANDARD.encode(&big);
        match decode_image(&encoded) {
            Err(AppError::InvalidRequest(msg)) => assert!(msg.contains("5 MB")),
            other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_label_filtering() {
        let body: AnnotateResponse = serde_json::from_str(
            r#"{"responses": [{"labelAnnotations": [
                {"description": "Food", "score": 0.98},
                {"description": "Tomato", "score": 0.95},
                {"description": "Garlic", "score": 0.81},
                {"description": "tomato", "score": 0.7},
                {"description": "Produce", "score": 0.9},
                {"description": "Shallot", "score": 0.41}
            ]}]}"#,
        )
        .unwrap();

        assert_eq!(parse_annotate_response(body).unwrap(), vec!["tomato", "garlic"]);
    }

    #[test]
    fn test_vision_error_payload() {
        let body: AnnotateResponse =
            serde_json::from_str(r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#).unwrap();
        assert!(matches!(parse_annotate_response(body), Err(AppError::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let config = VisionConfig {
            api_key: None,
            api_url: "http://localhost:1".to_string(),
        };
        let result = detect_ingredients(&config, b"img").await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }
}
