use crate::{config::AppConfig, utils::AppError};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: String,
    text: String,
}

pub fn verification_link(frontend_url: &str, token: &str) -> String {
    format!(
        "{}/verify-email?token={}",
        frontend_url.trim_end_matches('/'),
        urlencoding::encode(token)
    )
}

/// Sends the verification email through the configured HTTP mail API.
/// Without a mail API the link is logged so local setups stay usable.
pub async fn send_verification_email(config: &AppConfig, name: &str, email: &str, token: &str) -> Result<(), AppError> {
    let link = verification_link(&config.frontend_url, token);

    let (api_url, api_key) = match (&config.mail.api_url, &config.mail.api_key) {
        (Some(url), Some(key)) => (url, key),
        _ => {
            log::info!("📧 Mail API not configured, verification link for {}: {}", email, link);
            return Ok(());
        }
    };

    let mail = OutgoingMail {
        from: &config.mail.from,
        to: vec![email],
        subject: "Verify your KusinAI account",
        html: format!(
            "<p>Hi {},</p><p>Welcome to KusinAI! Confirm your email address to start cooking:</p>\
             <p><a href=\"{}\">Verify my account</a></p>\
             <p>This link expires in 24 hours.</p>",
            name, link
        ),
        text: format!(
            "Hi {},\n\nWelcome to KusinAI! Confirm your email address: {}\n\nThis link expires in 24 hours.",
            name, link
        ),
    };

    let client = reqwest::Client::new();
    let response = client
        .post(api_url)
        .bearer_auth(api_key)
        .json(&mail)
        .send()
        .await
        .map_err(|e| AppError::ExternalService(format!("Failed to reach mail API: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::ExternalService(format!("Mail API error: {}", response.status())));
    }

    log::info!("📧 Verification email sent to {}", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link() {
        assert_eq!(
            verification_link("http://localhost:3000/", "abc-123"),
            "http://localhost:3000/verify-email?token=abc-123"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_mail_logs_and_succeeds() {
        let config = AppConfig::for_tests();
        assert!(send_verification_email(&config, "Maria", "maria@example.com", "tok").await.is_ok());
    }
}
