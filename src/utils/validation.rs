use crate::utils::error::AppError;
use regex::Regex;

lazy_static::lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex");
}

pub const MAX_NAME_LEN: usize = 80;
pub const MAX_COMMENT_LEN: usize = 1000;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Lowercases and validates an email address
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::InvalidRequest("Invalid email address".to_string()));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(AppError::InvalidRequest(
            "Password must contain at least one letter and one number".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Trims comment/reply text and enforces the length limit
pub fn validate_comment_text(text: &str) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidRequest("Comment text is required".to_string()));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(text.to_string())
}

/// Clamps page/limit query values, returning (page, limit, skip)
pub fn pagination(page: Option<u64>, limit: Option<i64>) -> (u64, i64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, 100);
    let skip = (page - 1) * limit as u64;
    (page, limit, skip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_lowercased() {
        assert_eq!(normalize_email("  Juan@Example.COM ").unwrap(), "juan@example.com");
    }

    #[test]
    fn test_invalid_emails() {
        assert!(normalize_email("juan").is_err());
        assert!(normalize_email("juan@").is_err());
        assert!(normalize_email("juan@example").is_err());
        assert!(normalize_email("").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("adobo123").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("onlyletters").is_err());
        assert!(validate_password("12345678").is_err());
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(validate_name("  Maria ").unwrap(), "Maria");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(81)).is_err());
    }

    #[test]
    fn test_comment_text() {
        assert_eq!(validate_comment_text(" Sarap! ").unwrap(), "Sarap!");
        assert!(validate_comment_text("").is_err());
        assert!(validate_comment_text(&"x".repeat(1001)).is_err());
    }

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(pagination(None, None), (1, 20, 0));
        assert_eq!(pagination(Some(0), Some(500)), (1, 100, 0));
        assert_eq!(pagination(Some(3), Some(10)), (3, 10, 20));
        assert_eq!(pagination(Some(2), Some(-5)), (2, 1, 1));
    }
}
