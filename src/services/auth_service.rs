use crate::{
    config::{AppConfig, JwtConfig},
    database::{MongoDB, USERS},
    models::{Role, User, UserInfo},
    services::{comment_service, mail_service},
    utils::{error::is_duplicate_key, validation, AppError},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::doc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Verification links stay valid for one day
pub const VERIFICATION_TTL_HOURS: i64 = 24;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: usize,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub requires_verification: bool,
    pub user: UserInfo,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    verify(password, hashed).map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))
}

// Generate JWT token
pub fn generate_jwt(config: &JwtConfig, user: &User) -> Result<(String, usize), AppError> {
    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::hours(config.expiration_hours)).timestamp() as usize;

    let claims = Claims {
        sub: user.user_id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        iat,
        exp,
        jti: Uuid::new_v4().to_string(),
        aud: config.audience.clone(),
        iss: config.issuer.clone(),
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(config.secret.as_ref()))
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;

    Ok((token, exp))
}

// Verify JWT token
pub fn verify_token(config: &JwtConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.audience.clone()]);

    let mut issuers = HashSet::new();
    issuers.insert(config.issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(token, &DecodingKey::from_secret(config.secret.as_ref()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

pub async fn find_user_by_id(db: &MongoDB, user_id: &str) -> Result<User, AppError> {
    db.collection::<User>(USERS)
        .find_one(doc! { "user_id": user_id })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

async fn find_user_by_email(db: &MongoDB, email: &str) -> Result<Option<User>, AppError> {
    Ok(db.collection::<User>(USERS).find_one(doc! { "email": email }).await?)
}

/// Builds a new unsaved account document
pub fn new_user(name: String, email: String, password_hash: String, role: Role, verified: bool) -> User {
    let now = Utc::now().timestamp();
    let (verification_token, verification_expires_at) = if verified {
        (None, None)
    } else {
        (
            Some(Uuid::new_v4().to_string()),
            Some(now + VERIFICATION_TTL_HOURS * 3600),
        )
    };

    User {
        id: None,
        user_id: Uuid::new_v4().to_string(),
        name,
        email,
        password: password_hash,
        role,
        avatar_url: None,
        is_banned: false,
        ban_reason: None,
        banned_at: None,
        is_verified: verified,
        verification_token,
        verification_expires_at,
        notes: vec![],
        favorites: vec![],
        created_at: now,
        updated_at: now,
        last_login: None,
    }
}

// User registration
pub async fn register(db: &MongoDB, config: &AppConfig, request: &RegisterRequest) -> Result<RegisterResponse, AppError> {
    let name = validation::validate_name(&request.name)?;
    let email = validation::normalize_email(&request.email)?;
    validation::validate_password(&request.password)?;

    if find_user_by_email(db, &email).await?.is_some() {
        return Err(AppError::Conflict("An account with this email already exists".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let requires_verification = config.require_email_verification;
    let user = new_user(name, email, password_hash, Role::User, !requires_verification);

    // Two concurrent registrations can both pass the lookup, the unique index settles it
    if let Err(e) = db.collection::<User>(USERS).insert_one(&user).await {
        if is_duplicate_key(&e) {
            return Err(AppError::Conflict("An account with this email already exists".to_string()));
        }
        return Err(e.into());
    }

    if let Some(token) = &user.verification_token {
        if let Err(e) = mail_service::send_verification_email(config, &user.name, &user.email, token).await {
            // The account exists, the user can ask for a new link
            log::warn!("⚠️  Failed to send verification email to {}: {}", user.email, e);
        }
    }

    let message = if requires_verification {
        "Registration successful. Please check your email to verify your account."
    } else {
        "Registration successful."
    };

    Ok(RegisterResponse {
        success: true,
        message: message.to_string(),
        requires_verification,
        user: UserInfo::from(&user),
    })
}

pub async fn verify_email(db: &MongoDB, token: &str) -> Result<UserInfo, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::InvalidRequest("Verification token is required".to_string()));
    }

    let collection = db.collection::<User>(USERS);
    let user = collection
        .find_one(doc! { "verification_token": token })
        .await?
        .ok_or_else(|| AppError::InvalidRequest("Invalid verification link".to_string()))?;

    let now = Utc::now().timestamp();
    if user.verification_expires_at.map(|exp| exp < now).unwrap_or(false) {
        return Err(AppError::InvalidRequest("Verification link expired".to_string()));
    }

    collection
        .update_one(
            doc! { "user_id": &user.user_id },
            doc! {
                "$set": { "is_verified": true, "updated_at": now },
                "$unset": { "verification_token": "", "verification_expires_at": "" }
            },
        )
        .await?;

    let mut verified = user;
    verified.is_verified = true;
    verified.verification_token = None;
    verified.verification_expires_at = None;
    Ok(UserInfo::from(&verified))
}

/// Issues a fresh verification link. Unknown emails succeed silently.
pub async fn resend_verification(db: &MongoDB, config: &AppConfig, email: &str) -> Result<(), AppError> {
    let email = validation::normalize_email(email)?;

    let user = match find_user_by_email(db, &email).await? {
        Some(u) => u,
        None => {
            log::info!("📭 Verification resend requested for unknown email");
            return Ok(());
        }
    };

    if user.is_verified {
        return Err(AppError::InvalidRequest("Account is already verified".to_string()));
    }

    let now = Utc::now().timestamp();
    let token = Uuid::new_v4().to_string();
    db.collection::<User>(USERS)
        .update_one(
            doc! { "user_id": &user.user_id },
            doc! { "$set": {
                "verification_token": &token,
                "verification_expires_at": now + VERIFICATION_TTL_HOURS * 3600,
                "updated_at": now,
            }},
        )
        .await?;

    mail_service::send_verification_email(config, &user.name, &user.email, &token).await
}

// User login
pub async fn login(db: &MongoDB, config: &AppConfig, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let email = request.email.trim().to_lowercase();
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = find_user_by_email(db, &email).await?.ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password)? {
        return Err(invalid());
    }

    if user.is_banned {
        return Err(AppError::Forbidden(match &user.ban_reason {
            Some(reason) => format!("Account is banned: {}", reason),
            None => "Account is banned".to_string(),
        }));
    }

    if config.require_email_verification && !user.is_verified {
        return Err(AppError::Forbidden("Please verify your email before logging in".to_string()));
    }

    let now = Utc::now().timestamp();
    db.collection::<User>(USERS)
        .update_one(doc! { "user_id": &user.user_id }, doc! { "$set": { "last_login": now } })
        .await?;

    let (token, expires_at) = generate_jwt(&config.jwt, &user)?;

    let mut user = user;
    user.last_login = Some(now);

    Ok(AuthResponse {
        success: true,
        token,
        expires_at,
        user: UserInfo::from(&user),
    })
}

pub async fn get_current_user(db: &MongoDB, user_id: &str) -> Result<UserInfo, AppError> {
    let user = find_user_by_id(db, user_id).await?;
    Ok(UserInfo::from(&user))
}

pub async fn change_password(db: &MongoDB, user_id: &str, request: &ChangePasswordRequest) -> Result<(), AppError> {
    let user = find_user_by_id(db, user_id).await?;

    if !verify_password(&request.current_password, &user.password)? {
        return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
    }
    validation::validate_password(&request.new_password)?;
    if request.current_password == request.new_password {
        return Err(AppError::InvalidRequest("New password must differ from the current one".to_string()));
    }

    let password_hash = hash_password(&request.new_password)?;
    db.collection::<User>(USERS)
        .update_one(
            doc! { "user_id": user_id },
            doc! { "$set": { "password": password_hash, "updated_at": Utc::now().timestamp() } },
        )
        .await?;

    Ok(())
}

/// Deletes the account and everything the user wrote or liked
pub async fn delete_user_account(db: &MongoDB, user_id: &str) -> Result<(), AppError> {
    let result = db.collection::<User>(USERS).delete_one(doc! { "user_id": user_id }).await?;
    if result.deleted_count == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let purged = comment_service::purge_user_activity(db, user_id).await?;
    log::info!("🧹 Removed activity of deleted user {} from {} recipe updates", user_id, purged);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config() -> JwtConfig {
        AppConfig::for_tests().jwt
    }

    fn user(role: Role) -> User {
        new_user("Maria".to_string(), "maria@example.com".to_string(), "hash".to_string(), role, true)
    }

    #[test]
    fn test_jwt_roundtrip() {
        let config = jwt_config();
        let user = user(Role::Admin);
        let (token, exp) = generate_jwt(&config, &user).unwrap();

        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.email, "maria@example.com");
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_jwt_rejects_wrong_secret() {
        let config = jwt_config();
        let (token, _) = generate_jwt(&config, &user(Role::User)).unwrap();

        let mut other = jwt_config();
        other.secret = "another-secret".to_string();
        assert!(matches!(verify_token(&other, &token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_jwt_rejects_wrong_audience() {
        let config = jwt_config();
        let (token, _) = generate_jwt(&config, &user(Role::User)).unwrap();

        let mut other = jwt_config();
        other.audience = "someone-else".to_string();
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn test_jwt_rejects_expired_token() {
        let mut config = jwt_config();
        config.expiration_hours = -2;
        let (token, _) = generate_jwt(&config, &user(Role::User)).unwrap();
        assert!(verify_token(&jwt_config(), &token).is_err());
    }

    #[test]
    fn test_password_hashing() {
        let hashed = bcrypt::hash("adobo123", 4).unwrap();
        assert!(verify_password("adobo123", &hashed).unwrap());
        assert!(!verify_password("sinigang1", &hashed).unwrap());
    }

    #[test]
    fn test_new_user_verification_state() {
        let pending = new_user("A".into(), "a@example.com".into(), "h".into(), Role::User, false);
        assert!(!pending.is_verified);
        assert!(pending.verification_token.is_some());
        let expires = pending.verification_expires_at.unwrap();
        assert_eq!(expires - pending.created_at, VERIFICATION_TTL_HOURS * 3600);

        let verified = new_user("B".into(), "b@example.com".into(), "h".into(), Role::User, true);
        assert!(verified.is_verified);
        assert!(verified.verification_token.is_none());
    }
}
