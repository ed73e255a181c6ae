use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

/// Personal kitchen note
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Note {
    pub note_id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Account document stored in the `users` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub ban_reason: Option<String>,
    #[serde(default)]
    pub banned_at: Option<i64>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_expires_at: Option<i64>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub favorites: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub last_login: Option<i64>,
}

/// Authenticated caller, loaded fresh from the database on every request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        CurrentUser {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Public view of a user, never carries the password hash or tokens
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub is_banned: bool,
    pub favorites_count: usize,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.user_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
            is_verified: user.is_verified,
            is_banned: user.is_banned,
            favorites_count: user.favorites.len(),
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// Admin listing entry, includes moderation details
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub info: UserInfo,
    pub ban_reason: Option<String>,
    pub banned_at: Option<i64>,
    pub notes_count: usize,
}

impl From<&User> for AdminUserView {
    fn from(user: &User) -> Self {
        AdminUserView {
            info: UserInfo::from(user),
            ban_reason: user.ban_reason.clone(),
            banned_at: user.banned_at,
            notes_count: user.notes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: None,
            user_id: "u-1".to_string(),
            name: "Maria".to_string(),
            email: "maria@example.com".to_string(),
            password: "$2b$12$hash".to_string(),
            role: Role::User,
            avatar_url: None,
            is_banned: false,
            ban_reason: None,
            banned_at: None,
            is_verified: true,
            verification_token: Some("tok".to_string()),
            verification_expires_at: Some(10),
            notes: vec![],
            favorites: vec!["a".to_string(), "b".to_string()],
            created_at: 1,
            updated_at: 1,
            last_login: None,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" user ".parse::<Role>().unwrap(), Role::User);
        assert!("chef".parse::<Role>().is_err());
    }

    #[test]
    fn test_user_info_hides_secrets() {
        let user = sample_user();
        let json = serde_json::to_value(UserInfo::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("verification_token").is_none());
        assert_eq!(json["role"], "user");
        assert_eq!(json["favorites_count"], 2);
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        let doc = mongodb::bson::doc! {
            "user_id": "u-2",
            "name": "Jose",
            "email": "jose@example.com",
            "password": "hash",
            "created_at": 5_i64,
            "updated_at": 5_i64,
        };
        let user: User = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(user.role, Role::User);
        assert!(!user.is_banned);
        assert!(!user.is_verified);
        assert!(user.favorites.is_empty());
    }
}
