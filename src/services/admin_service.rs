use crate::{
    database::{MongoDB, RECIPES, USERS},
    models::{AdminUserView, CurrentUser, Recipe, Role, User},
    services::{auth_service, comment_service, recipe_service},
    utils::{validation, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    pub q: Option<String>,
    pub banned: Option<bool>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BanRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<AdminUserView>,
    pub total: u64,
    pub page: u64,
    pub limit: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub users: u64,
    pub verified_users: u64,
    pub banned_users: u64,
    pub admins: u64,
    pub recipes: u64,
    pub comments: u64,
    pub regions: usize,
}

pub fn build_user_filter(query: &UserListQuery) -> Document {
    let mut filter = Document::new();
    if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = recipe_service::contains_ci(q);
        filter.insert("$or", vec![doc! { "name": pattern.clone() }, doc! { "email": pattern }]);
    }
    if let Some(banned) = query.banned {
        filter.insert("is_banned", banned);
    }
    filter
}

pub async fn list_users(db: &MongoDB, query: &UserListQuery) -> Result<UserListResponse, AppError> {
    let (page, limit, skip) = validation::pagination(query.page, query.limit);
    let filter = build_user_filter(query);
    let collection = db.collection::<User>(USERS);

    let total = collection.count_documents(filter.clone()).await?;
    let users: Vec<User> = collection
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(limit)
        .await?
        .try_collect()
        .await?;

    Ok(UserListResponse {
        success: true,
        users: users.iter().map(AdminUserView::from).collect(),
        total,
        page,
        limit,
    })
}

/// Bans a user and removes their comments, replies and likes everywhere
pub async fn ban_user(db: &MongoDB, admin: &CurrentUser, user_id: &str, reason: Option<String>) -> Result<AdminUserView, AppError> {
    if admin.user_id == user_id {
        return Err(AppError::InvalidRequest("You cannot ban yourself".to_string()));
    }

    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let now = chrono::Utc::now().timestamp();

    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(
            doc! { "user_id": user_id },
            doc! { "$set": {
                "is_banned": true,
                "ban_reason": reason,
                "banned_at": now,
                "updated_at": now,
            }},
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let purged = comment_service::purge_user_activity(db, user_id).await?;
    log::info!("🚫 User {} banned by {}, {} recipe updates purged", user_id, admin.user_id, purged);

    Ok(AdminUserView::from(&user))
}

pub async fn unban_user(db: &MongoDB, user_id: &str) -> Result<AdminUserView, AppError> {
    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(
            doc! { "user_id": user_id },
            doc! {
                "$set": { "is_banned": false, "updated_at": chrono::Utc::now().timestamp() },
                "$unset": { "ban_reason": "", "banned_at": "" }
            },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(AdminUserView::from(&user))
}

pub async fn set_role(db: &MongoDB, admin: &CurrentUser, user_id: &str, role: &str) -> Result<AdminUserView, AppError> {
    let role: Role = role.parse().map_err(AppError::InvalidRequest)?;

    if admin.user_id == user_id && role != Role::Admin {
        return Err(AppError::InvalidRequest("You cannot remove your own admin role".to_string()));
    }

    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(
            doc! { "user_id": user_id },
            doc! { "$set": { "role": role.as_str(), "updated_at": chrono::Utc::now().timestamp() } },
        )
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(AdminUserView::from(&user))
}

pub async fn delete_user(db: &MongoDB, admin: &CurrentUser, user_id: &str) -> Result<(), AppError> {
    if admin.user_id == user_id {
        return Err(AppError::InvalidRequest("Use account deletion to remove your own account".to_string()));
    }
    auth_service::delete_user_account(db, user_id).await
}

pub async fn get_stats(db: &MongoDB) -> Result<StatsResponse, AppError> {
    let users = db.collection::<User>(USERS);
    let recipes = db.collection::<Recipe>(RECIPES);

    let comments = {
        let pipeline = vec![
            doc! { "$project": { "count": { "$size": { "$ifNull": ["$comments", []] } } } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$count" } } },
        ];
        let mut cursor = recipes.aggregate(pipeline).await?;
        match cursor.try_next().await? {
            Some(row) => match row.get("total") {
                Some(mongodb::bson::Bson::Int32(n)) => *n as u64,
                Some(mongodb::bson::Bson::Int64(n)) => *n as u64,
                _ => 0,
            },
            None => 0,
        }
    };

    Ok(StatsResponse {
        success: true,
        users: users.count_documents(doc! {}).await?,
        verified_users: users.count_documents(doc! { "is_verified": true }).await?,
        banned_users: users.count_documents(doc! { "is_banned": true }).await?,
        admins: users.count_documents(doc! { "role": "admin" }).await?,
        recipes: recipes.count_documents(doc! {}).await?,
        comments,
        regions: recipe_service::list_regions(db).await?.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_filter() {
        let query = UserListQuery {
            q: Some("maria".to_string()),
            banned: Some(true),
            ..Default::default()
        };
        let filter = build_user_filter(&query);
        assert_eq!(filter.get_array("$or").unwrap().len(), 2);
        assert!(filter.get_bool("is_banned").unwrap());
    }

    #[test]
    fn test_empty_user_filter() {
        assert!(build_user_filter(&UserListQuery::default()).is_empty());
    }

    async fn test_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/kusinai_test".to_string());
        MongoDB::new(&uri).await.expect("MongoDB must be running")
    }

    fn member(user_id: &str) -> User {
        let now = chrono::Utc::now().timestamp();
        User {
            id: None,
            user_id: user_id.to_string(),
            name: "Test Cook".to_string(),
            email: format!("{}@example.com", user_id),
            password: "not-a-real-hash".to_string(),
            role: Role::User,
            avatar_url: None,
            is_banned: false,
            ban_reason: None,
            banned_at: None,
            is_verified: true,
            verification_token: None,
            verification_expires_at: None,
            notes: vec![],
            favorites: vec![],
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_ban_removes_comments_replies_and_likes() {
        let db = test_db().await;
        let target = format!("ban-{}", uuid::Uuid::new_v4());
        let other = format!("other-{}", uuid::Uuid::new_v4());
        let admin = CurrentUser {
            user_id: format!("admin-{}", uuid::Uuid::new_v4()),
            name: "Admin".to_string(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        };
        db.collection::<User>(USERS).insert_one(member(&target)).await.unwrap();

        let now = chrono::Utc::now().timestamp();
        let recipe_id = db
            .collection::<Document>(RECIPES)
            .insert_one(doc! {
                "title": "Test Adobo",
                "region": "Tagalog",
                "ingredients": ["chicken"],
                "steps": ["Cook."],
                "created_at": now,
                "updated_at": now,
                "comments": [
                    {
                        "comment_id": "c-own", "user_id": &target, "user_name": "Test Cook",
                        "text": "mine", "likes": [&other], "replies": [],
                        "created_at": now, "updated_at": now,
                    },
                    {
                        "comment_id": "c-other", "user_id": &other, "user_name": "Other",
                        "text": "theirs", "likes": [&target, &other],
                        "replies": [
                            { "reply_id": "r-own", "user_id": &target, "user_name": "Test Cook",
                              "text": "reply", "likes": [], "created_at": now, "updated_at": now },
                            { "reply_id": "r-other", "user_id": &other, "user_name": "Other",
                              "text": "reply", "likes": [&target], "created_at": now, "updated_at": now },
                        ],
                        "created_at": now, "updated_at": now,
                    },
                ],
            })
            .await
            .unwrap()
            .inserted_id;

        let banned = ban_user(&db, &admin, &target, Some("spam".to_string())).await.unwrap();
        assert!(banned.info.is_banned);
        assert_eq!(banned.ban_reason.as_deref(), Some("spam"));

        let recipe = db
            .collection::<Document>(RECIPES)
            .find_one(doc! { "_id": &recipe_id })
            .await
            .unwrap()
            .unwrap();
        let raw = recipe.get_array("comments").unwrap();
        assert_eq!(raw.len(), 1);
        let comment = raw[0].as_document().unwrap();
        assert_eq!(comment.get_str("comment_id").unwrap(), "c-other");
        assert_eq!(comment.get_array("likes").unwrap().len(), 1);
        let replies = comment.get_array("replies").unwrap();
        assert_eq!(replies.len(), 1);
        let reply = replies[0].as_document().unwrap();
        assert_eq!(reply.get_str("reply_id").unwrap(), "r-other");
        assert!(reply.get_array("likes").unwrap().is_empty());

        db.collection::<Document>(RECIPES).delete_one(doc! { "_id": &recipe_id }).await.unwrap();
        db.collection::<User>(USERS).delete_one(doc! { "user_id": &target }).await.unwrap();
    }
}

