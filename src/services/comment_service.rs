use crate::{
    database::{MongoDB, RECIPES},
    models::{Comment, CurrentUser, Recipe, Reply},
    services::recipe_service,
    utils::{validation, AppError},
};
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LikeResponse {
    pub success: bool,
    pub liked: bool,
    pub likes: usize,
}

/// Outcome of toggling a like on a likes array
#[derive(Debug, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes: usize,
}

/// Decides the new like state given the current likes array (set semantics)
pub fn toggle_like(likes: &[String], user_id: &str) -> LikeToggle {
    let already = likes.iter().any(|l| l == user_id);
    let distinct = {
        let mut seen: Vec<&String> = likes.iter().collect();
        seen.sort();
        seen.dedup();
        seen.len()
    };
    if already {
        LikeToggle { liked: false, likes: distinct - 1 }
    } else {
        LikeToggle { liked: true, likes: distinct + 1 }
    }
}

fn like_update(path: &str, user_id: &str, liked: bool) -> Document {
    let mut target = Document::new();
    target.insert(path, user_id);
    if liked {
        doc! { "$addToSet": target }
    } else {
        doc! { "$pull": target }
    }
}

async fn load_recipe(db: &MongoDB, recipe_id: &ObjectId) -> Result<Recipe, AppError> {
    db.collection::<Recipe>(RECIPES)
        .find_one(doc! { "_id": recipe_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

fn comment_not_found() -> AppError {
    AppError::NotFound("Comment not found".to_string())
}

pub async fn list_comments(db: &MongoDB, recipe_id: &str) -> Result<Vec<Comment>, AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let recipe = load_recipe(db, &oid).await?;
    Ok(recipe.comments)
}

pub async fn add_comment(db: &MongoDB, recipe_id: &str, actor: &CurrentUser, text: &str) -> Result<Comment, AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let text = validation::validate_comment_text(text)?;
    let now = chrono::Utc::now().timestamp();

    let comment = Comment {
        comment_id: Uuid::new_v4().to_string(),
        user_id: actor.user_id.clone(),
        user_name: actor.name.clone(),
        text,
        likes: vec![],
        replies: vec![],
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Recipe>(RECIPES)
        .update_one(doc! { "_id": oid }, doc! { "$push": { "comments": to_bson(&comment)? } })
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Recipe not found".to_string()));
    }

    Ok(comment)
}

pub async fn edit_comment(
    db: &MongoDB,
    recipe_id: &str,
    comment_id: &str,
    actor: &CurrentUser,
    text: &str,
) -> Result<Comment, AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let text = validation::validate_comment_text(text)?;
    let recipe = load_recipe(db, &oid).await?;
    let comment = recipe.find_comment(comment_id).ok_or_else(comment_not_found)?;

    if comment.user_id != actor.user_id {
        return Err(AppError::Forbidden("Only the author can edit this comment".to_string()));
    }

    let now = chrono::Utc::now().timestamp();
    db.collection::<Recipe>(RECIPES)
        .update_one(
            doc! { "_id": oid, "comments.comment_id": comment_id },
            doc! { "$set": { "comments.$.text": &text, "comments.$.updated_at": now } },
        )
        .await?;

    let mut updated = comment.clone();
    updated.text = text;
    updated.updated_at = now;
    Ok(updated)
}

pub async fn delete_comment(db: &MongoDB, recipe_id: &str, comment_id: &str, actor: &CurrentUser) -> Result<(), AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let recipe = load_recipe(db, &oid).await?;
    let comment = recipe.find_comment(comment_id).ok_or_else(comment_not_found)?;

    if comment.user_id != actor.user_id && !actor.is_admin() {
        return Err(AppError::Forbidden("Not allowed to delete this comment".to_string()));
    }

    db.collection::<Recipe>(RECIPES)
        .update_one(doc! { "_id": oid }, doc! { "$pull": { "comments": { "comment_id": comment_id } } })
        .await?;

    Ok(())
}

pub async fn toggle_comment_like(
    db: &MongoDB,
    recipe_id: &str,
    comment_id: &str,
    actor: &CurrentUser,
) -> Result<LikeToggle, AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let recipe = load_recipe(db, &oid).await?;
    let comment = recipe.find_comment(comment_id).ok_or_else(comment_not_found)?;

    let toggle = toggle_like(&comment.likes, &actor.user_id);

    db.collection::<Recipe>(RECIPES)
        .update_one(
            doc! { "_id": oid, "comments.comment_id": comment_id },
            like_update("comments.$.likes", &actor.user_id, toggle.liked),
        )
        .await?;

    Ok(toggle)
}

pub async fn add_reply(
    db: &MongoDB,
    recipe_id: &str,
    comment_id: &str,
    actor: &CurrentUser,
    text: &str,
) -> Result<Reply, AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let text = validation::validate_comment_text(text)?;
    let now = chrono::Utc::now().timestamp();

    let reply = Reply {
        reply_id: Uuid::new_v4().to_string(),
        user_id: actor.user_id.clone(),
        user_name: actor.name.clone(),
        text,
        likes: vec![],
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<Recipe>(RECIPES)
        .update_one(
            doc! { "_id": oid, "comments.comment_id": comment_id },
            doc! { "$push": { "comments.$.replies": to_bson(&reply)? } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Recipe or comment not found".to_string()));
    }

    Ok(reply)
}

pub async fn delete_reply(
    db: &MongoDB,
    recipe_id: &str,
    comment_id: &str,
    reply_id: &str,
    actor: &CurrentUser,
) -> Result<(), AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let recipe = load_recipe(db, &oid).await?;
    let reply = recipe
        .find_comment(comment_id)
        .ok_or_else(comment_not_found)?
        .find_reply(reply_id)
        .ok_or_else(|| AppError::NotFound("Reply not found".to_string()))?;

    if reply.user_id != actor.user_id && !actor.is_admin() {
        return Err(AppError::Forbidden("Not allowed to delete this reply".to_string()));
    }

    db.collection::<Recipe>(RECIPES)
        .update_one(
            doc! { "_id": oid, "comments.comment_id": comment_id },
            doc! { "$pull": { "comments.$.replies": { "reply_id": reply_id } } },
        )
        .await?;

    Ok(())
}

pub async fn toggle_reply_like(
    db: &MongoDB,
    recipe_id: &str,
    comment_id: &str,
    reply_id: &str,
    actor: &CurrentUser,
) -> Result<LikeToggle, AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    let recipe = load_recipe(db, &oid).await?;
    let reply = recipe
        .find_comment(comment_id)
        .ok_or_else(comment_not_found)?
        .find_reply(reply_id)
        .ok_or_else(|| AppError::NotFound("Reply not found".to_string()))?;

    let toggle = toggle_like(&reply.likes, &actor.user_id);

    db.collection::<Recipe>(RECIPES)
        .update_one(
            doc! { "_id": oid },
            like_update("comments.$[c].replies.$[r].likes", &actor.user_id, toggle.liked),
        )
        .array_filters(vec![doc! { "c.comment_id": comment_id }, doc! { "r.reply_id": reply_id }])
        .await?;

    Ok(toggle)
}

/// Filter/update pairs that strip a user's comments, replies and likes.
/// Comments go first so their replies and likes are dropped with them.
pub fn purge_updates(user_id: &str) -> Vec<(Document, Document)> {
    vec![
        (
            doc! { "comments.user_id": user_id },
            doc! { "$pull": { "comments": { "user_id": user_id } } },
        ),
        (
            doc! { "comments.replies.user_id": user_id },
            doc! { "$pull": { "comments.$[].replies": { "user_id": user_id } } },
        ),
        (
            doc! { "comments.likes": user_id },
            doc! { "$pull": { "comments.$[].likes": user_id } },
        ),
        (
            doc! { "comments.replies.likes": user_id },
            doc! { "$pull": { "comments.$[].replies.$[].likes": user_id } },
        ),
    ]
}

/// Removes a user's comments, replies and likes from every recipe.
/// Returns the number of modified recipe documents across all passes.
pub async fn purge_user_activity(db: &MongoDB, user_id: &str) -> Result<u64, AppError> {
    let recipes = db.collection::<Recipe>(RECIPES);
    let mut modified = 0;

    for (filter, update) in purge_updates(user_id) {
        modified += recipes.update_many(filter, update).await?.modified_count;
    }

    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_like_adds() {
        let likes = vec!["u-2".to_string()];
        assert_eq!(toggle_like(&likes, "u-1"), LikeToggle { liked: true, likes: 2 });
    }

    #[test]
    fn test_toggle_like_removes() {
        let likes = vec!["u-1".to_string(), "u-2".to_string()];
        assert_eq!(toggle_like(&likes, "u-1"), LikeToggle { liked: false, likes: 1 });
    }

    #[test]
    fn test_toggle_like_counts_distinct_users() {
        // Legacy data may contain duplicates; the stored array keeps set semantics after $pull
        let likes = vec!["u-1".to_string(), "u-1".to_string(), "u-3".to_string()];
        assert_eq!(toggle_like(&likes, "u-1"), LikeToggle { liked: false, likes: 1 });
        assert_eq!(toggle_like(&likes, "u-2"), LikeToggle { liked: true, likes: 3 });
    }

    #[test]
    fn test_like_update_documents() {
        let add = like_update("comments.$.likes", "u-1", true);
        assert_eq!(add, doc! { "$addToSet": { "comments.$.likes": "u-1" } });

        let remove = like_update("comments.$.likes", "u-1", false);
        assert_eq!(remove, doc! { "$pull": { "comments.$.likes": "u-1" } });
    }

    #[test]
    fn test_purge_updates_cover_comments_replies_and_likes() {
        let updates = purge_updates("u-9");
        assert_eq!(updates.len(), 4);

        // Authored comments are removed before the per-comment passes
        assert_eq!(updates[0].0, doc! { "comments.user_id": "u-9" });
        assert_eq!(updates[0].1, doc! { "$pull": { "comments": { "user_id": "u-9" } } });

        let pulls: Vec<String> = updates
            .iter()
            .map(|(_, update)| {
                let pull = update.get_document("$pull").unwrap();
                assert_eq!(pull.len(), 1);
                pull.keys().next().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            pulls,
            vec!["comments", "comments.$[].replies", "comments.$[].likes", "comments.$[].replies.$[].likes"]
        );

        // Every pass only touches recipes where the user actually appears
        for (filter, update) in &updates {
            let field = filter.keys().next().unwrap();
            assert_eq!(filter.get_str(field).unwrap(), "u-9");
            let pulled = update.get_document("$pull").unwrap().values().next().unwrap();
            assert!(pulled.to_string().contains("u-9"));
        }
    }
}
