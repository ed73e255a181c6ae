use crate::{
    database::{MongoDB, USERS},
    models::{Note, RecipeSummary, User, UserInfo},
    services::{auth_service, recipe_service},
    utils::{validation, AppError},
};
use mongodb::bson::{doc, to_bson, Document};
use serde::Deserialize;
use uuid::Uuid;

const MAX_NOTE_TITLE_LEN: usize = 120;
const MAX_NOTE_CONTENT_LEN: usize = 5000;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct NoteRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

fn validate_note_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidRequest("Note title is required".to_string()));
    }
    if title.chars().count() > MAX_NOTE_TITLE_LEN {
        return Err(AppError::InvalidRequest(format!("Note title must be at most {} characters", MAX_NOTE_TITLE_LEN)));
    }
    Ok(title.to_string())
}

fn validate_note_content(content: &str) -> Result<String, AppError> {
    if content.chars().count() > MAX_NOTE_CONTENT_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Note content must be at most {} characters",
            MAX_NOTE_CONTENT_LEN
        )));
    }
    Ok(content.trim().to_string())
}

pub async fn update_profile(db: &MongoDB, user_id: &str, request: &UpdateProfileRequest) -> Result<UserInfo, AppError> {
    let mut set = Document::new();
    if let Some(name) = &request.name {
        set.insert("name", validation::validate_name(name)?);
    }
    if let Some(avatar_url) = &request.avatar_url {
        set.insert("avatar_url", avatar_url.trim());
    }
    if set.is_empty() {
        return Err(AppError::InvalidRequest("No fields to update".to_string()));
    }
    set.insert("updated_at", chrono::Utc::now().timestamp());

    let user = db
        .collection::<User>(USERS)
        .find_one_and_update(doc! { "user_id": user_id }, doc! { "$set": set })
        .return_document(mongodb::options::ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(UserInfo::from(&user))
}

// ==================== NOTES ====================

pub async fn list_notes(db: &MongoDB, user_id: &str) -> Result<Vec<Note>, AppError> {
    let mut notes = auth_service::find_user_by_id(db, user_id).await?.notes;
    notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(notes)
}

pub async fn add_note(db: &MongoDB, user_id: &str, request: &NoteRequest) -> Result<Note, AppError> {
    let now = chrono::Utc::now().timestamp();
    let note = Note {
        note_id: Uuid::new_v4().to_string(),
        title: validate_note_title(&request.title)?,
        content: validate_note_content(&request.content)?,
        created_at: now,
        updated_at: now,
    };

    let result = db
        .collection::<User>(USERS)
        .update_one(doc! { "user_id": user_id }, doc! { "$push": { "notes": to_bson(&note)? } })
        .await?;
    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(note)
}

pub async fn update_note(db: &MongoDB, user_id: &str, note_id: &str, request: &UpdateNoteRequest) -> Result<Note, AppError> {
    let user = auth_service::find_user_by_id(db, user_id).await?;
    let mut note = user
        .notes
        .into_iter()
        .find(|n| n.note_id == note_id)
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    if request.title.is_none() && request.content.is_none() {
        return Err(AppError::InvalidRequest("No fields to update".to_string()));
    }
    if let Some(title) = &request.title {
        note.title = validate_note_title(title)?;
    }
    if let Some(content) = &request.content {
        note.content = validate_note_content(content)?;
    }
    note.updated_at = chrono::Utc::now().timestamp();

    db.collection::<User>(USERS)
        .update_one(
            doc! { "user_id": user_id, "notes.note_id": note_id },
            doc! { "$set": {
                "notes.$.title": &note.title,
                "notes.$.content": &note.content,
                "notes.$.updated_at": note.updated_at,
            }},
        )
        .await?;

    Ok(note)
}

pub async fn delete_note(db: &MongoDB, user_id: &str, note_id: &str) -> Result<(), AppError> {
    let result = db
        .collection::<User>(USERS)
        .update_one(
            doc! { "user_id": user_id, "notes.note_id": note_id },
            doc! { "$pull": { "notes": { "note_id": note_id } } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("Note not found".to_string()));
    }
    Ok(())
}

// ==================== FAVORITES ====================

pub async fn list_favorites(db: &MongoDB, user_id: &str) -> Result<Vec<RecipeSummary>, AppError> {
    let user = auth_service::find_user_by_id(db, user_id).await?;
    recipe_service::get_recipes_by_ids(db, &user.favorites).await
}

/// Adds a recipe to the favorites set. Idempotent.
pub async fn add_favorite(db: &MongoDB, user_id: &str, recipe_id: &str) -> Result<(), AppError> {
    // Existence check also validates the id format
    let recipe = recipe_service::get_recipe(db, recipe_id).await?;
    let hex = recipe.id.map(|id| id.to_hex()).unwrap_or_default();

    db.collection::<User>(USERS)
        .update_one(doc! { "user_id": user_id }, doc! { "$addToSet": { "favorites": hex } })
        .await?;
    Ok(())
}

/// Removes a recipe from the favorites set. Idempotent.
pub async fn remove_favorite(db: &MongoDB, user_id: &str, recipe_id: &str) -> Result<(), AppError> {
    let oid = recipe_service::parse_recipe_id(recipe_id)?;
    db.collection::<User>(USERS)
        .update_one(doc! { "user_id": user_id }, doc! { "$pull": { "favorites": oid.to_hex() } })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_title_validation() {
        assert_eq!(validate_note_title("  Lola's tips ").unwrap(), "Lola's tips");
        assert!(validate_note_title("").is_err());
        assert!(validate_note_title(&"t".repeat(121)).is_err());
    }

    #[test]
    fn test_note_content_validation() {
        assert_eq!(validate_note_content(" use calamansi ").unwrap(), "use calamansi");
        assert!(validate_note_content(&"c".repeat(5001)).is_err());
    }
}
