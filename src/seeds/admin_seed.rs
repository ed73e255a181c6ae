use crate::{
    config::AdminSeedConfig,
    database::{MongoDB, USERS},
    models::{Role, User},
    services::auth_service,
    utils::validation,
};
use mongodb::bson::doc;

/// Creates the configured admin account when no user has that email.
/// An existing account is left untouched, including its role.
pub async fn seed_admin(db: &MongoDB, seed: &AdminSeedConfig) {
    let email = match validation::normalize_email(&seed.email) {
        Ok(email) => email,
        Err(e) => {
            log::error!("❌ ADMIN_EMAIL is invalid, skipping admin seed: {}", e);
            return;
        }
    };

    let users = db.collection::<User>(USERS);
    match users.count_documents(doc! { "email": &email }).await {
        Ok(0) => {}
        Ok(_) => {
            log::info!("👑 Admin {} already exists, skipping seed", email);
            return;
        }
        Err(e) => {
            log::error!("❌ Failed to check admin account: {}", e);
            return;
        }
    }

    let password_hash = match auth_service::hash_password(&seed.password) {
        Ok(hash) => hash,
        Err(e) => {
            log::error!("❌ Failed to hash admin password: {}", e);
            return;
        }
    };

    let admin = auth_service::new_user(seed.name.clone(), email.clone(), password_hash, Role::Admin, true);
    match users.insert_one(&admin).await {
        Ok(_) => log::info!("   ✅ Admin account created: {}", email),
        Err(e) => log::error!("   ❌ Failed to create admin account: {}", e),
    }
}
