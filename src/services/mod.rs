pub mod admin_service;
pub mod auth_service;
pub mod chat_service;
pub mod comment_service;
pub mod fdc_service;
pub mod import_service;
pub mod mail_service;
pub mod nutrition_service;
pub mod recipe_service;
pub mod scan_service;
pub mod user_service;
