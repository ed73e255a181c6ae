pub mod admin;
pub mod auth;
pub mod chat;
pub mod comments;
pub mod health;
pub mod nutrition;
pub mod recipes;
pub mod scan;
pub mod swagger;
pub mod users;
