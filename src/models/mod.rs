pub mod import_job;
pub mod recipe;
pub mod user;

pub use import_job::*;
pub use recipe::*;
pub use user::*;
