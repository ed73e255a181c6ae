pub mod admin_seed;
pub mod recipes_seed;
