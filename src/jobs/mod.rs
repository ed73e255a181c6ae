pub mod import_runner;
pub mod verification_cleanup;
