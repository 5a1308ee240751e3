// Re-export the Database struct and other public items
mod bank;
pub mod core;
mod review;
mod schema;

pub use self::core::Database;
pub use self::core::DbLockErrorExt;
