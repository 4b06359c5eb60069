//! Infrastructure: SQLite connection, migrations, password hashing, photo storage.

pub mod db;
pub mod password;
pub mod storage;

pub(crate) use db::get_connection;
pub use db::{init_db, init_test_db, DbPool};
pub use storage::{MemoryPhotoStore, PhotoStore, S3PhotoStore, StoredObject};
