pub mod sqlite_repo;
pub mod store;
