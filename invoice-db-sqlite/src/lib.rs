mod factory;
mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::{SqliteRepository, database_url};
