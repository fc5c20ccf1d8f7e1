pub mod memory;
pub mod postgres;
pub mod postgrest;
pub mod redis;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};
pub use postgrest::PostgrestStore;
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use self::redis::CacheWriterHandle;
pub use store::{ProfileStore, Query, Table};
