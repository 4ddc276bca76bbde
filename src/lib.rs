pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::infra::{cache::PageCache, db::Db, storage::ObjectStorage};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: PageCache,
    pub storage: ObjectStorage,
    pub session_key: [u8; 32],
    pub session_ttl_days: u64,
    pub page_size: i64,
    pub page_cache_ttl_seconds: u64,
}
