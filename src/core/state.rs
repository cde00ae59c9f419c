use std::sync::Arc;

use sqlx::MySqlPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::services::storage::StorageService;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: MySqlPool,
    redis: RedisHandle,
    storage: StorageService,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: MySqlPool,
        redis: RedisHandle,
        storage: StorageService,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, storage }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &MySqlPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn storage(&self) -> &StorageService {
        &self.inner.storage
    }
}
