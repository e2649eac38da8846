use std::sync::Arc;

use log::Logger;

use crate::cache::PhotoCache;
use crate::db::Db;

/// Everything a request handler needs.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub cache: Arc<PhotoCache>,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<dyn Db + Send + Sync>, cache: Arc<PhotoCache>) -> Self {
        Self { logger, db, cache }
    }
}
