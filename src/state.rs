use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    gateways::shiprocket::CachedToken,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: AppConfig,
    pub http: reqwest::Client,
    /// Shiprocket bearer token shared across requests; the token stays
    /// valid for days so re-login on every call would be wasteful.
    pub shiprocket_token: Arc<Mutex<Option<CachedToken>>>,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, config: AppConfig) -> Self {
        Self {
            pool,
            orm,
            config,
            http: reqwest::Client::new(),
            shiprocket_token: Arc::new(Mutex::new(None)),
        }
    }
}
