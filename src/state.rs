use std::sync::Arc;

use crate::config::FetchLimits;
use crate::fetch::{FetchError, Fetcher};
use crate::guard::UrlGuard;

/// Shared application state passed to all handlers.
///
/// The guard and its block-lists are built once at startup and only ever
/// read afterwards; the fetcher shares one connection pool across requests.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<UrlGuard>,
    pub fetcher: Fetcher,
}

impl AppState {
    pub fn new(guard: UrlGuard, limits: FetchLimits) -> Result<Self, FetchError> {
        let guard = Arc::new(guard);
        let fetcher = Fetcher::new(Arc::clone(&guard), limits)?;
        Ok(AppState { guard, fetcher })
    }
}
