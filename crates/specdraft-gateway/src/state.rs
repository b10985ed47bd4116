use std::sync::Arc;

use specdraft_engine::DraftService;

/// Shared handler state. The service is read-only after startup, so a
/// plain `Arc` is all the sharing this gateway needs.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DraftService>,
}
