use std::sync::Arc;
use std::time::Duration;

use crate::automation::Connector;
use crate::bridge::SlideNotesCache;

/// Shared by every handler; cloned per request
#[derive(Clone)]
pub struct AppState {
    pub notes: SlideNotesCache,
    pub office: Arc<dyn Connector>,
    /// Upper bound for one negotiate + control round trip
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(notes: SlideNotesCache, office: Arc<dyn Connector>, request_timeout: Duration) -> Self {
        Self {
            notes,
            office,
            request_timeout,
        }
    }
}
