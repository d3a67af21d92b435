pub mod codec;
pub mod forward;
pub mod listener;
pub mod server;

use std::sync::Arc;

use crate::mime::MimeRegistry;
use crate::settings::Settings;

/// Shared, read-only per-process state handed to every connection task.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub registry: Arc<MimeRegistry>,
}

impl AppContext {
    pub fn new(settings: Arc<Settings>, registry: Arc<MimeRegistry>) -> Self {
        Self { settings, registry }
    }
}
