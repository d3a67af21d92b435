pub mod canon;
pub mod cli;
pub mod logging;
pub mod mime;
pub mod proxy;
pub mod settings;
pub mod util;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::mime::MimeRegistry;
use crate::proxy::AppContext;
use crate::settings::Settings;

pub async fn run(settings: Settings) -> Result<()> {
    let registry = build_registry(&settings)?;
    let app = AppContext::new(Arc::new(settings), Arc::new(registry));
    proxy::listener::start_listener(app).await
}

fn build_registry(settings: &Settings) -> Result<MimeRegistry> {
    let mut registry = MimeRegistry::builtin();
    for entry in &settings.extra_mime_types {
        registry
            .register_str(entry)
            .with_context(|| format!("invalid extra_mime_types entry '{entry}'"))?;
    }
    Ok(registry)
}
