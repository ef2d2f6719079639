//! Editor configuration, resolved once at startup and injected into the
//! service. Nothing here is looked up per request.

use std::sync::Arc;

use crate::engine::RenderMode;
use crate::plugins::Plugin;

/// Hook applied to the serialized document right before it is written.
pub type PreWriteTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Picks the form render mode for a given user login.
pub type RenderStrategy = Arc<dyn Fn(&str) -> RenderMode + Send + Sync>;

pub struct EditorConfig {
    /// DTD URLs offered in the "New file" prompt.
    pub dtd_urls: Vec<String>,

    /// Add-element plugins, consulted in registration order.
    pub plugins: Vec<Arc<dyn Plugin>>,

    pub pre_write_transform: Option<PreWriteTransform>,

    pub render_strategy: RenderStrategy,
}

impl EditorConfig {
    pub fn new(dtd_urls: Vec<String>) -> Self {
        Self {
            dtd_urls,
            plugins: Vec::new(),
            pre_write_transform: None,
            render_strategy: Arc::new(|_| RenderMode::Editable),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
