//! Pluggable handlers for add-sub-element requests.
//!
//! Plugins are offered the request in registration order; the first one
//! whose `matches` returns true supplies the result and the generic engine
//! call is skipped.

use serde_json::Value;

use crate::engine::Fields;
use crate::errors::EditorError;

pub trait Plugin: Send + Sync {
    /// Does this plugin claim the (element id, DTD url) pair?
    fn matches(&self, elt_id: &str, dtd_url: &str) -> bool;

    /// Produce the element data for a claimed request.
    fn handle(&self, elt_id: &str, dtd_url: &str, fields: &Fields) -> Result<Value, EditorError>;
}

/// First-match-wins dispatch over the registered plugins.
pub fn dispatch(
    plugins: &[std::sync::Arc<dyn Plugin>],
    elt_id: &str,
    dtd_url: &str,
    fields: &Fields,
) -> Option<Result<Value, EditorError>> {
    plugins
        .iter()
        .find(|plugin| plugin.matches(elt_id, dtd_url))
        .map(|plugin| plugin.handle(elt_id, dtd_url, fields))
}
