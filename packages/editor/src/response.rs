//! Response bodies shared by every operation.

use serde::Serialize;
use serde_json::Value;

/// What an editor operation hands back to the HTTP layer. Serializes
/// untagged: each variant is exactly the JSON object the front end expects.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EditorResponse {
    /// Structured editing form plus the navigation tree.
    Form {
        content: String,
        jstree_data: Value,
    },

    /// Raw-text editing form (edit-as-text, and the degraded open path).
    Content { content: String },

    /// Tag names defined by a DTD.
    Tags { tags: Vec<String> },

    /// Modal prompt (new file, commit message).
    Modal { modal: String },

    /// Element data produced by add/paste.
    Element(Value),

    /// Copy acknowledgment.
    Info { info_msg: String },

    /// Save acknowledgment.
    Updated { msg: String },
}
