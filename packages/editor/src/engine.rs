//! # XML engine seam
//!
//! The actual XML tooling — DTD parsing, document object modeling, HTML
//! form generation — lives outside this repository. This module defines the
//! interface the view layer consumes, plus an in-memory implementation used
//! by the test suites and by the server binary when no real backend is
//! wired in.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use thiserror::Error;
use xmlwright_common::FileSystem;

use crate::fragments::escape;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("dtd can't be fetched: {0}")]
    DtdUnreachable(String),

    #[error("dtd syntax error: {0}")]
    DtdSyntax(String),

    #[error("xml syntax error: {0}")]
    XmlSyntax(String),

    #[error("unknown element: {0}")]
    UnknownElement(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Element kind as declared by a DTD. `Text` marks text-only leaf types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Container,
    Text,
}

/// Tag name -> element kind, as parsed from a DTD. BTreeMap keeps the tag
/// listing ascending and stable across calls.
pub type DtdMapping = BTreeMap<String, ElementKind>;

/// Submitted form fields, in posting order. Repeated keys are allowed.
pub type Fields = Vec<(String, String)>;

/// How the generated form should render for the current request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    #[default]
    Editable,
    ReadOnly,
}

/// Opaque handle on an engine-loaded document. The view layer never looks
/// inside `data`; it only attaches a render mode and hands the document
/// back to the engine for rendering.
#[derive(Clone, Debug)]
pub struct XmlDocument {
    pub root_tag: String,
    pub dtd_url: Option<String>,
    pub data: Value,
    pub render_mode: RenderMode,
}

impl XmlDocument {
    pub fn new(root_tag: &str, dtd_url: Option<&str>) -> Self {
        Self {
            root_tag: root_tag.to_string(),
            dtd_url: dtd_url.map(str::to_string),
            data: json!({}),
            render_mode: RenderMode::default(),
        }
    }
}

/// Attributes stamped on the generated `<form>` so the front end knows
/// which endpoints to call back into.
#[derive(Clone, Debug)]
pub struct FormAttrs {
    pub form_filename: String,
    pub action: String,
    pub add_href: String,
    pub comment_href: String,
    pub copy_href: String,
    pub paste_href: String,
}

/// The external XML tooling library, interface only.
pub trait XmlEngine: Send + Sync {
    /// Load and parse the document at `path`.
    fn load(&self, path: &Path) -> Result<XmlDocument, EngineError>;

    /// Parse `content` against the full document model (DTD included).
    fn load_string(&self, content: &str) -> Result<XmlDocument, EngineError>;

    /// Write the submitted field mapping back to `path`. `transform` is an
    /// optional hook applied to the serialized document before the write.
    fn update(
        &self,
        path: &Path,
        fields: &Fields,
        transform: Option<&(dyn Fn(&str) -> String + Send + Sync)>,
    ) -> Result<(), EngineError>;

    /// Enumerate the element types defined by the DTD at `url`.
    fn parse_dtd(&self, url: &str) -> Result<DtdMapping, EngineError>;

    /// Instantiate a blank document of the given element type, recording
    /// its originating DTD URL on the instance.
    fn new_element(&self, dtd_url: &str, tag: &str) -> Result<XmlDocument, EngineError>;

    /// Generate the HTML editing form for a loaded document.
    fn render_form(&self, document: &XmlDocument, attrs: &FormAttrs) -> String;

    /// Nested structural summary driving the front-end tree widget.
    fn to_tree(&self, document: &XmlDocument) -> Value;

    /// Serialize the posted sub-tree rooted at `elt_id` (copy source).
    fn element_data(&self, elt_id: &str, fields: &Fields) -> Value;

    /// Default data for a freshly added sub-element of this type.
    fn default_element_data(&self, elt_id: &str, dtd_url: &str) -> Result<Value, EngineError>;

    /// Merge clipboard data into a new element at the target location.
    /// `None` when the source and target shapes are incompatible;
    /// `skip_extra` discards the source's attributes and comments.
    fn paste_data(
        &self,
        elt_id: &str,
        fields: &Fields,
        clipboard: &Value,
        dtd_url: &str,
        skip_extra: bool,
    ) -> Result<Option<Value>, EngineError>;
}

/// In-memory engine backed by registered DTDs and documents.
///
/// Stands in for the real tooling backend: documents and DTDs are
/// registered up front, a file that exists on disk but was never registered
/// reads as malformed markup, and an unregistered DTD URL reads as
/// unreachable. Update calls are recorded so callers can assert the write
/// path was (or was not) taken.
pub struct InMemoryEngine {
    fs: Arc<dyn FileSystem>,
    dtds: Mutex<HashMap<String, DtdMapping>>,
    documents: Mutex<HashMap<PathBuf, XmlDocument>>,
    update_log: Mutex<Vec<PathBuf>>,
}

impl InMemoryEngine {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            dtds: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
            update_log: Mutex::new(Vec::new()),
        }
    }

    pub fn add_dtd(&self, url: &str, mapping: DtdMapping) {
        self.dtds.lock().unwrap().insert(url.to_string(), mapping);
    }

    pub fn add_document(&self, path: PathBuf, document: XmlDocument) {
        self.documents.lock().unwrap().insert(path, document);
    }

    /// Paths passed to `update` so far, in call order.
    pub fn update_calls(&self) -> Vec<PathBuf> {
        self.update_log.lock().unwrap().clone()
    }

    fn check_dtd(&self, document: &XmlDocument) -> Result<(), EngineError> {
        if let Some(url) = &document.dtd_url {
            if !self.dtds.lock().unwrap().contains_key(url) {
                return Err(EngineError::DtdUnreachable(url.clone()));
            }
        }
        Ok(())
    }
}

impl XmlEngine for InMemoryEngine {
    fn load(&self, path: &Path) -> Result<XmlDocument, EngineError> {
        if let Some(document) = self.documents.lock().unwrap().get(path) {
            self.check_dtd(document)?;
            return Ok(document.clone());
        }
        if self.fs.exists(path) {
            // Present on disk but not a registered document: the closest
            // in-memory analogue of markup the parser rejects.
            return Err(EngineError::XmlSyntax(format!(
                "{}: not well-formed",
                path.display()
            )));
        }
        Err(EngineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{}: no such file", path.display()),
        )))
    }

    fn load_string(&self, content: &str) -> Result<XmlDocument, EngineError> {
        let trimmed = content.trim_start();
        let body = if let Some(rest) = trimmed.strip_prefix("<?xml") {
            match rest.find('<') {
                Some(pos) => &rest[pos..],
                None => return Err(EngineError::XmlSyntax("no root element".to_string())),
            }
        } else {
            trimmed
        };
        let root_tag: String = body
            .strip_prefix('<')
            .map(|rest| {
                rest.chars()
                    .take_while(|c| c.is_alphanumeric() || matches!(c, ':' | '-' | '_'))
                    .collect()
            })
            .unwrap_or_default();
        if root_tag.is_empty() {
            return Err(EngineError::XmlSyntax("no root element".to_string()));
        }
        Ok(XmlDocument::new(&root_tag, None))
    }

    fn update(
        &self,
        path: &Path,
        fields: &Fields,
        transform: Option<&(dyn Fn(&str) -> String + Send + Sync)>,
    ) -> Result<(), EngineError> {
        self.update_log.lock().unwrap().push(path.to_path_buf());

        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .get_mut(path)
            .ok_or_else(|| EngineError::Other(format!("{}: can't be loaded", path.display())))?;
        if let Some(url) = &document.dtd_url {
            if !self.dtds.lock().unwrap().contains_key(url) {
                return Err(EngineError::DtdUnreachable(url.clone()));
            }
        }
        let map = document.data.as_object_mut();
        if let Some(map) = map {
            for (key, value) in fields {
                map.insert(key.clone(), Value::String(value.clone()));
            }
        }
        let serialized = document.data.to_string();
        let written = match transform {
            Some(transform) => transform(&serialized),
            None => serialized,
        };
        self.fs.write(path, &written)?;
        Ok(())
    }

    fn parse_dtd(&self, url: &str) -> Result<DtdMapping, EngineError> {
        self.dtds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::DtdUnreachable(url.to_string()))
    }

    fn new_element(&self, dtd_url: &str, tag: &str) -> Result<XmlDocument, EngineError> {
        let mapping = self.parse_dtd(dtd_url)?;
        if !mapping.contains_key(tag) {
            return Err(EngineError::UnknownElement(tag.to_string()));
        }
        Ok(XmlDocument::new(tag, Some(dtd_url)))
    }

    fn render_form(&self, document: &XmlDocument, attrs: &FormAttrs) -> String {
        let readonly = match document.render_mode {
            RenderMode::ReadOnly => " readonly=\"readonly\"",
            RenderMode::Editable => "",
        };
        let mut out = format!(
            "<form method=\"POST\" data-action=\"{}\" data-paste-href=\"{}\" \
             data-add-href=\"{}\" data-comment-href=\"{}\" data-copy-href=\"{}\" \
             id=\"xmltool-form\">\n",
            escape(&attrs.action),
            escape(&attrs.paste_href),
            escape(&attrs.add_href),
            escape(&attrs.comment_href),
            escape(&attrs.copy_href),
        );
        out.push_str(&format!(
            "<input type=\"hidden\" name=\"_xml_filename\" id=\"_xml_filename\" value=\"{}\" />\n",
            escape(&attrs.form_filename)
        ));
        if let Some(map) = document.data.as_object() {
            for (key, value) in map {
                let text = value.as_str().unwrap_or_default();
                out.push_str(&format!(
                    "<textarea name=\"{}:{}\"{}>{}</textarea>\n",
                    escape(&document.root_tag),
                    escape(key),
                    readonly,
                    escape(text),
                ));
            }
        }
        out.push_str("</form>");
        out
    }

    fn to_tree(&self, document: &XmlDocument) -> Value {
        let children: Vec<Value> = document
            .data
            .as_object()
            .map(|map| map.keys().map(|k| json!({ "tag": k })).collect())
            .unwrap_or_default();
        json!({ "tag": document.root_tag, "children": children })
    }

    fn element_data(&self, elt_id: &str, fields: &Fields) -> Value {
        let mut sub = serde_json::Map::new();
        for (key, value) in fields {
            if key == elt_id || key.starts_with(&format!("{elt_id}:")) {
                sub.insert(key.clone(), Value::String(value.clone()));
            }
        }
        json!({ "elt_id": elt_id, "fields": Value::Object(sub) })
    }

    fn default_element_data(&self, elt_id: &str, dtd_url: &str) -> Result<Value, EngineError> {
        self.parse_dtd(dtd_url)?;
        Ok(json!({
            "elt_id": elt_id,
            "html": format!("<div id=\"{}\"></div>", escape(elt_id)),
        }))
    }

    fn paste_data(
        &self,
        elt_id: &str,
        _fields: &Fields,
        clipboard: &Value,
        dtd_url: &str,
        skip_extra: bool,
    ) -> Result<Option<Value>, EngineError> {
        self.parse_dtd(dtd_url)?;

        let source_id = clipboard
            .get("elt_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        // A whole element pasted onto itself has no legal insertion point.
        if source_id == elt_id {
            return Ok(None);
        }
        let suffix = source_id.rsplit(':').next().unwrap_or(source_id);

        let mut merged = serde_json::Map::new();
        if let Some(map) = clipboard.get("fields").and_then(Value::as_object) {
            for (key, value) in map {
                if skip_extra && (key.contains("_attrs") || key.contains("_comment")) {
                    continue;
                }
                merged.insert(key.clone(), value.clone());
            }
        }
        Ok(Some(json!({
            "elt_id": format!("{elt_id}:{suffix}"),
            "fields": Value::Object(merged),
        })))
    }
}
