//! # Editor operations
//!
//! One method per HTTP operation, each a single
//! validate -> delegate -> shape-or-map-error step. The service is
//! long-lived and stateless; the per-user context (login + root directory)
//! comes in with every call, and the one piece of cross-request state (the
//! clipboard slot) is owned by the session layer, which passes it in for
//! paste and stores what copy returns.

use std::path::PathBuf;
use std::sync::Arc;

use xmlwright_common::{resolve_under_root, FileSystem};

use crate::clipboard::{self, ClipboardEntry};
use crate::config::EditorConfig;
use crate::engine::{ElementKind, EngineError, Fields, FormAttrs, RenderMode, XmlEngine};
use crate::errors::EditorError;
use crate::fragments;
use crate::plugins;
use crate::response::EditorResponse;

/// Authenticated user context, resolved by the HTTP layer.
pub struct UserCtx {
    pub login: String,
    pub root: PathBuf,
}

/// Route paths under one account's prefix, stamped into generated forms.
pub struct Routes {
    prefix: String,
}

impl Routes {
    pub fn for_account(login: &str) -> Self {
        Self {
            prefix: format!("/account/{login}/xml"),
        }
    }

    pub fn update(&self) -> String {
        format!("{}/update.json", self.prefix)
    }

    pub fn update_text(&self) -> String {
        format!("{}/update-text.json", self.prefix)
    }

    pub fn add_element(&self) -> String {
        format!("{}/add-element.json", self.prefix)
    }

    pub fn comment_modal(&self) -> String {
        format!("{}/get-comment-modal.json", self.prefix)
    }

    pub fn copy(&self) -> String {
        format!("{}/copy.json", self.prefix)
    }

    pub fn paste(&self) -> String {
        format!("{}/paste.json", self.prefix)
    }

    pub fn form_attrs(&self, form_filename: &str) -> FormAttrs {
        FormAttrs {
            form_filename: form_filename.to_string(),
            action: self.update(),
            add_href: self.add_element(),
            comment_href: self.comment_modal(),
            copy_href: self.copy(),
            paste_href: self.paste(),
        }
    }
}

pub struct EditorService {
    engine: Arc<dyn XmlEngine>,
    fs: Arc<dyn FileSystem>,
    config: EditorConfig,
}

/// First non-empty value for `key`.
fn field<'a>(fields: &'a Fields, key: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn nonempty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Extension of the last path segment, dot included. A leading dot alone
/// does not count ("`.bashrc`" has no extension).
fn extension(filename: &str) -> Option<&str> {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    match base.rfind('.') {
        None | Some(0) => None,
        Some(i) => Some(&base[i..]),
    }
}

/// Re-express an engine failure in the operation's error vocabulary.
/// `name` is the file path or DTD URL the client will see in the message.
fn engine_failure(name: &str, err: EngineError) -> EditorError {
    match err {
        EngineError::DtdUnreachable(_) | EngineError::DtdSyntax(_) => {
            EditorError::DtdLoad(name.to_string())
        }
        other => EditorError::Internal(other.to_string()),
    }
}

impl EditorService {
    pub fn new(engine: Arc<dyn XmlEngine>, fs: Arc<dyn FileSystem>, config: EditorConfig) -> Self {
        Self { engine, fs, config }
    }

    /// Load a document and render its editing form plus tree data.
    ///
    /// XML that fails to parse degrades to the raw-text editing response
    /// instead of erroring; a DTD that can't be fetched does not.
    pub fn open(
        &self,
        ctx: &UserCtx,
        path: Option<&str>,
        iframe: bool,
    ) -> Result<EditorResponse, EditorError> {
        let path = nonempty(path)
            .ok_or(EditorError::MissingParameter("A filename should be provided"))?;
        let absolute = resolve_under_root(&ctx.root, path)?;

        match self.engine.load(&absolute) {
            Ok(mut document) => {
                document.render_mode = if iframe {
                    RenderMode::ReadOnly
                } else {
                    (self.config.render_strategy)(&ctx.login)
                };
                let routes = Routes::for_account(&ctx.login);
                let content = self.engine.render_form(&document, &routes.form_attrs(path));
                let jstree_data = self.engine.to_tree(&document);
                Ok(EditorResponse::Form {
                    content,
                    jstree_data,
                })
            }
            Err(EngineError::XmlSyntax(reason)) => {
                tracing::warn!(path, %reason, "xml does not parse, serving the text editor");
                self.open_as_text(ctx, Some(path))
            }
            Err(err @ (EngineError::DtdUnreachable(_) | EngineError::DtdSyntax(_))) => {
                tracing::error!(path, error = %err, "dtd load failed");
                Err(EditorError::DtdLoad(path.to_string()))
            }
            Err(err) => {
                tracing::error!(path, error = %err, "load failed");
                Err(EditorError::Internal(err.to_string()))
            }
        }
    }

    /// Raw file content wrapped in the text-editing form.
    pub fn open_as_text(
        &self,
        ctx: &UserCtx,
        path: Option<&str>,
    ) -> Result<EditorResponse, EditorError> {
        let path = nonempty(path)
            .ok_or(EditorError::MissingParameter("A filename should be provided"))?;
        let absolute = resolve_under_root(&ctx.root, path)?;
        let raw = self.fs.read_to_string(&absolute).map_err(|err| {
            tracing::error!(path, error = %err, "read failed");
            EditorError::Internal(err.to_string())
        })?;
        let routes = Routes::for_account(&ctx.login);
        Ok(EditorResponse::Content {
            content: fragments::text_form(path, &raw, &routes.update_text()),
        })
    }

    /// Tag names defined by the DTD, ascending, optionally text-only.
    pub fn list_tags(
        &self,
        dtd_url: Option<&str>,
        text_only: bool,
    ) -> Result<EditorResponse, EditorError> {
        let url = nonempty(dtd_url).ok_or(EditorError::MissingParameter("No dtd url given"))?;
        let mapping = self.engine.parse_dtd(url).map_err(|err| {
            tracing::error!(url, error = %err, "dtd parse failed");
            engine_failure(url, err)
        })?;
        let tags = mapping
            .into_iter()
            .filter(|(_, kind)| !text_only || *kind == ElementKind::Text)
            .map(|(tag, _)| tag)
            .collect();
        Ok(EditorResponse::Tags { tags })
    }

    /// Start a new document, from a DTD element type or from a template
    /// file. No parameters at all prompts for a DTD/tag selection instead.
    pub fn create_new(
        &self,
        ctx: &UserCtx,
        path: Option<&str>,
        dtd_url: Option<&str>,
        dtd_tag: Option<&str>,
    ) -> Result<EditorResponse, EditorError> {
        let path = nonempty(path);
        let mut document = match (nonempty(dtd_url), nonempty(dtd_tag)) {
            (Some(url), Some(tag)) => {
                let mapping = self.engine.parse_dtd(url).map_err(|err| {
                    tracing::error!(url, error = %err, "dtd parse failed");
                    engine_failure(url, err)
                })?;
                if !mapping.contains_key(tag) {
                    return Err(EditorError::InvalidElement {
                        tag: tag.to_string(),
                        url: url.to_string(),
                    });
                }
                self.engine
                    .new_element(url, tag)
                    .map_err(|err| engine_failure(url, err))?
            }
            (None, None) => match path {
                Some(template) => {
                    let absolute = resolve_under_root(&ctx.root, template)?;
                    self.engine.load(&absolute).map_err(|err| {
                        tracing::error!(template, error = %err, "template load failed");
                        engine_failure(template, err)
                    })?
                }
                None => {
                    return Ok(EditorResponse::Modal {
                        modal: fragments::new_file_modal(&self.config.dtd_urls),
                    })
                }
            },
            _ => return Err(EditorError::Creation),
        };

        document.render_mode = (self.config.render_strategy)(&ctx.login);
        let routes = Routes::for_account(&ctx.login);
        // New document: the form carries an empty hidden filename.
        let content = self.engine.render_form(&document, &routes.form_attrs(""));
        let jstree_data = self.engine.to_tree(&document);
        Ok(EditorResponse::Form {
            content,
            jstree_data,
        })
    }

    /// Write the submitted field mapping through the engine. The filename
    /// must carry exactly the `.xml` extension; nothing reaches the engine
    /// otherwise.
    pub fn save(&self, ctx: &UserCtx, fields: &Fields) -> Result<EditorResponse, EditorError> {
        let filename =
            field(fields, "_xml_filename").ok_or(EditorError::MissingParameter("No filename given"))?;
        match extension(filename) {
            None => return Err(EditorError::MissingExtension),
            Some(".xml") => {}
            Some(ext) => return Err(EditorError::WrongExtension(ext.to_string())),
        }

        let absolute = resolve_under_root(&ctx.root, filename)?;
        let body: Fields = fields
            .iter()
            .filter(|(key, _)| key != "_xml_filename")
            .cloned()
            .collect();
        self.engine
            .update(&absolute, &body, self.config.pre_write_transform.as_deref())
            .map_err(|err| {
                tracing::error!(filename, error = %err, "update failed");
                engine_failure(filename, err)
            })?;
        Ok(EditorResponse::Updated {
            msg: "File updated".to_string(),
        })
    }

    /// Write raw text. `.xml` content must round-trip through the full
    /// document model first; other extensions are written as-is. The
    /// commit flag swaps the acknowledgment for a commit-message prompt.
    pub fn save_text(
        &self,
        ctx: &UserCtx,
        filename: Option<&str>,
        filecontent: Option<&str>,
        commit: bool,
    ) -> Result<EditorResponse, EditorError> {
        let (filename, content) = match (nonempty(filename), nonempty(filecontent)) {
            (Some(f), Some(c)) => (f, c),
            _ => return Err(EditorError::MissingParameter("Missing parameters!")),
        };
        let absolute = resolve_under_root(&ctx.root, filename)?;

        let output = if extension(filename) == Some(".xml") {
            self.engine.load_string(content).map_err(|err| {
                tracing::error!(filename, error = %err, "content does not validate");
                engine_failure(filename, err)
            })?;
            match &self.config.pre_write_transform {
                Some(transform) => transform(content),
                None => content.to_string(),
            }
        } else {
            content.to_string()
        };

        self.fs.write(&absolute, &output).map_err(|err| {
            tracing::error!(filename, error = %err, "write failed");
            EditorError::Internal(err.to_string())
        })?;

        if commit {
            Ok(EditorResponse::Modal {
                modal: fragments::commit_modal(),
            })
        } else {
            Ok(EditorResponse::Updated {
                msg: "File updated".to_string(),
            })
        }
    }

    /// Default data for a new sub-element. Plugins get first refusal, in
    /// registration order.
    pub fn add_element(
        &self,
        elt_id: Option<&str>,
        dtd_url: Option<&str>,
        fields: &Fields,
    ) -> Result<EditorResponse, EditorError> {
        let (elt_id, url) = match (nonempty(elt_id), nonempty(dtd_url)) {
            (Some(e), Some(u)) => (e, u),
            _ => return Err(EditorError::BadParameter),
        };

        if let Some(result) = plugins::dispatch(&self.config.plugins, elt_id, url, fields) {
            return result.map(EditorResponse::Element);
        }

        let data = self
            .engine
            .default_element_data(elt_id, url)
            .map_err(|err| {
                tracing::error!(elt_id, url, error = %err, "element data failed");
                engine_failure(url, err)
            })?;
        Ok(EditorResponse::Element(data))
    }

    /// Serialize the posted sub-tree to the clipboard temp file. The
    /// returned entry replaces whatever the session held before.
    pub fn copy_element(
        &self,
        elt_id: Option<&str>,
        fields: &Fields,
    ) -> Result<(ClipboardEntry, EditorResponse), EditorError> {
        let elt_id = nonempty(elt_id).ok_or(EditorError::BadParameter)?;
        let data = self.engine.element_data(elt_id, fields);
        let entry = clipboard::store(elt_id, &data)?;
        Ok((
            entry,
            EditorResponse::Info {
                info_msg: "Copied".to_string(),
            },
        ))
    }

    /// Merge the session clipboard into the target element. Attributes and
    /// comments from the source are always discarded.
    pub fn paste_element(
        &self,
        elt_id: Option<&str>,
        dtd_url: Option<&str>,
        fields: &Fields,
        entry: Option<&ClipboardEntry>,
    ) -> Result<EditorResponse, EditorError> {
        let (elt_id, url) = match (nonempty(elt_id), nonempty(dtd_url)) {
            (Some(e), Some(u)) => (e, u),
            _ => return Err(EditorError::BadParameter),
        };
        let entry = entry.ok_or(EditorError::EmptyClipboard)?;
        let data = clipboard::read(entry)?;

        let merged = self
            .engine
            .paste_data(elt_id, fields, &data, url, true)
            .map_err(|err| {
                tracing::error!(elt_id, url, error = %err, "paste failed");
                engine_failure(url, err)
            })?;
        match merged {
            Some(value) => Ok(EditorResponse::Element(value)),
            None => Err(EditorError::NotPasteable),
        }
    }

    /// Pure rendering call.
    pub fn comment_modal(&self, comment: Option<&str>) -> EditorResponse {
        EditorResponse::Content {
            content: fragments::comment_modal(comment.unwrap_or("")),
        }
    }
}
