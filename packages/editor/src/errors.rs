//! Error types for the editor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("{0}")]
    MissingParameter(&'static str),

    #[error("No filename extension. It should be '.xml'")]
    MissingExtension,

    #[error("Bad filename extension '{0}'. It should be '.xml'")]
    WrongExtension(String),

    #[error("The dtd of {0} can't be loaded.")]
    DtdLoad(String),

    #[error("Invalid dtd element: {tag} ({url})")]
    InvalidElement { tag: String, url: String },

    #[error("Can't create new XML")]
    Creation,

    #[error("Empty clipboard")]
    EmptyClipboard,

    #[error("The element can't be pasted here")]
    NotPasteable,

    #[error("Bad parameter")]
    BadParameter,

    #[error("{0}")]
    Internal(String),
}

impl EditorError {
    /// Whether the client caused this error (bad input) or the server did.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EditorError::DtdLoad(_) | EditorError::Internal(_))
    }
}

impl From<xmlwright_common::PathError> for EditorError {
    fn from(e: xmlwright_common::PathError) -> Self {
        EditorError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for EditorError {
    fn from(e: std::io::Error) -> Self {
        EditorError::Internal(e.to_string())
    }
}
