//! # Xmlwright Editor
//!
//! Server-side view layer of the XML editor: validates request inputs,
//! delegates to the external XML tooling engine, and shapes the results
//! into the JSON bodies the front end consumes.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ workspace: HTTP routing + sessions          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorService                       │
//! │  - validate request parameters              │
//! │  - resolve paths under the user root        │
//! │  - map engine failures to the error         │
//! │    vocabulary                               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ engine (external): DTD + document model     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The engine is consumed through the [`XmlEngine`] trait; the tooling
//! library behind it is not part of this repository.

mod clipboard;
mod config;
mod engine;
mod errors;
mod fragments;
mod plugins;
mod response;
mod service;

pub use clipboard::ClipboardEntry;
pub use config::{EditorConfig, PreWriteTransform, RenderStrategy};
pub use engine::{
    DtdMapping, ElementKind, EngineError, Fields, FormAttrs, InMemoryEngine, RenderMode,
    XmlDocument, XmlEngine,
};
pub use errors::EditorError;
pub use fragments::escape;
pub use plugins::Plugin;
pub use response::EditorResponse;
pub use service::{EditorService, Routes, UserCtx};
