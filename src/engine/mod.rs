//! Rendering collaborator contract
//!
//! The session never parses or paginates EPUB content itself. It drives an
//! engine through these traits: parse bytes into a document, await the
//! document's readiness, bind it to a container, theme it, and turn pages.
//!
//! Futures returned here behave like JS promises: the work is started by
//! the call, and the future only reports completion. Dropping one does not
//! cancel the operation.

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LayoutConfig;
use crate::theme::Theme;

pub mod archive;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Malformed EPUB: {0}")]
    Malformed(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Document already destroyed")]
    Destroyed,
}

/// Completion of an engine operation.
pub type EngineFuture = LocalBoxFuture<'static, Result<(), EngineError>>;

/// Entry point of a rendering engine.
pub trait RenderingEngine {
    /// Region a rendition is drawn into.
    type Container;
    type Document: DocumentHandle<Container = Self::Container>;

    /// Construct a document from raw bytes. Fails only on gross malformation;
    /// structural validation is reported through [`DocumentHandle::ready`].
    fn parse(&self, bytes: Vec<u8>) -> Result<Self::Document, EngineError>;
}

/// Parsed document owned by one session.
pub trait DocumentHandle {
    type Container;
    type Rendition: Rendition;

    /// Resolves once the container/package structure has been validated.
    fn ready(&self) -> EngineFuture;

    fn render_to(
        &self,
        container: &Self::Container,
        layout: &LayoutConfig,
    ) -> Result<Self::Rendition, EngineError>;

    /// Release the document's internal resources. Idempotent.
    fn destroy(&mut self);
}

/// Live pagination context bound to one document and one container.
pub trait Rendition {
    fn register_theme(&self, theme: &Theme);

    fn select_theme(&self, name: &str);

    /// Show the first page.
    fn display(&self) -> EngineFuture;

    fn prev(&self) -> EngineFuture;

    fn next(&self) -> EngineFuture;

    fn current_location(&self) -> Option<Location>;

    fn destroy(&mut self);
}

/// Where the rendition currently is, shaped like epub.js `currentLocation()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub start: LocationPoint,
    pub end: LocationPoint,
    #[serde(default)]
    pub at_start: bool,
    #[serde(default)]
    pub at_end: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    /// Spine index (0-based)
    pub index: usize,
    pub href: String,
    #[serde(default)]
    pub cfi: Option<String>,
}
