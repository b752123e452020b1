//! EPUB Spread Viewer
//!
//! Opens a user-selected EPUB and shows it as a paginated two-page spread:
//! - file validation and render session lifecycle ([`ReaderSession`])
//! - a rendering-engine contract, with epub.js bindings in the browser and
//!   a headless archive engine elsewhere
//! - keyboard and button navigation through a scoped subscription
//!
//! Parsing, pagination and layout belong to the rendering engine; this
//! crate only orchestrates it.

pub mod config;
pub mod engine;
pub mod epub;
pub mod error;
pub mod keyboard;
pub mod session;
pub mod source;
pub mod status;
pub mod theme;

#[cfg(target_arch = "wasm32")]
pub mod web;

// Re-export common types
pub use config::{LayoutConfig, ReaderConfig, TextDirection, ThemeConfig};
pub use engine::archive::{ArchiveEngine, Viewport};
pub use engine::{DocumentHandle, EngineError, Location, RenderingEngine, Rendition};
pub use error::SessionError;
pub use keyboard::{KeyboardInput, KeySubscription, NavKey};
pub use session::{Generation, ReaderSession};
pub use source::{ByteSource, MemorySource, SelectedFile};
pub use status::Status;
pub use theme::Theme;

#[cfg(not(target_arch = "wasm32"))]
pub use source::PathSource;

/// The only content type accepted for opening.
pub const EPUB_MIME_TYPE: &str = "application/epub+zip";
