//! Headless rendering engine
//!
//! Implements the collaborator contract without a browser: readiness means
//! the ZIP/OPF structure validated, and a rendition pages through the linear
//! spine one spread at a time. Used by the CLI and by non-browser hosts.

use futures::future;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{DocumentHandle, EngineError, EngineFuture, Location, LocationPoint, RenderingEngine, Rendition};
use crate::config::{LayoutConfig, SpreadMode};
use crate::epub::{looks_like_zip, EpubBook, EpubError};
use crate::theme::Theme;

impl From<EpubError> for EngineError {
    fn from(e: EpubError) -> Self {
        EngineError::Malformed(e.to_string())
    }
}

/// Display area for a headless rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
}

impl Viewport {
    pub fn new(width: u32) -> Self {
        Self { width }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveEngine;

impl ArchiveEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RenderingEngine for ArchiveEngine {
    type Container = Viewport;
    type Document = ArchiveDocument;

    fn parse(&self, bytes: Vec<u8>) -> Result<ArchiveDocument, EngineError> {
        if !looks_like_zip(&bytes) {
            return Err(EngineError::Malformed("Not a ZIP archive".to_string()));
        }
        Ok(ArchiveDocument {
            state: Rc::new(RefCell::new(DocumentState::Pending(bytes))),
        })
    }
}

enum DocumentState {
    Pending(Vec<u8>),
    Ready(Rc<EpubBook>),
    Failed(String),
    Destroyed,
}

/// Document handle over an in-memory archive
pub struct ArchiveDocument {
    state: Rc<RefCell<DocumentState>>,
}

impl ArchiveDocument {
    pub fn is_destroyed(&self) -> bool {
        matches!(*self.state.borrow(), DocumentState::Destroyed)
    }

    /// Validated book, once ready
    pub fn book(&self) -> Option<Rc<EpubBook>> {
        match &*self.state.borrow() {
            DocumentState::Ready(book) => Some(Rc::clone(book)),
            _ => None,
        }
    }
}

impl DocumentHandle for ArchiveDocument {
    type Container = Viewport;
    type Rendition = ArchiveRendition;

    fn ready(&self) -> EngineFuture {
        let state = Rc::clone(&self.state);
        Box::pin(async move {
            let mut state = state.borrow_mut();
            let outcome = match &*state {
                DocumentState::Pending(bytes) => EpubBook::from_bytes(bytes)
                    .map(Rc::new)
                    .map_err(|e| e.to_string()),
                DocumentState::Ready(book) => Ok(Rc::clone(book)),
                DocumentState::Failed(reason) => Err(reason.clone()),
                DocumentState::Destroyed => return Err(EngineError::Destroyed),
            };
            match outcome {
                Ok(book) => {
                    tracing::debug!(title = %book.title, spine = book.spine.len(), "Archive validated");
                    *state = DocumentState::Ready(book);
                    Ok(())
                }
                Err(reason) => {
                    *state = DocumentState::Failed(reason.clone());
                    Err(EngineError::Malformed(reason))
                }
            }
        })
    }

    fn render_to(
        &self,
        container: &Viewport,
        layout: &LayoutConfig,
    ) -> Result<ArchiveRendition, EngineError> {
        let book = match &*self.state.borrow() {
            DocumentState::Ready(book) => Rc::clone(book),
            DocumentState::Destroyed => return Err(EngineError::Destroyed),
            _ => return Err(EngineError::Render("Document is not ready".to_string())),
        };

        let pages: Vec<(usize, String)> = book
            .linear_spine()
            .map(|(index, item)| (index, item.href.clone()))
            .collect();
        if pages.is_empty() {
            return Err(EngineError::Render("No linear spine items".to_string()));
        }

        let per_spread = pages_per_spread(container, layout);
        tracing::debug!(width = container.width, per_spread, "Headless rendition created");

        Ok(ArchiveRendition {
            pages: Rc::new(pages),
            per_spread,
            position: Rc::new(Cell::new(None)),
            themes: RefCell::new(HashMap::new()),
            selected_theme: RefCell::new(None),
        })
    }

    fn destroy(&mut self) {
        *self.state.borrow_mut() = DocumentState::Destroyed;
    }
}

fn pages_per_spread(container: &Viewport, layout: &LayoutConfig) -> usize {
    match layout.spread {
        SpreadMode::None => 1,
        SpreadMode::Always | SpreadMode::Auto if container.width >= layout.min_spread_width => 2,
        _ => 1,
    }
}

/// Spine-step CFI of a content document
fn spine_cfi(spine_index: usize) -> String {
    format!("epubcfi(/6/{})", (spine_index + 1) * 2)
}

/// Spread-at-a-time pagination over the linear spine
pub struct ArchiveRendition {
    /// (spine index, href) of every page
    pages: Rc<Vec<(usize, String)>>,
    per_spread: usize,
    /// First page of the displayed spread; `None` until `display`.
    position: Rc<Cell<Option<usize>>>,
    themes: RefCell<HashMap<String, Theme>>,
    selected_theme: RefCell<Option<String>>,
}

impl ArchiveRendition {
    pub fn pages_per_spread(&self) -> usize {
        self.per_spread
    }

    /// Theme applied to the content, if one was registered and selected
    pub fn active_theme(&self) -> Option<Theme> {
        let selected = self.selected_theme.borrow();
        let name = selected.as_ref()?;
        self.themes.borrow().get(name).cloned()
    }

    fn last_spread_start(&self) -> usize {
        let last_page = self.pages.len() - 1;
        last_page - last_page % self.per_spread
    }

    fn turn(&self, forward: bool) -> EngineFuture {
        let Some(current) = self.position.get() else {
            return Box::pin(future::ready(Err(EngineError::Navigation(
                "Rendition not displayed".to_string(),
            ))));
        };
        let target = if forward {
            (current + self.per_spread).min(self.last_spread_start())
        } else {
            current.saturating_sub(self.per_spread)
        };
        self.position.set(Some(target));
        Box::pin(future::ready(Ok(())))
    }
}

impl Rendition for ArchiveRendition {
    fn register_theme(&self, theme: &Theme) {
        self.themes
            .borrow_mut()
            .insert(theme.name.clone(), theme.clone());
    }

    fn select_theme(&self, name: &str) {
        if !self.themes.borrow().contains_key(name) {
            tracing::warn!(theme = name, "Selecting unregistered theme");
        }
        *self.selected_theme.borrow_mut() = Some(name.to_string());
    }

    fn display(&self) -> EngineFuture {
        self.position.set(Some(0));
        Box::pin(future::ready(Ok(())))
    }

    fn prev(&self) -> EngineFuture {
        self.turn(false)
    }

    fn next(&self) -> EngineFuture {
        self.turn(true)
    }

    fn current_location(&self) -> Option<Location> {
        let start = self.position.get()?;
        let end = (start + self.per_spread - 1).min(self.pages.len() - 1);
        let point = |page: usize| {
            let (index, href) = &self.pages[page];
            LocationPoint {
                index: *index,
                href: href.clone(),
                cfi: Some(spine_cfi(*index)),
            }
        };
        Some(Location {
            start: point(start),
            end: point(end),
            at_start: start == 0,
            at_end: end == self.pages.len() - 1,
        })
    }

    fn destroy(&mut self) {
        self.position.set(None);
        self.themes.borrow_mut().clear();
    }
}
