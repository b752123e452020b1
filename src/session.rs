//! Reader session controller
//!
//! Owns the selected file, the document handle, the rendition bound to it
//! and the status shown to the user. Everything runs on one thread; the
//! byte read, readiness check and page turns are suspension points.
//!
//! Open attempts supersede each other: every `begin_validation_and_render`
//! and every `teardown` takes a new [`Generation`]. A continuation resuming
//! with an older generation releases whatever it constructed and returns
//! [`SessionError::Superseded`] without touching session state.

use futures::future::{self, LocalBoxFuture};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::ReaderConfig;
use crate::engine::{DocumentHandle, Location, RenderingEngine, Rendition};
use crate::error::SessionError;
use crate::keyboard::{KeyHandler, KeySubscription, KeyboardInput, NavKey};
use crate::source::SelectedFile;
use crate::status::Status;
use crate::theme::Theme;
use crate::EPUB_MIME_TYPE;

type RenditionOf<E> = <<E as RenderingEngine>::Document as DocumentHandle>::Rendition;

type StatusObserver = Rc<dyn Fn(Status)>;

/// Token identifying one open attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct LiveDocument<D> {
    generation: Generation,
    handle: D,
}

struct SessionState<E: RenderingEngine> {
    file: Option<SelectedFile>,
    status: Status,
    generation: Generation,
    document: Option<LiveDocument<E::Document>>,
    /// Only ever present alongside the document it was bound to.
    rendition: Option<RenditionOf<E>>,
    keys: Option<Box<dyn KeySubscription>>,
}

struct Inner<E: RenderingEngine> {
    engine: E,
    config: ReaderConfig,
    theme: Theme,
    keyboard: Option<Box<dyn KeyboardInput>>,
    state: RefCell<SessionState<E>>,
    observer: RefCell<Option<StatusObserver>>,
}

/// Handle to a reader session. Clones share the same session.
pub struct ReaderSession<E: RenderingEngine> {
    inner: Rc<Inner<E>>,
}

impl<E: RenderingEngine> Clone for ReaderSession<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: RenderingEngine + 'static> ReaderSession<E> {
    pub fn new(engine: E, config: ReaderConfig) -> Self {
        Self::build(engine, config, None)
    }

    /// Session that also pages on arrow keys while a book is rendered.
    pub fn with_keyboard(
        engine: E,
        config: ReaderConfig,
        keyboard: impl KeyboardInput + 'static,
    ) -> Self {
        Self::build(engine, config, Some(Box::new(keyboard)))
    }

    fn build(engine: E, config: ReaderConfig, keyboard: Option<Box<dyn KeyboardInput>>) -> Self {
        let theme = Theme::from(&config.theme);
        Self {
            inner: Rc::new(Inner {
                engine,
                config,
                theme,
                keyboard,
                state: RefCell::new(SessionState {
                    file: None,
                    status: Status::Idle,
                    generation: Generation::default(),
                    document: None,
                    rendition: None,
                    keys: None,
                }),
                observer: RefCell::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.inner.config
    }

    pub fn status(&self) -> Status {
        self.inner.state.borrow().status
    }

    pub fn status_message(&self) -> String {
        let state = self.inner.state.borrow();
        state
            .status
            .message(state.file.as_ref().map(SelectedFile::name))
    }

    pub fn selected_file_name(&self) -> Option<String> {
        let state = self.inner.state.borrow();
        state.file.as_ref().map(|file| file.name().to_string())
    }

    /// Whether Previous/Next do anything right now.
    pub fn can_navigate(&self) -> bool {
        self.inner.state.borrow().rendition.is_some()
    }

    pub fn has_document(&self) -> bool {
        self.inner.state.borrow().document.is_some()
    }

    pub fn generation(&self) -> Generation {
        self.inner.state.borrow().generation
    }

    pub fn current_location(&self) -> Option<Location> {
        let state = self.inner.state.borrow();
        state.rendition.as_ref().and_then(|r| r.current_location())
    }

    /// Called after every status transition, outside any internal borrow.
    pub fn on_status_change(&self, observer: impl Fn(Status) + 'static) {
        *self.inner.observer.borrow_mut() = Some(Rc::new(observer));
    }

    /// Replace the file slot. Leaves any loaded document alone.
    pub fn select_file(&self, file: SelectedFile) {
        tracing::info!(
            file_name = %file.name(),
            declared_type = %file.declared_type(),
            "File selected"
        );
        self.inner.state.borrow_mut().file = Some(file);
        self.set_status(Status::FileSelected);
    }

    /// Validate the selected file and, if it is a readable EPUB, render its
    /// first spread into `container`.
    pub async fn begin_validation_and_render(
        &self,
        container: &E::Container,
    ) -> Result<(), SessionError> {
        let attempt = {
            let mut state = self.inner.state.borrow_mut();
            match state.file.clone() {
                Some(file) => {
                    state.generation = state.generation.next();
                    Some((file, state.generation))
                }
                None => None,
            }
        };
        let Some((file, generation)) = attempt else {
            tracing::warn!("Open requested with no file selected");
            self.set_status(Status::ErrorNoFileSelected);
            return Err(SessionError::NoFileSelected);
        };

        if file.declared_type() != EPUB_MIME_TYPE {
            tracing::warn!(
                %generation,
                file_name = %file.name(),
                declared_type = %file.declared_type(),
                "Rejected non-EPUB file"
            );
            self.set_status(Status::ErrorInvalidFormat);
            return Err(SessionError::InvalidFormat {
                declared_type: file.declared_type().to_string(),
            });
        }

        self.set_status(Status::Validating);
        tracing::debug!(%generation, file_name = %file.name(), "Reading file");

        let read = file.source().read_bytes().await;
        if !self.is_current(generation) {
            tracing::warn!(%generation, "Superseded during file read");
            return Err(SessionError::Superseded);
        }
        let bytes = match read {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(%generation, error = %e, "Failed to read file");
                self.set_status(Status::ErrorReadFailure);
                return Err(SessionError::ReadFailure(e));
            }
        };

        // At most one live document: the previous one goes before the next exists.
        self.release_resources();

        let document = match self.inner.engine.parse(bytes) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(%generation, error = %e, "Engine rejected file");
                self.set_status(Status::ErrorCorruptFile);
                return Err(SessionError::CorruptFile(e));
            }
        };
        let ready = document.ready();
        self.inner.state.borrow_mut().document = Some(LiveDocument {
            generation,
            handle: document,
        });

        let readiness = ready.await;
        if !self.is_current(generation) {
            tracing::warn!(%generation, "Superseded while awaiting readiness");
            self.release_stale_document(generation);
            return Err(SessionError::Superseded);
        }
        if let Err(e) = readiness {
            tracing::error!(%generation, error = %e, "Error loading EPUB file");
            self.release_resources();
            self.set_status(Status::ErrorCorruptFile);
            return Err(SessionError::CorruptFile(e));
        }

        tracing::debug!(%generation, "File is a valid EPUB file");

        let bound = {
            let mut guard = self.inner.state.borrow_mut();
            let state = &mut *guard;
            let Some(live) = state.document.as_ref() else {
                return Err(SessionError::Superseded);
            };
            match live.handle.render_to(container, &self.inner.config.layout) {
                Ok(rendition) => {
                    rendition.register_theme(&self.inner.theme);
                    rendition.select_theme(&self.inner.theme.name);
                    let display = rendition.display();
                    state.rendition = Some(rendition);
                    Ok(display)
                }
                Err(e) => Err(e),
            }
        };
        let display = match bound {
            Ok(display) => display,
            Err(e) => {
                tracing::error!(%generation, error = %e, "Failed to bind rendition");
                self.release_resources();
                self.set_status(Status::ErrorCorruptFile);
                return Err(SessionError::CorruptFile(e));
            }
        };

        self.subscribe_keys();
        // Observers of `Success` see a live binding.
        self.set_status(Status::Success);

        if let Err(e) = display.await {
            tracing::warn!(%generation, error = %e, "Failed to display first page");
        }
        if !self.is_current(generation) {
            tracing::warn!(%generation, "Superseded while displaying first page");
            return Err(SessionError::Superseded);
        }
        tracing::info!(%generation, file_name = %file.name(), "EPUB content rendered");
        Ok(())
    }

    /// Turn back one spread. No-op without a rendition.
    pub fn navigate_previous(&self) -> LocalBoxFuture<'static, ()> {
        self.turn_page(NavKey::Previous)
    }

    /// Turn forward one spread. No-op without a rendition.
    pub fn navigate_next(&self) -> LocalBoxFuture<'static, ()> {
        self.turn_page(NavKey::Next)
    }

    /// Release the rendition, then the document, and return to `Idle`.
    /// Safe to call at any time, including with nothing loaded.
    pub fn teardown(&self) {
        let previous = {
            let mut state = self.inner.state.borrow_mut();
            state.generation = state.generation.next();
            state.file = None;
            state.status
        };
        self.release_resources();
        if previous != Status::Idle {
            tracing::debug!("Session torn down");
            self.set_status(Status::Idle);
        }
    }

    fn turn_page(&self, key: NavKey) -> LocalBoxFuture<'static, ()> {
        let turn = {
            let Ok(state) = self.inner.state.try_borrow() else {
                return Box::pin(future::ready(()));
            };
            state.rendition.as_ref().map(|rendition| match key {
                NavKey::Previous => rendition.prev(),
                NavKey::Next => rendition.next(),
            })
        };
        match turn {
            Some(turn) => Box::pin(async move {
                if let Err(e) = turn.await {
                    tracing::warn!(?key, error = %e, "Page turn failed");
                }
            }),
            None => Box::pin(future::ready(())),
        }
    }

    fn subscribe_keys(&self) {
        let Some(keyboard) = self.inner.keyboard.as_ref() else {
            return;
        };
        let session: Weak<Inner<E>> = Rc::downgrade(&self.inner);
        let handler: KeyHandler = Rc::new(move |key| {
            if let Some(inner) = session.upgrade() {
                // The turn starts immediately; its completion is not awaited.
                drop(ReaderSession { inner }.turn_page(key));
            }
        });
        let subscription = keyboard.subscribe(handler);
        let stale = self.inner.state.borrow_mut().keys.replace(subscription);
        if let Some(stale) = stale {
            stale.cancel();
        }
    }

    fn is_current(&self, generation: Generation) -> bool {
        self.inner.state.borrow().generation == generation
    }

    /// Destroy the document constructed by `generation` if it is still held.
    fn release_stale_document(&self, generation: Generation) {
        let stale = {
            let mut state = self.inner.state.borrow_mut();
            match &state.document {
                Some(live) if live.generation == generation => state.document.take(),
                _ => None,
            }
        };
        if let Some(mut live) = stale {
            live.handle.destroy();
        }
    }

    fn release_resources(&self) {
        let (keys, rendition, document) = {
            let mut state = self.inner.state.borrow_mut();
            (state.keys.take(), state.rendition.take(), state.document.take())
        };
        if let Some(keys) = keys {
            keys.cancel();
        }
        if let Some(mut rendition) = rendition {
            rendition.destroy();
        }
        if let Some(mut live) = document {
            tracing::debug!(generation = %live.generation, "Releasing document");
            live.handle.destroy();
        }
    }

    fn set_status(&self, status: Status) {
        self.inner.state.borrow_mut().status = status;
        let observer = self.inner.observer.borrow().clone();
        if let Some(observer) = observer {
            observer(status);
        }
    }
}

impl<E: RenderingEngine> Drop for Inner<E> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(keys) = state.keys.take() {
            keys.cancel();
        }
        if let Some(mut rendition) = state.rendition.take() {
            rendition.destroy();
        }
        if let Some(mut live) = state.document.take() {
            live.handle.destroy();
        }
    }
}
