//! Shared fixtures: a scripted rendering engine, a recording keyboard,
//! byte sources with controllable failures and in-memory EPUB archives.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::executor::LocalSpawner;
use futures::future;
use futures::task::LocalSpawnExt;
use std::cell::{Cell, RefCell};
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use epub_spread_viewer::engine::EngineFuture;
use epub_spread_viewer::keyboard::KeyHandler;
use epub_spread_viewer::{
    ByteSource, DocumentHandle, EngineError, KeySubscription, KeyboardInput, LayoutConfig,
    Location, NavKey, ReaderSession, RenderingEngine, Rendition, SessionError, Theme,
};

// ============================================================================
// Scripted engine
// ============================================================================

/// What the engine does with a given byte payload.
pub const REJECT: &[u8] = b"reject";
pub const CORRUPT: &[u8] = b"corrupt";
pub const HOLD: &[u8] = b"hold";
pub const VALID: &[u8] = b"valid";
/// Valid, but the first `display()` stays pending until `settle_display`.
pub const SLOW_DISPLAY: &[u8] = b"slow-display";

/// Pages in every scripted book; two per spread.
pub const SCRIPTED_PAGES: usize = 10;

#[derive(Default)]
pub struct EngineLog {
    pub events: RefCell<Vec<&'static str>>,
    pub parsed: Cell<usize>,
    pub live_documents: Cell<usize>,
    pub live_renditions: Cell<usize>,
    pub containers: RefCell<Vec<String>>,
    pub layouts: RefCell<Vec<LayoutConfig>>,
    pub themes: RefCell<Vec<Theme>>,
    pub selected_themes: RefCell<Vec<String>>,
    pub turns: RefCell<Vec<NavKey>>,
    pending: RefCell<Vec<oneshot::Sender<Result<(), EngineError>>>>,
    pending_displays: RefCell<Vec<oneshot::Sender<Result<(), EngineError>>>>,
}

impl EngineLog {
    fn event(&self, name: &'static str) {
        self.events.borrow_mut().push(name);
    }

    /// Settle the oldest held readiness check.
    pub fn settle_next(&self, outcome: Result<(), EngineError>) {
        let sender = self.pending.borrow_mut().remove(0);
        let _ = sender.send(outcome);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Settle the oldest held `display()`.
    pub fn settle_display(&self, outcome: Result<(), EngineError>) {
        let sender = self.pending_displays.borrow_mut().remove(0);
        let _ = sender.send(outcome);
    }

    pub fn pending_display_count(&self) -> usize {
        self.pending_displays.borrow().len()
    }
}

#[derive(Clone, Default)]
pub struct ScriptedEngine {
    pub log: Rc<EngineLog>,
}

impl RenderingEngine for ScriptedEngine {
    type Container = String;
    type Document = ScriptedDocument;

    fn parse(&self, bytes: Vec<u8>) -> Result<ScriptedDocument, EngineError> {
        self.log.event("parse");
        if bytes == REJECT {
            return Err(EngineError::Malformed("not an archive".to_string()));
        }
        self.log.parsed.set(self.log.parsed.get() + 1);
        self.log.live_documents.set(self.log.live_documents.get() + 1);
        Ok(ScriptedDocument {
            log: Rc::clone(&self.log),
            bytes,
            destroyed: false,
        })
    }
}

pub struct ScriptedDocument {
    log: Rc<EngineLog>,
    bytes: Vec<u8>,
    destroyed: bool,
}

impl DocumentHandle for ScriptedDocument {
    type Container = String;
    type Rendition = ScriptedRendition;

    fn ready(&self) -> EngineFuture {
        if self.bytes == CORRUPT {
            return Box::pin(future::ready(Err(EngineError::Malformed(
                "missing container.xml".to_string(),
            ))));
        }
        if self.bytes == HOLD {
            let (tx, rx) = oneshot::channel();
            self.log.pending.borrow_mut().push(tx);
            return Box::pin(async move { rx.await.unwrap_or(Err(EngineError::Destroyed)) });
        }
        Box::pin(future::ready(Ok(())))
    }

    fn render_to(
        &self,
        container: &String,
        layout: &LayoutConfig,
    ) -> Result<ScriptedRendition, EngineError> {
        assert!(!self.destroyed, "render_to on a destroyed document");
        self.log.event("render_to");
        self.log.containers.borrow_mut().push(container.clone());
        self.log.layouts.borrow_mut().push(layout.clone());
        self.log.live_renditions.set(self.log.live_renditions.get() + 1);
        Ok(ScriptedRendition {
            log: Rc::clone(&self.log),
            spread: Cell::new(None),
            hold_display: self.bytes == SLOW_DISPLAY,
            destroyed: false,
        })
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.log.event("document.destroy");
            self.log.live_documents.set(self.log.live_documents.get() - 1);
        }
    }
}

pub struct ScriptedRendition {
    log: Rc<EngineLog>,
    spread: Cell<Option<usize>>,
    hold_display: bool,
    destroyed: bool,
}

impl Rendition for ScriptedRendition {
    fn register_theme(&self, theme: &Theme) {
        self.log.themes.borrow_mut().push(theme.clone());
    }

    fn select_theme(&self, name: &str) {
        self.log.selected_themes.borrow_mut().push(name.to_string());
    }

    fn display(&self) -> EngineFuture {
        self.log.event("display");
        self.spread.set(Some(0));
        if self.hold_display {
            let (tx, rx) = oneshot::channel();
            self.log.pending_displays.borrow_mut().push(tx);
            return Box::pin(async move { rx.await.unwrap_or(Err(EngineError::Destroyed)) });
        }
        Box::pin(future::ready(Ok(())))
    }

    fn prev(&self) -> EngineFuture {
        self.log.turns.borrow_mut().push(NavKey::Previous);
        if let Some(spread) = self.spread.get() {
            self.spread.set(Some(spread.saturating_sub(1)));
        }
        Box::pin(future::ready(Ok(())))
    }

    fn next(&self) -> EngineFuture {
        self.log.turns.borrow_mut().push(NavKey::Next);
        if let Some(spread) = self.spread.get() {
            self.spread.set(Some((spread + 1).min(SCRIPTED_PAGES / 2 - 1)));
        }
        Box::pin(future::ready(Ok(())))
    }

    fn current_location(&self) -> Option<Location> {
        let spread = self.spread.get()?;
        let point = |index: usize| epub_spread_viewer::engine::LocationPoint {
            index,
            href: format!("page{}.xhtml", index),
            cfi: None,
        };
        Some(Location {
            start: point(spread * 2),
            end: point(spread * 2 + 1),
            at_start: spread == 0,
            at_end: spread == SCRIPTED_PAGES / 2 - 1,
        })
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.log.event("rendition.destroy");
            self.log.live_renditions.set(self.log.live_renditions.get() - 1);
        }
    }
}

// ============================================================================
// Keyboard
// ============================================================================

#[derive(Default)]
pub struct KeyboardLog {
    handlers: RefCell<Vec<(u64, KeyHandler)>>,
    next_id: Cell<u64>,
    pub subscribed: Cell<usize>,
    pub cancelled: Cell<usize>,
}

/// Keyboard host that delivers keys on demand.
#[derive(Clone, Default)]
pub struct RecordingKeyboard {
    pub log: Rc<KeyboardLog>,
}

impl RecordingKeyboard {
    pub fn press(&self, key: &str) {
        let Some(key) = NavKey::from_key(key) else {
            return;
        };
        let handlers: Vec<KeyHandler> = self
            .log
            .handlers
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect();
        for handler in handlers {
            handler(key);
        }
    }

    pub fn active(&self) -> usize {
        self.log.handlers.borrow().len()
    }
}

impl KeyboardInput for RecordingKeyboard {
    fn subscribe(&self, handler: KeyHandler) -> Box<dyn KeySubscription> {
        let id = self.log.next_id.get();
        self.log.next_id.set(id + 1);
        self.log.handlers.borrow_mut().push((id, handler));
        self.log.subscribed.set(self.log.subscribed.get() + 1);
        Box::new(RecordedSubscription {
            id,
            log: Rc::clone(&self.log),
        })
    }
}

struct RecordedSubscription {
    id: u64,
    log: Rc<KeyboardLog>,
}

impl KeySubscription for RecordedSubscription {
    fn cancel(self: Box<Self>) {
        self.log.handlers.borrow_mut().retain(|(id, _)| *id != self.id);
        self.log.cancelled.set(self.log.cancelled.get() + 1);
    }
}

// ============================================================================
// Byte sources
// ============================================================================

/// In-memory bytes that count how often they were read.
pub struct CountingSource {
    data: Vec<u8>,
    pub reads: Rc<Cell<usize>>,
}

impl CountingSource {
    pub fn new(data: &[u8]) -> (Self, Rc<Cell<usize>>) {
        let reads = Rc::new(Cell::new(0));
        (
            Self {
                data: data.to_vec(),
                reads: Rc::clone(&reads),
            },
            reads,
        )
    }
}

#[async_trait(?Send)]
impl ByteSource for CountingSource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.data.clone())
    }
}

pub struct FailingSource;

#[async_trait(?Send)]
impl ByteSource for FailingSource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "file is locked"))
    }
}

/// Bytes released only when the paired sender fires.
pub struct GatedSource {
    data: Vec<u8>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl GatedSource {
    pub fn new(data: &[u8]) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                data: data.to_vec(),
                gate: RefCell::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait(?Send)]
impl ByteSource for GatedSource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self.data.clone())
    }
}

// ============================================================================
// Driving attempts concurrently
// ============================================================================

pub type OpenSlot = Rc<RefCell<Option<Result<(), SessionError>>>>;

/// Start an open attempt on the pool; its result lands in the returned slot.
pub fn spawn_open<E>(spawner: &LocalSpawner, session: &ReaderSession<E>, container: E::Container) -> OpenSlot
where
    E: RenderingEngine + 'static,
    E::Container: 'static,
{
    let slot: OpenSlot = Rc::new(RefCell::new(None));
    let session = session.clone();
    let out = Rc::clone(&slot);
    spawner
        .spawn_local(async move {
            let result = session.begin_validation_and_render(&container).await;
            *out.borrow_mut() = Some(result);
        })
        .expect("spawn open attempt");
    slot
}

// ============================================================================
// EPUB archives
// ============================================================================

const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn package_document(chapters: usize, with_cover: bool) -> String {
    let mut manifest = String::new();
    let mut spine = String::new();
    if with_cover {
        manifest.push_str(r#"<item id="cover" href="cover.xhtml" media-type="application/xhtml+xml"/>"#);
        spine.push_str(r#"<itemref idref="cover" linear="no"/>"#);
    }
    for n in 1..=chapters {
        manifest.push_str(&format!(
            r#"<item id="ch{n}" href="text/ch{n}.xhtml" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{n}"/>"#));
    }
    format!(
        r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture Book</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
    )
}

fn zip_entries(entries: &[(String, String)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, body) in entries {
        writer.start_file(name.as_str(), options).expect("start zip entry");
        writer.write_all(body.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn book_entries(chapters: usize, with_cover: bool) -> Vec<(String, String)> {
    let mut entries = vec![
        ("mimetype".to_string(), "application/epub+zip".to_string()),
        ("META-INF/container.xml".to_string(), CONTAINER_XML.to_string()),
        ("OEBPS/content.opf".to_string(), package_document(chapters, with_cover)),
    ];
    if with_cover {
        entries.push(("OEBPS/cover.xhtml".to_string(), "<html/>".to_string()));
    }
    for n in 1..=chapters {
        entries.push((
            format!("OEBPS/text/ch{n}.xhtml"),
            format!("<html><body><p>Chapter {n}</p></body></html>"),
        ));
    }
    entries
}

/// Well-formed EPUB with `chapters` linear spine items.
pub fn epub_bytes(chapters: usize) -> Vec<u8> {
    zip_entries(&book_entries(chapters, false))
}

/// Well-formed EPUB whose first spine item is a non-linear cover.
pub fn epub_with_cover(chapters: usize) -> Vec<u8> {
    zip_entries(&book_entries(chapters, true))
}

/// Valid ZIP whose container.xml is missing.
pub fn epub_without_container(chapters: usize) -> Vec<u8> {
    let entries: Vec<_> = book_entries(chapters, false)
        .into_iter()
        .filter(|(name, _)| name != "META-INF/container.xml")
        .collect();
    zip_entries(&entries)
}

/// ZIP signature followed by a truncated archive.
pub fn truncated_epub() -> Vec<u8> {
    let mut bytes = epub_bytes(3);
    bytes.truncate(bytes.len() / 3);
    bytes
}
