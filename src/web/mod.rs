//! Browser façade
//!
//! `WebReader` wires a [`ReaderSession`] to epub.js, a picked `File`, the
//! page's `keyup` events and a container element.
//!
//! ```javascript
//! import init, { WebReader } from 'epub-spread-viewer';
//!
//! await init();
//! const reader = new WebReader(document.getElementById('viewer'), { theme: { direction: 'rtl' } });
//! reader.onStatusChange(() => { statusEl.textContent = reader.statusMessage(); });
//! input.addEventListener('change', (e) => reader.selectFile(e.target.files[0]));
//! const outcome = await reader.open();
//! ```

use js_sys::{Function, Promise};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::Element;

mod epubjs;
mod file;
mod keyboard;

pub use epubjs::EpubJsEngine;
pub use file::FileSource;
pub use keyboard::DocumentKeyboard;

use crate::config::{ReaderConfig, ThemeConfig};
use crate::session::ReaderSession;
use crate::source::SelectedFile;

const FONT_LINK_ID: &str = "epub-spread-viewer-font";

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in debug mode
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Result of `open()`. Failures resolve rather than reject.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenOutcome {
    ok: bool,
    error: Option<&'static str>,
    message: String,
}

#[wasm_bindgen]
pub struct WebReader {
    session: ReaderSession<EpubJsEngine>,
    container: Element,
}

#[wasm_bindgen]
impl WebReader {
    /// `config` may be `undefined` or a partial `ReaderConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(container: Element, config: JsValue) -> Result<WebReader, JsValue> {
        let config: ReaderConfig = if config.is_undefined() || config.is_null() {
            ReaderConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&e.to_string()))?
        };

        let session = match DocumentKeyboard::for_document() {
            Some(keyboard) => ReaderSession::with_keyboard(EpubJsEngine, config, keyboard),
            None => ReaderSession::new(EpubJsEngine, config),
        };
        Ok(Self { session, container })
    }

    #[wasm_bindgen(js_name = "selectFile")]
    pub fn select_file(&self, file: web_sys::File) {
        let name = file.name();
        let declared_type = file.type_();
        self.session
            .select_file(SelectedFile::new(name, declared_type, FileSource::new(file)));
    }

    /// Validate the selected file and render it. Resolves to
    /// `{ ok, error, message }`.
    pub fn open(&self) -> Promise {
        let session = self.session.clone();
        let container = self.container.clone();
        future_to_promise(async move {
            let result = session.begin_validation_and_render(&container).await;
            let outcome = match result {
                Ok(()) => {
                    inject_font_stylesheet(&session.config().theme);
                    OpenOutcome {
                        ok: true,
                        error: None,
                        message: session.status_message(),
                    }
                }
                Err(e) => {
                    web_sys::console::error_1(&format!("[EPUB] {}", e).into());
                    OpenOutcome {
                        ok: false,
                        error: Some(e.code()),
                        message: session.status_message(),
                    }
                }
            };
            serde_wasm_bindgen::to_value(&outcome).map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    pub fn prev(&self) -> Promise {
        let turn = self.session.navigate_previous();
        future_to_promise(async move {
            turn.await;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn next(&self) -> Promise {
        let turn = self.session.navigate_next();
        future_to_promise(async move {
            turn.await;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Release the rendition and book and remove the key listener.
    pub fn teardown(&self) {
        self.session.teardown();
    }

    pub fn status(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.status())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = "statusMessage")]
    pub fn status_message(&self) -> String {
        self.session.status_message()
    }

    #[wasm_bindgen(js_name = "canNavigate")]
    pub fn can_navigate(&self) -> bool {
        self.session.can_navigate()
    }

    /// `callback(status)` after every status change
    #[wasm_bindgen(js_name = "onStatusChange")]
    pub fn on_status_change(&self, callback: Function) {
        self.session.on_status_change(move |status| {
            let value = serde_wasm_bindgen::to_value(&status).unwrap_or(JsValue::NULL);
            if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                web_sys::console::error_2(&"[EPUB] Status callback threw".into(), &e);
            }
        });
    }

    #[wasm_bindgen(js_name = "currentLocation")]
    pub fn current_location(&self) -> Result<JsValue, JsValue> {
        match self.session.current_location() {
            Some(location) => serde_wasm_bindgen::to_value(&location)
                .map_err(|e| JsValue::from_str(&e.to_string())),
            None => Ok(JsValue::NULL),
        }
    }
}

/// Add the theme font's stylesheet to `<head>` unless already present.
fn inject_font_stylesheet(theme: &ThemeConfig) {
    let Some(href) = theme.font_stylesheet.as_deref() else {
        return;
    };
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    if document.get_element_by_id(FONT_LINK_ID).is_some() {
        return;
    }
    let Some(head) = document.head() else {
        return;
    };

    let link = match document.create_element("link") {
        Ok(link) => link,
        Err(e) => {
            web_sys::console::warn_2(&"[EPUB] Could not create font link".into(), &e);
            return;
        }
    };
    let attrs = [("id", FONT_LINK_ID), ("rel", "stylesheet"), ("href", href)];
    for (name, value) in attrs {
        if let Err(e) = link.set_attribute(name, value) {
            web_sys::console::warn_2(&"[EPUB] Could not set font link attribute".into(), &e);
            return;
        }
    }
    if let Err(e) = head.append_child(&link) {
        web_sys::console::warn_2(&"[EPUB] Could not append font link".into(), &e);
    }
}
