//! epub.js as the rendering engine
//!
//! Thin bindings over `ePub()`, `Book` and `Rendition`. Every promise epub.js
//! hands back is wrapped in a `JsFuture`, so the work is already running by
//! the time the session sees the future.

use js_sys::{ArrayBuffer, Promise, Uint8Array};
use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Element;

use crate::config::LayoutConfig;
use crate::engine::{DocumentHandle, EngineError, EngineFuture, Location, RenderingEngine, Rendition};
use crate::theme::Theme;

#[wasm_bindgen(module = "epubjs")]
extern "C" {
    #[wasm_bindgen(catch, js_name = default)]
    fn open_book(data: &ArrayBuffer) -> Result<Book, JsValue>;

    type Book;

    #[wasm_bindgen(method, getter)]
    fn ready(this: &Book) -> Promise;

    #[wasm_bindgen(method, catch, js_name = renderTo)]
    fn render_to(this: &Book, element: &Element, options: &JsValue) -> Result<JsRendition, JsValue>;

    #[wasm_bindgen(method)]
    fn destroy(this: &Book);

    type JsRendition;

    #[wasm_bindgen(method, getter)]
    fn themes(this: &JsRendition) -> Themes;

    #[wasm_bindgen(method)]
    fn display(this: &JsRendition) -> Promise;

    #[wasm_bindgen(method)]
    fn prev(this: &JsRendition) -> Promise;

    #[wasm_bindgen(method)]
    fn next(this: &JsRendition) -> Promise;

    #[wasm_bindgen(method, js_name = currentLocation)]
    fn current_location(this: &JsRendition) -> JsValue;

    #[wasm_bindgen(method)]
    fn destroy(this: &JsRendition);

    type Themes;

    #[wasm_bindgen(method)]
    fn register(this: &Themes, name: &str, rules: &JsValue);

    #[wasm_bindgen(method)]
    fn select(this: &Themes, name: &str);
}

/// Best-effort text of a thrown JS value
pub(crate) fn js_error_message(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{:?}", err)
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    // Plain objects, not `Map`s: epub.js reads these with property access.
    value.serialize(&Serializer::json_compatible())
}

fn settle(promise: Promise, wrap: fn(String) -> EngineError) -> EngineFuture {
    Box::pin(async move {
        JsFuture::from(promise)
            .await
            .map(|_| ())
            .map_err(|e| wrap(js_error_message(&e)))
    })
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EpubJsEngine;

impl RenderingEngine for EpubJsEngine {
    type Container = Element;
    type Document = EpubJsDocument;

    fn parse(&self, bytes: Vec<u8>) -> Result<EpubJsDocument, EngineError> {
        let data = Uint8Array::from(bytes.as_slice());
        let book = open_book(&data.buffer())
            .map_err(|e| EngineError::Malformed(js_error_message(&e)))?;
        Ok(EpubJsDocument {
            book,
            destroyed: false,
        })
    }
}

pub struct EpubJsDocument {
    book: Book,
    destroyed: bool,
}

impl DocumentHandle for EpubJsDocument {
    type Container = Element;
    type Rendition = EpubJsRendition;

    fn ready(&self) -> EngineFuture {
        if self.destroyed {
            return Box::pin(futures::future::ready(Err(EngineError::Destroyed)));
        }
        settle(self.book.ready(), EngineError::Malformed)
    }

    fn render_to(
        &self,
        container: &Element,
        layout: &LayoutConfig,
    ) -> Result<EpubJsRendition, EngineError> {
        if self.destroyed {
            return Err(EngineError::Destroyed);
        }
        let options = to_js(layout).map_err(|e| EngineError::Render(e.to_string()))?;
        let inner = self
            .book
            .render_to(container, &options)
            .map_err(|e| EngineError::Render(js_error_message(&e)))?;
        Ok(EpubJsRendition {
            inner,
            destroyed: false,
        })
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.book.destroy();
            self.destroyed = true;
        }
    }
}

pub struct EpubJsRendition {
    inner: JsRendition,
    destroyed: bool,
}

impl Rendition for EpubJsRendition {
    fn register_theme(&self, theme: &Theme) {
        match to_js(&theme.rules) {
            Ok(rules) => self.inner.themes().register(&theme.name, &rules),
            Err(e) => tracing::warn!(theme = %theme.name, error = %e, "Theme rules not serializable"),
        }
    }

    fn select_theme(&self, name: &str) {
        self.inner.themes().select(name);
    }

    fn display(&self) -> EngineFuture {
        settle(self.inner.display(), EngineError::Render)
    }

    fn prev(&self) -> EngineFuture {
        settle(self.inner.prev(), EngineError::Navigation)
    }

    fn next(&self) -> EngineFuture {
        settle(self.inner.next(), EngineError::Navigation)
    }

    fn current_location(&self) -> Option<Location> {
        // Empty object until the first display settles.
        serde_wasm_bindgen::from_value(self.inner.current_location()).ok()
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.inner.destroy();
            self.destroyed = true;
        }
    }
}
