//! Arrow-key paging via a `keyup` listener on `document`

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{EventTarget, KeyboardEvent};

use crate::keyboard::{KeyHandler, KeySubscription, KeyboardInput, NavKey};

pub struct DocumentKeyboard {
    target: EventTarget,
}

impl DocumentKeyboard {
    pub fn for_document() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self {
            target: document.into(),
        })
    }
}

impl KeyboardInput for DocumentKeyboard {
    fn subscribe(&self, handler: KeyHandler) -> Box<dyn KeySubscription> {
        let closure = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if let Some(key) = NavKey::from_key(&event.key()) {
                handler(key);
            }
        });
        if let Err(e) = self
            .target
            .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())
        {
            web_sys::console::warn_2(&"[EPUB] Failed to register keyup listener".into(), &e);
        }
        Box::new(KeyupListener {
            target: self.target.clone(),
            closure,
        })
    }
}

struct KeyupListener {
    target: EventTarget,
    closure: Closure<dyn FnMut(KeyboardEvent)>,
}

impl KeySubscription for KeyupListener {
    fn cancel(self: Box<Self>) {
        // The closure must outlive the listener, so drop it only after removal.
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback("keyup", self.closure.as_ref().unchecked_ref())
        {
            web_sys::console::warn_2(&"[EPUB] Failed to remove keyup listener".into(), &e);
        }
    }
}
