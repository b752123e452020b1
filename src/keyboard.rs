//! Keyboard navigation as a scoped subscription
//!
//! The session subscribes when a rendition is created and cancels the
//! subscription on teardown, so repeated sessions never stack handlers.

use std::rc::Rc;

/// Keys that turn pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Previous,
    Next,
}

impl NavKey {
    /// Map a DOM `KeyboardEvent.key` value.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" => Some(NavKey::Previous),
            "ArrowRight" => Some(NavKey::Next),
            _ => None,
        }
    }
}

pub type KeyHandler = Rc<dyn Fn(NavKey)>;

/// A host that can deliver navigation keys to a handler.
pub trait KeyboardInput {
    fn subscribe(&self, handler: KeyHandler) -> Box<dyn KeySubscription>;
}

/// Live registration returned by [`KeyboardInput::subscribe`].
pub trait KeySubscription {
    /// Deregister the handler. The host must not call it afterwards.
    fn cancel(self: Box<Self>);
}
