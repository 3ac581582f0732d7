//! Action Dispatcher (C6): maps an action-type tag to a handler function
//! (spec §4.4 "Dispatch registry", §9 "Polymorphism over Action").

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use navigant_pages::PageEntry;
use navigant_protocol::{Action, ActionResult};

use crate::error::ActionError;

pub type HandlerResult = Result<ActionResult, ActionError>;

/// A boxed async handler for one action type. Receives the already-resolved
/// page entry so it never has to look pages up itself.
pub type HandlerFn = Box<
    dyn Fn(Action, Arc<PageEntry>) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>>
        + Send
        + Sync,
>;

/// Map from `actionType` string to handler; third parties register and
/// unregister additional types (spec §4.4 "Dispatch registry").
pub struct ActionDispatcher {
    handlers: HashMap<String, HandlerFn>,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        let mut dispatcher = Self {
            handlers: HashMap::new(),
        };
        crate::handlers::register_defaults(&mut dispatcher);
        dispatcher
    }
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action_type: impl Into<String>, handler: HandlerFn) {
        self.handlers.insert(action_type.into(), handler);
    }

    pub fn unregister(&mut self, action_type: &str) {
        self.handlers.remove(action_type);
    }

    pub async fn dispatch(&self, action: Action, page: Arc<PageEntry>) -> HandlerResult {
        let type_tag = action.type_tag();
        let Some(handler) = self.handlers.get(type_tag) else {
            return Err(ActionError::UnsupportedAction(type_tag.to_string()));
        };
        handler(action, page).await
    }

    pub fn is_registered(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }
}

#[cfg(test)]
mod tests {
    use navigant_protocol::ActionKind;

    use super::*;

    #[test]
    fn default_dispatcher_registers_every_canonical_action_type() {
        let dispatcher = ActionDispatcher::new();
        for tag in [
            "navigate", "click", "type", "select", "keyboard", "mouse", "screenshot", "pdf",
            "wait", "scroll", "evaluate", "injectScript", "injectCSS", "upload", "cookie",
            "goBack", "goForward", "refresh", "setViewport",
        ] {
            assert!(dispatcher.is_registered(tag), "{tag} should be registered");
        }
    }

    #[test]
    fn unregister_removes_a_handler() {
        let mut dispatcher = ActionDispatcher::new();
        dispatcher.unregister("navigate");
        assert!(!dispatcher.is_registered("navigate"));
        let _ = ActionKind::GoBack {};
    }
}
