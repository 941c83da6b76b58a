//! Named publish/subscribe bus used to broadcast shell notifications

use std::collections::HashMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::instance::Signature;

/// Origin of a `resize` notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeSource {
    /// The browser window (or whatever hosts the shell) changed size
    Window,
    /// The sidebar committed a new width
    Sidebar,
}

/// Views the sidebar can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarView {
    Thumbnails,
    Outline,
    Attachments,
    Layers,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BusEvent {
    Resize { source: ResizeSource },
    SidebarViewChanged { view: Option<SidebarView> },
    Restored { instance: Signature },
    Frozen { instance: Signature },
}

impl BusEvent {
    pub const RESIZE: &'static str = "resize";
    pub const SIDEBAR_VIEW_CHANGED: &'static str = "sidebarviewchanged";
    pub const RESTORED: &'static str = "pdfjs:restored";
    pub const FROZEN: &'static str = "pdfjs:frozen";

    /// Name listeners subscribe to
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::Resize { .. } => Self::RESIZE,
            BusEvent::SidebarViewChanged { .. } => Self::SIDEBAR_VIEW_CHANGED,
            BusEvent::Restored { .. } => Self::RESTORED,
            BusEvent::Frozen { .. } => Self::FROZEN,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&BusEvent)>;

/// Single-threaded event bus keyed by event name
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, name: &str, listener: F) -> ListenerId
    where
        F: FnMut(&BusEvent) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(name.to_string())
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Remove a listener, returns true if it was registered under `name`
    pub fn off(&mut self, name: &str, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(name) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener of its name, returns how many ran
    pub fn dispatch(&mut self, event: &BusEvent) -> usize {
        let name = event.name();
        let Some(listeners) = self.listeners.get_mut(name) else {
            trace!("No listeners for {name}");
            return 0;
        };
        for (_, listener) in listeners.iter_mut() {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .listeners
            .iter()
            .map(|(name, listeners)| (name.as_str(), listeners.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn dispatch_reaches_only_matching_listeners() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        bus.on(BusEvent::RESIZE, move |evt| sink.borrow_mut().push(evt.clone()));
        let sink = seen.clone();
        bus.on(BusEvent::FROZEN, move |evt| sink.borrow_mut().push(evt.clone()));

        let ran = bus.dispatch(&BusEvent::Resize {
            source: ResizeSource::Window,
        });
        assert_eq!(ran, 1);
        assert_eq!(
            seen.borrow().as_slice(),
            &[BusEvent::Resize {
                source: ResizeSource::Window
            }]
        );
    }

    #[test]
    fn off_removes_listener() {
        let mut bus = EventBus::new();
        let id = bus.on(BusEvent::RESTORED, |_| {});
        assert_eq!(bus.listener_count(BusEvent::RESTORED), 1);

        assert!(bus.off(BusEvent::RESTORED, id));
        assert!(!bus.off(BusEvent::RESTORED, id));
        assert_eq!(bus.dispatch(&BusEvent::Restored { instance: Signature(7) }), 0);
    }

    #[test]
    fn event_names_match_wire_names() {
        assert_eq!(
            BusEvent::SidebarViewChanged { view: None }.name(),
            "sidebarviewchanged"
        );
        assert_eq!(BusEvent::Frozen { instance: Signature(1) }.name(), "pdfjs:frozen");
    }
}
