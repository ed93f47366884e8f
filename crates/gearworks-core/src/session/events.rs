//! Session event bus with RAII subscriptions

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::interaction::PointerMode;
use crate::schema::CameraDocument;

/// Notifications published by a [`Session`](super::Session)
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Origin was edited; derived state is already current
    OriginChanged { revision: u64 },
    ModeChanged { mode: PointerMode },
    CameraChanged { camera: CameraDocument },
    /// The save throttle released a camera document for the host to persist
    CameraSaveRequested { camera: CameraDocument },
    Ticked { elapsed: f32 },
}

type Listener = Box<dyn FnMut(&SessionEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
    /// Subscriptions dropped while their listener was out for a publish
    dropped: Vec<u64>,
    closed: bool,
}

/// Single-threaded publisher; listeners run synchronously in subscription order
#[derive(Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`; it stays registered while the handle lives
    pub fn subscribe(&self, listener: impl FnMut(&SessionEvent) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        if registry.closed {
            return Subscription {
                id: 0,
                registry: Weak::new(),
            };
        }
        registry.next_id += 1;
        let id = registry.next_id;
        registry.listeners.push((id, Box::new(listener)));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn publish(&self, event: &SessionEvent) {
        // Listeners are taken out so they may subscribe or unsubscribe re-entrantly
        let mut listeners = {
            let mut registry = self.registry.borrow_mut();
            if registry.closed {
                return;
            }
            std::mem::take(&mut registry.listeners)
        };

        for (_, listener) in listeners.iter_mut() {
            listener(event);
        }

        let mut registry = self.registry.borrow_mut();
        if registry.closed {
            return;
        }
        let dropped = std::mem::take(&mut registry.dropped);
        listeners.retain(|(id, _)| !dropped.contains(id));
        listeners.append(&mut registry.listeners);
        registry.listeners = listeners;
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    /// Drop every listener; outstanding handles become inert
    pub fn close(&self) {
        let mut registry = self.registry.borrow_mut();
        registry.closed = true;
        registry.listeners.clear();
        registry.dropped.clear();
    }
}

/// Registration handle; dropping it unregisters the listener
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Whether the listener is still registered with a live bus
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            let registry = registry.borrow();
            !registry.closed && !registry.dropped.contains(&self.id)
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = registry.borrow_mut();
        if registry.closed {
            return;
        }
        let before = registry.listeners.len();
        let id = self.id;
        registry.listeners.retain(|(listener, _)| *listener != id);
        if registry.listeners.len() == before {
            registry.dropped.push(id);
        }
    }
}
