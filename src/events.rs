//! Board events and a dispatcher keyed by event kind.

use std::collections::BTreeMap;
use std::fmt;

use crate::cascade::CascadeSummary;
use crate::error::Rejection;
use crate::grid::{FruitId, Pos};
use crate::powerup::{Point, PowerUpKind};

/// What started a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    Swap,
    PowerUp(PowerUpKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    Swapped {
        from: Pos,
        to: Pos,
    },
    SwapRejected {
        at: Pos,
        reason: Rejection,
    },
    /// Fired before the cells are vacated.
    Cleared {
        cells: Vec<(Pos, FruitId)>,
        score: u64,
        pass: u32,
    },
    Rerolled {
        cells: Vec<Pos>,
    },
    UniqueMatches {
        groups: usize,
    },
    PowerUpFired {
        kind: PowerUpKind,
        impact: Point,
        cells: usize,
    },
    CascadeSettled {
        cause: Cause,
        summary: CascadeSummary,
    },
    CascadeCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Swapped,
    SwapRejected,
    Cleared,
    Rerolled,
    UniqueMatches,
    PowerUpFired,
    CascadeSettled,
    CascadeCancelled,
}

impl BoardEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Swapped { .. } => EventKind::Swapped,
            Self::SwapRejected { .. } => EventKind::SwapRejected,
            Self::Cleared { .. } => EventKind::Cleared,
            Self::Rerolled { .. } => EventKind::Rerolled,
            Self::UniqueMatches { .. } => EventKind::UniqueMatches,
            Self::PowerUpFired { .. } => EventKind::PowerUpFired,
            Self::CascadeSettled { .. } => EventKind::CascadeSettled,
            Self::CascadeCancelled => EventKind::CascadeCancelled,
        }
    }
}

type Listener = Box<dyn FnMut(&BoardEvent)>;

/// Callbacks registered per [`EventKind`], called in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: BTreeMap<EventKind, Vec<Listener>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<_, _> = self
            .listeners
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("listeners", &counts)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, listener: impl FnMut(&BoardEvent) + 'static) {
        self.listeners
            .entry(kind)
            .or_default()
            .push(Box::new(listener));
    }

    /// Returns how many listeners ran.
    pub fn dispatch(&mut self, event: &BoardEvent) -> usize {
        let Some(listeners) = self.listeners.get_mut(&event.kind()) else {
            return 0;
        };
        for listener in listeners.iter_mut() {
            listener(event);
        }
        listeners.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_only_see_their_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        let log = Rc::clone(&seen);
        dispatcher.on(EventKind::UniqueMatches, move |e| {
            log.borrow_mut().push(e.clone());
        });

        assert_eq!(dispatcher.dispatch(&BoardEvent::CascadeCancelled), 0);
        assert_eq!(dispatcher.dispatch(&BoardEvent::UniqueMatches { groups: 2 }), 1);
        assert_eq!(*seen.borrow(), vec![BoardEvent::UniqueMatches { groups: 2 }]);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();
        for i in 0..3 {
            let order = Rc::clone(&order);
            dispatcher.on(EventKind::CascadeCancelled, move |_| order.borrow_mut().push(i));
        }
        dispatcher.dispatch(&BoardEvent::CascadeCancelled);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        dispatcher.clear();
        assert_eq!(dispatcher.dispatch(&BoardEvent::CascadeCancelled), 0);
    }
}
