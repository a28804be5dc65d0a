//! Typed observer registry for loader events.
//!
//! Handlers run synchronously, in registration order, on whichever thread
//! drives the loader. There is no replay: a handler only sees events raised
//! after it was registered.

use crate::error::AssetError;

/// Returned by every `on_*` call; pass it to `off` to unregister.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct HandlerList<A: ?Sized> {
    handlers: Vec<(SubscriptionId, Box<dyn FnMut(&A)>)>,
}

impl<A: ?Sized> HandlerList<A> {
    fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    fn emit(&mut self, args: &A) {
        for (_, handler) in &mut self.handlers {
            handler(args);
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        before != self.handlers.len()
    }
}

pub struct Observers {
    next_id: u64,
    ready: HandlerList<()>,
    error: HandlerList<AssetError>,
    progress: HandlerList<u8>,
}

impl Observers {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            ready: HandlerList::new(),
            error: HandlerList::new(),
            progress: HandlerList::new(),
        }
    }

    fn next(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn on_ready(&mut self, mut f: impl FnMut() + 'static) -> SubscriptionId {
        let id = self.next();
        self.ready.handlers.push((id, Box::new(move |_: &()| f())));
        id
    }

    pub fn on_error(&mut self, f: impl FnMut(&AssetError) + 'static) -> SubscriptionId {
        let id = self.next();
        self.error.handlers.push((id, Box::new(f)));
        id
    }

    pub fn on_progress(&mut self, mut f: impl FnMut(u8) + 'static) -> SubscriptionId {
        let id = self.next();
        self.progress
            .handlers
            .push((id, Box::new(move |p: &u8| f(*p))));
        id
    }

    /// Unregister a handler of any event. Returns `false` for unknown ids.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.ready.remove(id) || self.error.remove(id) || self.progress.remove(id)
    }

    pub(crate) fn emit_ready(&mut self) {
        self.ready.emit(&());
    }

    pub(crate) fn emit_error(&mut self, error: &AssetError) {
        self.error.emit(error);
    }

    pub(crate) fn emit_progress(&mut self, percent: u8) {
        self.progress.emit(&percent);
    }
}

impl Default for Observers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn handlers_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut obs = Observers::new();
        for tag in ["first", "second", "third"] {
            let log = log.clone();
            obs.on_ready(move || log.borrow_mut().push(tag));
        }
        obs.emit_ready();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn off_removes_only_that_handler() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut obs = Observers::new();
        let a = {
            let seen = seen.clone();
            obs.on_progress(move |p| seen.borrow_mut().push(("a", p)))
        };
        {
            let seen = seen.clone();
            obs.on_progress(move |p| seen.borrow_mut().push(("b", p)));
        }
        assert!(obs.off(a));
        assert!(!obs.off(a));
        obs.emit_progress(50);
        assert_eq!(*seen.borrow(), vec![("b", 50)]);
    }
}
