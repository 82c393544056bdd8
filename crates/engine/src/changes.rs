use std::cell::{Cell, RefCell};

use bindery_xpath::DepElement;
use smallvec::SmallVec;

type ChangeList = SmallVec<[DepElement; 8]>;

/// Engine-wide list of changed models and elements.
///
/// While a build pass runs, new changes go to the pending list so the pass
/// never observes its own writes; [`ChangeTracker::end_build`] promotes them.
#[derive(Debug, Default)]
pub(crate) struct ChangeTracker {
    building: Cell<bool>,
    current: RefCell<ChangeList>,
    pending: RefCell<ChangeList>,
}

impl ChangeTracker {
    pub(crate) fn is_building(&self) -> bool {
        self.building.get()
    }

    pub(crate) fn add(&self, element: DepElement) {
        let list = if self.building.get() { &self.pending } else { &self.current };
        let mut list = list.borrow_mut();
        if !list.contains(&element) {
            list.push(element);
        }
    }

    pub(crate) fn contains(&self, element: DepElement) -> bool {
        self.current.borrow().contains(&element)
    }

    pub(crate) fn snapshot(&self) -> Vec<DepElement> {
        self.current.borrow().to_vec()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.current.borrow().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.current.borrow().len()
    }

    pub(crate) fn begin_build(&self) {
        self.building.set(true);
    }

    pub(crate) fn end_build(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        *self.current.borrow_mut() = pending;
        self.building.set(false);
    }

    pub(crate) fn clear(&self) {
        self.current.borrow_mut().clear();
        self.pending.borrow_mut().clear();
        self.building.set(false);
    }
}
