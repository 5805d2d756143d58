use alloc::{collections::BTreeMap, sync::Arc};
use parking_lot::Mutex;

use crate::{any::RcAny, registry::BindingId};

type Slot = Mutex<Option<RcAny>>;

/// Values of scoped bindings owned by one component instance.
///
/// Every binding has its own slot, so constructing one value never blocks on another binding's construction.
#[derive(Default)]
pub(crate) struct Cache {
    slots: Mutex<BTreeMap<BindingId, Arc<Slot>>>,
}

impl Cache {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value or constructs it with `init` while holding the binding's slot,
    /// the flag is `true` if the value was found in cache.
    ///
    /// A failed `init` leaves the slot empty.
    pub(crate) fn get_or_try_init<E>(&self, id: BindingId, init: impl FnOnce() -> Result<RcAny, E>) -> Result<(RcAny, bool), E> {
        let slot = self.slot(id);
        let mut guard = slot.lock();
        if let Some(value) = guard.as_ref() {
            return Ok((value.clone(), true));
        }

        let value = init()?;
        *guard = Some(value.clone());
        Ok((value, false))
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn get(&self, id: BindingId) -> Option<RcAny> {
        let slot = self.slots.lock().get(&id).cloned()?;
        let value = slot.lock().clone();
        value
    }

    #[inline]
    fn slot(&self, id: BindingId) -> Arc<Slot> {
        self.slots.lock().entry(id).or_default().clone()
    }
}
