use std::cell::RefCell;

use crate::effect::SideEffect;

thread_local! {
	static ACTIVE: RefCell<Option<SideEffect>> = RefCell::new(None);
}

pub(crate) fn current_collector() -> Option<SideEffect> {
	ACTIVE.with(|slot| slot.borrow().clone())
}

pub(crate) fn is_capturing() -> bool {
	ACTIVE.with(|slot| slot.borrow().is_some())
}

/// Scoped ownership of the collector slot. The previous occupant is restored
/// on drop, panics included, so a capture run can never leave a stale
/// collector behind.
pub(crate) struct CaptureGuard {
	prev: Option<SideEffect>,
}

pub(crate) fn begin_capture(effect: SideEffect) -> CaptureGuard {
	let prev = ACTIVE.with(|slot| slot.borrow_mut().replace(effect));
	CaptureGuard { prev }
}

impl Drop for CaptureGuard {
	fn drop(&mut self) {
		let prev = self.prev.take();
		ACTIVE.with(|slot| *slot.borrow_mut() = prev);
	}
}
