use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use tracing::trace;

use crate::addr::RcAddr;
use crate::effect::{EffectBody, SideEffect};

/// Upper bound on reactions processed by one flush. A cascade that overflows
/// it is truncated, not retried.
const MAX_REACTIONS_PER_FLUSH: usize = 999;

thread_local! {
	static DEPTH: Cell<u32> = Cell::new(0);
	static IN_TRANSACTION: Cell<bool> = Cell::new(false);
	static PENDING: RefCell<BTreeSet<RcAddr<EffectBody>>> = RefCell::new(BTreeSet::new());
}

pub fn in_batch() -> bool {
	DEPTH.with(|depth| depth.get() > 0)
}

pub fn in_transaction() -> bool {
	IN_TRANSACTION.with(|flag| flag.get())
}

pub fn start_batch() {
	DEPTH.with(|depth| {
		if depth.get() == 0 {
			// a fresh outermost batch starts from an empty queue
			PENDING.with(|pending| pending.borrow_mut().clear());
		}
		depth.set(depth.get() + 1);
	});
	IN_TRANSACTION.with(|flag| flag.set(true));
}

/// Must pair with a prior `start_batch`; an unmatched call is a caller error.
pub fn end_batch() {
	let depth = DEPTH.with(|depth| {
		let next = depth.get() - 1;
		depth.set(next);
		next
	});
	if depth == 0 {
		IN_TRANSACTION.with(|flag| flag.set(false));
		run_pending_reactions();
	}
}

pub fn batch(func: impl FnOnce()) {
	start_batch();
	func();
	end_batch();
}

pub(crate) fn enqueue(effect: &SideEffect) {
	PENDING.with(|pending| {
		pending.borrow_mut().insert(RcAddr::new(effect.body.clone()));
	});
}

/// Drains the pending set and runs each distinct effect once through the
/// guarded run. The set is taken up front: once a flush begins the queue is
/// empty, so entries dropped by the overflow cap or abandoned by a panicking
/// body are never retried.
pub fn run_pending_reactions() {
	let pending = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
	if pending.is_empty() {
		return;
	}

	trace!(pending = pending.len(), "flush pending reactions");

	let mut processed = 0usize;
	for entry in pending {
		processed += 1;
		if processed >= MAX_REACTIONS_PER_FLUSH {
			break;
		}
		SideEffect::from_body(entry.into_inner()).run_guarded();
	}
}
