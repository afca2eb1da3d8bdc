use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::atom::AtomBody;
use crate::capture::begin_capture;
use crate::value::{Key, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
	Reaction,
	Computed,
}

/// One reactive computation: a guard predicate, an optional
/// dependency-collecting step and the effect body. Cheap to clone; clones
/// share identity, and identity is what subscriber lists and the pending set
/// match on.
#[derive(Clone)]
pub struct SideEffect {
	pub(crate) body: Rc<EffectBody>,
}

pub(crate) struct EffectBody {
	kind: EffectKind,
	guard: Box<dyn Fn() -> bool>,
	collect: Option<Box<dyn Fn() -> Value>>,
	run: Box<dyn Fn(Option<Value>)>,
	disposed: Cell<bool>,
	subscriptions: RefCell<Vec<(Weak<AtomBody>, Key)>>,
}

impl SideEffect {
	pub fn new(run: impl Fn() + 'static) -> Self {
		Self::new_as(EffectKind::Reaction, run)
	}

	pub fn new_as(kind: EffectKind, run: impl Fn() + 'static) -> Self {
		Self::build(kind, Box::new(|| true), None, Box::new(move |_| run()))
	}

	pub fn guarded(guard: impl Fn() -> bool + 'static, run: impl Fn() + 'static) -> Self {
		Self::build(
			EffectKind::Reaction,
			Box::new(guard),
			None,
			Box::new(move |_| run()),
		)
	}

	/// The collector runs right before the body and its result is handed to
	/// the body. `Value` is the currency between the two steps.
	pub fn with_collector(
		kind: EffectKind,
		collect: impl Fn() -> Value + 'static,
		run: impl Fn(Value) + 'static,
	) -> Self {
		Self::build(
			kind,
			Box::new(|| true),
			Some(Box::new(collect)),
			Box::new(move |input| {
				if let Some(input) = input {
					run(input)
				}
			}),
		)
	}

	fn build(
		kind: EffectKind,
		guard: Box<dyn Fn() -> bool>,
		collect: Option<Box<dyn Fn() -> Value>>,
		run: Box<dyn Fn(Option<Value>)>,
	) -> Self {
		SideEffect {
			body: Rc::new(EffectBody {
				kind,
				guard,
				collect,
				run,
				disposed: Cell::new(false),
				subscriptions: RefCell::new(Vec::new()),
			}),
		}
	}

	pub(crate) fn from_body(body: Rc<EffectBody>) -> Self {
		SideEffect { body }
	}

	pub fn kind(&self) -> EffectKind {
		self.body.kind
	}

	pub fn is_disposed(&self) -> bool {
		self.body.disposed.get()
	}

	/// Every notification path comes through here: the guard is re-checked
	/// before the body runs, batched or not.
	pub fn run_guarded(&self) {
		if self.body.disposed.get() || !(self.body.guard)() {
			return;
		}
		self.run_body();
	}

	pub(crate) fn run_body(&self) {
		let input = self.body.collect.as_ref().map(|collect| collect());
		(self.body.run)(input);
	}

	pub(crate) fn check_guard(&self) -> bool {
		(self.body.guard)()
	}

	pub(crate) fn note_subscription(&self, cell: Weak<AtomBody>, key: Key) {
		self.body.subscriptions.borrow_mut().push((cell, key));
	}

	/// Releases every (cell, key) registration this effect holds. The effect
	/// never runs again; dropping the handle alone does NOT dispose.
	pub fn dispose(&self) {
		if self.body.disposed.replace(true) {
			return;
		}
		trace!(kind = ?self.body.kind, "dispose effect");
		let subscriptions = std::mem::take(&mut *self.body.subscriptions.borrow_mut());
		for (cell, key) in subscriptions {
			if let Some(cell) = cell.upgrade() {
				cell.remove_reaction(&key, self);
			}
		}
	}
}

impl fmt::Debug for SideEffect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SideEffect")
			.field("kind", &self.body.kind)
			.field("disposed", &self.body.disposed.get())
			.finish()
	}
}

/// Installs an already-built effect as the active collector and performs its
/// capture run. The dependency set is fixed by this one run; re-runs happen
/// outside capture mode.
pub fn track(effect: &SideEffect) {
	let _capture = begin_capture(effect.clone());
	effect.run_body();
}

pub fn autorun(run: impl Fn() + 'static) -> SideEffect {
	autorun_as(EffectKind::Reaction, run)
}

pub fn autorun_as(kind: EffectKind, run: impl Fn() + 'static) -> SideEffect {
	let effect = SideEffect::new_as(kind, run);
	track(&effect);
	effect
}

/// The capture run evaluates the predicate, not the body: changes to the
/// predicate's dependencies re-trigger evaluation, and the body fires
/// whenever the predicate holds at notification time.
pub fn when(predicate: impl Fn() -> bool + 'static, run: impl Fn() + 'static) -> SideEffect {
	let effect = SideEffect::guarded(predicate, run);
	let _capture = begin_capture(effect.clone());
	effect.check_guard();
	effect
}
