use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::batch::{enqueue, in_batch};
use crate::capture::{current_collector, is_capturing};
use crate::effect::SideEffect;
use crate::error::Error;
use crate::value::{Key, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomKind {
	Object,
	Array,
}

impl fmt::Display for AtomKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AtomKind::Object => f.write_str("object"),
			AtomKind::Array => f.write_str("array"),
		}
	}
}

/// Equality used by the guarded `replace` path. The raw write path never
/// consults it.
pub type Comparer = Rc<dyn Fn(&Value, &Value) -> bool>;

fn default_comparer() -> Comparer {
	Rc::new(|old: &Value, new: &Value| old == new)
}

type Subscribers = FxHashMap<Key, SmallVec<[SideEffect; 2]>>;

/// The owned plain container behind one cell. External code never touches it
/// directly; every read and write goes through the cell.
pub(crate) enum Source {
	Object(FxHashMap<String, Value>),
	Array(Vec<Value>),
}

impl Source {
	fn kind(&self) -> AtomKind {
		match self {
			Source::Object(_) => AtomKind::Object,
			Source::Array(_) => AtomKind::Array,
		}
	}

	fn len(&self) -> Option<usize> {
		match self {
			Source::Array(items) => Some(items.len()),
			Source::Object(_) => None,
		}
	}

	fn peek(&self, key: &Key) -> Option<&Value> {
		match (self, key) {
			(Source::Object(map), Key::Name(name)) => map.get(name),
			(Source::Array(items), Key::Index(index)) => items.get(*index),
			_ => None,
		}
	}

	fn store(&mut self, key: &Key, value: Value) -> Result<(), Error> {
		match (self, key) {
			(Source::Object(map), Key::Name(name)) => {
				map.insert(name.clone(), value);
				Ok(())
			}
			(Source::Array(items), Key::Index(index)) => {
				if *index < items.len() {
					items[*index] = value;
					Ok(())
				} else if *index == items.len() {
					items.push(value);
					Ok(())
				} else {
					Err(Error::OutOfBounds {
						index: *index,
						len: items.len(),
					})
				}
			}
			(source, key) => Err(Error::KeyMismatch {
				key: key.clone(),
				kind: source.kind(),
			}),
		}
	}

	/// Moves a container value out so it can become a child cell. Array slots
	/// keep a placeholder so sibling indices stay stable.
	fn take_container(&mut self, key: &Key) -> Option<Value> {
		match (self, key) {
			(Source::Object(map), Key::Name(name)) => {
				if map.get(name).map_or(false, Value::is_container) {
					map.remove(name)
				} else {
					None
				}
			}
			(Source::Array(items), Key::Index(index)) => match items.get_mut(*index) {
				Some(slot) if slot.is_container() => {
					Some(std::mem::replace(slot, Value::Null))
				}
				_ => None,
			},
			_ => None,
		}
	}
}

/// What a read of one key produced.
pub(crate) enum Slot {
	Missing,
	Primitive(Value),
	Child(Atom),
}

/// The reactive cell: owns one plain container, keeps the per-key subscriber
/// table and performs dependency capture on read / notification on write.
#[derive(Clone)]
pub(crate) struct Atom {
	pub(crate) body: Rc<AtomBody>,
}

pub(crate) struct AtomBody {
	kind: AtomKind,
	source: RefCell<Source>,
	subscribers: RefCell<Subscribers>,
	observed: Cell<bool>,
	children: RefCell<FxHashMap<Key, Atom>>,
	comparer: RefCell<Comparer>,
	this: Weak<AtomBody>,
}

impl Atom {
	pub(crate) fn object(map: FxHashMap<String, Value>) -> Self {
		Self::build(AtomKind::Object, Source::Object(map))
	}

	pub(crate) fn array(items: Vec<Value>) -> Self {
		Self::build(AtomKind::Array, Source::Array(items))
	}

	pub(crate) fn from_container(value: Value) -> Option<Self> {
		match value {
			Value::Object(map) => Some(Self::object(map)),
			Value::Array(items) => Some(Self::array(items)),
			_ => None,
		}
	}

	fn build(kind: AtomKind, source: Source) -> Self {
		Atom {
			body: Rc::new_cyclic(|this| AtomBody {
				kind,
				source: RefCell::new(source),
				subscribers: RefCell::new(FxHashMap::default()),
				observed: Cell::new(false),
				children: RefCell::new(FxHashMap::default()),
				comparer: RefCell::new(default_comparer()),
				this: this.clone(),
			}),
		}
	}
}

impl AtomBody {
	pub(crate) fn kind(&self) -> AtomKind {
		self.kind
	}

	pub(crate) fn is_observed(&self) -> bool {
		self.observed.get()
	}

	pub(crate) fn set_comparer(&self, comparer: Comparer) {
		*self.comparer.borrow_mut() = comparer;
	}

	fn register(&self, key: &Key) {
		if let Some(effect) = current_collector() {
			self.add_reaction(key.clone(), Some(effect));
		}
	}

	/// Read interception. Primitive and absent slots register against the
	/// active collector; container slots promote into child cells, and the
	/// outer key registers alongside the child's own keys.
	pub(crate) fn get(&self, key: &Key) -> Slot {
		if let Some(child) = self.children.borrow().get(key) {
			self.register(key);
			return Slot::Child(child.clone());
		}

		if *key == Key::Len {
			if let Some(len) = self.source.borrow().len() {
				self.register(key);
				return Slot::Primitive(Value::Int(len as i64));
			}
		}

		if let Some(child) = self
			.source
			.borrow_mut()
			.take_container(key)
			.and_then(Atom::from_container)
		{
			self.children.borrow_mut().insert(key.clone(), child.clone());
			self.register(key);
			return Slot::Child(child);
		}

		// Absent slots register too: a later write to the key must be able
		// to trigger the collector.
		self.register(key);
		let source = self.source.borrow();
		match source.peek(key) {
			Some(value) => Slot::Primitive(value.clone()),
			None => Slot::Missing,
		}
	}

	/// Raw write interception: stores and reports unconditionally, with no
	/// equality check. Compare `replace`.
	pub(crate) fn set(&self, key: Key, value: Value) -> Result<(), Error> {
		self.assert_mutable(&key);
		self.source.borrow_mut().store(&key, value)?;
		self.children.borrow_mut().remove(&key);
		self.report_changed(&key);
		Ok(())
	}

	/// Guarded convenience write: consults the comparer and reports only on
	/// change. A promoted child always counts as changed. Returns the
	/// previous value.
	pub(crate) fn replace(&self, key: Key, value: Value) -> Result<Option<Value>, Error> {
		self.assert_mutable(&key);

		let had_child = self.children.borrow().contains_key(&key);
		let old = if had_child {
			self.children
				.borrow_mut()
				.remove(&key)
				.map(|child| child.body.snapshot())
		} else {
			self.source.borrow().peek(&key).cloned()
		};

		if !had_child {
			let unchanged = match &old {
				Some(prev) => {
					let comparer = self.comparer.borrow().clone();
					comparer(prev, &value)
				}
				None => false,
			};
			if unchanged {
				return Ok(old);
			}
		}

		self.source.borrow_mut().store(&key, value)?;
		self.report_changed(&key);
		Ok(old)
	}

	pub(crate) fn len(&self) -> Result<usize, Error> {
		let len = match self.source.borrow().len() {
			Some(len) => len,
			None => return Err(Error::NotAnArray { op: "len" }),
		};
		self.register(&Key::Len);
		Ok(len)
	}

	pub(crate) fn push(&self, value: Value) -> Result<(), Error> {
		self.assert_mutable(&Key::Len);
		let index = {
			let mut source = self.source.borrow_mut();
			match &mut *source {
				Source::Array(items) => {
					items.push(value);
					items.len() - 1
				}
				Source::Object(_) => return Err(Error::NotAnArray { op: "push" }),
			}
		};
		self.report_changed(&Key::Index(index));
		self.report_changed(&Key::Len);
		Ok(())
	}

	pub(crate) fn pop(&self) -> Result<Option<Value>, Error> {
		self.assert_mutable(&Key::Len);
		let popped = {
			let mut source = self.source.borrow_mut();
			match &mut *source {
				Source::Array(items) => items.pop().map(|value| (items.len(), value)),
				Source::Object(_) => return Err(Error::NotAnArray { op: "pop" }),
			}
		};
		let (index, value) = match popped {
			Some(entry) => entry,
			None => return Ok(None),
		};
		// a promoted element materializes from its cell, not the placeholder
		let value = match self.children.borrow_mut().remove(&Key::Index(index)) {
			Some(child) => child.body.snapshot(),
			None => value,
		};
		self.report_changed(&Key::Index(index));
		self.report_changed(&Key::Len);
		Ok(Some(value))
	}

	pub(crate) fn insert(&self, index: usize, value: Value) -> Result<(), Error> {
		self.assert_mutable(&Key::Index(index));
		let new_len = {
			let mut source = self.source.borrow_mut();
			match &mut *source {
				Source::Array(items) => {
					if index > items.len() {
						return Err(Error::OutOfBounds {
							index,
							len: items.len(),
						});
					}
					items.insert(index, value);
					items.len()
				}
				Source::Object(_) => return Err(Error::NotAnArray { op: "insert" }),
			}
		};
		self.shift_children_up(index);
		// every slot the shift touched reports, the way interposed native
		// mutation does
		for slot in index..new_len {
			self.report_changed(&Key::Index(slot));
		}
		self.report_changed(&Key::Len);
		Ok(())
	}

	pub(crate) fn remove(&self, index: usize) -> Result<Value, Error> {
		self.assert_mutable(&Key::Index(index));
		let (removed, old_len) = {
			let mut source = self.source.borrow_mut();
			match &mut *source {
				Source::Array(items) => {
					if index >= items.len() {
						return Err(Error::OutOfBounds {
							index,
							len: items.len(),
						});
					}
					let old_len = items.len();
					(items.remove(index), old_len)
				}
				Source::Object(_) => return Err(Error::NotAnArray { op: "remove" }),
			}
		};
		let removed = match self.children.borrow().get(&Key::Index(index)) {
			Some(child) => child.body.snapshot(),
			None => removed,
		};
		self.shift_children_down(index);
		for slot in index..old_len {
			self.report_changed(&Key::Index(slot));
		}
		self.report_changed(&Key::Len);
		Ok(removed)
	}

	/// Rebuilds the plain value, folding promoted children back into place.
	/// Does not register dependencies.
	pub(crate) fn snapshot(&self) -> Value {
		let children = self.children.borrow();
		match &*self.source.borrow() {
			Source::Object(map) => {
				let mut out = map.clone();
				for (key, child) in children.iter() {
					if let Key::Name(name) = key {
						out.insert(name.clone(), child.body.snapshot());
					}
				}
				Value::Object(out)
			}
			Source::Array(items) => {
				let mut out = items.clone();
				for (key, child) in children.iter() {
					if let Key::Index(slot) = key {
						if let Some(slot_value) = out.get_mut(*slot) {
							*slot_value = child.body.snapshot();
						}
					}
				}
				Value::Array(out)
			}
		}
	}

	pub(crate) fn add_reaction(&self, key: Key, effect: Option<SideEffect>) {
		let effect = match effect {
			Some(effect) => effect,
			None => return,
		};

		trace!(key = %key, "subscribe");
		self.observed.set(true);
		effect.note_subscription(self.this.clone(), key.clone());
		self.subscribers
			.borrow_mut()
			.entry(key)
			.or_default()
			.push(effect);
	}

	pub(crate) fn remove_reaction(&self, key: &Key, effect: &SideEffect) {
		let mut subscribers = self.subscribers.borrow_mut();
		if let Some(list) = subscribers.get_mut(key) {
			list.retain(|entry| !Rc::ptr_eq(&entry.body, &effect.body));
		}
	}

	/// Notifies every subscriber of `key` in subscription order: queued while
	/// a batch is open, run immediately otherwise.
	pub(crate) fn report_changed(&self, key: &Key) {
		let to_run: SmallVec<[SideEffect; 2]> = {
			let mut subscribers = self.subscribers.borrow_mut();
			match subscribers.get_mut(key) {
				Some(list) => {
					list.retain(|effect| !effect.is_disposed());
					list.clone()
				}
				None => return,
			}
		};
		if to_run.is_empty() {
			return;
		}

		trace!(key = %key, subscribers = to_run.len(), "report changed");

		for effect in to_run {
			if in_batch() {
				enqueue(&effect);
			} else {
				effect.run_guarded();
			}
		}
	}

	// Writes while a capture run is collecting have no defined ordering;
	// refuse them outright.
	fn assert_mutable(&self, key: &Key) {
		if is_capturing() {
			panic!("cannot write `{key}` while a dependency capture is active");
		}
	}

	fn shift_children_up(&self, from: usize) {
		let mut children = self.children.borrow_mut();
		let shifted: Vec<(Key, Atom)> = children
			.drain()
			.map(|(key, child)| match key {
				Key::Index(slot) if slot >= from => (Key::Index(slot + 1), child),
				other => (other, child),
			})
			.collect();
		children.extend(shifted);
	}

	fn shift_children_down(&self, removed: usize) {
		let mut children = self.children.borrow_mut();
		let shifted: Vec<(Key, Atom)> = children
			.drain()
			.filter_map(|(key, child)| match key {
				Key::Index(slot) if slot == removed => None,
				Key::Index(slot) if slot > removed => Some((Key::Index(slot - 1), child)),
				other => Some((other, child)),
			})
			.collect();
		children.extend(shifted);
	}
}
