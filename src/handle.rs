use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::atom::{Atom, AtomKind, Slot};
use crate::error::Error;
use crate::value::{Key, Value};

/// Wraps a plain container into a tracked handle of the same shape.
pub fn wrap(value: Value) -> Result<Tracked, Error> {
	let cell = match value {
		Value::Object(map) => Atom::object(map),
		Value::Array(items) => Atom::array(items),
		other => return Err(Error::NotObservable(other.type_name())),
	};
	trace!(kind = %cell.body.kind(), "wrap");
	Ok(Tracked { cell })
}

/// The public accessor over one cell. All reads and writes the consumer
/// performs go through here; clones address the same cell.
#[derive(Clone)]
pub struct Tracked {
	cell: Atom,
}

/// A successful read: a primitive leaf, or the handle of a nested cell.
pub enum Field {
	Value(Value),
	Tracked(Tracked),
}

impl Field {
	pub fn into_value(self) -> Option<Value> {
		match self {
			Field::Value(value) => Some(value),
			Field::Tracked(_) => None,
		}
	}

	pub fn into_tracked(self) -> Option<Tracked> {
		match self {
			Field::Tracked(tracked) => Some(tracked),
			Field::Value(_) => None,
		}
	}
}

impl Tracked {
	pub fn kind(&self) -> AtomKind {
		self.cell.body.kind()
	}

	pub fn get(&self, key: impl Into<Key>) -> Option<Field> {
		match self.cell.body.get(&key.into()) {
			Slot::Missing => None,
			Slot::Primitive(value) => Some(Field::Value(value)),
			Slot::Child(cell) => Some(Field::Tracked(Tracked { cell })),
		}
	}

	pub fn get_value(&self, key: impl Into<Key>) -> Option<Value> {
		self.get(key).and_then(Field::into_value)
	}

	pub fn child(&self, key: impl Into<Key>) -> Option<Tracked> {
		self.get(key).and_then(Field::into_tracked)
	}

	/// Raw field assignment: always reports, no equality check.
	pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), Error> {
		self.cell.body.set(key.into(), value.into())
	}

	/// Comparer-guarded assignment: reports only on change. Returns the
	/// previous value.
	pub fn replace(
		&self,
		key: impl Into<Key>,
		value: impl Into<Value>,
	) -> Result<Option<Value>, Error> {
		self.cell.body.replace(key.into(), value.into())
	}

	pub fn len(&self) -> Result<usize, Error> {
		self.cell.body.len()
	}

	pub fn push(&self, value: impl Into<Value>) -> Result<(), Error> {
		self.cell.body.push(value.into())
	}

	pub fn pop(&self) -> Result<Option<Value>, Error> {
		self.cell.body.pop()
	}

	pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<(), Error> {
		self.cell.body.insert(index, value.into())
	}

	pub fn remove(&self, index: usize) -> Result<Value, Error> {
		self.cell.body.remove(index)
	}

	pub fn snapshot(&self) -> Value {
		self.cell.body.snapshot()
	}

	pub fn is_observed(&self) -> bool {
		self.cell.body.is_observed()
	}

	pub fn set_comparer(&self, comparer: impl Fn(&Value, &Value) -> bool + 'static) {
		self.cell.body.set_comparer(Rc::new(comparer));
	}
}

impl fmt::Debug for Tracked {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.snapshot(), f)
	}
}
