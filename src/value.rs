use std::fmt;

use fxhash::FxHashMap;

/// Plain data observed by the engine. Containers nest arbitrarily; every
/// non-container variant is a primitive leaf for dependency tracking.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(String),
	Array(Vec<Value>),
	Object(FxHashMap<String, Value>),
}

impl Value {
	pub fn object<I, K, V>(entries: I) -> Value
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<Value>,
	{
		Value::Object(
			entries
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}

	pub fn array<I, V>(items: I) -> Value
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		Value::Array(items.into_iter().map(Into::into).collect())
	}

	pub fn is_container(&self) -> bool {
		matches!(self, Value::Array(_) | Value::Object(_))
	}

	pub fn is_primitive(&self) -> bool {
		!self.is_container()
	}

	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "bool",
			Value::Int(_) => "int",
			Value::Float(_) => "float",
			Value::Str(_) => "str",
			Value::Array(_) => "array",
			Value::Object(_) => "object",
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			Value::Float(value) => Some(*value),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(value) => Some(value),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Int(i64::from(value))
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Float(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Str(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Str(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Value::Array(items)
	}
}

impl From<FxHashMap<String, Value>> for Value {
	fn from(map: FxHashMap<String, Value>) -> Self {
		Value::Object(map)
	}
}

/// Addresses one slot of a tracked container. `Len` is the array length
/// pseudo-property; reading it participates in capture like any other
/// primitive read.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
	Name(String),
	Index(usize),
	Len,
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Name(name) => f.write_str(name),
			Key::Index(index) => write!(f, "{}", index),
			Key::Len => f.write_str("length"),
		}
	}
}

impl From<&str> for Key {
	fn from(name: &str) -> Self {
		Key::Name(name.to_owned())
	}
}

impl From<String> for Key {
	fn from(name: String) -> Self {
		Key::Name(name)
	}
}

impl From<usize> for Key {
	fn from(index: usize) -> Self {
		Key::Index(index)
	}
}
