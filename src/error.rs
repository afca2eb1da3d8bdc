use thiserror::Error;

use crate::atom::AtomKind;
use crate::value::Key;

#[derive(Debug, Error)]
pub enum Error {
	/// Only container-shaped values can be wrapped; rejected at the factory
	/// boundary.
	#[error("only object or array values can be tracked, got {0}")]
	NotObservable(&'static str),

	#[error("key `{key}` does not address a {kind} cell")]
	KeyMismatch { key: Key, kind: AtomKind },

	#[error("index {index} is out of bounds for length {len}")]
	OutOfBounds { index: usize, len: usize },

	#[error("`{op}` requires an array cell")]
	NotAnArray { op: &'static str },
}
