pub mod macros;

mod addr;
mod atom;
mod batch;
mod capture;
mod effect;
mod error;
mod handle;
mod value;

pub use atom::{AtomKind, Comparer};
pub use batch::{batch, end_batch, in_batch, in_transaction, run_pending_reactions, start_batch};
pub use effect::{autorun, autorun_as, track, when, EffectKind, SideEffect};
pub use error::Error;
pub use handle::{wrap, Field, Tracked};
pub use value::{Key, Value};
