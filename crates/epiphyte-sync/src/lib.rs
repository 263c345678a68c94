//! epiphyte-sync: the chain engine
//!
//! - `thread`: append-only chunk chain anchored at a derived genesis link
//! - `fragment`: splits outbound messages into bounded chunks
//! - `session`: pull (follow until not-found) and push (resync, split, seal, store)

pub mod fragment;
pub mod session;
pub mod thread;

pub use fragment::Fragmenter;
pub use session::{ChainState, PushReceipt, Session, SessionOptions};
pub use thread::{Sealed, Thread};
