pub mod config;
pub mod error;
pub mod types;

pub use error::{EpiphyteError, EpiphyteResult, ErrorKind};
pub use types::{Chunk, Link, Salt, ThreadId, DEFAULT_FRAGMENT_SIZE, DEFAULT_SALT, LINK_SIZE};
