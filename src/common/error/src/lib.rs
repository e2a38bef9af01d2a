//! Error types and result aliases for Arq.
//!
//! Every crate in the workspace reports failures through [`ArqError`]. The
//! variants map onto four caller-visible categories (see [`ErrorKind`]):
//! rejected arguments, provider failures, selector faults and cancellation.

mod error;

pub use error::{ArqError, ArqResult, ErrorKind, GenericError};
