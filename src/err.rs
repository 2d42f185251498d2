//! Error interface for this crate.
//!
//! Errors produced while assembling implement [`Error`],
//! which extends [`std::error::Error`] with the information needed to
//! point at the offending part of a source line.
//!
//! This module also re-exports the error types of the other modules,
//! so they can be found in one place.
use std::borrow::Cow;
use std::ops::Range;

pub use crate::asm::{AsmErr, AsmErrKind, OperandErr};
pub use crate::parse::lex::LexErr;
pub use crate::sim::SimErr;
pub use crate::sim::model::ModelErr;

/// The columns of a source line an error refers to.
pub type ErrSpan = Range<usize>;

/// Unified error interface for assembly errors in this crate.
pub trait Error: std::error::Error {
    /// The range of the source line where this error occurs, if known.
    fn span(&self) -> Option<ErrSpan> {
        None
    }

    /// A suggestion on how to fix this error, if one exists.
    fn help(&self) -> Option<Cow<'_, str>>;
}
