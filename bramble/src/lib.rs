//! Front-end-independent code for loading languages and tokenizing text with them.

mod buffer; // Text storage
mod lang; // Language definition
pub mod outline; // Scope trees

pub use bramble_grammar as grammar;
pub use buffer::{Buffer, Error};
pub use lang::{Lang, LoadError};
pub use outline::Outline;
