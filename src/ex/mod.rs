//! The ex command line: addresses, command parsing and execution.
//!
//! A line is parsed and its addresses resolved before anything is touched,
//! so a malformed or out-of-range command never half-applies.

mod address;
mod exec;
mod parser;

pub use address::{Address, AddressBase, RangeSpec};
pub use exec::{ExInput, ExOutcome, Substitution, execute, feed_input};
pub use parser::{
    ExCommand, FileTarget, InputKind, ParsedLine, PrintStyle, SubstituteFlags, parse,
    translate_replacement,
};
