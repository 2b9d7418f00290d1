/// Configuration subsystem - Editor options and the rc file
///
/// This module holds the `:set` option table and loads defaults from an
/// `.exvirc` file.
pub mod rc;

pub use rc::{RcLoader, SetOutcome, Settings};
