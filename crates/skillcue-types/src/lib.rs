//! Rule data model and error hierarchy for skillcue.

pub mod error;
pub mod rules;
pub mod util;

pub use error::ConfigError;
pub use rules::*;
pub use util::{truncate_str, truncate_with_note};
