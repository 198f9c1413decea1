mod combat_event;
mod error;
mod parser;

pub use combat_event::*;
pub use error::DecodeError;
pub use parser::{ParsedPage, parse_page, parse_record};
