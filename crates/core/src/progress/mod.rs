//! Structured progress parsing.
//!
//! Turns free-text status lines from the downloader and the transcoder into
//! [`ProgressReport`] values.

mod parser;
mod types;

pub use parser::{
    is_transcoder_status, parse_clock, parse_downloader, parse_duration_line, parse_transcoder,
};
pub use types::{ProgressReport, NOT_AVAILABLE};
pub(crate) use types::clamp_percent;
