//! Content segmentation for message rendering.
//!
//! Splits raw message text into an ordered sequence of [`Segment`]s:
//! verbatim prose and fenced code blocks. Markdown inside prose is left
//! untouched for the presentation layer.

pub mod parser;

pub use parser::{segment, Segment, DEFAULT_LANGUAGE, FENCE, FILENAME_TAG};
