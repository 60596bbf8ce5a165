//! Single-pass fence scanner.
//!
//! Two states: outside a fence and inside one. Each call to `str::find`
//! resumes where the previous one stopped, so the whole input is scanned
//! in linear time and an unterminated fence simply ends the scan.

use serde::{Deserialize, Serialize};

/// Marker that opens and closes a fenced block.
pub const FENCE: &str = "```";

/// Language assigned to fenced blocks without a tag.
pub const DEFAULT_LANGUAGE: &str = "text";

/// Tag whose block carries a filename on its first line.
pub const FILENAME_TAG: &str = "filename";

/// A contiguous, typed slice of message content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    /// Text outside any fence, verbatim.
    Prose { text: String },
    /// Body of a fenced block, trimmed.
    Code {
        text: String,
        language: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

impl Segment {
    pub fn prose(text: impl Into<String>) -> Self {
        Segment::Prose { text: text.into() }
    }

    pub fn code(text: impl Into<String>, language: impl Into<String>) -> Self {
        Segment::Code {
            text: text.into(),
            language: language.into(),
            filename: None,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Segment::Prose { text } | Segment::Code { text, .. } => text,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Segment::Code { .. })
    }
}

/// An opening marker plus its tag line.
#[derive(Clone, Copy)]
struct Opening<'a> {
    /// Byte offset of the first backtick.
    marker: usize,
    tag: &'a str,
    /// Byte offset just past the newline that ends the tag line.
    body_start: usize,
}

#[derive(Clone, Copy)]
enum ScanState<'a> {
    Outside,
    Inside(Opening<'a>),
}

/// Split `content` into prose and code segments in source order.
///
/// Never fails: anything that does not form a complete fence is kept as
/// prose. Empty content yields no segments.
pub fn segment(content: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut prose_start = 0;
    let mut pos = 0;
    let mut state = ScanState::Outside;

    loop {
        match state {
            ScanState::Outside => {
                let Some(offset) = content[pos..].find(FENCE) else {
                    break;
                };
                let marker = pos + offset;
                match parse_opening(content, marker) {
                    Some(opening) => {
                        pos = opening.body_start;
                        state = ScanState::Inside(opening);
                    }
                    // Not an opening here; a run of backticks may still
                    // open one position later.
                    None => pos = marker + 1,
                }
            }
            ScanState::Inside(opening) => {
                let Some(offset) = content[opening.body_start..].find(FENCE) else {
                    // Unterminated: everything from prose_start is prose.
                    break;
                };
                let close = opening.body_start + offset;
                push_prose(&mut segments, &content[prose_start..opening.marker]);
                segments.push(code_segment(
                    opening.tag,
                    &content[opening.body_start..close],
                ));
                pos = close + FENCE.len();
                prose_start = pos;
                state = ScanState::Outside;
            }
        }
    }

    push_prose(&mut segments, &content[prose_start..]);
    segments
}

/// Try to read an opening fence at `marker`: the marker, an optional tag
/// directly after it, then a line break.
fn parse_opening(content: &str, marker: usize) -> Option<Opening<'_>> {
    let tag_start = marker + FENCE.len();
    let rest = &content[tag_start..];
    let tag_len = rest
        .find(|c: char| c.is_whitespace() || c == '`')
        .unwrap_or(rest.len());
    let tag = &rest[..tag_len];
    let after_tag = &rest[tag_len..];

    let newline_len = if after_tag.starts_with("\r\n") {
        2
    } else if after_tag.starts_with('\n') {
        1
    } else {
        return None;
    };

    Some(Opening {
        marker,
        tag,
        body_start: tag_start + tag_len + newline_len,
    })
}

fn code_segment(tag: &str, body: &str) -> Segment {
    if tag == FILENAME_TAG {
        let (first_line, rest) = body.split_once('\n').unwrap_or((body, ""));
        let filename = first_line.trim();
        return Segment::Code {
            text: rest.trim().to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            filename: (!filename.is_empty()).then(|| filename.to_string()),
        };
    }

    let language = if tag.is_empty() { DEFAULT_LANGUAGE } else { tag };
    Segment::Code {
        text: body.trim().to_string(),
        language: language.to_string(),
        filename: None,
    }
}

fn push_prose(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::prose(text));
    }
}

// =============================================================================
// Tests
// =============================================================================
