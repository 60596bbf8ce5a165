//! Plain-text transcript rendering for terminal front ends.

use colloquy_core::{Message, MessageId, Role};
use colloquy_segment::{segment, Segment};

/// Render one message as terminal lines.
///
/// The first line is the role header; `pending` marks a message still
/// awaiting confirmation. Prose keeps its own line breaks and blank lines,
/// except the single line break that separates it from an adjacent fence.
/// Code blocks are framed with a header naming the file or language.
pub fn render_message(message: &Message, pending: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let header = if pending {
        format!("[{who}] (sending...)")
    } else {
        format!("[{who}] {}", message.timestamp.format("%H:%M"))
    };
    lines.push(header);

    let segments = segment(&message.content);
    for (i, seg) in segments.iter().enumerate() {
        match seg {
            Segment::Prose { text } => {
                let mut text = text.as_str();
                if i > 0 && segments[i - 1].is_code() {
                    text = text.strip_prefix('\n').unwrap_or(text);
                }
                if segments.get(i + 1).is_some_and(Segment::is_code) {
                    text = text.strip_suffix('\n').unwrap_or(text);
                }
                if !text.is_empty() {
                    lines.extend(text.split('\n').map(|l| l.trim_end_matches('\r').to_string()));
                }
            }
            Segment::Code {
                text,
                language,
                filename,
            } => {
                let label = filename.as_deref().unwrap_or(language);
                lines.push(format!("  ┌─ {label}"));
                lines.extend(text.lines().map(|l| format!("  │ {l}")));
                lines.push("  └─".to_string());
            }
        }
    }
    lines
}

/// Render a whole transcript, one blank line between messages.
/// `is_pending` tells which messages still await confirmation.
pub fn render_transcript(messages: &[Message], is_pending: impl Fn(&MessageId) -> bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, message) in messages.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.extend(render_message(message, is_pending(&message.id)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(h: u32, m: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, h, m, 0).unwrap()
    }

    #[test]
    fn test_render_prose_message() {
        let msg = Message::new("m1", Role::User, "hello\nthere", at(9, 5));
        assert_eq!(render_message(&msg, false), vec!["[you] 09:05", "hello", "there"]);
    }

    #[test]
    fn test_render_code_block() {
        let msg = Message::new(
            "m2",
            Role::Assistant,
            "Try this:\n```rust\nlet x = 1;\nlet y = 2;\n```\nDone.",
            at(14, 30),
        );
        assert_eq!(
            render_message(&msg, false),
            vec![
                "[assistant] 14:30",
                "Try this:",
                "  ┌─ rust",
                "  │ let x = 1;",
                "  │ let y = 2;",
                "  └─",
                "Done.",
            ]
        );
    }

    #[test]
    fn test_render_filename_block_uses_filename() {
        let msg = Message::new(
            "m3",
            Role::Assistant,
            "```filename\nmain.py\nprint(1)\n```",
            at(8, 0),
        );
        let lines = render_message(&msg, false);
        assert_eq!(lines[1], "  ┌─ main.py");
        assert_eq!(lines[2], "  │ print(1)");
    }

    #[test]
    fn test_render_provisional_marks_pending() {
        let msg = Message::provisional_user("draft");
        assert_eq!(render_message(&msg, true)[0], "[you] (sending...)");
    }

    #[test]
    fn test_render_confirmed_tmp_like_id_is_not_pending() {
        let msg = Message::new("tmp-report", Role::Assistant, "done", at(7, 45));
        assert_eq!(render_message(&msg, false), vec!["[assistant] 07:45", "done"]);
    }

    #[test]
    fn test_render_keeps_blank_lines_in_prose() {
        let msg = Message::new("m4", Role::User, "\nfirst\n\nsecond", at(10, 0));
        assert_eq!(
            render_message(&msg, false),
            vec!["[you] 10:00", "", "first", "", "second"]
        );
    }

    #[test]
    fn test_render_keeps_blank_line_before_fence() {
        let msg = Message::new("m5", Role::Assistant, "Intro\n\n```\nx\n```\n\nOutro", at(10, 0));
        assert_eq!(
            render_message(&msg, false),
            vec![
                "[assistant] 10:00",
                "Intro",
                "",
                "  ┌─ text",
                "  │ x",
                "  └─",
                "",
                "Outro",
            ]
        );
    }

    #[test]
    fn test_render_transcript_separates_messages() {
        let msgs = vec![
            Message::new("m1", Role::User, "q", at(1, 0)),
            Message::new("m2", Role::Assistant, "a", at(1, 1)),
        ];
        assert_eq!(
            render_transcript(&msgs, |_| false),
            vec!["[you] 01:00", "q", "", "[assistant] 01:01", "a"]
        );
    }

    #[test]
    fn test_render_empty_transcript() {
        assert!(render_transcript(&[], |_| false).is_empty());
    }
}
