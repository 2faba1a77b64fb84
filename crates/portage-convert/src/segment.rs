//! Line-bounded segmentation of source text.

use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_SCHEMA;

/// Separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = "\n\n";

/// Line budget used when none is configured.
pub const DEFAULT_MAX_LINES: usize = 512;

/// Ordered segments of a text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegments {
    /// Segments in text order, none of them empty.
    pub segments: Vec<String>,
}

impl TextSegments {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if the text produced no segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Splits `text` into segments of at most `max_lines` lines.
///
/// The text is cut at the first separator (`"\n\n"` when `separators` is
/// empty) and the pieces are packed greedily: a piece joins the current
/// segment while the running line count stays within `max_lines`. A single
/// piece longer than the budget becomes a segment on its own. Segments with
/// only whitespace are dropped.
pub fn segment_text(text: &str, separators: &[String], max_lines: usize) -> TextSegments {
    let separator = separators
        .first()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SEPARATOR);
    let max_lines = max_lines.max(1);

    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_lines = 0usize;

    for piece in text.split(separator) {
        let lines = piece.matches('\n').count() + 1;
        if !current.is_empty() && current_lines + lines > max_lines {
            push_segment(&mut segments, &current, separator);
            current.clear();
            current_lines = 0;
        }

        if lines > max_lines {
            tracing::warn!(
                target: TRACING_TARGET_SCHEMA,
                lines,
                max_lines,
                "Segment exceeds the line budget"
            );
        }

        current.push(piece);
        current_lines += lines;
    }
    push_segment(&mut segments, &current, separator);

    TextSegments { segments }
}

fn push_segment(segments: &mut Vec<String>, pieces: &[&str], separator: &str) {
    let segment = pieces.join(separator);
    if !segment.trim().is_empty() {
        segments.push(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(name: &str, lines: usize) -> String {
        (0..lines)
            .map(|i| format!("{name}{i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn packs_pieces_within_budget() {
        let text = [block("a", 2), block("b", 2), block("c", 3)].join("\n\n");
        let segments = segment_text(&text, &[], 4);
        assert_eq!(
            segments.segments,
            vec![format!("{}\n\n{}", block("a", 2), block("b", 2)), block("c", 3)]
        );
    }

    #[test]
    fn oversize_piece_stands_alone() {
        let text = [block("a", 1), block("big", 10), block("b", 1)].join("\n\n");
        let segments = segment_text(&text, &[], 3);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments.segments[1], block("big", 10));
    }

    #[test]
    fn never_emits_empty_segments() {
        assert!(segment_text("", &[], 10).is_empty());
        assert!(segment_text("\n\n\n\n", &[], 1).is_empty());

        let segments = segment_text(&format!("\n\n{}", block("a", 5)), &[], 2);
        assert_eq!(segments.segments, vec![block("a", 5)]);
    }

    #[test]
    fn honours_custom_separator() {
        let segments = segment_text("a\n---\nb\n---\nc", &["\n---\n".to_owned()], 2);
        assert_eq!(segments.segments, vec!["a\n---\nb", "c"]);
    }
}
