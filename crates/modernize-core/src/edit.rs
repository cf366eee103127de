/*!
# Text Edits

Rewrites never touch the parsed buffer. They are expressed as byte-range
replacements against the original text and composed onto a copy,
back-to-front, so earlier offsets stay valid while later ones are spliced.
*/

use serde::Serialize;
use tree_sitter::Node;

/// Half-open byte range `[start, end)` in a unit's original text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn of(node: Node<'_>) -> Self {
        Self::new(node.start_byte(), node.end_byte())
    }

    /// Span from the start of `first` to the end of `last`
    pub fn covering(first: Node<'_>, last: Node<'_>) -> Self {
        Self::new(first.start_byte(), last.end_byte())
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// A single replacement against the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            start: span.start,
            end: span.end,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            start: offset,
            end: offset,
            replacement: text.into(),
        }
    }

    /// Delete `span`; when it occupies whole lines, take the lines with it
    ///
    /// The deletion then starts at the line's first column and swallows the
    /// trailing line break, so no blank line is left behind.
    pub fn remove(text: &str, span: Span) -> Self {
        let line_start = text[..span.start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let lead_is_blank = text[line_start..span.start]
            .chars()
            .all(|c| c == ' ' || c == '\t');

        let rest = &text[span.end..];
        let line_end = rest.find('\n').map(|i| span.end + i);
        let trail_is_blank = text[span.end..line_end.unwrap_or(text.len())]
            .chars()
            .all(|c| c == ' ' || c == '\t' || c == '\r');

        if lead_is_blank && trail_is_blank {
            let end = line_end.map(|i| i + 1).unwrap_or(text.len());
            Self::replace(Span::new(line_start, end), "")
        } else {
            Self::replace(span, "")
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// Net line count removed by this edit in `original`
    pub fn lines_saved(&self, original: &str) -> i64 {
        newlines(&original[self.start..self.end]) as i64 - newlines(&self.replacement) as i64
    }
}

/// Two edits that cannot be composed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOverlap {
    pub first: Span,
    pub second: Span,
}

/// Apply `edits` to a copy of `original`, back-to-front by start offset
///
/// Edits may touch but not overlap. Insertions at the same offset are
/// kept in their given order.
pub fn apply_edits(original: &str, edits: &[Edit]) -> Result<String, EditOverlap> {
    let mut ordered: Vec<(usize, &Edit)> = edits.iter().enumerate().collect();
    ordered.sort_by(|(ia, a), (ib, b)| {
        b.start
            .cmp(&a.start)
            .then(b.end.cmp(&a.end))
            .then(ib.cmp(ia))
    });

    for pair in ordered.windows(2) {
        let later = pair[0].1;
        let earlier = pair[1].1;
        if earlier.end > later.start {
            return Err(EditOverlap {
                first: earlier.span(),
                second: later.span(),
            });
        }
    }

    let mut out = original.to_string();
    for (_, edit) in ordered {
        out.replace_range(edit.start..edit.end, &edit.replacement);
    }
    Ok(out)
}

/// Whether any two edits in `edits` overlap
pub fn edits_overlap(edits: &[Edit]) -> bool {
    let mut spans: Vec<Span> = edits.iter().map(Edit::span).collect();
    spans.sort();
    spans.windows(2).any(|w| w[0].end > w[1].start)
}

/// Number of line breaks in `text`
pub fn newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Number of lines `text` occupies
///
/// A trailing fragment without a final newline counts as a line.
pub fn line_count(text: &str) -> usize {
    let breaks = newlines(text);
    if !text.is_empty() && !text.ends_with('\n') {
        breaks + 1
    } else {
        breaks
    }
}
