//! Line source: turns raw program text into the trimmed, comment-free,
//! non-empty lines the assembler consumes.
//!
//! Comments start with `//` and run to the end of the line. Each surviving
//! line keeps its [`Span`] so diagnostics can point back into the file.

use crate::error::Span;

/// Comment marker.
pub const COMMENT: &str = "//";

/// One line of program text, ready to be matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine<'src> {
    /// Trimmed line text without its comment.
    pub text: &'src str,
    /// Location of `text` in the original source.
    pub span: Span,
}

impl<'src> SourceLine<'src> {
    /// Wrap an already-clean line (no comment, no surrounding whitespace).
    #[must_use]
    pub fn new(text: &'src str, line: u32) -> Self {
        Self {
            text,
            span: Span::new(line, 1, text.len()),
        }
    }
}

/// Split `source` into assembler lines.
///
/// Blank lines and comment-only lines are dropped; line numbers stay
/// those of the original text.
///
/// # Examples
///
/// ```
/// use tta_asm::source::lines;
///
/// let lines = lines("// header\n  acc += var1  // add\n\n{\n");
/// let texts: Vec<&str> = lines.iter().map(|l| l.text).collect();
/// assert_eq!(texts, ["acc += var1", "{"]);
/// assert_eq!(lines[0].span.line, 2);
/// assert_eq!(lines[0].span.col, 3);
/// ```
#[must_use]
pub fn lines(source: &str) -> Vec<SourceLine<'_>> {
    let mut out = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let code = match raw.find(COMMENT) {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        let text = code.trim();
        if text.is_empty() {
            continue;
        }
        let lead = code.len() - code.trim_start().len();
        out.push(SourceLine {
            text,
            span: Span::new(idx as u32 + 1, lead as u32 + 1, text.len()),
        });
    }
    out
}
