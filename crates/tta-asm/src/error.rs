//! Error types and source span tracking for diagnostics.

use std::fmt;

/// Source location for diagnostics.
///
/// Tracks the line, column and length of a source line or of a single
/// operand token within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (byte offset within line).
    pub col: u32,
    /// Byte length of the spanned region.
    pub len: usize,
}

impl Span {
    /// Create a new span.
    #[must_use]
    pub fn new(line: u32, col: u32, len: usize) -> Self {
        Self { line, col, len }
    }

    /// A dummy span for generated/internal constructs.
    #[must_use]
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Narrow a line span to a sub-range starting `start` bytes into the line.
    #[must_use]
    pub fn narrow(self, start: usize, len: usize) -> Self {
        Self {
            line: self.line,
            col: self.col + start as u32,
            len,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// The type of a resolved operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// An integer (immediate, label offset, augmentation constant).
    Number,
    /// A register index.
    Register,
    /// Verbatim token text.
    Text,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Number => write!(f, "number"),
            Shape::Register => write!(f, "register"),
            Shape::Text => write!(f, "text"),
        }
    }
}

/// Assembly error with source location and descriptive message.
///
/// Every error aborts the run: the assembler has no warning-and-continue
/// mode and never returns partial output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AsmError {
    /// No registered pattern accepts the line.
    UnmatchedInstruction {
        /// The raw line text.
        line: String,
        /// Location of the line.
        span: Span,
    },

    /// A placeholder token matched no kind of its union.
    InvalidOperand {
        /// The offending token.
        token: String,
        /// Location of the token.
        span: Span,
    },

    /// A label sigil is present but the remainder is not an identifier.
    MalformedLabel {
        /// The offending token.
        token: String,
        /// Location of the token.
        span: Span,
    },

    /// Label was declared more than once.
    DuplicateLabel {
        /// The duplicated label name.
        label: String,
        /// Offset the duplicate declaration would bind.
        offset: u64,
        /// Offset of the first declaration.
        first_offset: u64,
        /// Location of the first declaration.
        first_span: Span,
        /// Location of the duplicate declaration.
        span: Span,
    },

    /// Referenced label was never declared.
    UndefinedLabel {
        /// The undefined label name.
        label: String,
        /// Location of the reference.
        span: Span,
    },

    /// A register index does not fit the register file.
    RegisterOutOfRange {
        /// The requested register index.
        index: u64,
        /// Number of registers of the architecture.
        count: u64,
        /// Location of the operand.
        span: Span,
    },

    /// A register name is neither a fixed register nor a variable.
    UnknownRegister {
        /// The unrecognized name.
        name: String,
        /// Location of the operand.
        span: Span,
    },

    /// An augmentation key is absent from the configuration.
    UnknownAugmentation {
        /// The missing key.
        key: String,
        /// Location of the operand.
        span: Span,
    },

    /// An encoder read an operand of the wrong type.
    OperandType {
        /// 0-based operand position.
        index: usize,
        /// The type the encoder expected.
        expected: Shape,
        /// The type that was resolved, `None` when the operand is missing.
        found: Option<Shape>,
        /// Location of the line.
        span: Span,
    },

    /// Operands are well-formed but violate an instruction constraint.
    Constraint {
        /// Description of the violated constraint.
        detail: String,
        /// Location of the line.
        span: Span,
    },

    /// An instruction template could not be compiled.
    InvalidPattern {
        /// The template text.
        template: String,
        /// Why compilation failed.
        detail: String,
    },

    /// A line's words would run past the last representable offset.
    OffsetOverflow {
        /// Offset of the line's first word.
        offset: u64,
        /// Words the line emits.
        len: usize,
        /// Location of the line.
        span: Span,
    },

    /// The architecture cannot be encoded into instruction words.
    InvalidArchitecture {
        /// Why the configuration is rejected.
        detail: String,
    },

    /// A line emitted a different number of words in the two passes.
    LengthMismatch {
        /// Words emitted during the layout pass.
        layout: usize,
        /// Words emitted during the emission pass.
        emitted: usize,
        /// Location of the line.
        span: Span,
    },
}

impl AsmError {
    /// Source location of the error, if it has one.
    #[must_use]
    pub fn span(&self) -> Option<Span> {
        match self {
            AsmError::UnmatchedInstruction { span, .. }
            | AsmError::InvalidOperand { span, .. }
            | AsmError::MalformedLabel { span, .. }
            | AsmError::DuplicateLabel { span, .. }
            | AsmError::UndefinedLabel { span, .. }
            | AsmError::RegisterOutOfRange { span, .. }
            | AsmError::UnknownRegister { span, .. }
            | AsmError::UnknownAugmentation { span, .. }
            | AsmError::OperandType { span, .. }
            | AsmError::Constraint { span, .. }
            | AsmError::OffsetOverflow { span, .. }
            | AsmError::LengthMismatch { span, .. } => Some(*span),
            AsmError::InvalidPattern { .. } | AsmError::InvalidArchitecture { .. } => None,
        }
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmError::UnmatchedInstruction { line, span } => {
                write!(f, "{}: no matching instruction for '{}'", span, line)
            }
            AsmError::InvalidOperand { token, span } => {
                write!(f, "{}: invalid operand '{}'", span, token)
            }
            AsmError::MalformedLabel { token, span } => {
                write!(f, "{}: malformed label '{}'", span, token)
            }
            AsmError::DuplicateLabel {
                label,
                offset,
                first_offset,
                first_span,
                span,
            } => {
                write!(
                    f,
                    "{}: duplicate label '{}' at 0x{:X} (first declared at 0x{:X}, {})",
                    span, label, offset, first_offset, first_span
                )
            }
            AsmError::UndefinedLabel { label, span } => {
                write!(f, "{}: undefined label '{}'", span, label)
            }
            AsmError::RegisterOutOfRange { index, count, span } => {
                write!(
                    f,
                    "{}: register index {} out of range ({} registers)",
                    span, index, count
                )
            }
            AsmError::UnknownRegister { name, span } => {
                write!(f, "{}: unknown register '{}'", span, name)
            }
            AsmError::UnknownAugmentation { key, span } => {
                write!(f, "{}: unknown augmentation '{}'", span, key)
            }
            AsmError::OperandType {
                index,
                expected,
                found,
                span,
            } => match found {
                Some(found) => write!(
                    f,
                    "{}: operand {} is a {}, expected a {}",
                    span, index, found, expected
                ),
                None => write!(
                    f,
                    "{}: missing operand {}, expected a {}",
                    span, index, expected
                ),
            },
            AsmError::Constraint { detail, span } => {
                write!(f, "{}: {}", span, detail)
            }
            AsmError::InvalidPattern { template, detail } => {
                write!(f, "invalid instruction pattern '{}': {}", template, detail)
            }
            AsmError::OffsetOverflow { offset, len, span } => {
                write!(
                    f,
                    "{}: {} words at 0x{:X} overflow the offset range",
                    span, len, offset
                )
            }
            AsmError::InvalidArchitecture { detail } => {
                write!(f, "invalid architecture: {}", detail)
            }
            AsmError::LengthMismatch {
                layout,
                emitted,
                span,
            } => {
                write!(
                    f,
                    "{}: line emitted {} words but layout reserved {}",
                    span, emitted, layout
                )
            }
        }
    }
}

impl std::error::Error for AsmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_display() {
        let span = Span::new(3, 12, 5);
        assert_eq!(format!("{}", span), "3:12");
    }

    #[test]
    fn span_narrow() {
        let span = Span::new(4, 3, 20).narrow(6, 4);
        assert_eq!(span, Span::new(4, 9, 4));
    }

    #[test]
    fn error_unmatched_display() {
        let err = AsmError::UnmatchedInstruction {
            line: "jump away".into(),
            span: Span::new(7, 1, 9),
        };
        assert_eq!(
            format!("{}", err),
            "7:1: no matching instruction for 'jump away'"
        );
    }

    #[test]
    fn error_register_out_of_range_display() {
        let err = AsmError::RegisterOutOfRange {
            index: 17,
            count: 16,
            span: Span::new(2, 1, 5),
        };
        assert_eq!(
            format!("{}", err),
            "2:1: register index 17 out of range (16 registers)"
        );
    }

    #[test]
    fn error_duplicate_label_display() {
        let err = AsmError::DuplicateLabel {
            label: "loop".into(),
            offset: 0x20,
            first_offset: 0x4,
            first_span: Span::new(3, 1, 6),
            span: Span::new(20, 1, 6),
        };
        assert_eq!(
            format!("{}", err),
            "20:1: duplicate label 'loop' at 0x20 (first declared at 0x4, 3:1)"
        );
    }

    #[test]
    fn error_offset_overflow_display() {
        let err = AsmError::OffsetOverflow {
            offset: u64::MAX,
            len: 2,
            span: Span::new(1, 1, 8),
        };
        assert_eq!(
            format!("{}", err),
            "1:1: 2 words at 0xFFFFFFFFFFFFFFFF overflow the offset range"
        );
        assert_eq!(err.span(), Some(Span::new(1, 1, 8)));
    }

    #[test]
    fn error_invalid_architecture_has_no_span() {
        let err = AsmError::InvalidArchitecture {
            detail: "register fields of 40 bits do not fit a 64-bit word".into(),
        };
        assert_eq!(err.span(), None);
    }

    #[test]
    fn error_operand_type_display() {
        let err = AsmError::OperandType {
            index: 1,
            expected: Shape::Register,
            found: Some(Shape::Text),
            span: Span::new(1, 1, 3),
        };
        assert_eq!(
            format!("{}", err),
            "1:1: operand 1 is a text, expected a register"
        );
        let err = AsmError::OperandType {
            index: 2,
            expected: Shape::Number,
            found: None,
            span: Span::new(1, 1, 3),
        };
        assert_eq!(
            format!("{}", err),
            "1:1: missing operand 2, expected a number"
        );
    }

    #[test]
    fn error_invalid_pattern_has_no_span() {
        let err = AsmError::InvalidPattern {
            template: "{:Q:}".into(),
            detail: "unknown slot selector 'Q'".into(),
        };
        assert_eq!(err.span(), None);
        assert_eq!(
            format!("{}", err),
            "invalid instruction pattern '{:Q:}': unknown slot selector 'Q'"
        );
    }

    #[test]
    fn error_span_accessor() {
        let err = AsmError::UndefinedLabel {
            label: "end".into(),
            span: Span::new(9, 4, 4),
        };
        assert_eq!(err.span(), Some(Span::new(9, 4, 4)));
    }
}
