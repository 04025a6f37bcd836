//! Bit/word encoder: packs resolved operand values into fixed-width fields.
//!
//! Values wider than their field are reduced modulo `2^width`. This is a
//! wraparound, not an error, and applies to negative values as well
//! (`-1` in a 3-bit field is `0b111`).
//!
//! The module also defines the values encoders receive ([`Value`],
//! [`Operands`]) and what they hand back ([`Emission`]).

use crate::error::{AsmError, Shape, Span};

/// A resolved operand value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// An integer: immediate, label offset or augmentation constant.
    Number(i128),
    /// A register index.
    Register(u32),
    /// Verbatim token text.
    Text(String),
}

impl Value {
    /// The type of this value.
    pub fn shape(&self) -> Shape {
        match self {
            Value::Number(_) => Shape::Number,
            Value::Register(_) => Shape::Register,
            Value::Text(_) => Shape::Text,
        }
    }
}

/// Reduce `value` into an unsigned `width`-bit field.
///
/// # Examples
///
/// ```
/// use tta_asm::encoder::mask;
///
/// assert_eq!(mask(5, 2), 1);
/// assert_eq!(mask(-1, 3), 0b111);
/// ```
pub fn mask(value: i128, width: u32) -> u64 {
    if width == 0 {
        return 0;
    }
    if width >= 64 {
        // two's-complement truncation is the modulo-2^64 reduction
        return value as u64;
    }
    value.rem_euclid(1i128 << width) as u64
}

/// Concatenate `(value, width)` fields, first field in the most significant
/// bits. Each value is masked to its width first.
///
/// # Examples
///
/// ```
/// use tta_asm::encoder::pack;
///
/// assert_eq!(pack(&[(0b101, 3), (0b01, 2)]), 0b10101);
/// ```
pub fn pack(fields: &[(i128, u32)]) -> u64 {
    fields.iter().fold(0u64, |acc, &(value, width)| {
        acc.checked_shl(width).unwrap_or(0) | mask(value, width)
    })
}

/// Render `value` as a `width`-digit binary string after masking.
///
/// # Examples
///
/// ```
/// use tta_asm::encoder::to_binary;
///
/// assert_eq!(to_binary(1, 3), "001");
/// assert_eq!(to_binary(9, 3), "001");
/// ```
pub fn to_binary(value: i128, width: u32) -> String {
    if width == 0 {
        return String::new();
    }
    format!("{:0width$b}", mask(value, width), width = width as usize)
}

/// Encode a `dst:src` transport word with `register_bits`-wide fields.
pub fn transport(register_bits: u32, dst: u32, src: u32) -> u64 {
    pack(&[
        (i128::from(dst), register_bits),
        (i128::from(src), register_bits),
    ])
}

/// What an encoder produced for one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emission {
    /// Emitted instruction words, in order.
    pub words: Vec<u64>,
    /// Offsets bound by label declarations on this line.
    pub labels: Vec<u64>,
}

impl Emission {
    /// An emission with no words and no labels.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An emission consisting of `words`.
    pub fn words(words: Vec<u64>) -> Self {
        Self {
            words,
            labels: Vec::new(),
        }
    }

    /// A single-word emission.
    pub fn word(word: u64) -> Self {
        Self::words(vec![word])
    }

    /// Bind a declared label to `offset`.
    pub fn with_label(mut self, offset: u64) -> Self {
        self.labels.push(offset);
        self
    }

    /// Number of emitted words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether no words were emitted.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Typed view of the values passed to an encoder.
///
/// Label declarations contribute no value, so positions here count only
/// the placeholders that resolved to something.
#[derive(Debug, Clone, Copy)]
pub struct Operands<'a> {
    values: &'a [Value],
    span: Span,
}

impl<'a> Operands<'a> {
    /// Wrap resolved values for the line at `span`.
    pub fn new(values: &'a [Value], span: Span) -> Self {
        Self { values, span }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All values.
    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    /// Location of the line being encoded.
    pub fn span(&self) -> Span {
        self.span
    }

    fn mismatch(&self, index: usize, expected: Shape) -> AsmError {
        AsmError::OperandType {
            index,
            expected,
            found: self.values.get(index).map(Value::shape),
            span: self.span,
        }
    }

    /// The integer at `index`.
    pub fn number(&self, index: usize) -> Result<i128, AsmError> {
        match self.values.get(index) {
            Some(Value::Number(n)) => Ok(*n),
            _ => Err(self.mismatch(index, Shape::Number)),
        }
    }

    /// The register index at `index`.
    pub fn register(&self, index: usize) -> Result<u32, AsmError> {
        match self.values.get(index) {
            Some(Value::Register(r)) => Ok(*r),
            _ => Err(self.mismatch(index, Shape::Register)),
        }
    }

    /// The text at `index`.
    pub fn text(&self, index: usize) -> Result<&'a str, AsmError> {
        match self.values.get(index) {
            Some(Value::Text(s)) => Ok(s.as_str()),
            _ => Err(self.mismatch(index, Shape::Text)),
        }
    }
}
