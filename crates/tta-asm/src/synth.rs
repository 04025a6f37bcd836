//! Constant synthesis: materialize an immediate in a register using only
//! accumulate, negate and copy transports.
//!
//! Both policies run a most-significant-bit-first double-and-add over the
//! value reduced to `w` bits:
//!
//! - [`Policy::Minimal`] zeroes the accumulator, skips leading zero bits
//!   and emits nothing for other zero bits. Its length depends on the value.
//! - [`Policy::Fixed`] doubles and then adds one or idles on every bit, so
//!   its length is always `2w + 1`. After `w` doublings any previous
//!   accumulator content has been shifted out modulo `2^w`, so no zeroing is
//!   needed. Label-derived constants must use this policy: its length does
//!   not depend on the value, which the layout pass does not know yet.
//!
//! A minimal sequence that would come out longer than the fixed one is
//! replaced by the fixed sequence.

use std::fmt;

use crate::error::{AsmError, Span};

/// Length policy of a constant load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Policy {
    /// Data-dependent length, never longer than [`Policy::Fixed`].
    ///
    /// For `w >= 2` both lengths are equal only when the top bit of the
    /// reduced value is set. With `w = 1` every value costs three words
    /// under both policies, `0` included.
    Minimal,
    /// Value-independent length of `2w + 1` words.
    Fixed,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Minimal => write!(f, "minimal"),
            Policy::Fixed => write!(f, "fixed"),
        }
    }
}

/// The primitive transports an architecture offers for synthesis.
///
/// Every method returns a single instruction word.
pub trait Primitives {
    /// The accumulator register.
    fn accumulator(&self) -> u32;

    /// The register that receives negated values.
    fn negator(&self) -> u32;

    /// A register holding the constant one.
    fn unit(&self) -> u32;

    /// `acc += src`.
    fn accumulate(&self, src: u32, span: Span) -> Result<u64, AsmError>;

    /// `neg = -src`.
    fn negate(&self, src: u32, span: Span) -> Result<u64, AsmError>;

    /// `dst = src`.
    fn copy(&self, dst: u32, src: u32, span: Span) -> Result<u64, AsmError>;

    /// A word with no architectural effect, the same length as the others.
    fn idle(&self, span: Span) -> Result<u64, AsmError>;
}

/// Words emitted so far and the offset of the next one.
///
/// Each synthesis step consumes the stream and returns the extended one.
/// The offset wraps past `u64::MAX`; [`Synthesizer::load`] rejects loads
/// that would get there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stream {
    offset: u64,
    words: Vec<u64>,
}

impl Stream {
    /// An empty stream whose first word lands at `offset`.
    pub fn at(offset: u64) -> Self {
        Self {
            offset,
            words: Vec::new(),
        }
    }

    /// Append `word`.
    #[must_use]
    pub fn push(mut self, word: u64) -> Self {
        self.words.push(word);
        self.offset = self.offset.wrapping_add(1);
        self
    }

    /// Offset of the next word.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Words emitted so far.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Number of words emitted so far.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether nothing was emitted.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Consume the stream, returning its words.
    pub fn into_words(self) -> Vec<u64> {
        self.words
    }
}

/// Reduce `value` into `width` bits (Euclidean, so negatives wrap).
pub fn reduce(value: i128, width: u32) -> u128 {
    if width >= 128 {
        value as u128
    } else {
        value.rem_euclid(1i128 << width) as u128
    }
}

/// The `width` bits of `reduced`, most significant first.
fn bits(reduced: u128, width: u32) -> impl Iterator<Item = bool> {
    (0..width)
        .rev()
        .map(move |i| i < 128 && (reduced >> i) & 1 == 1)
}

/// Builds constant loads for one line.
#[derive(Debug)]
pub struct Synthesizer<'p, P: ?Sized> {
    prims: &'p P,
    width: u32,
    span: Span,
}

impl<'p, P: Primitives + ?Sized> Synthesizer<'p, P> {
    /// A synthesizer for `width`-bit registers, reporting errors at `span`.
    pub fn new(prims: &'p P, width: u32, span: Span) -> Self {
        Self { prims, width, span }
    }

    /// Length of the fixed-policy sequence, `2w + 1`.
    pub fn fixed_len(&self) -> usize {
        2 * self.width as usize + 1
    }

    /// Length of the data-dependent sequence before the fixed fallback.
    fn zero_skipping_len(&self, value: i128) -> usize {
        let reduced = reduce(value, self.width);
        let ones = reduced.count_ones() as usize;
        // zeroing (2) + final copy (1)
        let mut len = 3;
        if ones > 0 {
            let significant = (128 - reduced.leading_zeros()) as usize;
            // first set bit: one add; each later bit: one double plus an
            // add for a set bit
            len += 1 + (significant - 1) + (ones - 1);
        }
        len
    }

    /// Number of words [`Synthesizer::load`] emits for `value`.
    pub fn len(&self, policy: Policy, value: i128) -> usize {
        match policy {
            Policy::Fixed => self.fixed_len(),
            Policy::Minimal => self.zero_skipping_len(value).min(self.fixed_len()),
        }
    }

    /// Emit the words loading `value` into `target`, starting at `offset`.
    ///
    /// # Errors
    ///
    /// [`AsmError::OffsetOverflow`] if the words would run past `u64::MAX`,
    /// otherwise primitive encoding errors, e.g. when `target` may not be
    /// written by a plain copy.
    pub fn load(
        &self,
        policy: Policy,
        target: u32,
        value: i128,
        offset: u64,
    ) -> Result<Vec<u64>, AsmError> {
        let reduced = reduce(value, self.width);
        let len = self.len(policy, value);
        if offset.checked_add(len as u64).is_none() {
            return Err(AsmError::OffsetOverflow {
                offset,
                len,
                span: self.span,
            });
        }
        log::debug!(
            "{}: reg{} := {} start ({} policy)",
            self.span,
            target,
            reduced,
            policy
        );
        let stream = Stream::at(offset);
        let stream = match policy {
            Policy::Fixed => self.fixed(target, reduced, stream)?,
            Policy::Minimal if self.zero_skipping_len(value) > self.fixed_len() => {
                self.fixed(target, reduced, stream)?
            }
            Policy::Minimal => self.zero_skipping(target, reduced, stream)?,
        };
        log::debug!(
            "{}: reg{} := {} end ({} words)",
            self.span,
            target,
            reduced,
            stream.len()
        );
        Ok(stream.into_words())
    }

    fn step(&self, stream: Stream, word: u64, what: &str) -> Stream {
        log::trace!("{}: {} at 0x{:X}", self.span, what, stream.offset());
        stream.push(word)
    }

    /// Double-and-add over every bit, idling on zero bits.
    fn fixed(&self, target: u32, reduced: u128, mut stream: Stream) -> Result<Stream, AsmError> {
        let p = self.prims;
        let acc = p.accumulator();
        for bit in bits(reduced, self.width) {
            stream = self.step(stream, p.accumulate(acc, self.span)?, "*2");
            stream = if bit {
                self.step(stream, p.accumulate(p.unit(), self.span)?, "+1")
            } else {
                self.step(stream, p.idle(self.span)?, "+0")
            };
        }
        Ok(self.step(stream, p.copy(target, acc, self.span)?, "store"))
    }

    /// Zero the accumulator, then double-and-add from the first set bit.
    fn zero_skipping(
        &self,
        target: u32,
        reduced: u128,
        mut stream: Stream,
    ) -> Result<Stream, AsmError> {
        let p = self.prims;
        let acc = p.accumulator();
        stream = self.step(stream, p.negate(acc, self.span)?, "neg = -acc");
        stream = self.step(stream, p.accumulate(p.negator(), self.span)?, "acc = 0");
        let mut seen_one = false;
        for bit in bits(reduced, self.width) {
            if seen_one {
                stream = self.step(stream, p.accumulate(acc, self.span)?, "*2");
            }
            if bit {
                seen_one = true;
                stream = self.step(stream, p.accumulate(p.unit(), self.span)?, "+1");
            }
        }
        Ok(self.step(stream, p.copy(target, acc, self.span)?, "store"))
    }
}
