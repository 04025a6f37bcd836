//! Public assembler API: the two-pass driver and its result.
//!
//! The layout pass walks every line with label uses resolved to zero,
//! recording each line's length and binding declared labels at the offset
//! where their line begins. The emission pass walks the same lines again
//! with real label offsets from the symbol table and produces the words.
//! Each line must emit the same number of words in both passes; a
//! difference is reported as [`AsmError::LengthMismatch`]. The offset after
//! the last word must fit a `u64`, otherwise the run fails with
//! [`AsmError::OffsetOverflow`].

use crate::arch::Architecture;
use crate::error::{AsmError, Span};
use crate::p1;
use crate::pattern::Registry;
use crate::source::{self, SourceLine};
use crate::symbols::SymbolTable;

/// One source line as placed in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct LineRecord {
    offset: u64,
    len: usize,
    text: String,
    declared: Vec<String>,
}

/// The result of a successful assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[must_use]
pub struct AssemblyResult {
    /// Instruction words, in order.
    words: Vec<u64>,
    /// Label offsets in declaration order.
    labels: Vec<(String, u64)>,
    /// Offset of the first word.
    base_offset: u64,
    /// Width of one instruction word.
    instruction_bits: u32,
    /// Per-line placement, for lengths and listing.
    lines: Vec<LineRecord>,
}

impl AssemblyResult {
    /// The assembled words.
    ///
    /// # Examples
    ///
    /// ```
    /// let result = tta_asm::assemble("var1 = 1\nacc += var1", 4, 8)?;
    /// assert_eq!(result.words(), &[0x77, 0x07]);
    /// # Ok::<(), tta_asm::AsmError>(())
    /// ```
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Consume and return the words.
    #[must_use]
    pub fn into_words(self) -> Vec<u64> {
        self.words
    }

    /// Number of words, the executable size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Label offsets (name, offset) in declaration order.
    #[must_use]
    pub fn labels(&self) -> &[(String, u64)] {
        &self.labels
    }

    /// Look up a label offset by name.
    ///
    /// # Examples
    ///
    /// ```
    /// let result = tta_asm::assemble("@.top\nvar1 = 1\n@.end", 4, 8)?;
    /// assert_eq!(result.label_offset("top"), Some(0));
    /// assert_eq!(result.label_offset("end"), Some(1));
    /// assert_eq!(result.label_offset("missing"), None);
    /// # Ok::<(), tta_asm::AsmError>(())
    /// ```
    #[must_use]
    pub fn label_offset(&self, name: &str) -> Option<u64> {
        self.labels
            .iter()
            .find(|(label, _)| label == name)
            .map(|(_, offset)| *offset)
    }

    /// Offset of the first word.
    #[must_use]
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Width of one instruction word in bits.
    #[must_use]
    pub fn instruction_bits(&self) -> u32 {
        self.instruction_bits
    }

    /// Words emitted by each source line, in order.
    #[must_use]
    pub fn line_lengths(&self) -> Vec<usize> {
        self.lines.iter().map(|line| line.len).collect()
    }

    /// Human-readable listing of offset, hex word and source text.
    ///
    /// Label declarations are shown on their own line with their offset.
    /// Lines that expand to several words show the source text once.
    ///
    /// # Example output
    ///
    /// ```text
    /// 00000000      main:
    /// 00000000  77  var1 = 1
    /// 00000001  07  acc += var1
    /// ```
    #[must_use]
    pub fn listing(&self) -> String {
        use std::fmt::Write;

        let digits = self.instruction_bits.div_ceil(4).max(1) as usize;
        let mut out = String::new();
        let mut words = self.words.iter();
        for line in &self.lines {
            for name in &line.declared {
                let _ = writeln!(out, "{:08X}  {:digits$}  {}:", line.offset, "", name);
            }
            if line.len == 0 {
                if line.declared.is_empty() {
                    let _ = writeln!(out, "{:08X}  {:digits$}  {}", line.offset, "", line.text);
                }
                continue;
            }
            for (i, word) in words.by_ref().take(line.len).enumerate() {
                let offset = line.offset.wrapping_add(i as u64);
                if i == 0 {
                    let _ = writeln!(out, "{:08X}  {:0digits$X}  {}", offset, word, line.text);
                } else {
                    let _ = writeln!(out, "{:08X}  {:0digits$X}", offset, word);
                }
            }
        }
        out
    }
}

/// What the layout pass learned about the program.
#[derive(Debug)]
struct Layout {
    symbols: SymbolTable,
    lengths: Vec<usize>,
    end: u64,
}

/// Offset following a line of `len` words that starts at `offset`.
fn advance(offset: u64, len: usize, span: Span) -> Result<u64, AsmError> {
    offset
        .checked_add(len as u64)
        .ok_or(AsmError::OffsetOverflow { offset, len, span })
}

/// Two-pass assembler over one architecture and command catalogue.
///
/// An `Assembler` holds configuration only. Every call to
/// [`Assembler::assemble`] starts from a fresh symbol table, so one
/// instance can assemble any number of programs.
///
/// # Examples
///
/// ```
/// use tta_asm::Assembler;
///
/// let mut asm = Assembler::p1(4, 8)?;
/// asm.augment("SIZE", 3);
/// let result = asm.assemble_str("var1 = 1\nvar2 := &SIZE")?;
/// assert_eq!(result.len(), 1 + 6);
/// # Ok::<(), tta_asm::AsmError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Assembler {
    arch: Architecture,
    registry: Registry,
}

impl Assembler {
    /// Create an assembler for `arch` using the commands of `registry`.
    pub fn new(arch: Architecture, registry: Registry) -> Self {
        Self { arch, registry }
    }

    /// An assembler for the P1 core with `2^register_bits` registers of
    /// `word_bits` bits.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidArchitecture`] if two register fields do not fit
    /// one word, or [`AsmError::InvalidPattern`] if the P1 catalogue fails
    /// to compile.
    pub fn p1(register_bits: u32, word_bits: u32) -> Result<Self, AsmError> {
        let arch = p1::architecture(register_bits, word_bits);
        arch.validate()?;
        Ok(Self::new(arch, p1::registry()?))
    }

    /// Define an augmentation constant.
    pub fn augment(&mut self, key: &str, value: i128) -> &mut Self {
        self.arch.augmentations.insert(String::from(key), value);
        self
    }

    /// Set the offset of the first emitted word.
    pub fn base_offset(&mut self, offset: u64) -> &mut Self {
        self.arch.base_offset = offset;
        self
    }

    /// The target configuration.
    pub fn architecture(&self) -> &Architecture {
        &self.arch
    }

    /// The command catalogue.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Split `source` into lines and assemble them.
    ///
    /// # Errors
    ///
    /// See [`Assembler::assemble`].
    pub fn assemble_str(&self, source: &str) -> Result<AssemblyResult, AsmError> {
        self.assemble(&source::lines(source))
    }

    /// Assemble already-cleaned lines.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidArchitecture`] for an architecture that cannot be
    /// encoded, then the first matching, resolution, label or encoding
    /// error; no partial output is returned.
    pub fn assemble(&self, lines: &[SourceLine<'_>]) -> Result<AssemblyResult, AsmError> {
        self.arch.validate()?;
        let layout = self.layout(lines)?;
        self.emit(lines, layout)
    }

    fn layout(&self, lines: &[SourceLine<'_>]) -> Result<Layout, AsmError> {
        let mut symbols = SymbolTable::new();
        let mut lengths = Vec::with_capacity(lines.len());
        let mut offset = self.arch.base_offset;
        log::debug!("layout pass: {} lines from 0x{:X}", lines.len(), offset);

        for line in lines {
            let m = self.registry.find(line)?;
            let labels = m.labels()?;
            let emission = m.encode(&self.arch, offset, vec![0; labels.used.len()])?;
            if emission.labels.len() != labels.declared.len() {
                return Err(AsmError::Constraint {
                    detail: format!(
                        "'{}' declares {} labels but its encoder bound {}",
                        m.command().pattern().template(),
                        labels.declared.len(),
                        emission.labels.len()
                    ),
                    span: line.span,
                });
            }
            for (name, &at) in labels.declared.iter().zip(&emission.labels) {
                symbols.declare(name, at, line.span)?;
                log::debug!("{}: label '{}' = 0x{:X}", line.span, name, at);
            }
            offset = advance(offset, emission.len(), line.span)?;
            lengths.push(emission.len());
        }

        log::debug!(
            "layout pass done: {} labels, end at 0x{:X}",
            symbols.len(),
            offset
        );
        Ok(Layout {
            symbols,
            lengths,
            end: offset,
        })
    }

    fn emit(&self, lines: &[SourceLine<'_>], layout: Layout) -> Result<AssemblyResult, AsmError> {
        let mut offset = self.arch.base_offset;
        let mut words = Vec::with_capacity((layout.end - offset) as usize);
        let mut records = Vec::with_capacity(lines.len());
        log::debug!("emission pass: {} lines from 0x{:X}", lines.len(), offset);

        for (line, &reserved) in lines.iter().zip(&layout.lengths) {
            let m = self.registry.find(line)?;
            let labels = m.labels()?;
            let uses = labels
                .used
                .iter()
                .map(|name| layout.symbols.lookup(name, line.span))
                .collect::<Result<Vec<_>, _>>()?;
            let emission = m.encode(&self.arch, offset, uses)?;
            if emission.len() != reserved {
                return Err(AsmError::LengthMismatch {
                    layout: reserved,
                    emitted: emission.len(),
                    span: line.span,
                });
            }
            records.push(LineRecord {
                offset,
                len: emission.len(),
                text: String::from(line.text),
                declared: labels.declared,
            });
            offset = advance(offset, emission.len(), line.span)?;
            words.extend(emission.words);
        }

        log::debug!("emission pass done: {} words", words.len());
        Ok(AssemblyResult {
            words,
            labels: layout.symbols.entries(),
            base_offset: self.arch.base_offset,
            instruction_bits: self.arch.instruction_bits(),
            lines: records,
        })
    }
}
