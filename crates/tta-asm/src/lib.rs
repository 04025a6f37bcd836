//! # tta-asm: Retargetable Assembler for Transport-Triggered Cores
//!
//! `tta-asm` turns instruction text for minimal, move-oriented instruction
//! sets into fixed-width instruction words. An architecture is described
//! declaratively: a register table plus an ordered list of instruction
//! templates, each bound to an encoder.
//!
//! ## Quick Start
//!
//! ```rust
//! use tta_asm::assemble;
//!
//! // P1 core: 16 registers (4-bit fields), 8-bit registers
//! let result = assemble("var1 = 1\nacc += var1", 4, 8).unwrap();
//! assert_eq!(result.words(), &[0x77, 0x07]);
//! ```
//!
//! ## Features
//!
//! - **Declarative catalogues**: templates such as `acc += {:R|V:}` with
//!   typed placeholders, tried in registration order.
//! - **Two-pass labels**: forward references resolved by a layout pass and
//!   an emission pass with pass-invariant line lengths.
//! - **Constant synthesis**: immediates built from accumulate and negate
//!   transports, in a minimal or a fixed-length form.
//! - **Output sinks**: Logisim raw images, hex dumps, bit strings and
//!   listings.

#![forbid(unsafe_code)]
// ── Pedantic lint policy ─────────────────────────────────────────────────
// Field packing narrows between integer widths (i128→u64, u64→u32) on
// purpose; the lints below are expected in this context.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::unreadable_literal,
    clippy::match_same_arms,
    clippy::redundant_closure_for_method_calls,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args,
    clippy::doc_markdown,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::manual_let_else,
    clippy::unnecessary_wraps,
    clippy::many_single_char_names,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc,
    clippy::needless_continue
)]

/// Architecture configuration: register tables, widths, augmentations.
pub mod arch;
/// Two-pass driver, builder API and `AssemblyResult`.
pub mod assembler;
/// Bit/word packing, resolved values and encoder operands.
pub mod encoder;
/// Error types and source-span diagnostics.
pub mod error;
/// Logisim image, hex dump, bit string and size summary.
pub mod output;
/// The P1 transport-triggered core catalogue.
pub mod p1;
/// Template compilation, commands and the ordered registry.
pub mod pattern;
/// Comment stripping and line splitting.
pub mod source;
/// Placeholder kinds and token resolution.
pub mod slot;
/// Label name to offset table.
pub mod symbols;
/// Constant synthesis from primitive transports.
pub mod synth;

// Re-exports
pub use arch::Architecture;
pub use assembler::{Assembler, AssemblyResult};
pub use encoder::{Emission, Operands, Value};
pub use error::{AsmError, Shape, Span};
pub use output::{Format, Summary};
pub use pattern::{Command, EncodeCtx, EncodeFn, Pattern, Registry};
pub use slot::{SlotKind, SlotUnion};
pub use source::SourceLine;
pub use symbols::SymbolTable;
pub use synth::{Policy, Primitives, Synthesizer};

/// Assemble P1 source for `2^register_bits` registers of `word_bits` bits.
///
/// Comments start with `//`; blank lines are ignored.
///
/// # Errors
///
/// Returns [`AsmError`] for an unmatched line, an invalid operand, a
/// duplicate or undefined label, an out-of-range register, or any other
/// encoding issue.
///
/// # Examples
///
/// ```rust
/// use tta_asm::assemble;
///
/// let result = assemble("var1 = 1\n@.end\nvar2 =-= .end", 4, 8).unwrap();
/// assert_eq!(result.label_offset("end"), Some(1));
/// assert_eq!(result.len(), 1 + 17);
/// ```
pub fn assemble(
    source: &str,
    register_bits: u32,
    word_bits: u32,
) -> Result<AssemblyResult, AsmError> {
    Assembler::p1(register_bits, word_bits)?.assemble_str(source)
}

/// Assemble P1 source against an explicit architecture description.
///
/// The architecture supplies the register table, widths, base offset and
/// augmentation constants; the P1 command catalogue is used unchanged.
///
/// # Errors
///
/// Returns [`AsmError`] on assembly failure (see [`assemble`] for details).
///
/// # Examples
///
/// ```rust
/// use tta_asm::{assemble_with, p1};
///
/// let arch = p1::architecture(4, 8)
///     .with_base_offset(0x10)
///     .with_augmentation("N", 1);
/// let result = assemble_with("var1 = 1\nvar2 := &N\n@.end", &arch).unwrap();
/// assert_eq!(result.label_offset("end"), Some(0x10 + 5));
/// ```
pub fn assemble_with(source: &str, arch: &Architecture) -> Result<AssemblyResult, AsmError> {
    Assembler::new(arch.clone(), p1::registry()?).assemble_str(source)
}
