//! Architecture configuration: register file geometry, register names and
//! build-time augmentation constants.
//!
//! An [`Architecture`] is plain data. The generic engine consults it to
//! resolve register operands and augmentation tokens; a command catalogue
//! such as [`crate::p1`] decides what the registers mean.

use std::collections::BTreeMap;

use crate::error::{AsmError, Span};

/// Default prefix of indexed general-purpose registers (`var0`, `var1`, ...).
pub const DEFAULT_VARIABLE_PREFIX: &str = "var";

/// Widest register field: two fields must fit one 64-bit word.
pub const MAX_REGISTER_BITS: u32 = 32;

/// Register file and constant configuration for one target.
///
/// # Examples
///
/// ```
/// use tta_asm::Architecture;
///
/// let arch = Architecture::new("demo", 3, 8)
///     .with_register("A", 0)
///     .with_register("B", 1);
/// assert_eq!(arch.register_count(), 8);
/// assert_eq!(arch.instruction_bits(), 6);
/// // variables are numbered after the two fixed registers
/// assert_eq!(arch.register("var0", Default::default()), Ok(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Architecture {
    /// Human-readable target name.
    pub name: String,
    /// Register-count exponent `r`: the register file has `2^r` registers
    /// and every register field is `r` bits wide.
    pub register_bits: u32,
    /// Register width `w` in bits, used for constant synthesis.
    pub word_bits: u32,
    /// Offset of the first emitted word.
    pub base_offset: u64,
    /// Architecturally fixed registers by name.
    pub registers: BTreeMap<String, u32>,
    /// Name prefix of indexed general-purpose registers.
    pub variable_prefix: String,
    /// Named build-time constants available to `Augmentation` slots.
    pub augmentations: BTreeMap<String, i128>,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            name: String::from("generic"),
            register_bits: 4,
            word_bits: 8,
            base_offset: 0,
            registers: BTreeMap::new(),
            variable_prefix: String::from(DEFAULT_VARIABLE_PREFIX),
            augmentations: BTreeMap::new(),
        }
    }
}

impl Architecture {
    /// Create an architecture with `2^register_bits` registers and
    /// `word_bits`-wide registers, no named registers and no augmentations.
    pub fn new(name: &str, register_bits: u32, word_bits: u32) -> Self {
        Self {
            name: String::from(name),
            register_bits,
            word_bits,
            ..Self::default()
        }
    }

    /// Name a fixed register.
    pub fn with_register(mut self, name: &str, index: u32) -> Self {
        self.registers.insert(String::from(name), index);
        self
    }

    /// Define a build-time augmentation constant.
    pub fn with_augmentation(mut self, key: &str, value: i128) -> Self {
        self.augmentations.insert(String::from(key), value);
        self
    }

    /// Set the offset of the first emitted word.
    pub fn with_base_offset(mut self, offset: u64) -> Self {
        self.base_offset = offset;
        self
    }

    /// Set the prefix of indexed general-purpose registers.
    pub fn with_variable_prefix(mut self, prefix: &str) -> Self {
        self.variable_prefix = String::from(prefix);
        self
    }

    /// Number of registers, `2^r`.
    pub fn register_count(&self) -> u64 {
        1u64.checked_shl(self.register_bits).unwrap_or(u64::MAX)
    }

    /// Width of a two-field transport word, `2r`.
    pub fn instruction_bits(&self) -> u32 {
        self.register_bits.saturating_mul(2)
    }

    /// Check that two register fields fit one instruction word.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidArchitecture`] if `register_bits` is zero or
    /// wider than [`MAX_REGISTER_BITS`].
    pub fn validate(&self) -> Result<(), AsmError> {
        if self.register_bits == 0 || self.register_bits > MAX_REGISTER_BITS {
            return Err(AsmError::InvalidArchitecture {
                detail: format!(
                    "register fields of {} bits; expected 1 to {}",
                    self.register_bits, MAX_REGISTER_BITS
                ),
            });
        }
        Ok(())
    }

    /// Number of words addressable with a `w`-bit register, `2^w`.
    pub fn memory_size(&self) -> u64 {
        1u64.checked_shl(self.word_bits).unwrap_or(u64::MAX)
    }

    /// Index of `var0`: variables follow the fixed registers.
    pub fn variable_base(&self) -> u64 {
        self.registers.len() as u64
    }

    /// Look up a fixed register by name.
    pub fn fixed_register(&self, name: &str) -> Option<u32> {
        self.registers.get(name).copied()
    }

    /// Resolve a variable token such as `var3`.
    ///
    /// Returns `None` when the token is not shaped like a variable, and an
    /// error when it is but the index falls outside the register file.
    pub fn variable(&self, token: &str, span: Span) -> Option<Result<u32, AsmError>> {
        let digits = token.strip_prefix(self.variable_prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = digits
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_add(self.variable_base()))
            .unwrap_or(u64::MAX);
        Some(self.check_register(index, span))
    }

    /// Resolve a register by name: fixed registers first, then variables.
    ///
    /// # Errors
    ///
    /// [`AsmError::UnknownRegister`] if the name is neither, or
    /// [`AsmError::RegisterOutOfRange`] if it names a register past the file.
    pub fn register(&self, name: &str, span: Span) -> Result<u32, AsmError> {
        if let Some(index) = self.fixed_register(name) {
            return self.check_register(u64::from(index), span);
        }
        match self.variable(name, span) {
            Some(res) => res,
            None => Err(AsmError::UnknownRegister {
                name: String::from(name),
                span,
            }),
        }
    }

    /// Check that `index` addresses a register of this architecture.
    pub fn check_register(&self, index: u64, span: Span) -> Result<u32, AsmError> {
        let count = self.register_count();
        if index >= count {
            return Err(AsmError::RegisterOutOfRange { index, count, span });
        }
        u32::try_from(index).map_err(|_| AsmError::RegisterOutOfRange { index, count, span })
    }

    /// Look up an augmentation constant.
    pub fn augmentation(&self, key: &str, span: Span) -> Result<i128, AsmError> {
        self.augmentations
            .get(key)
            .copied()
            .ok_or_else(|| AsmError::UnknownAugmentation {
                key: String::from(key),
                span,
            })
    }

    /// Display name of a register index, used in diagnostics and logs.
    pub fn register_name(&self, index: u32) -> String {
        if let Some((name, _)) = self.registers.iter().find(|(_, i)| **i == index) {
            return name.clone();
        }
        match u64::from(index).checked_sub(self.variable_base()) {
            Some(n) => format!("{}{}", self.variable_prefix, n),
            None => format!("reg{}", index),
        }
    }
}
