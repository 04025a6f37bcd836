//! Output sinks for an assembled program.
//!
//! The assembler only produces words; these helpers render them for the
//! Logisim ROM loader, for inspection, or as a raw bit stream.

use std::fmt;

use crate::arch::Architecture;
use crate::assembler::AssemblyResult;
use crate::encoder::to_binary;

/// First line of a Logisim raw image.
pub const SIM_HEADER: &str = "v2.0 raw";

/// Logisim ROM image: header line, then lowercase hex words separated by
/// single spaces.
///
/// # Examples
///
/// ```
/// use tta_asm::output::sim_image;
///
/// assert_eq!(sim_image(&[0x77, 0x07, 0xa0]), "v2.0 raw\n77 7 a0");
/// ```
pub fn sim_image(words: &[u64]) -> String {
    let body: Vec<String> = words.iter().map(|w| format!("{:x}", w)).collect();
    format!("{}\n{}", SIM_HEADER, body.join(" "))
}

/// One `offset: word` line per word, words zero-padded to `bits` bits.
pub fn hex_dump(words: &[u64], base: u64, bits: u32) -> String {
    use std::fmt::Write;

    let digits = bits.div_ceil(4).max(1) as usize;
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        let _ = writeln!(out, "{:08X}: {:0digits$X}", base.wrapping_add(i as u64), word);
    }
    out
}

/// All words as `width`-bit binary fields, concatenated.
pub fn bit_string(words: &[u64], width: u32) -> String {
    words
        .iter()
        .map(|&w| to_binary(i128::from(w), width))
        .collect()
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Format {
    /// Logisim `v2.0 raw` image.
    Sim,
    /// Hex dump with offsets.
    Hex,
    /// Concatenated binary fields.
    Bits,
    /// Offset, word and source listing.
    Listing,
}

impl Format {
    /// File extension appended to the source path.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Sim => "sim",
            Format::Hex => "hex",
            Format::Bits => "bits",
            Format::Listing => "lst",
        }
    }

    /// Render `result` in this format.
    pub fn render(self, result: &AssemblyResult) -> String {
        match self {
            Format::Sim => sim_image(result.words()),
            Format::Hex => hex_dump(
                result.words(),
                result.base_offset(),
                result.instruction_bits(),
            ),
            Format::Bits => bit_string(result.words(), result.instruction_bits()),
            Format::Listing => result.listing(),
        }
    }
}

/// Program size against the memory a `w`-bit program counter reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    /// Executable size in instructions.
    pub instructions: usize,
    /// Program memory in words, also the data memory in bits: `2^w`.
    pub memory: u64,
}

impl Summary {
    /// Summarize `result` assembled for `arch`.
    pub fn new(result: &AssemblyResult, arch: &Architecture) -> Self {
        Self {
            instructions: result.len(),
            memory: arch.memory_size(),
        }
    }

    /// Share of program memory used, truncated to a whole percent.
    pub fn percent(&self) -> u128 {
        if self.memory == 0 {
            return 0;
        }
        100 * self.instructions as u128 / u128::from(self.memory)
    }

    /// Data memory in bytes, rounded up.
    pub fn ram_bytes(&self) -> u64 {
        self.memory.div_ceil(8)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Executable size: {} instructions [ {} % ]",
            self.instructions,
            self.percent()
        )?;
        let bytes = self.ram_bytes();
        write!(
            f,
            "Available RAM size: {} bits = {} byte{}",
            self.memory,
            bytes,
            if bytes == 1 { "" } else { "s" }
        )
    }
}
