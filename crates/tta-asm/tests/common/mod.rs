//! Test-only P1 interpreter: runs transport words and exposes the
//! register file, so emitted constants can be decoded back to values.

#![allow(dead_code)]

pub const ACC: usize = 0;
pub const IP: usize = 1;
pub const NEG: usize = 2;
pub const COND: usize = 4;
pub const VAR0: usize = 6;

/// A P1 register file with `2^r` registers of `w` bits.
pub struct Machine {
    regs: Vec<u128>,
    r: u32,
    modulus: u128,
}

impl Machine {
    pub fn new(r: u32, w: u32) -> Self {
        Self {
            regs: vec![0; 1 << r],
            r,
            modulus: 1u128 << w,
        }
    }

    /// Preset register `index`.
    pub fn with(mut self, index: usize, value: u128) -> Self {
        self.regs[index] = value % self.modulus;
        self
    }

    /// Execute one transport word.
    pub fn step(&mut self, word: u64) {
        let mask = (1u64 << self.r) - 1;
        let dst = ((word >> self.r) & mask) as usize;
        let src = (word & mask) as usize;
        match dst {
            ACC => self.regs[ACC] = (self.regs[ACC] + self.regs[src]) % self.modulus,
            NEG => self.regs[NEG] = (self.modulus - self.regs[src]) % self.modulus,
            IP | COND if dst == src => {}
            _ if dst == src => self.regs[dst] = 1,
            _ => self.regs[dst] = self.regs[src],
        }
    }

    pub fn run(&mut self, words: &[u64]) -> &mut Self {
        for &word in words {
            self.step(word);
        }
        self
    }

    pub fn reg(&self, index: usize) -> u128 {
        self.regs[index]
    }

    /// Value of `var<n>`.
    pub fn var(&self, n: usize) -> u128 {
        self.regs[VAR0 + n]
    }
}
