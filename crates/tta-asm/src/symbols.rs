//! Symbol table: label name to word offset.
//!
//! Filled during the layout pass and only read afterwards. Every assembly
//! run starts from a fresh table. Each binding keeps the span of its
//! declaration so a duplicate can point back at the first one.

use std::collections::BTreeMap;

use crate::error::{AsmError, Span};

/// A bound label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LabelDef {
    offset: u64,
    span: Span,
}

/// Label name → offset mapping.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    labels: BTreeMap<String, LabelDef>,
    /// Names in declaration order.
    order: Vec<String>,
}

impl SymbolTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `offset`.
    ///
    /// # Errors
    ///
    /// [`AsmError::DuplicateLabel`] if `name` is already bound.
    pub fn declare(&mut self, name: &str, offset: u64, span: Span) -> Result<(), AsmError> {
        if let Some(existing) = self.labels.get(name) {
            return Err(AsmError::DuplicateLabel {
                label: String::from(name),
                offset,
                first_offset: existing.offset,
                first_span: existing.span,
                span,
            });
        }
        self.labels
            .insert(String::from(name), LabelDef { offset, span });
        self.order.push(String::from(name));
        Ok(())
    }

    /// Offset bound to `name`.
    ///
    /// # Errors
    ///
    /// [`AsmError::UndefinedLabel`] if `name` was never declared.
    pub fn lookup(&self, name: &str, span: Span) -> Result<u64, AsmError> {
        self.get(name).ok_or_else(|| AsmError::UndefinedLabel {
            label: String::from(name),
            span,
        })
    }

    /// Offset bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.labels.get(name).map(|def| def.offset)
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(name, offset)` pairs in declaration order.
    pub fn entries(&self) -> Vec<(String, u64)> {
        self.order
            .iter()
            .filter_map(|name| self.get(name).map(|offset| (name.clone(), offset)))
            .collect()
    }
}
