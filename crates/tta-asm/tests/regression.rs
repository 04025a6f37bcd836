//! Regression tests for bug fixes.
//!
//! Each test documents a specific bug that was found and fixed, ensuring the
//! fix is never accidentally reverted.

use tta_asm::{
    assemble, assemble_with, p1, AsmError, Assembler, Emission, Policy, Primitives, Registry,
    Shape, Span, Synthesizer,
};

/// Regression: a bare `{` was taken for a label declaration when the brace
/// command was registered after the catch-all.
#[test]
fn brace_is_not_a_label() {
    let result = assemble("{\n@.x\n}", 4, 8).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.labels(), &[("x".to_string(), 0)]);
}

/// Regression: a line that is not a label declaration used to be captured
/// by `{:L:}` and reported as a malformed label instead of as unmatched.
#[test]
fn stray_word_is_unmatched_not_malformed() {
    let err = assemble("halt", 4, 8).unwrap_err();
    assert!(matches!(err, AsmError::UnmatchedInstruction { .. }));
}

/// Regression: the minimal load of an almost-all-ones value came out one
/// word longer than the fixed load.
#[test]
fn minimal_never_longer_than_fixed() {
    for value in [0xFF, 0xFE, 0xFD, 0x7F] {
        let fixed = assemble(&format!("var1 = 1\nvar2 =-= {}", value), 4, 8).unwrap();
        let minimal = assemble(&format!("var1 = 1\nvar2 := {}", value), 4, 8).unwrap();
        assert!(minimal.len() <= fixed.len(), "0x{:X}", value);
    }
}

/// Regression: labels were bound after advancing past their line, so a
/// label on a multi-word line pointed at the next instruction.
#[test]
fn label_binds_before_its_line_advances() {
    let result = assemble("var1 = 1\n@.load\nvar2 =-= 7\n@.after", 4, 8).unwrap();
    assert_eq!(result.label_offset("load"), Some(1));
    assert_eq!(result.label_offset("after"), Some(18));
}

/// Regression: the symbol table survived between runs on the same
/// assembler, turning every second run into a duplicate-label error.
#[test]
fn second_run_starts_fresh() {
    let asm = Assembler::p1(4, 8).unwrap();
    for _ in 0..3 {
        asm.assemble_str("@.once\nvar1 = 1").unwrap();
    }
}

/// Regression: `varN = varN` silently encoded a store of one.
#[test]
fn self_move_of_variable_is_rejected() {
    let err = assemble("var3 = var3", 4, 8).unwrap_err();
    assert!(matches!(err, AsmError::Constraint { .. }));
    assert_eq!(err.span(), Some(Span::new(1, 1, 11)));
}

/// Regression: a comment marker inside a line dropped the whole line.
#[test]
fn trailing_comment_keeps_code() {
    let result = assemble("@.top // entry\nvar1 = 1 // unit", 4, 8).unwrap();
    assert_eq!(result.label_offset("top"), Some(0));
    assert_eq!(result.words(), &[0x77]);
}

/// Regression: register widths of 64 bits overflowed the reduction shift.
#[test]
fn wide_registers() {
    struct Plain;
    impl Primitives for Plain {
        fn accumulator(&self) -> u32 {
            0
        }
        fn negator(&self) -> u32 {
            2
        }
        fn unit(&self) -> u32 {
            7
        }
        fn accumulate(&self, src: u32, _: Span) -> Result<u64, AsmError> {
            Ok(u64::from(src))
        }
        fn negate(&self, src: u32, _: Span) -> Result<u64, AsmError> {
            Ok(0x20 | u64::from(src))
        }
        fn copy(&self, dst: u32, src: u32, _: Span) -> Result<u64, AsmError> {
            Ok(u64::from(dst) << 4 | u64::from(src))
        }
        fn idle(&self, _: Span) -> Result<u64, AsmError> {
            Ok(0x11)
        }
    }
    let synth = Synthesizer::new(&Plain, 64, Span::dummy());
    let words = synth.load(Policy::Fixed, 5, -1, 0).unwrap();
    assert_eq!(words.len(), 129);
    assert_eq!(synth.len(Policy::Minimal, -1), 129);
    assert_eq!(synth.len(Policy::Minimal, 1), 4);
}

/// Regression: a base offset at the top of the range panicked on the
/// offset addition instead of failing the run.
#[test]
fn base_offset_at_top_of_range() {
    let mut asm = Assembler::p1(4, 8).unwrap();
    asm.base_offset(u64::MAX);
    let err = asm.assemble_str("var1 = 1\nacc += var1").unwrap_err();
    assert!(matches!(err, AsmError::OffsetOverflow { offset: u64::MAX, len: 1, .. }));

    asm.base_offset(u64::MAX - 3);
    let err = asm.assemble_str("var1 = 1\nvar2 =-= 5").unwrap_err();
    assert!(matches!(err, AsmError::OffsetOverflow { len: 17, .. }));
    assert_eq!(err.span().map(|s| s.line), Some(2));
}

/// Regression: register fields wider than 32 bits dropped the destination
/// field of the 64-bit word, so a move into a high register encoded as a
/// write to register 0.
#[test]
fn register_fields_wider_than_half_a_word() {
    let err = assemble_with("var1073741818 = var0", &p1::architecture(40, 8)).unwrap_err();
    assert!(matches!(err, AsmError::InvalidArchitecture { .. }));
    assert!(Assembler::p1(33, 8).is_err());
    // 32-bit fields still fill the word exactly
    let result = assemble_with("var1 = var0", &p1::architecture(32, 8)).unwrap();
    assert_eq!(result.words(), &[7u64 << 32 | 6]);
}

/// Regression: a command's encoder was the first to notice a value of the
/// wrong type, after resolution had already succeeded.
#[test]
fn declared_shapes_checked_at_resolution() {
    let mut registry = Registry::new();
    registry
        .register_typed("out {:N|S:}", &[Shape::Number], |ctx, _| {
            Err(AsmError::Constraint {
                detail: "encoder ran".into(),
                span: ctx.span,
            })
        })
        .unwrap();
    let asm = Assembler::new(p1::architecture(4, 8), registry);
    let err = asm.assemble_str("out port").unwrap_err();
    assert_eq!(
        err,
        AsmError::OperandType {
            index: 0,
            expected: Shape::Number,
            found: Some(Shape::Text),
            span: Span::new(1, 5, 4),
        }
    );
    let ok = Assembler::new(p1::architecture(4, 8), {
        let mut r = Registry::new();
        r.register_typed("out {:N|S:}", &[Shape::Number], |_, ops| {
            Ok(Emission::word(ops.number(0)? as u64))
        })
        .unwrap();
        r
    });
    assert_eq!(ok.assemble_str("out 3").unwrap().words(), &[3]);
}
