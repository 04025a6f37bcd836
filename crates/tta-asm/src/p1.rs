//! The P1 transport-triggered core.
//!
//! Every P1 instruction is a single `dst:src` transport word with `r`-bit
//! fields. What a transport does depends on the destination:
//!
//! | Destination | Effect |
//! |-------------|--------|
//! | `acc` | `acc += src` |
//! | `neg` | `neg = -src` |
//! | `ip` from `ip` | no-op |
//! | any register from itself | store the constant one |
//! | otherwise | `dst = src` |
//!
//! Fixed registers are `acc=0`, `ip=1`, `neg=2`, `addr=3`, `cond=4`,
//! `else=5`; `var0` is register 6. Constant loads use `var1` as the
//! register holding one, so programs start with `var1 = 1`.

use crate::arch::Architecture;
use crate::encoder::{transport, Emission, Operands};
use crate::error::{AsmError, Shape, Span};
use crate::pattern::{EncodeCtx, Registry};
use crate::synth::{Policy, Primitives, Synthesizer};

/// Fixed register names and indices.
pub const REGISTERS: [(&str, u32); 6] = [
    ("acc", 0),
    ("ip", 1),
    ("neg", 2),
    ("addr", 3),
    ("cond", 4),
    ("else", 5),
];

/// Index of the variable that holds one during constant loads.
pub const UNIT_VARIABLE: u32 = 1;

/// P1 architecture with `2^register_bits` registers of `word_bits` bits.
///
/// # Examples
///
/// ```
/// let arch = tta_asm::p1::architecture(4, 8);
/// assert_eq!(arch.register("acc", Default::default()), Ok(0));
/// assert_eq!(arch.register("var0", Default::default()), Ok(6));
/// ```
pub fn architecture(register_bits: u32, word_bits: u32) -> Architecture {
    REGISTERS
        .iter()
        .fold(Architecture::new("p1", register_bits, word_bits), |arch, &(name, index)| {
            arch.with_register(name, index)
        })
}

/// The P1 command catalogue, in trial order.
///
/// Block braces come first so they are not taken for a label declaration
/// or move; the label declaration catch-all comes last.
pub fn registry() -> Result<Registry, AsmError> {
    use Shape::{Number, Register, Text};

    let mut registry = Registry::new();
    registry
        .register_typed("{", &[], block)?
        .register_typed("}", &[], block)?
        .register_typed("{:R|V:} = 1", &[Register], store_one)?
        .register_typed("acc += {:R|V:}", &[Register], accumulate)?
        .register_typed("neg = -{:R|V:}", &[Register], negate)?
        .register_typed("{:R|V:} = {:R|V:}", &[Register, Register], move_register)?
        .register_typed("{:S:} := {:X|E|N:}", &[Text, Number], load_minimal)?
        .register_typed("{:S:} =-= {:X|E|N:}", &[Text, Number], load_fixed)?
        .register_typed("{:L:}", &[], declare_label)?;
    Ok(registry)
}

/// Roles of the fixed registers, resolved from the architecture tables.
#[derive(Debug, Clone, Copy)]
struct Core<'a> {
    arch: &'a Architecture,
    acc: u32,
    ip: u32,
    neg: u32,
    cond: u32,
    unit: u32,
}

impl<'a> Core<'a> {
    fn new(arch: &'a Architecture, span: Span) -> Result<Self, AsmError> {
        let unit = format!("{}{}", arch.variable_prefix, UNIT_VARIABLE);
        Ok(Self {
            arch,
            acc: arch.register("acc", span)?,
            ip: arch.register("ip", span)?,
            neg: arch.register("neg", span)?,
            cond: arch.register("cond", span)?,
            unit: arch.register(&unit, span)?,
        })
    }

    fn word(&self, dst: u32, src: u32) -> u64 {
        transport(self.arch.register_bits, dst, src)
    }

    fn name(&self, index: u32) -> String {
        self.arch.register_name(index)
    }
}

impl Primitives for Core<'_> {
    fn accumulator(&self) -> u32 {
        self.acc
    }

    fn negator(&self) -> u32 {
        self.neg
    }

    fn unit(&self) -> u32 {
        self.unit
    }

    fn accumulate(&self, src: u32, _: Span) -> Result<u64, AsmError> {
        Ok(self.word(self.acc, src))
    }

    fn negate(&self, src: u32, _: Span) -> Result<u64, AsmError> {
        Ok(self.word(self.neg, src))
    }

    fn copy(&self, dst: u32, src: u32, span: Span) -> Result<u64, AsmError> {
        if dst == self.acc || dst == self.neg {
            return Err(AsmError::Constraint {
                detail: format!(
                    "cannot move into '{}': writes to it do not copy",
                    self.name(dst)
                ),
                span,
            });
        }
        if dst == src && dst != self.ip && dst != self.cond {
            return Err(AsmError::Constraint {
                detail: format!(
                    "'{0} = {0}' stores one; write '{0} = 1'",
                    self.name(dst)
                ),
                span,
            });
        }
        Ok(self.word(dst, src))
    }

    fn idle(&self, _: Span) -> Result<u64, AsmError> {
        Ok(self.word(self.ip, self.ip))
    }
}

fn block(_: &EncodeCtx<'_>, _: &Operands<'_>) -> Result<Emission, AsmError> {
    Ok(Emission::empty())
}

fn store_one(ctx: &EncodeCtx<'_>, ops: &Operands<'_>) -> Result<Emission, AsmError> {
    let core = Core::new(ctx.arch, ctx.span)?;
    let n = ops.register(0)?;
    if [core.ip, core.cond, core.acc, core.neg].contains(&n) {
        return Err(AsmError::Constraint {
            detail: format!("cannot store one into '{}'", core.name(n)),
            span: ctx.span,
        });
    }
    log::trace!("{}: {} = 1 at 0x{:X}", ctx.span, core.name(n), ctx.offset);
    Ok(Emission::word(core.word(n, n)))
}

fn accumulate(ctx: &EncodeCtx<'_>, ops: &Operands<'_>) -> Result<Emission, AsmError> {
    let core = Core::new(ctx.arch, ctx.span)?;
    let n = ops.register(0)?;
    log::trace!("{}: acc += {} at 0x{:X}", ctx.span, core.name(n), ctx.offset);
    Ok(Emission::word(core.accumulate(n, ctx.span)?))
}

fn negate(ctx: &EncodeCtx<'_>, ops: &Operands<'_>) -> Result<Emission, AsmError> {
    let core = Core::new(ctx.arch, ctx.span)?;
    let n = ops.register(0)?;
    log::trace!("{}: neg = -{} at 0x{:X}", ctx.span, core.name(n), ctx.offset);
    Ok(Emission::word(core.negate(n, ctx.span)?))
}

fn move_register(ctx: &EncodeCtx<'_>, ops: &Operands<'_>) -> Result<Emission, AsmError> {
    let core = Core::new(ctx.arch, ctx.span)?;
    let (n, m) = (ops.register(0)?, ops.register(1)?);
    log::trace!(
        "{}: {} = {} at 0x{:X}",
        ctx.span,
        core.name(n),
        core.name(m),
        ctx.offset
    );
    Ok(Emission::word(core.copy(n, m, ctx.span)?))
}

fn load(ctx: &EncodeCtx<'_>, ops: &Operands<'_>, policy: Policy) -> Result<Emission, AsmError> {
    let core = Core::new(ctx.arch, ctx.span)?;
    let target = ctx.arch.register(ops.text(0)?, ctx.span)?;
    let value = ops.number(1)?;
    let words = Synthesizer::new(&core, ctx.arch.word_bits, ctx.span).load(
        policy,
        target,
        value,
        ctx.offset,
    )?;
    Ok(Emission::words(words))
}

fn load_minimal(ctx: &EncodeCtx<'_>, ops: &Operands<'_>) -> Result<Emission, AsmError> {
    load(ctx, ops, Policy::Minimal)
}

fn load_fixed(ctx: &EncodeCtx<'_>, ops: &Operands<'_>) -> Result<Emission, AsmError> {
    load(ctx, ops, Policy::Fixed)
}

fn declare_label(ctx: &EncodeCtx<'_>, _: &Operands<'_>) -> Result<Emission, AsmError> {
    Ok(Emission::empty().with_label(ctx.offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceLine;

    fn encode(text: &str) -> Result<Emission, AsmError> {
        let arch = architecture(4, 8);
        let registry = registry()?;
        let line = SourceLine::new(text, 1);
        let m = registry.find(&line)?;
        let used = m.labels()?.used.len();
        m.encode(&arch, 0, vec![0; used])
    }

    fn words(text: &str) -> Vec<u64> {
        encode(text).unwrap().words
    }

    #[test]
    fn registers_numbered_after_fixed_file() {
        let arch = architecture(4, 8);
        assert_eq!(arch.variable_base(), 6);
        assert_eq!(arch.register("else", Span::dummy()), Ok(5));
        assert_eq!(arch.register("var9", Span::dummy()), Ok(15));
        assert!(arch.register("var10", Span::dummy()).is_err());
    }

    #[test]
    fn every_command_declares_its_shapes() {
        let registry = registry().unwrap();
        assert!(registry
            .find(&SourceLine::new("var2 = var3", 1))
            .unwrap()
            .command()
            .shapes()
            .is_some_and(|shapes| shapes == [Shape::Register, Shape::Register]));
        assert_eq!(
            registry
                .find(&SourceLine::new("@.x", 1))
                .unwrap()
                .command()
                .shapes(),
            Some(&[][..])
        );
    }

    #[test]
    fn braces_emit_nothing() {
        assert!(words("{").is_empty());
        assert!(words("}").is_empty());
    }

    #[test]
    fn store_one_is_self_transport() {
        assert_eq!(words("var1 = 1"), vec![0x77]);
        assert_eq!(words("addr = 1"), vec![0x33]);
    }

    #[test]
    fn store_one_rejects_special_registers() {
        for reg in ["acc", "ip", "neg", "cond"] {
            let err = encode(&format!("{} = 1", reg)).unwrap_err();
            assert!(matches!(err, AsmError::Constraint { .. }), "{}", reg);
        }
    }

    #[test]
    fn accumulate_and_negate() {
        assert_eq!(words("acc += var0"), vec![0x06]);
        assert_eq!(words("neg = -acc"), vec![0x20]);
    }

    #[test]
    fn moves() {
        assert_eq!(words("var2 = var3"), vec![0x89]);
        assert_eq!(words("ip = addr"), vec![0x13]);
        assert_eq!(words("ip = ip"), vec![0x11]);
        assert_eq!(words("cond = cond"), vec![0x44]);
    }

    #[test]
    fn move_constraints() {
        assert!(matches!(
            encode("acc = var0").unwrap_err(),
            AsmError::Constraint { .. }
        ));
        assert!(matches!(
            encode("neg = var0").unwrap_err(),
            AsmError::Constraint { .. }
        ));
        assert!(matches!(
            encode("var0 = var0").unwrap_err(),
            AsmError::Constraint { .. }
        ));
    }

    #[test]
    fn unknown_operand_in_move() {
        assert!(matches!(
            encode("var2 = bogus").unwrap_err(),
            AsmError::InvalidOperand { ref token, .. } if token == "bogus"
        ));
    }

    #[test]
    fn constant_load_lengths() {
        // 8-bit registers: fixed loads are 2*8 + 1 words
        assert_eq!(words("var2 =-= 0").len(), 17);
        assert_eq!(words("var2 =-= 200").len(), 17);
        assert_eq!(words("var2 := 0").len(), 3);
        assert_eq!(words("var2 := 1").len(), 4);
    }

    #[test]
    fn constant_load_unknown_target() {
        assert!(matches!(
            encode("bogus := 1").unwrap_err(),
            AsmError::UnknownRegister { ref name, .. } if name == "bogus"
        ));
    }

    #[test]
    fn constant_load_into_acc_is_rejected() {
        assert!(matches!(
            encode("acc := 3").unwrap_err(),
            AsmError::Constraint { .. }
        ));
    }

    #[test]
    fn label_declaration() {
        let e = encode("@.main").unwrap();
        assert!(e.words.is_empty());
        assert_eq!(e.labels, vec![0]);
    }

    #[test]
    fn stray_text_is_unmatched() {
        assert!(matches!(
            encode("halt").unwrap_err(),
            AsmError::UnmatchedInstruction { ref line, .. } if line == "halt"
        ));
    }
}
