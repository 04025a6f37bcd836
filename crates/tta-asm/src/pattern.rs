//! Instruction pattern registry.
//!
//! A template is literal text with embedded placeholders, for example
//! `acc += {:R|V:}`. Registering it compiles a whole-line regex (anchored,
//! so a pattern never matches part of a line) and keeps one
//! [`SlotUnion`] per placeholder.
//!
//! Commands are tried in registration order and the first structural match
//! wins. Ambiguous templates are not detected; ordering is part of an
//! architecture's catalogue.
//!
//! A command may declare the [`Shape`] of every value its encoder reads.
//! Declared shapes are checked against the slot unions at registration and
//! against the resolved values before the encoder runs.

use std::collections::VecDeque;

use regex::Regex;

use crate::arch::Architecture;
use crate::encoder::{Emission, Operands, Value};
use crate::error::{AsmError, Shape, Span};
use crate::slot::{LabelRole, ResolveCtx, SlotUnion};
use crate::source::SourceLine;

/// Context handed to an encoder.
#[derive(Debug, Clone, Copy)]
pub struct EncodeCtx<'a> {
    /// Target configuration.
    pub arch: &'a Architecture,
    /// Offset of the first word this line emits.
    pub offset: u64,
    /// Location of the line.
    pub span: Span,
}

/// Encoder bound to a template.
///
/// Receives the line offset and the resolved values (label declarations
/// skipped) and returns the emitted words plus any declared label offsets.
pub type EncodeFn = fn(&EncodeCtx<'_>, &Operands<'_>) -> Result<Emission, AsmError>;

/// A compiled instruction template.
#[derive(Debug, Clone)]
pub struct Pattern {
    template: String,
    regex: Regex,
    slots: Vec<SlotUnion>,
}

/// A `{:...:}` placeholder located in a template.
struct Placeholder<'t> {
    start: usize,
    end: usize,
    spec: &'t str,
}

/// Find placeholders: `{:` then the shortest non-empty run of
/// non-whitespace followed by `:}`.
fn placeholders(template: &str) -> Vec<Placeholder<'_>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(rel) = template[pos..].find("{:") {
        let start = pos + rel;
        let inner = start + 2;
        let rest = &template[inner..];
        let mut close = None;
        for (i, c) in rest.char_indices() {
            if c.is_whitespace() {
                break;
            }
            if i > 0 && rest[i..].starts_with(":}") {
                close = Some(i);
                break;
            }
        }
        match close {
            Some(i) => {
                out.push(Placeholder {
                    start,
                    end: inner + i + 2,
                    spec: &rest[..i],
                });
                pos = inner + i + 2;
            }
            None => pos = start + 1,
        }
    }
    out
}

/// A captured placeholder token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture<'l> {
    /// Token text.
    pub text: &'l str,
    /// Byte offset of the token within the line.
    pub start: usize,
}

impl Pattern {
    /// Compile `template`.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidPattern`] for an unknown selector, or if the
    /// resulting matcher cannot be built.
    pub fn compile(template: &str) -> Result<Self, AsmError> {
        let invalid = |detail: String| AsmError::InvalidPattern {
            template: String::from(template),
            detail,
        };

        let mut source = String::from("^");
        let mut slots = Vec::new();
        let mut last = 0;
        for ph in placeholders(template) {
            source.push_str(&regex::escape(&template[last..ph.start]));
            let union = SlotUnion::parse(ph.spec).map_err(invalid)?;
            source.push_str(&union.capture_group());
            slots.push(union);
            last = ph.end;
        }
        source.push_str(&regex::escape(&template[last..]));
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            template: String::from(template),
            regex,
            slots,
        })
    }

    /// The template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder unions, in template order.
    pub fn slots(&self) -> &[SlotUnion] {
        &self.slots
    }

    /// Match a whole line, returning one capture per placeholder.
    pub fn captures<'l>(&self, line: &'l str) -> Option<Vec<Capture<'l>>> {
        let caps = self.regex.captures(line)?;
        let args = (1..=self.slots.len())
            .map(|i| match caps.get(i) {
                Some(m) => Capture {
                    text: m.as_str(),
                    start: m.start(),
                },
                None => Capture {
                    text: "",
                    start: line.len(),
                },
            })
            .collect();
        Some(args)
    }
}

/// A registered (pattern, encoder) pair.
#[derive(Debug, Clone)]
pub struct Command {
    pattern: Pattern,
    shapes: Option<Vec<Shape>>,
    encode: EncodeFn,
}

impl Command {
    /// Compile `template` and bind it to `encode`. Values reach the encoder
    /// unchecked.
    pub fn new(template: &str, encode: EncodeFn) -> Result<Self, AsmError> {
        Ok(Self {
            pattern: Pattern::compile(template)?,
            shapes: None,
            encode,
        })
    }

    /// Compile `template` and bind it to an encoder reading values of
    /// `shapes`, in order.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidPattern`] if the template does not compile, if
    /// `shapes` does not have one entry per value-carrying placeholder, or
    /// if a placeholder's union cannot yield its declared shape.
    pub fn typed(template: &str, shapes: &[Shape], encode: EncodeFn) -> Result<Self, AsmError> {
        let pattern = Pattern::compile(template)?;
        let invalid = |detail: String| AsmError::InvalidPattern {
            template: String::from(template),
            detail,
        };
        // unions made only of label declarations never carry a value
        let carrying: Vec<&SlotUnion> = pattern
            .slots
            .iter()
            .filter(|union| union.kinds().iter().any(|kind| kind.shape().is_some()))
            .collect();
        if carrying.len() != shapes.len() {
            return Err(invalid(format!(
                "{} value placeholders but {} declared shapes",
                carrying.len(),
                shapes.len()
            )));
        }
        for (index, (union, &shape)) in carrying.iter().zip(shapes).enumerate() {
            if !union.kinds().iter().any(|kind| kind.shape() == Some(shape)) {
                return Err(invalid(format!(
                    "placeholder {} ({}) cannot yield a {}",
                    index, union, shape
                )));
            }
        }
        Ok(Self {
            pattern,
            shapes: Some(shapes.to_vec()),
            encode,
        })
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Declared value shapes, if the command declares any.
    pub fn shapes(&self) -> Option<&[Shape]> {
        self.shapes.as_deref()
    }

    /// Run the encoder directly on already-resolved values.
    pub fn encode(&self, ctx: &EncodeCtx<'_>, values: &[Value]) -> Result<Emission, AsmError> {
        (self.encode)(ctx, &Operands::new(values, ctx.span))
    }
}

/// Names of the labels declared and used on one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineLabels {
    /// Declared names, in placeholder order.
    pub declared: Vec<String>,
    /// Used names, in placeholder order.
    pub used: Vec<String>,
}

/// A line matched against a command.
#[derive(Debug, Clone)]
pub struct Match<'r, 'l> {
    command: &'r Command,
    args: Vec<Capture<'l>>,
    span: Span,
}

impl<'r, 'l> Match<'r, 'l> {
    /// The matched command.
    pub fn command(&self) -> &'r Command {
        self.command
    }

    fn token_span(&self, arg: &Capture<'_>) -> Span {
        self.span.narrow(arg.start, arg.text.len())
    }

    /// Label declarations and uses on this line.
    ///
    /// # Errors
    ///
    /// [`AsmError::MalformedLabel`] for a sigil followed by a non-identifier.
    pub fn labels(&self) -> Result<LineLabels, AsmError> {
        let mut out = LineLabels::default();
        for (union, arg) in self.command.pattern.slots.iter().zip(&self.args) {
            if let Some(label) = union.label(arg.text, self.token_span(arg))? {
                match label.role {
                    LabelRole::Declaration => out.declared.push(label.name),
                    LabelRole::Use => out.used.push(label.name),
                }
            }
        }
        Ok(out)
    }

    /// Resolve every placeholder. `label_offsets` holds one offset per
    /// label use on the line, in placeholder order.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidOperand`] if a token matches no kind of its union,
    /// the error raised by the accepting kind, or [`AsmError::OperandType`]
    /// if a value does not have the shape the command declares.
    pub fn resolve(
        &self,
        arch: &Architecture,
        label_offsets: Vec<u64>,
    ) -> Result<Vec<Value>, AsmError> {
        let mut queue = VecDeque::from(label_offsets);
        let mut values = Vec::with_capacity(self.args.len());
        for (union, arg) in self.command.pattern.slots.iter().zip(&self.args) {
            let mut ctx = ResolveCtx {
                arch,
                labels: &mut queue,
                span: self.token_span(arg),
            };
            if let Some(value) = union.resolve(arg.text, &mut ctx)? {
                self.check_shape(values.len(), Some(value.shape()), ctx.span)?;
                values.push(value);
            }
        }
        if let Some(shapes) = self.command.shapes() {
            if values.len() < shapes.len() {
                self.check_shape(values.len(), None, self.span)?;
            }
        }
        Ok(values)
    }

    fn check_shape(&self, index: usize, found: Option<Shape>, span: Span) -> Result<(), AsmError> {
        let expected = match self.command.shapes().and_then(|shapes| shapes.get(index)) {
            Some(&expected) => expected,
            None => return Ok(()),
        };
        if found == Some(expected) {
            return Ok(());
        }
        Err(AsmError::OperandType {
            index,
            expected,
            found,
            span,
        })
    }

    /// Resolve and encode the line at `offset`.
    pub fn encode(
        &self,
        arch: &Architecture,
        offset: u64,
        label_offsets: Vec<u64>,
    ) -> Result<Emission, AsmError> {
        let values = self.resolve(arch, label_offsets)?;
        let ctx = EncodeCtx {
            arch,
            offset,
            span: self.span,
        };
        self.command.encode(&ctx, &values)
    }
}

/// Ordered table of commands.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: Vec<Command>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `template` and append it with its encoder.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidPattern`] if the template does not compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use tta_asm::{Emission, Registry};
    ///
    /// let mut registry = Registry::new();
    /// registry.register("halt", |_, _| Ok(Emission::word(0)))?;
    /// assert_eq!(registry.len(), 1);
    /// # Ok::<(), tta_asm::AsmError>(())
    /// ```
    pub fn register(&mut self, template: &str, encode: EncodeFn) -> Result<&mut Self, AsmError> {
        self.commands.push(Command::new(template, encode)?);
        Ok(self)
    }

    /// Compile `template` and append it with an encoder reading values of
    /// `shapes`; see [`Command::typed`].
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidPattern`] if the template does not compile or does
    /// not agree with `shapes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tta_asm::{Emission, Registry, Shape};
    ///
    /// let mut registry = Registry::new();
    /// registry.register_typed("jump {:N:}", &[Shape::Number], |_, ops| {
    ///     Ok(Emission::word(ops.number(0)? as u64))
    /// })?;
    /// assert!(registry.register_typed("jump {:N:}", &[Shape::Text], |_, _| {
    ///     Ok(Emission::empty())
    /// }).is_err());
    /// # Ok::<(), tta_asm::AsmError>(())
    /// ```
    pub fn register_typed(
        &mut self,
        template: &str,
        shapes: &[Shape],
        encode: EncodeFn,
    ) -> Result<&mut Self, AsmError> {
        self.commands.push(Command::typed(template, shapes, encode)?);
        Ok(self)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Find the first command whose pattern accepts `line`.
    ///
    /// # Errors
    ///
    /// [`AsmError::UnmatchedInstruction`] naming the line if none does.
    pub fn find<'r, 'l>(&'r self, line: &SourceLine<'l>) -> Result<Match<'r, 'l>, AsmError> {
        for command in &self.commands {
            if let Some(args) = command.pattern.captures(line.text) {
                log::trace!("{}: '{}' matched '{}'", line.span, line.text, command.pattern.template);
                return Ok(Match {
                    command,
                    args,
                    span: line.span,
                });
            }
        }
        Err(AsmError::UnmatchedInstruction {
            line: String::from(line.text),
            span: line.span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::transport;

    fn arch() -> Architecture {
        Architecture::new("test", 3, 8)
            .with_register("A", 0)
            .with_register("B", 1)
    }

    fn mov(ctx: &EncodeCtx<'_>, ops: &Operands<'_>) -> Result<Emission, AsmError> {
        let dst = ctx.arch.register(ops.text(0)?, ctx.span)?;
        let src = ctx.arch.register(ops.text(1)?, ctx.span)?;
        Ok(Emission::word(transport(ctx.arch.register_bits, dst, src)))
    }

    fn nothing(_: &EncodeCtx<'_>, _: &Operands<'_>) -> Result<Emission, AsmError> {
        Ok(Emission::empty())
    }

    fn declare(ctx: &EncodeCtx<'_>, _: &Operands<'_>) -> Result<Emission, AsmError> {
        Ok(Emission::empty().with_label(ctx.offset))
    }

    fn line(text: &str) -> SourceLine<'_> {
        SourceLine::new(text, 1)
    }

    #[test]
    fn placeholder_scan() {
        let found: Vec<&str> = placeholders("{:S:} := {:X|E|N:}")
            .iter()
            .map(|p| p.spec)
            .collect();
        assert_eq!(found, ["S", "X|E|N"]);
        assert!(placeholders("{").is_empty());
        assert!(placeholders("{: S :}").is_empty());
        assert_eq!(placeholders("{:`acc`:}")[0].spec, "`acc`");
    }

    #[test]
    fn compile_literal_template() {
        let p = Pattern::compile("acc += 1").unwrap();
        assert!(p.slots().is_empty());
        assert!(p.captures("acc += 1").is_some());
        assert!(p.captures("acc += 12").is_none());
        assert!(p.captures(" acc += 1").is_none());
    }

    #[test]
    fn compile_escapes_metacharacters() {
        let p = Pattern::compile("acc += {:R:} (*)").unwrap();
        let caps = p.captures("acc += A (*)").unwrap();
        assert_eq!(caps[0].text, "A");
        assert_eq!(caps[0].start, 7);
        assert!(p.captures("acc += A x").is_none());
    }

    #[test]
    fn compile_rejects_unknown_selector() {
        let err = Pattern::compile("{:Q:}").unwrap_err();
        assert_eq!(
            err,
            AsmError::InvalidPattern {
                template: "{:Q:}".into(),
                detail: "unknown slot selector 'Q'".into(),
            }
        );
    }

    #[test]
    fn sigil_only_union_narrows_capture() {
        let p = Pattern::compile("{:L:}").unwrap();
        assert!(p.captures("@.start").is_some());
        assert!(p.captures("foo bar").is_none());
    }

    #[test]
    fn scenario_register_pair_encoding() {
        let mut reg = Registry::new();
        reg.register("reg{:S:} = reg{:S:}", mov).unwrap();
        let arch = arch();
        let m = reg.find(&line("regA = regB")).unwrap();
        let out = m.encode(&arch, 0, Vec::new()).unwrap();
        assert_eq!(out.words, vec![0b000_001]);
        assert_eq!(crate::encoder::to_binary(out.words[0] as i128, 6), "000001");
    }

    #[test]
    fn unknown_register_name_is_rejected() {
        let mut reg = Registry::new();
        reg.register("reg{:S:} = reg{:S:}", mov).unwrap();
        let arch = arch();
        let m = reg.find(&line("regZ = regA")).unwrap();
        let err = m.encode(&arch, 0, Vec::new()).unwrap_err();
        assert!(matches!(err, AsmError::UnknownRegister { ref name, .. } if name == "Z"));
    }

    #[test]
    fn registration_order_decides() {
        let mut reg = Registry::new();
        reg.register("{", nothing).unwrap();
        reg.register("{:S:}", mov).unwrap();
        let m = reg.find(&line("{")).unwrap();
        assert_eq!(m.command().pattern().template(), "{");

        let mut reversed = Registry::new();
        reversed.register("{:S:}", mov).unwrap();
        reversed.register("{", nothing).unwrap();
        let m = reversed.find(&line("{")).unwrap();
        assert_eq!(m.command().pattern().template(), "{:S:}");
    }

    #[test]
    fn unmatched_line_is_named() {
        let mut reg = Registry::new();
        reg.register("{", nothing).unwrap();
        let err = reg.find(&SourceLine::new("jump there", 12)).unwrap_err();
        assert_eq!(
            err,
            AsmError::UnmatchedInstruction {
                line: "jump there".into(),
                span: Span::new(12, 1, 10),
            }
        );
    }

    #[test]
    fn invalid_operand_carries_token_span() {
        let mut reg = Registry::new();
        reg.register("acc += {:R|V:}", nothing).unwrap();
        let arch = arch();
        let m = reg.find(&SourceLine::new("acc += zz", 3)).unwrap();
        assert_eq!(
            m.resolve(&arch, Vec::new()),
            Err(AsmError::InvalidOperand {
                token: "zz".into(),
                span: Span::new(3, 8, 2),
            })
        );
    }

    fn must_not_run(ctx: &EncodeCtx<'_>, _: &Operands<'_>) -> Result<Emission, AsmError> {
        Err(AsmError::Constraint {
            detail: "encoder reached".into(),
            span: ctx.span,
        })
    }

    #[test]
    fn typed_registration_checks_unions() {
        let mut reg = Registry::new();
        assert!(reg
            .register_typed("{:S:} := {:X|E|N:}", &[Shape::Text, Shape::Number], nothing)
            .is_ok());
        // label declarations carry no value
        assert!(reg.register_typed("{:L:}", &[], declare).is_ok());
        assert!(matches!(
            reg.register_typed("{:R|V:} = 1", &[Shape::Number], nothing),
            Err(AsmError::InvalidPattern { .. })
        ));
        assert!(matches!(
            reg.register_typed("{:R:} = {:R:}", &[Shape::Register], nothing),
            Err(AsmError::InvalidPattern { .. })
        ));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn shape_mismatch_fails_before_encoding() {
        let mut reg = Registry::new();
        reg.register_typed("set {:N|S:}", &[Shape::Number], must_not_run)
            .unwrap();
        let arch = arch();
        let m = reg.find(&SourceLine::new("set abc", 2)).unwrap();
        let expected = AsmError::OperandType {
            index: 0,
            expected: Shape::Number,
            found: Some(Shape::Text),
            span: Span::new(2, 5, 3),
        };
        assert_eq!(m.resolve(&arch, Vec::new()), Err(expected.clone()));
        assert_eq!(m.encode(&arch, 0, Vec::new()), Err(expected));

        let m = reg.find(&SourceLine::new("set 7", 2)).unwrap();
        assert_eq!(m.resolve(&arch, Vec::new()), Ok(vec![Value::Number(7)]));
    }

    #[test]
    fn suppressed_value_is_reported_missing() {
        let mut reg = Registry::new();
        reg.register_typed("mark {:L|N:}", &[Shape::Number], must_not_run)
            .unwrap();
        let arch = arch();
        let m = reg.find(&SourceLine::new("mark @.here", 1)).unwrap();
        assert!(matches!(
            m.resolve(&arch, Vec::new()),
            Err(AsmError::OperandType { index: 0, found: None, .. })
        ));
    }

    #[test]
    fn untyped_commands_are_unchecked() {
        let mut reg = Registry::new();
        reg.register("set {:N|S:}", mov).unwrap();
        let m = reg.find(&line("set abc")).unwrap();
        assert_eq!(m.command().shapes(), None);
        assert_eq!(
            m.resolve(&arch(), Vec::new()),
            Ok(vec![Value::Text("abc".into())])
        );
    }

    #[test]
    fn labels_and_suppression() {
        let mut reg = Registry::new();
        reg.register("{:L:}", declare).unwrap();
        let arch = arch();
        let m = reg.find(&line("@.top")).unwrap();
        assert_eq!(
            m.labels().unwrap(),
            LineLabels {
                declared: vec!["top".into()],
                used: Vec::new(),
            }
        );
        assert!(m.resolve(&arch, Vec::new()).unwrap().is_empty());
        assert_eq!(m.encode(&arch, 9, Vec::new()).unwrap().labels, vec![9]);
    }

    #[test]
    fn label_offsets_consumed_in_placeholder_order() {
        let mut reg = Registry::new();
        reg.register("{:X:} .. {:X:}", nothing).unwrap();
        let arch = arch();
        let m = reg.find(&line(".a .. .b")).unwrap();
        assert_eq!(m.labels().unwrap().used, vec!["a", "b"]);
        assert_eq!(
            m.resolve(&arch, vec![10, 20]).unwrap(),
            vec![Value::Number(10), Value::Number(20)]
        );
    }
}
