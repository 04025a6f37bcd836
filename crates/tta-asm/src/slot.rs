//! Slot resolver catalogue.
//!
//! A template placeholder `{:K1|K2:}` accepts a union of [`SlotKind`]s.
//! Resolving a captured token tries the kinds in order; the first kind that
//! accepts the token decides whether it yields a [`Value`], is
//! [`Resolution::Suppressed`] (label declarations), or whether resolution
//! stops with an error.
//!
//! Each kind also answers a second, independent question: is this token a
//! label declaration or use, and what is its name? The driver uses that to
//! build label bookkeeping without resolving values.
//!
//! | Selector | Kind | Accepts |
//! |----------|------|---------|
//! | `N` | [`SlotKind::Immediate`] | integer literal, any base |
//! | `R` | [`SlotKind::Register`] | fixed register name |
//! | `V` | [`SlotKind::Variable`] | indexed register (`var3`) |
//! | `S` | [`SlotKind::RawString`] | anything, verbatim |
//! | `X` | [`SlotKind::LabelUse`] | `.name` |
//! | `E` | [`SlotKind::Augmentation`] | `&KEY` |
//! | `L` | [`SlotKind::LabelDecl`] | `@.name` |
//! | `` `lit` `` | [`SlotKind::Exact`] | exactly `lit` |

use std::collections::VecDeque;
use std::fmt;

use crate::arch::Architecture;
use crate::encoder::Value;
use crate::error::{AsmError, Shape, Span};

/// Sigil of a label use token.
pub const USE_SIGIL: &str = ".";
/// Sigil of a label declaration token.
pub const DECL_SIGIL: &str = "@.";
/// Sigil of an augmentation token.
pub const AUGMENTATION_SIGIL: &str = "&";

/// What a placeholder accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Any integer literal (decimal, `0x`, `0o`, `0b`).
    Immediate,
    /// A fixed register name from the architecture table.
    Register,
    /// An indexed general-purpose register token.
    Variable,
    /// Any token, passed through verbatim.
    RawString,
    /// A reference to a label, `.name`.
    LabelUse,
    /// A named build-time constant, `&KEY`.
    Augmentation,
    /// A label declaration, `@.name`. Contributes no value.
    LabelDecl,
    /// Exactly this literal text.
    Exact(String),
}

/// Result of resolving a token against one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The kind does not accept the token; try the next kind.
    NoMatch,
    /// The kind accepts the token but passes nothing to the encoder.
    Suppressed,
    /// The kind accepts the token and yields this value.
    Value(Value),
}

/// Role of a label token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelRole {
    /// Binds the name to the current offset.
    Declaration,
    /// References a name declared anywhere in the program.
    Use,
}

/// A label token with its extracted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Label name without sigil.
    pub name: String,
    /// Declaration or use.
    pub role: LabelRole,
}

impl Label {
    /// A label declaration.
    pub fn declaration(name: &str) -> Self {
        Self {
            name: String::from(name),
            role: LabelRole::Declaration,
        }
    }

    /// A label use.
    pub fn usage(name: &str) -> Self {
        Self {
            name: String::from(name),
            role: LabelRole::Use,
        }
    }
}

/// Per-line state available to resolvers.
#[derive(Debug)]
pub struct ResolveCtx<'a> {
    /// Target configuration.
    pub arch: &'a Architecture,
    /// Offsets of the labels used on this line, consumed one per label-use
    /// placeholder in placeholder order.
    pub labels: &'a mut VecDeque<u64>,
    /// Location of the token being resolved.
    pub span: Span,
}

/// Whether `s` is an identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Parse an integer literal.
///
/// Accepts an optional sign, a `0x`/`0o`/`0b` radix prefix (any case) and
/// single `_` separators between digits. Decimal literals other than zero
/// may not start with `0`. Surrounding whitespace is ignored.
///
/// # Examples
///
/// ```
/// use tta_asm::slot::parse_integer;
///
/// assert_eq!(parse_integer("42"), Some(42));
/// assert_eq!(parse_integer("-0x1F"), Some(-31));
/// assert_eq!(parse_integer("0b1010_0101"), Some(0xA5));
/// assert_eq!(parse_integer("017"), None);
/// assert_eq!(parse_integer("acc"), None);
/// ```
pub fn parse_integer(token: &str) -> Option<i128> {
    let s = token.trim();
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match body.get(..2) {
        Some("0x" | "0X") => (16, &body[2..]),
        Some("0o" | "0O") => (8, &body[2..]),
        Some("0b" | "0B") => (2, &body[2..]),
        _ => (10, body),
    };
    // a separator may directly follow a radix prefix: 0x_ff
    let digits = if radix == 10 {
        digits
    } else {
        digits.strip_prefix('_').unwrap_or(digits)
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
    {
        return None;
    }
    let clean: String = digits.chars().filter(|&c| c != '_').collect();
    if !clean.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    if radix == 10 && clean.starts_with('0') && clean.bytes().any(|b| b != b'0') {
        return None;
    }
    let value = i128::from_str_radix(&clean, radix).ok()?;
    Some(if negative { -value } else { value })
}

fn extract_label(token: &str, sigil: &str, span: Span) -> Result<Option<String>, AsmError> {
    match token.strip_prefix(sigil) {
        None => Ok(None),
        Some(name) if is_identifier(name) => Ok(Some(String::from(name))),
        Some(_) => Err(AsmError::MalformedLabel {
            token: String::from(token),
            span,
        }),
    }
}

impl SlotKind {
    /// Parse a selector (`N`, `R`, `V`, `S`, `X`, `E`, `L` or `` `lit` ``).
    pub fn parse(selector: &str) -> Option<Self> {
        let kind = match selector {
            "N" => SlotKind::Immediate,
            "R" => SlotKind::Register,
            "V" => SlotKind::Variable,
            "S" => SlotKind::RawString,
            "X" => SlotKind::LabelUse,
            "E" => SlotKind::Augmentation,
            "L" => SlotKind::LabelDecl,
            _ => {
                let lit = selector.strip_prefix('`')?.strip_suffix('`')?;
                SlotKind::Exact(String::from(lit))
            }
        };
        Some(kind)
    }

    /// The type of value this kind yields; `None` for label declarations.
    /// Typed commands check their declared shapes against it.
    pub fn shape(&self) -> Option<Shape> {
        match self {
            SlotKind::Immediate | SlotKind::LabelUse | SlotKind::Augmentation => {
                Some(Shape::Number)
            }
            SlotKind::Register | SlotKind::Variable => Some(Shape::Register),
            SlotKind::RawString | SlotKind::Exact(_) => Some(Shape::Text),
            SlotKind::LabelDecl => None,
        }
    }

    /// Regex fragment restricting what this kind can capture, or `None`
    /// when the kind can accept arbitrary text.
    pub(crate) fn capture_fragment(&self) -> Option<String> {
        match self {
            SlotKind::LabelDecl => Some(format!("{}.*", regex::escape(DECL_SIGIL))),
            SlotKind::LabelUse => Some(format!("{}.*", regex::escape(USE_SIGIL))),
            SlotKind::Augmentation => Some(format!("{}.*", regex::escape(AUGMENTATION_SIGIL))),
            SlotKind::Exact(lit) => Some(regex::escape(lit)),
            SlotKind::Immediate
            | SlotKind::Register
            | SlotKind::Variable
            | SlotKind::RawString => None,
        }
    }

    /// Resolve `token` against this kind.
    ///
    /// # Errors
    ///
    /// A kind that recognizes the token but cannot give it a value fails
    /// the whole line: an out-of-range variable, an unknown augmentation
    /// key, or a label use with no queued offset.
    pub fn resolve(&self, token: &str, ctx: &mut ResolveCtx<'_>) -> Result<Resolution, AsmError> {
        let res = match self {
            SlotKind::Immediate => match parse_integer(token) {
                Some(n) => Resolution::Value(Value::Number(n)),
                None => Resolution::NoMatch,
            },
            SlotKind::Register => match ctx.arch.fixed_register(token) {
                Some(index) => {
                    let index = ctx.arch.check_register(u64::from(index), ctx.span)?;
                    Resolution::Value(Value::Register(index))
                }
                None => Resolution::NoMatch,
            },
            SlotKind::Variable => match ctx.arch.variable(token, ctx.span) {
                Some(index) => Resolution::Value(Value::Register(index?)),
                None => Resolution::NoMatch,
            },
            SlotKind::RawString => Resolution::Value(Value::Text(String::from(token))),
            SlotKind::LabelUse => {
                if !token.starts_with(USE_SIGIL) {
                    return Ok(Resolution::NoMatch);
                }
                match ctx.labels.pop_front() {
                    Some(offset) => Resolution::Value(Value::Number(i128::from(offset))),
                    None => {
                        return Err(AsmError::UndefinedLabel {
                            label: String::from(&token[USE_SIGIL.len()..]),
                            span: ctx.span,
                        })
                    }
                }
            }
            SlotKind::Augmentation => match token.strip_prefix(AUGMENTATION_SIGIL) {
                Some(key) => Resolution::Value(Value::Number(ctx.arch.augmentation(key, ctx.span)?)),
                None => Resolution::NoMatch,
            },
            SlotKind::LabelDecl => {
                if token.starts_with(DECL_SIGIL) {
                    Resolution::Suppressed
                } else {
                    Resolution::NoMatch
                }
            }
            SlotKind::Exact(lit) => {
                if token == lit {
                    Resolution::Value(Value::Text(String::from(token)))
                } else {
                    Resolution::NoMatch
                }
            }
        };
        Ok(res)
    }

    /// Classify `token` as a label declaration or use of this kind.
    ///
    /// # Errors
    ///
    /// [`AsmError::MalformedLabel`] if the sigil is present but the rest of
    /// the token is not an identifier.
    pub fn label(&self, token: &str, span: Span) -> Result<Option<Label>, AsmError> {
        match self {
            SlotKind::LabelUse => {
                Ok(extract_label(token, USE_SIGIL, span)?.map(|name| Label::usage(&name)))
            }
            SlotKind::LabelDecl => {
                Ok(extract_label(token, DECL_SIGIL, span)?.map(|name| Label::declaration(&name)))
            }
            _ => Ok(None),
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Immediate => write!(f, "N"),
            SlotKind::Register => write!(f, "R"),
            SlotKind::Variable => write!(f, "V"),
            SlotKind::RawString => write!(f, "S"),
            SlotKind::LabelUse => write!(f, "X"),
            SlotKind::Augmentation => write!(f, "E"),
            SlotKind::LabelDecl => write!(f, "L"),
            SlotKind::Exact(lit) => write!(f, "`{}`", lit),
        }
    }
}

/// An ordered union of slot kinds for one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotUnion {
    kinds: Vec<SlotKind>,
}

impl SlotUnion {
    /// Parse a `|`-separated list of selectors.
    ///
    /// # Errors
    ///
    /// A message naming the first unknown selector.
    pub fn parse(spec: &str) -> Result<Self, String> {
        let kinds = spec
            .split('|')
            .map(|sel| SlotKind::parse(sel).ok_or_else(|| format!("unknown slot selector '{}'", sel)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { kinds })
    }

    /// The kinds of this union, in trial order.
    pub fn kinds(&self) -> &[SlotKind] {
        &self.kinds
    }

    /// Capture group that this placeholder compiles to.
    pub(crate) fn capture_group(&self) -> String {
        let fragments: Option<Vec<String>> =
            self.kinds.iter().map(SlotKind::capture_fragment).collect();
        match fragments {
            Some(parts) if !parts.is_empty() => format!("((?:{}))", parts.join("|")),
            _ => String::from("(.*)"),
        }
    }

    /// Resolve `token`: the first kind that accepts it wins.
    ///
    /// Returns `Ok(None)` for a suppressed token.
    ///
    /// # Errors
    ///
    /// [`AsmError::InvalidOperand`] if no kind accepts the token, or the
    /// error of the accepting kind.
    pub fn resolve(&self, token: &str, ctx: &mut ResolveCtx<'_>) -> Result<Option<Value>, AsmError> {
        for kind in &self.kinds {
            match kind.resolve(token, ctx)? {
                Resolution::NoMatch => continue,
                Resolution::Suppressed => return Ok(None),
                Resolution::Value(v) => return Ok(Some(v)),
            }
        }
        Err(AsmError::InvalidOperand {
            token: String::from(token),
            span: ctx.span,
        })
    }

    /// The label carried by `token`, from the first kind that sees one.
    pub fn label(&self, token: &str, span: Span) -> Result<Option<Label>, AsmError> {
        for kind in &self.kinds {
            if let Some(label) = kind.label(token, span)? {
                return Ok(Some(label));
            }
        }
        Ok(None)
    }
}

impl fmt::Display for SlotUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, kind) in self.kinds.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}
