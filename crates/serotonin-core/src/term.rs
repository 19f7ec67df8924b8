//! The term and constraint data model.
//!
//! Minimal AST-like value sufficient to drive the rewriter: a `Term` is
//! either a terminal (`BF`) or something the driver still has work to do on
//! (`Num`, `StringLit`, `Call`, `Quot`, `Macro`). See spec §3.

/// Identifier namespace shared by rule heads, operator symbols, and mangled
/// specialisation names. A thin `String` newtype, the way the teacher's
/// `ast.rs` wraps source identifiers for cheap `Eq`/`Hash`/`Display`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(pub String);

impl Name {
    pub fn new(s: impl Into<String>) -> Self {
        Name(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_string())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(s)
    }
}

/// A value in the working sequence being reduced.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// An integer literal 0–255.
    Num(u8),
    /// A character literal; semantically identical to `Num` but preserves
    /// its source shape (so e.g. `'a'` and `97` print differently in
    /// diagnostics even though they reduce the same way).
    CharLit(u8),
    /// A run of bytes. Expands during reduction to one `Num` per byte.
    StringLit(Vec<u8>),
    /// A verbatim Brainfuck fragment — the only terminal form.
    BF(String),
    /// An unresolved reference to a rule.
    Call(Name),
    /// A bracketed sub-program: a first-class value, not inlined until a
    /// matching rule consumes it. `compiled` caches the BF string obtained
    /// by independently reducing `body`, filled in by the quotation
    /// pre-pass (spec §4.2) the first time a candidate needs it.
    Quot {
        body: Vec<Term>,
        compiled: Option<String>,
    },
    /// A macro invocation carrying its raw, whitespace-preserved body text.
    Macro(Name, String),
}

impl Term {
    pub fn quot(body: Vec<Term>) -> Self {
        Term::Quot {
            body,
            compiled: None,
        }
    }

    /// Human-readable tag for diagnostics (`NoMatch`'s observed shape).
    pub fn shape_tag(&self) -> String {
        match self {
            Term::Num(n) => format!("Num({n})"),
            Term::CharLit(c) => format!("CharLit({c})"),
            Term::StringLit(bytes) => format!("StringLit(len={})", bytes.len()),
            Term::BF(_) => "BF".to_string(),
            Term::Call(name) => format!("Call({name})"),
            Term::Quot { .. } => "Quot".to_string(),
            Term::Macro(name, _) => format!("Macro({name})"),
        }
    }

    /// A term is a *reducible value* — eligible to sit in an argument slot a
    /// candidate rule matches against — once it is `Num`, `CharLit`, `BF`,
    /// or `Quot`. An unreduced `Call`/`Macro`/`StringLit` blocks matching at
    /// that position (spec §4.2 step 1.a; `StringLit` is excluded because it
    /// must first expand to a run of `Num`s).
    pub fn is_reducible_value(&self) -> bool {
        matches!(
            self,
            Term::Num(_) | Term::CharLit(_) | Term::BF(_) | Term::Quot { .. }
        )
    }

    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Term::Num(n) | Term::CharLit(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Term::BF(_))
    }
}

/// Pattern for one formal rule parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Matches any `Num`/`CharLit`, binds `id`.
    ByteNamed(String),
    /// Matches any byte; no binding (`@`).
    ByteAny,
    /// Matches exactly this byte.
    ByteExact(u8),
    /// Matches any `Quot`, binds `id`.
    QuotNamed(String),
    /// Matches any `Quot`; no binding (`?`).
    QuotAny,
    /// Matches a `Quot` whose structurally-normalised body equals this one.
    QuotExact(Vec<Term>),
}

impl Constraint {
    /// Does this constraint bind a quotation (by name or wildcard), i.e.
    /// does the quotation pre-pass need to compile it before matching?
    pub fn wants_quotation(&self) -> bool {
        matches!(
            self,
            Constraint::QuotNamed(_) | Constraint::QuotAny | Constraint::QuotExact(_)
        )
    }

    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Constraint::ByteNamed(id) | Constraint::QuotNamed(id) => Some(id),
            _ => None,
        }
    }
}

/// The three rewrite kinds a `RuleDef` can carry (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Pure substitution: splice `body` in place of the call site.
    Subst,
    /// Stage `body` to BF text via the embedded interpreter, then cache it.
    Gen,
    /// Stage `body` to data bytes via the embedded interpreter, then cache
    /// the resulting byte sequence.
    Exec,
}

/// A definition of one candidate rule for `head`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDef {
    pub head: Name,
    pub params: Vec<Constraint>,
    pub kind: RuleKind,
    pub body: Vec<Term>,
}

impl RuleDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Bindings captured by a successful constraint match, keyed by the
/// identifier named in the constraint.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub bytes: std::collections::HashMap<String, u8>,
    pub quots: std::collections::HashMap<String, Vec<Term>>,
    /// Compiled BF text for a bound quotation, keyed the same as `quots`,
    /// available to `Gen`/`Exec` bodies that reference the binding by name
    /// where a `StringLit` is expected (spec §4.2 quotation pre-pass).
    pub quot_bf: std::collections::HashMap<String, String>,
}

/// Structural normalisation used for `QuotExact` matching: strip nothing
/// semantic, only whitespace-insensitivity — terms are already a parsed
/// structure with comments removed by the lexer, so normalised equality is
/// just `PartialEq` on the term vector. Kept as a named function so the
/// rewriter's call sites read the same way spec §4.2 describes them.
pub fn normalise_for_match(body: &[Term]) -> &[Term] {
    body
}
