//! The Serotonin rewriting engine: terms, rules, the fixed-point driver,
//! the embedded BF interpreter, and the BF generator. Everything that turns
//! an already-parsed program into Brainfuck text lives here; lexing,
//! parsing, and the CLI surface are separate crates (`serotonin-syntax`,
//! `serotonin-cli`) the way the teacher splits its own `compiler`/`lsp`/
//! `repl` crates around a shared core.

pub mod bf;
pub mod driver;
pub mod error;
pub mod interp;
pub mod macros;
pub mod mangle;
pub mod rule;
pub mod term;

pub use driver::{Budgets, Driver};
pub use error::{Result, SerotoninError, SourceSpan};
pub use macros::MacroRegistry;
pub use rule::RuleTable;
pub use term::{Bindings, Constraint, Name, RuleDef, RuleKind, Term};

/// Compile a program's rule definitions plus an entry-point term sequence
/// into Brainfuck source text.
///
/// Each call builds a fresh [`RuleTable`]/[`MacroRegistry`]/specialisation
/// cache (spec §9 open question: specialisation state never survives past
/// a single compilation), so two calls with the same input always produce
/// identical output, never sharing state through a hidden global.
pub fn compile(rules: Vec<RuleDef>, entry: Vec<Term>, budgets: Budgets) -> Result<String> {
    let mut table = RuleTable::new();
    table.extend(rules);
    let mut driver = Driver::new(table, MacroRegistry::with_builtins(), budgets);
    let reduced = driver.reduce(entry)?;
    Ok(bf::generate(&reduced))
}
