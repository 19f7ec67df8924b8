//! Macro dispatcher (spec §4.3): `Macro(name, text)` sites are expanded by
//! invoking a native handler registered under `name`, before any constraint
//! matching happens. The registry is a closed, static table — the teacher's
//! design notes call the analogous `(&str) -> [Term]` shape "the only
//! extension point" and this codebase keeps that shape exactly.

use std::collections::HashMap;

use crate::error::{Result, SerotoninError};
use crate::term::{Name, Term};

pub type MacroFn = fn(&str) -> Result<Vec<Term>>;

/// Static table mapping `name!` to its native handler.
#[derive(Clone)]
pub struct MacroRegistry {
    handlers: HashMap<Name, MacroFn>,
}

impl MacroRegistry {
    /// An empty registry with no handlers installed.
    pub fn new() -> Self {
        MacroRegistry {
            handlers: HashMap::new(),
        }
    }

    /// The registry shipped with the compiler: currently just `autoperm!`.
    pub fn with_builtins() -> Self {
        let mut registry = MacroRegistry::new();
        registry.register("autoperm", autoperm);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: MacroFn) {
        self.handlers.insert(Name::new(name.into()), handler);
    }

    /// Expand `Macro(name, text)` by invoking its handler. The site is
    /// replaced by the returned term sequence and reduction resumes at the
    /// splice (spec §4.3); this function only produces that sequence.
    pub fn expand(&self, name: &Name, text: &str) -> Result<Vec<Term>> {
        let handler = self.handlers.get(name).ok_or_else(|| SerotoninError::MacroUnknown {
            name: name.to_string(),
        })?;
        handler(text)
    }
}

impl Default for MacroRegistry {
    fn default() -> Self {
        MacroRegistry::with_builtins()
    }
}

/// `autoperm!` — generate an optimal stack-shuffling BF block from a stack
/// effect diagram `{ inputs -- outputs }`, e.g. `{a b c -- b c a}` for
/// `rot`, or `{a -- a a}` for `dup`.
///
/// # Model
///
/// At runtime the BF tape *is* the stack: one byte per value, the data
/// pointer always sitting on the top value, contiguous with everything
/// below it. Reordering the top `n` values into `m` output values therefore
/// has to happen in place on the tape, using only `+ - < > [ ]`.
///
/// # Algorithm
///
/// 1. *Stage*: for every output name (processed left to right, bottom to
///    top), non-destructively copy its source value from the input window
///    into a fresh cell just past the current top. Copying rather than
///    moving means duplicated outputs (e.g. `dup`'s `a a`) and later
///    outputs that share a source both see the original value intact.
/// 2. *Clear*: zero every cell in the original `n`-wide input window — all
///    needed values have already been staged.
/// 3. *Settle*: shift the staged block down onto the window's original
///    address range (extending past it if `m > n`, landing short of it if
///    `m < n`), so the result is contiguous with the untouched stack below.
///    The shift amount is the constant `n` for every staged cell, so
///    processing low addresses first is always a safe in-place memmove even
///    though the staging and settle ranges can overlap.
/// 4. *Rehome*: the last settle leaves the pointer on the staging cell it
///    just drained, not on the result; move it onto the new top of stack.
fn autoperm(text: &str) -> Result<Vec<Term>> {
    let (lhs, rhs) = text.split_once("--").ok_or_else(|| SerotoninError::MacroError {
        name: "autoperm".to_string(),
        message: format!("expected 'inputs -- outputs', got: {text}"),
    })?;
    let inputs: Vec<&str> = lhs.split_whitespace().collect();
    let outputs: Vec<&str> = rhs.split_whitespace().collect();

    let n = inputs.len() as i64;
    let m = outputs.len() as i64;

    // Address of input[i] (0 = bottom of window) relative to the pointer
    // position when autoperm's generated code starts running: the last
    // (rightmost) input sits at the current pointer, offset 0.
    let input_offset = |i: usize| -> i64 { i as i64 - (n - 1) };

    let mut source_of: HashMap<&str, i64> = HashMap::new();
    for (i, name) in inputs.iter().enumerate() {
        source_of.insert(name, input_offset(i));
    }

    let bottom = if n == 0 { 0 } else { -(n - 1) };
    let watermark = 1i64;
    let tmp = watermark + m;

    let mut gen = BfCursor::new();

    // Phase 1: stage each output into a fresh cell past the current top.
    for (j, name) in outputs.iter().enumerate() {
        let src = *source_of.get(name).ok_or_else(|| SerotoninError::MacroError {
            name: "autoperm".to_string(),
            message: format!("output '{name}' is not among the inputs '{lhs}'"),
        })?;
        let dst = watermark + j as i64;
        gen.copy(src, dst, tmp);
    }

    // Phase 2: clear the original window now that everything needed has
    // been staged.
    for i in 0..n {
        gen.zero(input_offset(i as usize));
    }

    // Phase 3: settle the staged block onto the window's address range,
    // shifting left by the constant `n`. Ascending order keeps this safe
    // even when source and destination ranges overlap.
    if n != 0 {
        for j in 0..m {
            let staged = watermark + j;
            let target = bottom + j;
            gen.move_cell(staged, target);
        }
    }

    // `move_cell` always leaves the cursor on the cell it drained, not the
    // one it filled, so after the last settle the pointer is still sitting
    // on an emptied staging cell. Return it to the new top of stack so the
    // "pointer always sits on the top value" invariant holds for whatever
    // runs next.
    if m != 0 {
        gen.goto(bottom + m - 1);
    }

    Ok(vec![Term::BF(gen.finish())])
}

/// Tracks the BF data pointer as an offset from where generated code starts
/// running, emitting the `<`/`>` needed to reach an absolute offset.
struct BfCursor {
    cursor: i64,
    out: String,
}

impl BfCursor {
    fn new() -> Self {
        BfCursor {
            cursor: 0,
            out: String::new(),
        }
    }

    fn goto(&mut self, target: i64) {
        let delta = target - self.cursor;
        if delta > 0 {
            self.out.extend(std::iter::repeat('>').take(delta as usize));
        } else if delta < 0 {
            self.out.extend(std::iter::repeat('<').take((-delta) as usize));
        }
        self.cursor = target;
    }

    fn zero(&mut self, at: i64) {
        self.goto(at);
        self.out.push_str("[-]");
    }

    /// Move `from` into `to` (assumed zero), zeroing `from`.
    fn move_cell(&mut self, from: i64, to: i64) {
        debug_assert_ne!(from, to, "move_cell requires distinct cells");
        self.goto(from);
        self.out.push('[');
        self.out.push('-');
        self.goto(to);
        self.out.push('+');
        self.goto(from);
        self.out.push(']');
    }

    /// Copy `from` into `to` (assumed zero), leaving `from` unchanged, using
    /// `tmp` (assumed zero, and restored to zero) as scratch.
    fn copy(&mut self, from: i64, to: i64, tmp: i64) {
        if from == to {
            return;
        }
        self.goto(from);
        self.out.push('[');
        self.out.push('-');
        self.goto(to);
        self.out.push('+');
        self.goto(tmp);
        self.out.push('+');
        self.goto(from);
        self.out.push(']');
        self.move_cell(tmp, from);
    }

    fn finish(self) -> String {
        self.out
    }
}
