//! BF generator: turns a terminal term sequence into BF source text
//! (spec §4.5).
//!
//! `Num`/`CharLit` push one cell to the right and increment it `n` times;
//! `StringLit` concatenates that per-byte emission in source order; `BF`
//! fragments pass through verbatim. No peephole optimisation is required,
//! but trivial, semantics-preserving cancellations (`+-`, `-+`, `<>`, `><`)
//! are applied so generated code doesn't carry visible no-ops — the same
//! spirit as the teacher's register specialisation pass trimming dead
//! stack shuffles.

use crate::term::Term;

/// Emit the BF text for one byte literal: move one cell right, then
/// increment it `n` times.
fn emit_byte(n: u8, out: &mut String) {
    out.push('>');
    for _ in 0..n {
        out.push('+');
    }
}

/// Concatenate the BF contribution of each terminal term, in order.
///
/// A `Quot` left unconsumed by reduction (e.g. `main == [foo];`, where
/// nothing ever pulls the quotation off the sequence to call it) contributes
/// no BF text: a quotation pushes nothing onto the runtime BF stack (spec
/// §3), it only exists to be substituted elsewhere. Any other non-terminal
/// term (`Call`, `Macro`) reaching here means reduction didn't actually
/// reach a fixed point, which is a driver bug, not a user-reachable state.
pub fn generate(terms: &[Term]) -> String {
    let mut out = String::new();
    for term in terms {
        match term {
            Term::BF(s) => out.push_str(s),
            Term::Num(n) | Term::CharLit(n) => emit_byte(*n, &mut out),
            Term::StringLit(bytes) => {
                for &b in bytes {
                    emit_byte(b, &mut out);
                }
            }
            Term::Quot { .. } => {}
            other => panic!("bf::generate called on non-terminal term: {other:?}"),
        }
    }
    cancel_trivial_pairs(&out)
}

/// Repeatedly strip adjacent `+-`/`-+`/`<>`/`><` pairs, which never change
/// the net effect of the program (they cancel a mutation/move with its
/// inverse) but can appear at the seams where generated fragments meet.
fn cancel_trivial_pairs(src: &str) -> String {
    let mut chars: Vec<char> = src.chars().collect();
    loop {
        let mut changed = false;
        let mut i = 0;
        let mut next: Vec<char> = Vec::with_capacity(chars.len());
        while i < chars.len() {
            if i + 1 < chars.len() && is_cancelling_pair(chars[i], chars[i + 1]) {
                i += 2;
                changed = true;
            } else {
                next.push(chars[i]);
                i += 1;
            }
        }
        chars = next;
        if !changed {
            break;
        }
    }
    chars.into_iter().collect()
}

fn is_cancelling_pair(a: char, b: char) -> bool {
    matches!((a, b), ('+', '-') | ('-', '+') | ('<', '>') | ('>', '<'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_num_as_move_and_increments() {
        let terms = vec![Term::Num(3)];
        assert_eq!(generate(&terms), ">+++");
    }

    #[test]
    fn emits_string_lit_byte_by_byte() {
        let terms = vec![Term::StringLit(vec![1, 2])];
        assert_eq!(generate(&terms), ">+>++");
    }

    #[test]
    fn bf_fragments_concatenate_verbatim() {
        let terms = vec![Term::BF(">+".to_string()), Term::BF("<.".to_string())];
        assert_eq!(generate(&terms), ">+<.");
    }

    #[test]
    fn cancels_trivial_opposite_pairs_at_seams() {
        let terms = vec![Term::BF(">+".to_string()), Term::BF("-<".to_string())];
        // "> + - <" -> "+-" cancels -> "><" cancels -> ""
        assert_eq!(generate(&terms), "");
    }

    #[test]
    fn cancellation_only_removes_literal_opposite_pairs() {
        let terms = vec![Term::BF("[+]".to_string())];
        assert_eq!(generate(&terms), "[+]");
    }
}
