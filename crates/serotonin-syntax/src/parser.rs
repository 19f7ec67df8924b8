//! Recursive-descent parser over the token stream (spec §6 grammar),
//! producing the same `RuleDef`/`Term` values the driver consumes directly
//! — there is no separate surface AST to desugar later, the way the
//! teacher's parser builds `ast::Program` straight from tokens.

use serotonin_core::error::{Result, SerotoninError, SourceSpan};
use serotonin_core::term::{Constraint, Name, RuleDef, RuleKind, Term};

use crate::lexer::{Token, TokenKind};

/// One `IMPORT name;` directive, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    pub name: String,
}

/// The parsed contents of one `.sero` file: its imports, in the order they
/// appear, followed by its own rule definitions.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub imports: Vec<ImportDirective>,
    pub rules: Vec<RuleDef>,
}

pub fn parse(src: &str) -> Result<ParsedFile> {
    let tokens = crate::lexer::lex(src)?;
    Parser { tokens, pos: 0 }.parse_file()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_span(&self) -> SourceSpan {
        self.tokens[self.pos].span
    }

    fn bump(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn expect(&mut self, expected: &TokenKind, what: &str) -> Result<()> {
        if self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(SerotoninError::parse(
                format!("expected {what}, found {:?}", self.peek()),
                Some(self.peek_span()),
            ))
        }
    }

    fn parse_file(&mut self) -> Result<ParsedFile> {
        let mut file = ParsedFile::default();
        while !self.at_eof() {
            if let TokenKind::Ident(name) = self.peek() {
                if name == "IMPORT" {
                    file.imports.push(self.parse_import()?);
                    continue;
                }
            }
            file.rules.push(self.parse_rule_def()?);
        }
        Ok(file)
    }

    fn parse_import(&mut self) -> Result<ImportDirective> {
        self.bump(); // IMPORT
        let span = self.peek_span();
        let name = match self.bump() {
            TokenKind::Ident(name) => name,
            other => {
                return Err(SerotoninError::parse(
                    format!("expected library name after IMPORT, found {other:?}"),
                    Some(span),
                ));
            }
        };
        self.expect(&TokenKind::Semi, "';' after IMPORT directive")?;
        Ok(ImportDirective { name })
    }

    fn parse_rule_def(&mut self) -> Result<RuleDef> {
        let span = self.peek_span();
        let head = match self.bump() {
            TokenKind::Ident(name) => Name::new(name),
            other => {
                return Err(SerotoninError::parse(
                    format!("expected a rule head identifier, found {other:?}"),
                    Some(span),
                ));
            }
        };

        let params = if matches!(self.peek(), TokenKind::LParen) {
            self.parse_constraints()?
        } else {
            Vec::new()
        };

        let kind_span = self.peek_span();
        let kind = match self.bump() {
            TokenKind::Eq => RuleKind::Subst,
            TokenKind::EqQuery => RuleKind::Gen,
            TokenKind::EqBang => RuleKind::Exec,
            other => {
                return Err(SerotoninError::parse(
                    format!("expected '==', '==?', or '==!', found {other:?}"),
                    Some(kind_span),
                ));
            }
        };

        let body = self.parse_term_sequence(&TokenKind::Semi)?;
        self.expect(&TokenKind::Semi, "';' to close rule body")?;

        Ok(RuleDef { head, params, kind, body })
    }

    fn parse_constraints(&mut self) -> Result<Vec<Constraint>> {
        self.bump(); // '('
        let mut params = Vec::new();
        while !matches!(self.peek(), TokenKind::RParen) {
            if self.at_eof() {
                return Err(SerotoninError::parse(
                    "unexpected end of file in constraint list",
                    Some(self.peek_span()),
                ));
            }
            params.push(self.parse_one_constraint()?);
        }
        self.bump(); // ')'
        Ok(params)
    }

    /// A parameter's surface form decides its `Constraint` kind:
    /// `@` / `?` are the untyped-byte / untyped-quotation wildcards; a bare
    /// literal pins an exact byte; a bracketed term list pins an exact
    /// quotation; a bare identifier binds — and, following every named
    /// example in the source grammar (`dup (a)`, `F (Q)`, `while ([true]
    /// B)`), an identifier starting with an uppercase letter binds a
    /// quotation while any other binds a byte.
    fn parse_one_constraint(&mut self) -> Result<Constraint> {
        let span = self.peek_span();
        match self.bump() {
            TokenKind::At => Ok(Constraint::ByteAny),
            TokenKind::Question => Ok(Constraint::QuotAny),
            TokenKind::Number(n) => Ok(Constraint::ByteExact(n)),
            TokenKind::CharLit(c) => Ok(Constraint::ByteExact(c)),
            TokenKind::LBracket => {
                let body = self.parse_term_sequence(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket, "']' to close quotation constraint")?;
                Ok(Constraint::QuotExact(body))
            }
            TokenKind::Ident(name) => {
                if name.starts_with(char::is_uppercase) {
                    Ok(Constraint::QuotNamed(name))
                } else {
                    Ok(Constraint::ByteNamed(name))
                }
            }
            other => Err(SerotoninError::parse(
                format!("invalid constraint token {other:?}"),
                Some(span),
            )),
        }
    }

    /// Parse terms up to (but not consuming) `stop`.
    ///
    /// `"..." sprint` is recognised here as syntax sugar rather than left to
    /// a rule: the constraint model has no variadic quantifier, so no single
    /// `sprint (S)` rule could bind a string's whole, variable-length byte
    /// run. Desugars directly to one `byte` `` ` . ` `` pair per character,
    /// interleaved so each print follows its own push.
    fn parse_term_sequence(&mut self, stop: &TokenKind) -> Result<Vec<Term>> {
        let mut terms = Vec::new();
        while self.peek() != stop {
            if self.at_eof() {
                return Err(SerotoninError::parse(
                    format!("unexpected end of file, expected {stop:?}"),
                    Some(self.peek_span()),
                ));
            }
            let term = self.parse_one_term()?;
            if let Term::StringLit(bytes) = &term {
                if matches!(self.peek(), TokenKind::Ident(name) if name == "sprint") {
                    self.bump();
                    for &b in bytes {
                        terms.push(Term::Num(b));
                        terms.push(Term::BF(".".to_string()));
                    }
                    continue;
                }
            }
            terms.push(term);
        }
        Ok(terms)
    }

    fn parse_one_term(&mut self) -> Result<Term> {
        let span = self.peek_span();
        match self.bump() {
            TokenKind::Number(n) => Ok(Term::Num(n)),
            TokenKind::CharLit(c) => Ok(Term::CharLit(c)),
            TokenKind::StringLit(bytes) => Ok(Term::StringLit(bytes)),
            TokenKind::BfBlock(bf) => Ok(Term::BF(bf)),
            TokenKind::Ident(name) => Ok(Term::Call(Name::new(name))),
            TokenKind::LBracket => {
                let body = self.parse_term_sequence(&TokenKind::RBracket)?;
                self.expect(&TokenKind::RBracket, "']' to close quotation")?;
                Ok(Term::quot(body))
            }
            TokenKind::BraceText(text) => match self.bump() {
                TokenKind::MacroBang(name) => Ok(Term::Macro(Name::new(name), text)),
                other => Err(SerotoninError::parse(
                    format!("expected 'name!' after '{{...}}', found {other:?}"),
                    Some(span),
                )),
            },
            TokenKind::RBracket => Err(SerotoninError::quotation_unclosed(Some(span))),
            other => Err(SerotoninError::parse(format!("unexpected token {other:?}"), Some(span))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_subst_rule() {
        let file = parse("double (a) == a a;").unwrap();
        assert_eq!(file.rules.len(), 1);
        let rule = &file.rules[0];
        assert_eq!(rule.head, Name::new("double"));
        assert_eq!(rule.params, vec![Constraint::ByteNamed("a".to_string())]);
        assert_eq!(rule.kind, RuleKind::Subst);
        assert_eq!(
            rule.body,
            vec![Term::Call(Name::new("a")), Term::Call(Name::new("a"))]
        );
    }

    #[test]
    fn parses_gen_and_exec_kinds() {
        let file = parse("g () ==? ; e () ==! ;").unwrap();
        assert_eq!(file.rules[0].kind, RuleKind::Gen);
        assert_eq!(file.rules[1].kind, RuleKind::Exec);
    }

    #[test]
    fn uppercase_constraint_identifier_binds_a_quotation() {
        let file = parse("f (Q) ==? Q;").unwrap();
        assert_eq!(file.rules[0].params, vec![Constraint::QuotNamed("Q".to_string())]);
    }

    #[test]
    fn bracketed_constraint_is_quot_exact() {
        let file = parse("while ([true] B) == ;").unwrap();
        assert_eq!(
            file.rules[0].params,
            vec![
                Constraint::QuotExact(vec![Term::Call(Name::new("true"))]),
                Constraint::QuotNamed("B".to_string()),
            ]
        );
    }

    #[test]
    fn parses_import_directive() {
        let file = parse("IMPORT core;\nmain == ;").unwrap();
        assert_eq!(file.imports, vec![ImportDirective { name: "core".to_string() }]);
        assert_eq!(file.rules.len(), 1);
    }

    #[test]
    fn parses_quotation_and_macro_terms() {
        let file = parse("rot == {a b c -- b c a} autoperm!;").unwrap();
        match &file.rules[0].body[0] {
            Term::Macro(name, text) => {
                assert_eq!(name, &Name::new("autoperm"));
                assert_eq!(text, "a b c -- b c a");
            }
            other => panic!("expected Macro term, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_quotation_term() {
        let file = parse("main == 'y' [true] [print] while;").unwrap();
        assert!(matches!(file.rules[0].body[1], Term::Quot { .. }));
        assert!(matches!(file.rules[0].body[2], Term::Quot { .. }));
    }

    #[test]
    fn missing_semicolon_is_a_parse_error() {
        assert!(parse("f == a").is_err());
    }

    #[test]
    fn unclosed_quotation_is_a_parse_error() {
        assert!(parse("f == [ a ;").is_err());
    }

    #[test]
    fn string_sprint_desugars_to_interleaved_print_pairs() {
        let file = parse(r#"main == "Hi" sprint;"#).unwrap();
        assert_eq!(
            file.rules[0].body,
            vec![
                Term::Num(b'H'),
                Term::BF(".".to_string()),
                Term::Num(b'i'),
                Term::BF(".".to_string()),
            ]
        );
    }

    #[test]
    fn string_without_sprint_stays_a_string_lit() {
        let file = parse(r#"main == "Hi" pop;"#).unwrap();
        assert_eq!(file.rules[0].body[0], Term::StringLit(vec![b'H', b'i']));
    }
}
