//! Lexer implementation using logos

use logos::Logos;

use super::token::{Token, TokenKind};
use crate::common::{CompileError, CompileResult, Span};

/// Lexer for Rill source text.
///
/// `Clone` lets the parser probe ahead (lambda detection) without
/// consuming input.
#[derive(Clone)]
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source text
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            at_eof: false,
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> CompileResult<Token> {
        if self.at_eof {
            let len = self.inner.source().len();
            return Ok(Token::new(TokenKind::Eof, Span::new(len, len)));
        }

        match self.inner.next() {
            Some(Ok(kind)) => {
                let span = self.inner.span();
                Ok(Token::new(kind, Span::new(span.start, span.end)))
            }
            Some(Err(())) => {
                let span = self.inner.span();
                Err(CompileError::lexer(
                    format!("unexpected character '{}'", self.inner.slice()),
                    Span::new(span.start, span.end),
                ))
            }
            None => {
                self.at_eof = true;
                let len = self.inner.source().len();
                Ok(Token::new(TokenKind::Eof, Span::new(len, len)))
            }
        }
    }

    /// Tokenize the whole input, excluding the EOF marker
    pub fn tokenize_all(mut self) -> CompileResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_and_identifiers() {
        let mut lexer = Lexer::new("var value true false null");
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Var));
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::Identifier(s) if s == "value"
        ));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::True));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::False));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Null));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Eof));
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("42 3.25");
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::IntLiteral(42)
        ));
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::FloatLiteral(v) if (v - 3.25).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_range_operator_beats_float() {
        let mut lexer = Lexer::new("1..5");
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::IntLiteral(1)
        ));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::DotDot));
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::IntLiteral(5)
        ));
    }

    #[test]
    fn test_strings_unquote_and_escape() {
        let mut lexer = Lexer::new("\"a\\nb\" 'plain'");
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::StringLiteral(s) if s == "a\nb"
        ));
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::StringLiteral(s) if s == "plain"
        ));
    }

    #[test]
    fn test_pragma_and_register_tokens() {
        let mut lexer = Lexer::new("#pragma #12");
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Pragma));
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::Register(12)
        ));
    }

    #[test]
    fn test_compound_operators() {
        let mut lexer = Lexer::new("-> .. += == != &&");
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Arrow));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::DotDot));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::PlusEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::EqEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::NotEq));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::AndAnd));
    }

    #[test]
    fn test_comments_skipped() {
        let mut lexer = Lexer::new("// line\n1 /* block */ 2");
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::IntLiteral(1)
        ));
        assert!(matches!(
            lexer.next_token().unwrap().kind,
            TokenKind::IntLiteral(2)
        ));
        assert!(matches!(lexer.next_token().unwrap().kind, TokenKind::Eof));
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("@");
        let err = lexer.next_token().unwrap_err();
        assert!(matches!(err, CompileError::Lexer { .. }));
    }

    #[test]
    fn test_spans_are_byte_ranges() {
        let mut lexer = Lexer::new("ab cd");
        assert_eq!(lexer.next_token().unwrap().span, Span::new(0, 2));
        assert_eq!(lexer.next_token().unwrap().span, Span::new(3, 5));
    }

    #[test]
    fn test_tokenize_all_excludes_eof() {
        let tokens = Lexer::new("var x = 1").tokenize_all().unwrap();
        assert_eq!(tokens.len(), 4);
    }
}
