//! Recursive descent parser for Rill

use crate::ast::{AssignOp, BinaryOp, Expr, ExprKind, Literal, Script, UnaryOp};
use crate::common::{CompileResult, Span};
use crate::features::{Feature, Features};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::scope::Frame;

use super::support::ParseContext;

/// Recursive descent parser for Rill scripts.
///
/// The grammar productions live here; every declaration and every
/// finished node is routed through the [`ParseContext`] support layer,
/// which owns the frames, the feature policy, and the pragma table.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    ctx: ParseContext<'a>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given source
    pub fn new(source: &'a str, features: Features) -> CompileResult<Self> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            ctx: ParseContext::new(source, features),
        })
    }

    /// Bind pre-declared parameters before parsing begins
    pub fn set_frame(&mut self, frame: Frame) {
        self.ctx.set_frame(frame);
    }

    /// Replace the active feature snapshot
    pub fn set_features(&mut self, features: Features) {
        self.ctx.set_features(features);
    }

    /// Debug aid: toggle raw register references on the current snapshot
    pub fn allow_registers(&mut self, flag: bool) {
        self.ctx.allow_registers(flag);
    }

    /// Parse a complete script
    pub fn parse(&mut self) -> CompileResult<Script> {
        let start = self.current.span;
        let mut body = Vec::new();
        while !self.at_end() {
            if let Some(stmt) = self.parse_statement()? {
                body.push(stmt);
            }
        }
        let span = start.merge(self.current.span);
        let mut script = Script::new(false, Vec::new(), body, span);
        self.ctx.close_script_scope(&mut script)?;
        script.pragmas = self.ctx.take_pragmas();
        Ok(script)
    }

    // ======================== Helper methods ========================

    fn at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> CompileResult<Token> {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token()?);
        Ok(prev)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> CompileResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.check(&kind) {
            self.advance()
        } else {
            Err(self.ctx.generic_error(
                format!("expected {}, found {}", kind, self.current.kind),
                Some(self.current.span),
            ))
        }
    }

    fn expect_identifier(&mut self) -> CompileResult<(String, Span)> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            let span = self.current.span;
            self.advance()?;
            Ok((name, span))
        } else {
            Err(self.ctx.generic_error(
                format!("expected identifier, found {}", self.current.kind),
                Some(self.current.span),
            ))
        }
    }

    /// Run the close hook over a finished node
    fn finish(&mut self, node: Expr) -> CompileResult<Expr> {
        self.ctx.close_node_scope(&node, Some(self.current.span))?;
        Ok(node)
    }

    // ========================== Statements ==========================

    fn parse_statement(&mut self) -> CompileResult<Option<Expr>> {
        match self.current.kind {
            TokenKind::Semi => {
                self.advance()?;
                Ok(None)
            }
            TokenKind::Pragma => {
                self.parse_pragma()?;
                Ok(None)
            }
            TokenKind::Var => {
                let node = self.parse_var_statement()?;
                self.end_statement(node).map(Some)
            }
            _ => {
                let node = self.parse_expression()?;
                self.end_statement(node).map(Some)
            }
        }
    }

    /// Consume the statement separator, or detect an ambiguous
    /// statement: two constructs adjacent with no separator between
    /// them
    fn end_statement(&mut self, node: Expr) -> CompileResult<Expr> {
        match self.current.kind {
            TokenKind::Semi => {
                self.advance()?;
                Ok(node)
            }
            TokenKind::Eof | TokenKind::RBrace => Ok(node),
            _ => {
                let ambiguous = Expr::new(ExprKind::Ambiguous, self.current.span);
                self.ctx.open_node_scope(&ambiguous, Some(self.current.span))?;
                Ok(ambiguous)
            }
        }
    }

    fn parse_pragma(&mut self) -> CompileResult<()> {
        let anchor = self.current.span;
        self.advance()?; // #pragma
        let (first, _) = self.expect_identifier()?;
        let mut key = first;
        while self.match_token(&TokenKind::Dot)? {
            let (part, _) = self.expect_identifier()?;
            key.push('.');
            key.push_str(&part);
        }
        let value = self.parse_pragma_value()?;
        self.ctx.declare_pragma(key, value, Some(anchor))
    }

    fn parse_pragma_value(&mut self) -> CompileResult<Literal> {
        let value = match &self.current.kind {
            TokenKind::IntLiteral(value) => Literal::Int(*value),
            TokenKind::FloatLiteral(value) => Literal::Float(*value),
            TokenKind::StringLiteral(value) => Literal::Str(value.clone()),
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
            // bare words are collected as strings
            TokenKind::Identifier(name) => Literal::Str(name.clone()),
            TokenKind::Minus => {
                self.advance()?;
                return match self.parse_pragma_value()? {
                    Literal::Int(value) => Ok(Literal::Int(-value)),
                    Literal::Float(value) => Ok(Literal::Float(-value)),
                    _ => Err(self.ctx.generic_error(
                        "expected numeric pragma value",
                        Some(self.current.span),
                    )),
                };
            }
            other => {
                return Err(self.ctx.generic_error(
                    format!("expected pragma value, found {}", other),
                    Some(self.current.span),
                ));
            }
        };
        self.advance()?;
        Ok(value)
    }

    fn parse_var_statement(&mut self) -> CompileResult<Expr> {
        let var_span = self.current.span;
        self.advance()?; // var
        let (name, name_span) = self.expect_identifier()?;
        let register = self.ctx.declare_variable(&name, Some(name_span))?;
        let node = Expr::new(
            ExprKind::Var {
                name,
                symbol: Some(register),
            },
            var_span.merge(name_span),
        );
        let node = self.finish(node)?;
        if self.match_token(&TokenKind::Eq)? {
            let value = self.parse_expression()?;
            let span = node.span.merge(value.span);
            let assign = Expr::new(
                ExprKind::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(node),
                    value: Box::new(value),
                },
                span,
            );
            return self.finish(assign);
        }
        Ok(node)
    }

    // ========================= Expressions ==========================

    fn parse_expression(&mut self) -> CompileResult<Expr> {
        self.parse_assignment()
    }

    fn assign_op(&self) -> Option<AssignOp> {
        match self.current.kind {
            TokenKind::Eq => Some(AssignOp::Assign),
            TokenKind::PlusEq => Some(AssignOp::Add),
            TokenKind::MinusEq => Some(AssignOp::Sub),
            TokenKind::StarEq => Some(AssignOp::Mul),
            TokenKind::SlashEq => Some(AssignOp::Div),
            TokenKind::AmpEq => Some(AssignOp::And),
            TokenKind::PipeEq => Some(AssignOp::Or),
            TokenKind::CaretEq => Some(AssignOp::Xor),
            _ => None,
        }
    }

    fn parse_assignment(&mut self) -> CompileResult<Expr> {
        let target = self.parse_range()?;
        if let Some(op) = self.assign_op() {
            self.advance()?;
            // right associative
            let value = self.parse_assignment()?;
            let span = target.span.merge(value.span);
            let node = Expr::new(
                ExprKind::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                span,
            );
            return self.finish(node);
        }
        Ok(target)
    }

    fn parse_range(&mut self) -> CompileResult<Expr> {
        let from = self.parse_or()?;
        if self.match_token(&TokenKind::DotDot)? {
            let to = self.parse_or()?;
            let span = from.span.merge(to.span);
            let node = Expr::new(
                ExprKind::Range {
                    from: Box::new(from),
                    to: Box::new(to),
                },
                span,
            );
            return self.finish(node);
        }
        Ok(from)
    }

    fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> CompileResult<Expr> {
        let span = lhs.span.merge(rhs.span);
        self.finish(Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.match_token(&TokenKind::OrOr)? {
            let rhs = self.parse_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.match_token(&TokenKind::AndAnd)? {
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_comparison()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_bit_or()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_bit_or()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_bit_or(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_bit_xor()?;
        while self.match_token(&TokenKind::Pipe)? {
            let rhs = self.parse_bit_xor()?;
            lhs = self.binary(BinaryOp::BitOr, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_bit_xor(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_bit_and()?;
        while self.match_token(&TokenKind::Caret)? {
            let rhs = self.parse_bit_and()?;
            lhs = self.binary(BinaryOp::BitXor, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_bit_and(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_additive()?;
        while self.match_token(&TokenKind::Amp)? {
            let rhs = self.parse_additive()?;
            lhs = self.binary(BinaryOp::BitAnd, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> CompileResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> CompileResult<Expr> {
        let op = match self.current.kind {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current.span;
            self.advance()?;
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return self.finish(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> CompileResult<Expr> {
        let mut node = self.parse_primary()?;
        loop {
            if self.match_token(&TokenKind::Dot)? {
                let (field, field_span) = self.expect_identifier()?;
                let span = node.span.merge(field_span);
                node = self.finish(Expr::new(
                    ExprKind::Access {
                        object: Box::new(node),
                        field,
                    },
                    span,
                ))?;
            } else if self.match_token(&TokenKind::LBracket)? {
                let index = self.parse_expression()?;
                let end = self.expect(TokenKind::RBracket)?;
                let span = node.span.merge(end.span);
                node = self.finish(Expr::new(
                    ExprKind::Index {
                        object: Box::new(node),
                        index: Box::new(index),
                    },
                    span,
                ))?;
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let span = self.current.span;
        match &self.current.kind {
            TokenKind::IntLiteral(value) => {
                let value = *value;
                self.advance()?;
                self.finish(Expr::new(ExprKind::Literal(Literal::Int(value)), span))
            }
            TokenKind::FloatLiteral(value) => {
                let value = *value;
                self.advance()?;
                self.finish(Expr::new(ExprKind::Literal(Literal::Float(value)), span))
            }
            TokenKind::StringLiteral(value) => {
                let value = value.clone();
                self.advance()?;
                self.finish(Expr::new(ExprKind::Literal(Literal::Str(value)), span))
            }
            TokenKind::True => {
                self.advance()?;
                self.finish(Expr::new(ExprKind::Literal(Literal::Bool(true)), span))
            }
            TokenKind::False => {
                self.advance()?;
                self.finish(Expr::new(ExprKind::Literal(Literal::Bool(false)), span))
            }
            TokenKind::Null => {
                self.advance()?;
                self.finish(Expr::new(ExprKind::Literal(Literal::Null), span))
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                let symbol = self.ctx.resolve(&name);
                self.finish(Expr::new(ExprKind::Identifier { name, symbol }, span))
            }
            TokenKind::Register(index) => {
                let index = *index;
                if !self.ctx.features().supports_register() {
                    return Err(self.ctx.feature_error(Feature::Register, Some(span)));
                }
                self.advance()?;
                self.finish(Expr::new(
                    ExprKind::Identifier {
                        name: format!("#{}", index),
                        symbol: Some(index),
                    },
                    span,
                ))
            }
            TokenKind::LParen => {
                if self.lambda_ahead() {
                    self.parse_lambda()
                } else {
                    self.advance()?;
                    let node = self.parse_expression()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(node)
                }
            }
            other => Err(self.ctx.generic_error(
                format!("expected expression, found {}", other),
                Some(span),
            )),
        }
    }

    // =========================== Lambdas ============================

    /// Decide whether a `(` opens a lambda parameter list by scanning a
    /// cloned lexer for the matching `)` followed by `->`
    fn lambda_ahead(&self) -> bool {
        let mut probe = self.lexer.clone();
        let mut depth = 1usize;
        while depth > 0 {
            match probe.next_token() {
                Ok(token) => match token.kind {
                    TokenKind::LParen => depth += 1,
                    TokenKind::RParen => depth -= 1,
                    TokenKind::Eof => return false,
                    _ => {}
                },
                Err(_) => return false,
            }
        }
        matches!(probe.next_token(), Ok(token) if token.kind == TokenKind::Arrow)
    }

    fn parse_lambda(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;
        self.ctx.push_frame();
        self.advance()?; // (
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (name, name_span) = self.expect_identifier()?;
                self.ctx.declare_parameter(&name, Some(name_span))?;
                params.push(name);
                if !self.match_token(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Arrow)?;

        let mut body = Vec::new();
        let end = if self.match_token(&TokenKind::LBrace)? {
            while !self.check(&TokenKind::RBrace) {
                if self.at_end() {
                    return Err(self.ctx.generic_error(
                        "expected '}' before end of input",
                        Some(self.current.span),
                    ));
                }
                if let Some(stmt) = self.parse_statement()? {
                    body.push(stmt);
                }
            }
            self.expect(TokenKind::RBrace)?.span
        } else {
            let expr = self.parse_expression()?;
            let end = expr.span;
            body.push(expr);
            end
        };

        let mut script = Script::new(true, params, body, start.merge(end));
        self.ctx.close_script_scope(&mut script)?;
        let span = script.span;
        self.finish(Expr::new(ExprKind::Lambda(Box::new(script)), span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CompileError;
    use pretty_assertions::assert_eq;

    fn parse_default(source: &str) -> CompileResult<Script> {
        Parser::new(source, Features::default())?.parse()
    }

    #[test]
    fn test_parse_simple_script() {
        let script = parse_default("var x = 1; x + 2").unwrap();
        assert_eq!(script.body.len(), 2);
        assert!(!script.lambda);
        let frame = script.scope.expect("frame");
        assert_eq!(frame.symbol("x"), Some(0));
        assert_eq!(frame.num_registers(), 1);
    }

    #[test]
    fn test_identifier_resolves_to_register() {
        let script = parse_default("var x = 1; x").unwrap();
        if let ExprKind::Identifier { name, symbol } = &script.body[1].kind {
            assert_eq!(name, "x");
            assert_eq!(*symbol, Some(0));
        } else {
            panic!("expected identifier, got {:?}", script.body[1].kind);
        }
    }

    #[test]
    fn test_free_identifier_has_no_symbol() {
        let script = parse_default("y").unwrap();
        if let ExprKind::Identifier { symbol, .. } = &script.body[0].kind {
            assert_eq!(*symbol, None);
        } else {
            panic!("expected identifier");
        }
        // no declarations, so no frame was ever created
        assert!(script.scope.is_none());
    }

    #[test]
    fn test_lambda_gets_isolated_frame() {
        let script = parse_default("var a = 1; var f = (x) -> { var y = x; y }").unwrap();
        let outer = script.scope.as_ref().expect("outer frame");
        assert_eq!(outer.symbol("a"), Some(0));
        assert_eq!(outer.symbol("f"), Some(1));
        assert_eq!(outer.symbol("y"), None);

        let lambda = if let ExprKind::Assign { value, .. } = &script.body[1].kind {
            if let ExprKind::Lambda(inner) = &value.kind {
                inner
            } else {
                panic!("expected lambda, got {:?}", value.kind);
            }
        } else {
            panic!("expected assignment");
        };
        assert_eq!(lambda.params, vec!["x".to_string()]);
        let frame = lambda.scope.as_ref().expect("lambda frame");
        assert_eq!(frame.symbol("x"), Some(0));
        assert_eq!(frame.symbol("y"), Some(1));
        assert_eq!(frame.num_parameters(), 1);
        assert!(lambda.pragmas.is_none());
    }

    #[test]
    fn test_lambda_single_expression_body() {
        let script = parse_default("var f = (a, b) -> a + b").unwrap();
        if let ExprKind::Assign { value, .. } = &script.body[0].kind {
            if let ExprKind::Lambda(inner) = &value.kind {
                assert_eq!(inner.params, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(inner.body.len(), 1);
                let frame = inner.scope.as_ref().expect("lambda frame");
                assert_eq!(frame.num_parameters(), 2);
                // parameter references picked up their registers
                if let ExprKind::Binary { lhs, rhs, .. } = &inner.body[0].kind {
                    assert!(matches!(lhs.kind, ExprKind::Identifier { symbol: Some(0), .. }));
                    assert!(matches!(rhs.kind, ExprKind::Identifier { symbol: Some(1), .. }));
                } else {
                    panic!("expected binary body");
                }
            } else {
                panic!("expected lambda");
            }
        } else {
            panic!("expected assignment");
        }
    }

    #[test]
    fn test_empty_parameter_lambda() {
        let script = parse_default("var f = () -> 42").unwrap();
        if let ExprKind::Assign { value, .. } = &script.body[0].kind {
            if let ExprKind::Lambda(inner) = &value.kind {
                assert!(inner.params.is_empty());
                let frame = inner.scope.as_ref().expect("lambda frame");
                assert_eq!(frame.num_registers(), 0);
            } else {
                panic!("expected lambda");
            }
        } else {
            panic!("expected assignment");
        }
    }

    #[test]
    fn test_lambda_disabled_names_feature_and_location() {
        let source = "var f = (x) -> x";
        let err = Parser::new(source, Features::default().with_lambda(false))
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(err.to_string().contains("lambda"), "was: {}", err);
        match err {
            CompileError::Feature {
                feature,
                info,
                excerpt,
            } => {
                assert_eq!(feature, Feature::Lambda);
                // the lambda's opening '('
                assert_eq!((info.line, info.column), (1, 9));
                assert_eq!(excerpt, source);
            }
            other => panic!("expected feature error, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_to_literal_rejected() {
        let err = parse_default("1 = x").unwrap_err();
        match err {
            CompileError::Assignment { info, excerpt } => {
                assert_eq!(info.line, 1);
                assert_eq!(excerpt, "1 = x");
            }
            other => panic!("expected assignment error, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_to_computed_value_rejected() {
        let err = parse_default("(a + b) = 1").unwrap_err();
        assert!(matches!(err, CompileError::Assignment { .. }));
    }

    #[test]
    fn test_assignment_targets_accept_member_and_index() {
        let script = parse_default("a.b = 1; a[0] = 2; x = 3").unwrap();
        assert_eq!(script.body.len(), 3);
    }

    #[test]
    fn test_compound_assignment_checks_target() {
        assert!(parse_default("x += 1").is_ok());
        let err = parse_default("2 *= 3").unwrap_err();
        assert!(matches!(err, CompileError::Assignment { .. }));
    }

    #[test]
    fn test_predeclared_parameter_assignment() {
        let mut parser = Parser::new("x = 1", Features::default()).unwrap();
        parser.set_frame(Frame::with_parameters(&["x"]));
        let script = parser.parse().unwrap();
        let frame = script.scope.as_ref().expect("frame");
        assert_eq!(frame.symbol("x"), Some(0));
        assert_eq!(frame.num_parameters(), 1);
        // the reference picked up the parameter's register
        if let ExprKind::Assign { target, .. } = &script.body[0].kind {
            assert!(matches!(target.kind, ExprKind::Identifier { symbol: Some(0), .. }));
        } else {
            panic!("expected assignment");
        }
    }

    #[test]
    fn test_ambiguous_statement() {
        let err = parse_default("x 1").unwrap_err();
        match err {
            CompileError::Ambiguous { info, .. } => {
                assert_eq!((info.line, info.column), (1, 3));
                assert_eq!(info.text, "1");
            }
            other => panic!("expected ambiguous error, got {:?}", other),
        }
    }

    #[test]
    fn test_pragmas_attach_to_script_sorted() {
        let script =
            parse_default("#pragma rt.cache 32\n#pragma greeting 'hi'\nvar x = 1").unwrap();
        let pragmas = script.pragmas.expect("pragmas");
        let keys: Vec<&str> = pragmas.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["greeting", "rt.cache"]);
        assert_eq!(pragmas["rt.cache"], Literal::Int(32));
        assert_eq!(pragmas["greeting"], Literal::Str("hi".to_string()));
    }

    #[test]
    fn test_pragma_disabled() {
        let err = Parser::new("#pragma a 1", Features::default().with_pragma(false))
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Feature {
                feature: Feature::Pragma,
                ..
            }
        ));
    }

    #[test]
    fn test_locals_disabled() {
        let err = Parser::new("var x = 1", Features::default().with_local_var(false))
            .unwrap()
            .parse()
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Feature {
                feature: Feature::LocalVar,
                ..
            }
        ));
    }

    #[test]
    fn test_reserved_name_rejected() {
        let features = Features::default().with_reserved_names(["item"]);
        let err = Parser::new("var item = 1", features).unwrap().parse().unwrap_err();
        assert!(matches!(
            err,
            CompileError::Feature {
                feature: Feature::LocalVar,
                ..
            }
        ));
    }

    #[test]
    fn test_raw_registers_gated() {
        let err = parse_default("#0 + 1").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Feature {
                feature: Feature::Register,
                ..
            }
        ));

        let mut parser = Parser::new("#0 + 1", Features::default()).unwrap();
        parser.allow_registers(true);
        let script = parser.parse().unwrap();
        if let ExprKind::Binary { lhs, .. } = &script.body[0].kind {
            if let ExprKind::Identifier { name, symbol } = &lhs.kind {
                assert_eq!(name, "#0");
                assert_eq!(*symbol, Some(0));
            } else {
                panic!("expected register identifier");
            }
        } else {
            panic!("expected binary expression");
        }
    }

    #[test]
    fn test_side_effect_disabled_rejects_assignment() {
        let features = Features::default().with_side_effect(false);
        let err = Parser::new("x = 1", features).unwrap().parse().unwrap_err();
        assert!(matches!(
            err,
            CompileError::Feature {
                feature: Feature::SideEffect,
                ..
            }
        ));
    }

    #[test]
    fn test_precedence_shape() {
        let script = parse_default("1 + 2 * 3").unwrap();
        if let ExprKind::Binary { op, rhs, .. } = &script.body[0].kind {
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(
                rhs.kind,
                ExprKind::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            ));
        } else {
            panic!("expected binary expression");
        }
    }

    #[test]
    fn test_range_expression() {
        let script = parse_default("1 .. 5").unwrap();
        assert!(matches!(script.body[0].kind, ExprKind::Range { .. }));
    }

    #[test]
    fn test_empty_statements_and_comments() {
        let script = parse_default("// leading comment\n;;\nvar x = 1; /* trailing */").unwrap();
        assert_eq!(script.body.len(), 1);
    }

    #[test]
    fn test_unterminated_lambda_body() {
        let err = parse_default("var f = (x) -> { x").unwrap_err();
        assert!(matches!(err, CompileError::Parsing { .. }));
    }

    #[test]
    fn test_parenthesized_expression_is_not_a_lambda() {
        let script = parse_default("(1 + 2) * 3").unwrap();
        if let ExprKind::Binary { op, .. } = &script.body[0].kind {
            assert_eq!(*op, BinaryOp::Mul);
        } else {
            panic!("expected binary expression");
        }
    }
}
