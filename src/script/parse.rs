//! Recursive-descent parser for the transform DSL.

use crate::error::{AppError, ErrorKind};
use crate::script::ast::{AssignTarget, BinOp, BoolOp, CmpOp, Expr, Function, Stmt, UnaryOp};
use crate::script::lexer::{Tok, Token};

/// Maximum expression/statement nesting depth. Synthesized code is
/// untrusted input, so recursion is bounded rather than stack-limited.
const MAX_DEPTH: usize = 64;

/// Parse a token stream into a single transform routine.
///
/// The accepted shape is optional top-level `import` lines followed by
/// exactly one `def` taking one parameter. Anything else is a syntax
/// error.
pub fn parse(tokens: Vec<Token>) -> Result<Function, AppError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.parse_module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn parse_module(&mut self) -> Result<Function, AppError> {
        self.skip_newlines();

        // Top-level imports before the def are tolerated and recorded;
        // the evaluator enforces the module allow-list.
        let mut preamble = Vec::new();
        while matches!(self.peek(), Tok::Import | Tok::From) {
            preamble.push(self.parse_import()?);
            self.expect_newline()?;
            self.skip_newlines();
        }

        self.expect(Tok::Def, "expected 'def'")?;
        let name = self.expect_ident("expected function name after 'def'")?;
        self.expect(Tok::LParen, "expected '(' after function name")?;
        let param = self.expect_ident("expected exactly one parameter")?;
        self.expect(Tok::RParen, "expected ')' after parameter")?;

        let mut body = self.parse_suite()?;
        if !preamble.is_empty() {
            preamble.extend(body);
            body = preamble;
        }

        self.skip_newlines();
        if self.peek() != &Tok::Eof {
            return Err(self.error("unexpected code after function body"));
        }
        Ok(Function { name, param, body })
    }

    /// `: NEWLINE INDENT stmt+ DEDENT` or an inline `: stmt (; stmt)*`.
    fn parse_suite(&mut self) -> Result<Vec<Stmt>, AppError> {
        self.enter()?;
        self.expect(Tok::Colon, "expected ':'")?;

        let body = if self.peek() == &Tok::Newline {
            self.advance();
            self.expect(Tok::Indent, "expected an indented block")?;
            let mut stmts = Vec::new();
            while self.peek() != &Tok::Dedent {
                if self.peek() == &Tok::Eof {
                    return Err(self.error("unexpected end of input in block"));
                }
                self.parse_statement(&mut stmts)?;
            }
            self.advance(); // Dedent
            stmts
        } else {
            // Inline suite: `if x: return 1`
            let mut stmts = Vec::new();
            loop {
                stmts.push(self.parse_simple_stmt()?);
                if self.peek() == &Tok::Semicolon {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect_newline()?;
            stmts
        };

        self.leave();
        if body.is_empty() {
            return Err(self.error("empty block"));
        }
        Ok(body)
    }

    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> Result<(), AppError> {
        match self.peek() {
            Tok::If => {
                out.push(self.parse_if()?);
            }
            Tok::For => {
                self.advance();
                let var = self.expect_ident("expected loop variable after 'for'")?;
                self.expect(Tok::In, "expected 'in' in for loop")?;
                let iter = self.parse_expr()?;
                let body = self.parse_suite()?;
                out.push(Stmt::For { var, iter, body });
            }
            Tok::While => {
                self.advance();
                let cond = self.parse_expr()?;
                let body = self.parse_suite()?;
                out.push(Stmt::While { cond, body });
            }
            _ => {
                // A logical line of `;`-separated simple statements.
                loop {
                    out.push(self.parse_simple_stmt()?);
                    if self.peek() == &Tok::Semicolon {
                        self.advance();
                        continue;
                    }
                    break;
                }
                self.expect_newline()?;
            }
        }
        Ok(())
    }

    fn parse_if(&mut self) -> Result<Stmt, AppError> {
        self.expect(Tok::If, "expected 'if'")?;
        let mut branches = Vec::new();
        let cond = self.parse_expr()?;
        branches.push((cond, self.parse_suite()?));

        let mut orelse = Vec::new();
        loop {
            match self.peek() {
                Tok::Elif => {
                    self.advance();
                    let cond = self.parse_expr()?;
                    branches.push((cond, self.parse_suite()?));
                }
                Tok::Else => {
                    self.advance();
                    orelse = self.parse_suite()?;
                    break;
                }
                _ => break,
            }
        }
        Ok(Stmt::If { branches, orelse })
    }

    fn parse_simple_stmt(&mut self) -> Result<Stmt, AppError> {
        match self.peek() {
            Tok::Return => {
                self.advance();
                if matches!(self.peek(), Tok::Newline | Tok::Semicolon | Tok::Eof) {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.parse_expr()?)))
                }
            }
            Tok::Break => {
                self.advance();
                Ok(Stmt::Break)
            }
            Tok::Continue => {
                self.advance();
                Ok(Stmt::Continue)
            }
            Tok::Pass => {
                self.advance();
                Ok(Stmt::Pass)
            }
            Tok::Import | Tok::From => self.parse_import(),
            _ => self.parse_assign_or_expr(),
        }
    }

    /// `import a.b` or `from a import b, c`. Only the root module name
    /// matters for the allow-list; the rest of the line is skipped.
    fn parse_import(&mut self) -> Result<Stmt, AppError> {
        self.advance(); // `import` or `from`
        let module = self.expect_ident("expected module name")?;
        while matches!(
            self.peek(),
            Tok::Dot | Tok::Ident(_) | Tok::Comma | Tok::Import | Tok::Star
        ) {
            self.advance();
        }
        Ok(Stmt::Import(module))
    }

    fn parse_assign_or_expr(&mut self) -> Result<Stmt, AppError> {
        let expr = self.parse_expr()?;
        match self.peek() {
            Tok::Assign => {
                self.advance();
                let value = self.parse_expr()?;
                let target = match expr {
                    Expr::Name(name) => AssignTarget::Name(name),
                    Expr::Index { obj, index } => match *obj {
                        Expr::Name(name) => AssignTarget::Index {
                            name,
                            index: *index,
                        },
                        _ => return Err(self.error("unsupported assignment target")),
                    },
                    _ => return Err(self.error("unsupported assignment target")),
                };
                Ok(Stmt::Assign { target, value })
            }
            Tok::PlusAssign | Tok::MinusAssign | Tok::StarAssign => {
                let op = match self.peek() {
                    Tok::PlusAssign => BinOp::Add,
                    Tok::MinusAssign => BinOp::Sub,
                    _ => BinOp::Mul,
                };
                self.advance();
                let value = self.parse_expr()?;
                match expr {
                    Expr::Name(name) => Ok(Stmt::AugAssign { name, op, value }),
                    _ => Err(self.error("augmented assignment needs a plain name")),
                }
            }
            _ => Ok(Stmt::Expr(expr)),
        }
    }

    // Expressions, lowest to highest precedence.

    fn parse_expr(&mut self) -> Result<Expr, AppError> {
        self.enter()?;
        let expr = self.parse_ternary()?;
        self.leave();
        Ok(expr)
    }

    /// `a if cond else b`
    fn parse_ternary(&mut self) -> Result<Expr, AppError> {
        let then = self.parse_or()?;
        if self.peek() == &Tok::If {
            self.advance();
            let test = self.parse_or()?;
            self.expect(Tok::Else, "expected 'else' in conditional expression")?;
            let orelse = self.parse_expr()?;
            return Ok(Expr::Cond {
                test: Box::new(test),
                then: Box::new(then),
                orelse: Box::new(orelse),
            });
        }
        Ok(then)
    }

    fn parse_or(&mut self) -> Result<Expr, AppError> {
        let mut terms = vec![self.parse_and()?];
        while self.peek() == &Tok::Or {
            self.advance();
            terms.push(self.parse_and()?);
        }
        if terms.len() == 1 {
            Ok(terms.pop().unwrap_or(Expr::None))
        } else {
            Ok(Expr::BoolChain {
                op: BoolOp::Or,
                terms,
            })
        }
    }

    fn parse_and(&mut self) -> Result<Expr, AppError> {
        let mut terms = vec![self.parse_not()?];
        while self.peek() == &Tok::And {
            self.advance();
            terms.push(self.parse_not()?);
        }
        if terms.len() == 1 {
            Ok(terms.pop().unwrap_or(Expr::None))
        } else {
            Ok(Expr::BoolChain {
                op: BoolOp::And,
                terms,
            })
        }
    }

    fn parse_not(&mut self) -> Result<Expr, AppError> {
        if self.peek() == &Tok::Not {
            self.advance();
            self.enter()?;
            let operand = self.parse_not()?;
            self.leave();
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, AppError> {
        let lhs = self.parse_arith()?;
        let mut ops = Vec::new();
        loop {
            let op = match self.peek() {
                Tok::Eq => CmpOp::Eq,
                Tok::Ne => CmpOp::Ne,
                Tok::Lt => CmpOp::Lt,
                Tok::Le => CmpOp::Le,
                Tok::Gt => CmpOp::Gt,
                Tok::Ge => CmpOp::Ge,
                Tok::In => CmpOp::In,
                Tok::Not if self.peek_at(1) == &Tok::In => {
                    self.advance();
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            ops.push((op, self.parse_arith()?));
        }
        if ops.is_empty() {
            Ok(lhs)
        } else {
            Ok(Expr::Compare {
                lhs: Box::new(lhs),
                ops,
            })
        }
    }

    fn parse_arith(&mut self) -> Result<Expr, AppError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, AppError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::DoubleSlash => BinOp::FloorDiv,
                Tok::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, AppError> {
        match self.peek() {
            Tok::Minus => {
                self.advance();
                self.enter()?;
                let operand = self.parse_unary()?;
                self.leave();
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Tok::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, AppError> {
        let base = self.parse_postfix()?;
        if self.peek() == &Tok::DoubleStar {
            self.advance();
            // Right-associative; exponent may carry a unary sign.
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exp),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, AppError> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                Tok::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                Tok::Dot => {
                    self.advance();
                    let name = self.expect_ident("expected attribute name after '.'")?;
                    expr = Expr::Attr {
                        obj: Box::new(expr),
                        name,
                    };
                }
                Tok::LBracket => {
                    self.advance();
                    expr = self.parse_subscript(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, AppError> {
        let mut args = Vec::new();
        if self.peek() == &Tok::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.peek() {
                Tok::Comma => {
                    self.advance();
                    if self.peek() == &Tok::RParen {
                        self.advance();
                        return Ok(args);
                    }
                }
                Tok::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.error("expected ',' or ')' in call")),
            }
        }
    }

    /// After `[`: a plain index or a `lo:hi:step` slice, any part optional.
    fn parse_subscript(&mut self, obj: Expr) -> Result<Expr, AppError> {
        let lo = if matches!(self.peek(), Tok::Colon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        if self.peek() == &Tok::RBracket {
            self.advance();
            let index = lo.ok_or_else(|| self.error("empty subscript"))?;
            return Ok(Expr::Index {
                obj: Box::new(obj),
                index,
            });
        }

        self.expect(Tok::Colon, "expected ':' or ']' in subscript")?;
        let hi = if matches!(self.peek(), Tok::Colon | Tok::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let step = if self.peek() == &Tok::Colon {
            self.advance();
            if self.peek() == &Tok::RBracket {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            }
        } else {
            None
        };
        self.expect(Tok::RBracket, "expected ']' after slice")?;
        Ok(Expr::Slice {
            obj: Box::new(obj),
            lo,
            hi,
            step,
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, AppError> {
        let tok = self.peek().clone();
        match tok {
            Tok::Int(v) => {
                self.advance();
                Ok(Expr::Int(v))
            }
            Tok::Float(v) => {
                self.advance();
                Ok(Expr::Float(v))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Tok::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            Tok::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            Tok::None => {
                self.advance();
                Ok(Expr::None)
            }
            Tok::Ident(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            Tok::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Tok::RParen, "expected ')'")?;
                Ok(inner)
            }
            Tok::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while self.peek() != &Tok::RBracket {
                    items.push(self.parse_expr()?);
                    if self.peek() == &Tok::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(Tok::RBracket, "expected ']' after list")?;
                Ok(Expr::List(items))
            }
            Tok::LBrace => {
                self.advance();
                let mut items = Vec::new();
                while self.peek() != &Tok::RBrace {
                    let key = self.parse_expr()?;
                    self.expect(Tok::Colon, "expected ':' in dict literal")?;
                    let value = self.parse_expr()?;
                    items.push((key, value));
                    if self.peek() == &Tok::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(Tok::RBrace, "expected '}' after dict")?;
                Ok(Expr::Dict(items))
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    // Token-stream helpers.

    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.tok)
            .unwrap_or(&Tok::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, tok: Tok, message: &str) -> Result<(), AppError> {
        if self.peek() == &tok {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String, AppError> {
        if let Tok::Ident(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(message))
        }
    }

    fn expect_newline(&mut self) -> Result<(), AppError> {
        match self.peek() {
            Tok::Newline => {
                self.advance();
                Ok(())
            }
            Tok::Eof | Tok::Dedent => Ok(()),
            _ => Err(self.error("expected end of line")),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == &Tok::Newline {
            self.advance();
        }
    }

    fn enter(&mut self) -> Result<(), AppError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("code is nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn error(&self, message: impl Into<String>) -> AppError {
        let line = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1);
        AppError::new(
            ErrorKind::SynthesisSyntaxError,
            format!("line {}: {}", line, message.into()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::tokenize;

    fn parse_ok(source: &str) -> Function {
        parse(tokenize(source).unwrap()).unwrap()
    }

    fn parse_err(source: &str) -> AppError {
        match tokenize(source) {
            Ok(tokens) => parse(tokens).unwrap_err(),
            Err(err) => err,
        }
    }

    #[test]
    fn parses_minimal_function() {
        let f = parse_ok("def transform(x):\n    return x\n");
        assert_eq!(f.name, "transform");
        assert_eq!(f.param, "x");
        assert_eq!(f.body.len(), 1);
    }

    #[test]
    fn accepts_top_level_imports() {
        let f = parse_ok("import datetime\n\ndef transform(x):\n    return x\n");
        assert!(matches!(&f.body[0], Stmt::Import(m) if m == "datetime"));
    }

    #[test]
    fn parses_if_elif_else() {
        let f = parse_ok(concat!(
            "def transform(x):\n",
            "    if x > 0:\n",
            "        return 'pos'\n",
            "    elif x < 0:\n",
            "        return 'neg'\n",
            "    else:\n",
            "        return 'zero'\n",
        ));
        match &f.body[0] {
            Stmt::If { branches, orelse } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(orelse.len(), 1);
            }
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn parses_inline_suite() {
        let f = parse_ok("def transform(x):\n    if x: return 1\n    return 0\n");
        assert_eq!(f.body.len(), 2);
    }

    #[test]
    fn parses_slices_and_chained_compare() {
        parse_ok("def transform(x):\n    return x[::-1]\n");
        parse_ok("def transform(x):\n    return 0 < x <= 10\n");
        parse_ok("def transform(x):\n    return x[1:3]\n");
    }

    #[test]
    fn rejects_trailing_code_after_function() {
        let err = parse_err("def transform(x):\n    return x\nprint(x)\n");
        assert_eq!(err.kind(), ErrorKind::SynthesisSyntaxError);
    }

    #[test]
    fn rejects_deep_nesting() {
        let mut expr = String::from("x");
        for _ in 0..200 {
            expr = format!("({expr})");
        }
        let err = parse_err(&format!("def transform(x):\n    return {expr}\n"));
        assert_eq!(err.kind(), ErrorKind::SynthesisSyntaxError);
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn error_carries_line_number() {
        let err = parse_err("def transform(x):\n    return +\n");
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
