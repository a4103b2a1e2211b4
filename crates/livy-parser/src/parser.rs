//! Pratt parser for Livy.
//!
//! Expressions are parsed with prefix and infix dispatch over a total
//! precedence table. A handful of token kinds have dedicated prefix
//! handlers (`if`, `\`, `let`, unary `-`, `match`); everything else
//! falls back to application by juxtaposition. Infix operators fold the
//! parsed left-hand side into a curried `Apply` chain; `/` and the
//! pair-forming comma associate to the right, the rest to the left.

use livy_common::span::Span;
use livy_common::token::{Token, TokenKind};

use crate::ast::{Expr, ExprKind, MatchCase, Pattern, PatternKind, RestName, ScalarValue};
use crate::error::ParseError;
use crate::stream::TokenStream;
use crate::types::Type;

// ── Precedence table ───────────────────────────────────────────────────

const PREC_DEFAULT: i32 = -10;
const PREC_LET: i32 = 0;
const PREC_COMMA: i32 = 20;
const PREC_FUNC: i32 = 30;
const PREC_COND: i32 = 40;
const PREC_NEGATE: i32 = 120;

/// Binding power of the infix operators. `None` for anything that never
/// appears in infix position, which ends the expression loop.
fn infix_precedence(kind: TokenKind) -> Option<i32> {
    match kind {
        TokenKind::Comma => Some(PREC_COMMA),
        TokenKind::And => Some(50),
        TokenKind::Or => Some(60),
        TokenKind::Greater
        | TokenKind::Less
        | TokenKind::GreaterEqual
        | TokenKind::LessEqual => Some(70),
        TokenKind::Equal | TokenKind::SlashEqual => Some(80),
        TokenKind::Plus | TokenKind::Dash | TokenKind::Diamond => Some(90),
        TokenKind::Fslash | TokenKind::Asterisk | TokenKind::Percent => Some(100),
        TokenKind::Caret => Some(110),
        _ => None,
    }
}

const SCALAR_TOKENS: [TokenKind; 5] = [
    TokenKind::False,
    TokenKind::Float,
    TokenKind::Int,
    TokenKind::String,
    TokenKind::True,
];

/// Upper bound on juxtaposed application arguments, guarding the
/// `parse_apply` loop against runaway input.
const MAX_APPLICATIONS: usize = 24;

// ── Entry points ───────────────────────────────────────────────────────

/// Convert a stream of lexer tokens (after EOL inference) into an AST.
///
/// A program is a block of `Eol`-separated statements; zero statements
/// parse to `Unit` and one statement stands on its own.
pub fn parse(tokens: Vec<Token>) -> Result<Expr, ParseError> {
    let mut stream = TokenStream::new(tokens);
    let mut stmts: Vec<Expr> = Vec::new();
    while !stream.at_end() {
        stmts.push(parse_stmt(&mut stream)?);
        stream.consume(&[TokenKind::Eol])?;
    }

    let span = match (stmts.first(), stmts.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => Span::zero(),
    };
    Ok(Expr::block(span, stmts))
}

/// A statement: a definition, or an (optionally annotated) expression.
fn parse_stmt(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    if stream.peek(&[TokenKind::Let]) {
        parse_define(stream)
    } else {
        parse_annotation(stream)
    }
}

// ── Expression parsing ─────────────────────────────────────────────────

/// Parse an expression, folding in infix operators whose precedence is
/// strictly greater than `precedence`.
fn parse_expr(stream: &mut TokenStream, precedence: i32) -> Result<Expr, ParseError> {
    let mut result = match stream.preview_kind() {
        TokenKind::If => parse_if(stream)?,
        TokenKind::Bslash => parse_func(stream)?,
        TokenKind::Let => parse_define(stream)?,
        TokenKind::Dash => parse_negate(stream)?,
        TokenKind::Match => parse_match(stream)?,
        _ => parse_apply(stream)?,
    };

    loop {
        let op = stream.preview_kind();
        let Some(op_precedence) = infix_precedence(op) else {
            break;
        };
        if op_precedence <= precedence {
            break;
        }
        result = parse_infix(stream, result)?;
    }
    Ok(result)
}

/// Fold one infix operator into the left-hand side.
fn parse_infix(stream: &mut TokenStream, left: Expr) -> Result<Expr, ParseError> {
    let op = stream.next();
    if op.kind == TokenKind::Comma {
        // The pair comma associates right: recurse one level lower.
        let right = parse_expr(stream, PREC_COMMA - 1)?;
        let span = left.span.merge(right.span);
        return Ok(Expr::new(
            span,
            ExprKind::Pair {
                first: Box::new(left),
                second: Box::new(right),
            },
        ));
    }

    let precedence = infix_precedence(op.kind).expect("caller checked infix kind")
        - i32::from(op.kind == TokenKind::Fslash);
    let right = parse_expr(stream, precedence)?;
    let func_span = left.span.merge(op.span);
    let span = left.span.merge(right.span);
    let func = Expr::apply(
        func_span,
        Expr::name(op.span, op.kind.to_string()),
        left,
    );
    Ok(Expr::apply(span, func, right))
}

/// Greedily parse juxtaposed factors into a left-folded `Apply` chain.
fn parse_apply(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let mut result = parse_factor(stream)?;
    let mut iterations = 0;
    while iterations < MAX_APPLICATIONS && starts_factor(stream.preview_kind()) {
        iterations += 1;
        let arg = parse_factor(stream)?;
        let span = result.span.merge(arg.span);
        result = Expr::apply(span, result, arg);
    }
    Ok(result)
}

/// Whether a token can begin a factor (an application argument).
fn starts_factor(kind: TokenKind) -> bool {
    kind == TokenKind::Lparen
        || kind == TokenKind::Lbracket
        || kind == TokenKind::Name
        || SCALAR_TOKENS.contains(&kind)
}

fn parse_factor(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    match stream.preview_kind() {
        TokenKind::Lparen => parse_group(stream),
        TokenKind::Lbracket => parse_list(stream),
        TokenKind::Name => {
            let token = stream.consume(&[TokenKind::Name])?;
            let name = token.lexeme.expect("name tokens carry their lexeme");
            Ok(Expr::name(token.span, name))
        }
        _ => parse_scalar(stream),
    }
}

fn parse_group(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let first = stream.consume(&[TokenKind::Lparen])?;
    if stream.peek(&[TokenKind::Rparen]) {
        let last = stream.consume(&[TokenKind::Rparen])?;
        return Ok(Expr::unit(first.span.merge(last.span)));
    }
    let expr = parse_expr(stream, PREC_LET + 1)?;
    stream.consume(&[TokenKind::Rparen])?;
    Ok(expr)
}

fn parse_list(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let first = stream.consume(&[TokenKind::Lbracket])?;
    let mut elements = Vec::new();
    while !stream.peek(&[TokenKind::Rbracket]) {
        elements.push(parse_expr(stream, PREC_COMMA)?);
        if !stream.consume_if(&[TokenKind::Comma]) {
            break;
        }
    }
    let last = stream.consume(&[TokenKind::Rbracket])?;
    Ok(Expr::new(
        first.span.merge(last.span),
        ExprKind::List(elements),
    ))
}

fn parse_scalar(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let (span, value) = parse_scalar_value(stream)?;
    Ok(Expr::new(span, ExprKind::Scalar(value)))
}

fn parse_scalar_value(stream: &mut TokenStream) -> Result<(Span, ScalarValue), ParseError> {
    let token = stream.preview();
    let value = match token.kind {
        TokenKind::True => {
            stream.next();
            ScalarValue::Bool(true)
        }
        TokenKind::False => {
            stream.next();
            ScalarValue::Bool(false)
        }
        TokenKind::Int => {
            stream.next();
            let text = token.lexeme.as_deref().expect("int tokens carry their lexeme");
            let value = text.parse::<i64>().map_err(|_| {
                ParseError::new(crate::error::ParseErrorKind::NumberOverflow, token.span)
            })?;
            ScalarValue::Int(value)
        }
        TokenKind::Float => {
            stream.next();
            let text = token
                .lexeme
                .as_deref()
                .expect("float tokens carry their lexeme");
            let value = text.parse::<f64>().map_err(|_| {
                ParseError::new(crate::error::ParseErrorKind::NumberOverflow, token.span)
            })?;
            ScalarValue::Float(value)
        }
        TokenKind::String => {
            stream.next();
            let text = token
                .lexeme
                .as_deref()
                .expect("string tokens carry their lexeme");
            // The lexeme includes both quotes; escape expansion is the
            // string expander's job, not the parser's.
            ScalarValue::String(text[1..text.len() - 1].to_owned())
        }
        TokenKind::Eof => {
            return Err(ParseError::unexpected_eof(token.span, SCALAR_TOKENS.to_vec()))
        }
        found => {
            return Err(ParseError::unexpected_token(
                found,
                token.span,
                SCALAR_TOKENS.to_vec(),
            ))
        }
    };
    Ok((token.span, value))
}

// ── Prefix handlers ────────────────────────────────────────────────────

fn parse_if(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let first = stream.consume(&[TokenKind::If])?;
    let pred = parse_expr(stream, PREC_COND)?;
    stream.consume(&[TokenKind::Then])?;
    let cons = parse_expr(stream, PREC_COND)?;
    stream.consume(&[TokenKind::Else])?;
    let alt = parse_expr(stream, PREC_COND)?;
    let span = first.span.merge(alt.span);
    Ok(Expr::new(
        span,
        ExprKind::Cond {
            pred: Box::new(pred),
            cons: Box::new(cons),
            alt: Box::new(alt),
        },
    ))
}

fn parse_func(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let first = stream.consume(&[TokenKind::Bslash])?;
    let param = parse_pattern(stream)?;
    stream.consume(&[TokenKind::Arrow])?;
    let body = parse_expr(stream, PREC_FUNC)?;
    let span = first.span.merge(body.span);
    Ok(Expr::new(
        span,
        ExprKind::Function {
            param,
            body: Box::new(body),
        },
    ))
}

/// Unary negation: `-x` becomes an application of the name `~`.
fn parse_negate(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let token = stream.consume(&[TokenKind::Dash])?;
    let operand = parse_expr(stream, PREC_NEGATE)?;
    let span = token.span.merge(operand.span);
    Ok(Expr::apply(span, Expr::name(token.span, "~"), operand))
}

fn parse_match(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let first = stream.consume(&[TokenKind::Match])?;
    let subject = parse_expr(stream, PREC_COND)?;
    let mut cases: Vec<MatchCase> = Vec::new();
    while stream.consume_if(&[TokenKind::Pipe]) {
        let pattern = parse_pattern(stream)?;
        stream.consume(&[TokenKind::Arrow])?;
        let body = parse_expr(stream, PREC_COND)?;
        cases.push(MatchCase { pattern, body });
    }

    let Some(last) = cases.last() else {
        let head = stream.preview();
        return Err(ParseError::unexpected_token(
            head.kind,
            head.span,
            vec![TokenKind::Pipe],
        ));
    };
    let span = first.span.merge(last.body.span);
    Ok(Expr::new(
        span,
        ExprKind::Match {
            subject: Box::new(subject),
            cases,
        },
    ))
}

/// `let` definitions: `let pat = expr`, `let pat := block end`, and the
/// function shorthand `let f p1 p2 = body` which folds the parameter
/// patterns into curried functions.
fn parse_define(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let first = stream.consume(&[TokenKind::Let])?;
    let mut params: Vec<Pattern> = Vec::new();
    let target = if stream.peek(&[TokenKind::Name]) {
        let token = stream.consume(&[TokenKind::Name])?;
        let name = token.lexeme.expect("name tokens carry their lexeme");
        while !stream.peek(&[TokenKind::ColonEqual, TokenKind::Equal]) {
            params.push(parse_pattern(stream)?);
        }
        Pattern::new(token.span, PatternKind::FreeName(name))
    } else {
        parse_pattern(stream)?
    };

    let value = if stream.consume_if(&[TokenKind::ColonEqual]) {
        parse_block(stream, &[TokenKind::End])?
    } else {
        stream.consume(&[TokenKind::Equal])?;
        parse_expr(stream, PREC_LET)?
    };

    let value = params.into_iter().rev().fold(value, |body, param| {
        let span = param.span.merge(body.span);
        Expr::new(
            span,
            ExprKind::Function {
                param,
                body: Box::new(body),
            },
        )
    });
    let span = first.span.merge(value.span);
    Ok(Expr::new(
        span,
        ExprKind::Define {
            target,
            value: Box::new(value),
        },
    ))
}

/// Parse `Eol`-separated statements until one of `ends` is consumed.
fn parse_block(stream: &mut TokenStream, ends: &[TokenKind]) -> Result<Expr, ParseError> {
    let mut exprs: Vec<Expr> = Vec::new();
    while !stream.consume_if(ends) {
        exprs.push(parse_expr(stream, PREC_LET)?);
        stream.consume(&[TokenKind::Eol])?;
    }
    let span = match (exprs.first(), exprs.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span),
        _ => Span::zero(),
    };
    Ok(Expr::block(span, exprs))
}

// ── Annotations ────────────────────────────────────────────────────────

/// An expression statement, or `name :: Type`.
fn parse_annotation(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let left = parse_expr(stream, PREC_DEFAULT)?;
    if let ExprKind::Name(name) = &left.kind {
        if stream.consume_if(&[TokenKind::ColonColon]) {
            let ty = parse_type(stream)?;
            let span = left.span.merge(ty.span());
            return Ok(Expr::new(
                span,
                ExprKind::Annotation {
                    name: name.clone(),
                    ty,
                },
            ));
        }
    }
    if stream.peek(&[TokenKind::ColonColon]) {
        // Only a plain name can be annotated.
        let head = stream.preview();
        return Err(ParseError::unexpected_token(head.kind, head.span, vec![]));
    }
    Ok(left)
}

// ── Pattern parsing ────────────────────────────────────────────────────

fn parse_pattern(stream: &mut TokenStream) -> Result<Pattern, ParseError> {
    let left = parse_factor_pattern(stream)?;
    if stream.consume_if(&[TokenKind::Comma]) {
        let right = parse_pattern(stream)?;
        let span = left.span.merge(right.span);
        return Ok(Pattern::new(
            span,
            PatternKind::Pair {
                first: Box::new(left),
                second: Box::new(right),
            },
        ));
    }
    Ok(left)
}

fn parse_factor_pattern(stream: &mut TokenStream) -> Result<Pattern, ParseError> {
    if stream.peek(&[TokenKind::Lbracket]) {
        return parse_list_pattern(stream);
    }
    if stream.peek(&SCALAR_TOKENS) {
        let (span, value) = parse_scalar_value(stream)?;
        return Ok(Pattern::new(span, PatternKind::Scalar(value)));
    }
    if stream.peek(&[TokenKind::Name]) {
        let token = stream.consume(&[TokenKind::Name])?;
        let name = token.lexeme.expect("name tokens carry their lexeme");
        return Ok(Pattern::new(token.span, PatternKind::FreeName(name)));
    }
    if stream.consume_if(&[TokenKind::Caret]) {
        let token = stream.consume(&[TokenKind::Name])?;
        let name = token.lexeme.expect("name tokens carry their lexeme");
        return Ok(Pattern::new(token.span, PatternKind::PinnedName(name)));
    }
    if stream.peek(&[TokenKind::Lparen]) {
        let first = stream.consume(&[TokenKind::Lparen])?;
        let pattern = if stream.peek(&[TokenKind::Rparen]) {
            None
        } else {
            Some(parse_pattern(stream)?)
        };
        let last = stream.consume(&[TokenKind::Rparen])?;
        return Ok(pattern
            .unwrap_or_else(|| Pattern::new(first.span.merge(last.span), PatternKind::Unit)));
    }

    let head = stream.preview();
    if head.kind == TokenKind::Eof {
        Err(ParseError::unexpected_eof(head.span, vec![]))
    } else {
        Err(ParseError::unexpected_token(head.kind, head.span, vec![]))
    }
}

fn parse_list_pattern(stream: &mut TokenStream) -> Result<Pattern, ParseError> {
    let first = stream.consume(&[TokenKind::Lbracket])?;
    let mut initials: Vec<Pattern> = Vec::new();
    let mut rest: Option<RestName> = None;
    while !stream.peek(&[TokenKind::Rbracket]) {
        if stream.consume_if(&[TokenKind::DotDot]) {
            let token = stream.consume(&[TokenKind::Name])?;
            let name = token.lexeme.expect("name tokens carry their lexeme");
            rest = Some(RestName {
                span: token.span,
                name,
            });
            break;
        }
        initials.push(parse_factor_pattern(stream)?);
        if !stream.consume_if(&[TokenKind::Comma]) {
            break;
        }
    }
    let last = stream.consume(&[TokenKind::Rbracket])?;
    Ok(Pattern::new(
        first.span.merge(last.span),
        PatternKind::List { initials, rest },
    ))
}

// ── Type parsing ───────────────────────────────────────────────────────

/// `->` associates right over pair types over applied generics.
fn parse_type(stream: &mut TokenStream) -> Result<Type, ParseError> {
    let left = parse_pair_type(stream)?;
    if stream.consume_if(&[TokenKind::Arrow]) {
        let right = parse_type(stream)?;
        let span = left.span().merge(right.span());
        return Ok(Type::func(span, left, right));
    }
    Ok(left)
}

fn parse_pair_type(stream: &mut TokenStream) -> Result<Type, ParseError> {
    let left = parse_group_type(stream)?;
    if stream.consume_if(&[TokenKind::Comma]) {
        let right = parse_pair_type(stream)?;
        let span = left.span().merge(right.span());
        return Ok(Type::pair(span, left, right));
    }
    Ok(left)
}

fn parse_group_type(stream: &mut TokenStream) -> Result<Type, ParseError> {
    if stream.consume_if(&[TokenKind::Lparen]) {
        let result = parse_pair_type(stream)?;
        stream.consume(&[TokenKind::Rparen])?;
        return Ok(result);
    }
    parse_generic_type(stream)
}

/// A type name with optional `[...]` arguments, or a lowercase type
/// variable.
fn parse_generic_type(stream: &mut TokenStream) -> Result<Type, ParseError> {
    let token = stream.consume(&[TokenKind::Name])?;
    let text = token.lexeme.expect("name tokens carry their lexeme");
    let starts_lower = text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    if starts_lower {
        return Ok(Type::var(token.span, text));
    }

    let mut result = Type::name(token.span, text);
    if stream.consume_if(&[TokenKind::Lbracket]) {
        while !stream.peek(&[TokenKind::Rbracket]) {
            let arg = parse_group_type(stream)?;
            let span = result.span().merge(arg.span());
            result = Type::apply(span, result, arg);
            if !stream.consume_if(&[TokenKind::Comma]) {
                break;
            }
        }
        stream.consume(&[TokenKind::Rbracket])?;
    }
    Ok(result)
}
