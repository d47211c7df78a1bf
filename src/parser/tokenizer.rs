//! Tokenizer
//!
//! Turns source text into a token *tree*: bracket pairs become nested scopes
//! up front, so the later stages never see raw brackets. Each token carries
//! the 0-based column it started at; bracket parity errors point at the
//! offending column.
//!
//! Implicit multiplication is inserted here: `2x`, `2(x+1)`, `(a)(b)`, and
//! `x y` all get an explicit `*`. An identifier directly before `(` becomes
//! a function call instead when the context knows a callable by that name.

use log::trace;

use crate::context::Context;
use crate::error::Error;
use crate::rational::Rational;

/// The bracket family a scope was delimited by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// `( )` — precedence grouping.
    Group,
    /// `[ ]` — vector literal.
    Vector,
    /// `{ }` — set literal.
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(Rational),
    Ident(String),
    Op(String),
    /// A callable applied to a bracketed argument list.
    Call(String, Vec<Token>),
    Scope(ScopeKind, Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, column: usize) -> Self {
        Token { kind, column }
    }

    /// Operand-shaped tokens get an implicit `*` between them.
    fn is_operand(&self) -> bool {
        !matches!(self.kind, TokenKind::Op(_))
    }
}

struct Frame {
    kind: ScopeKind,
    open_column: usize,
    tokens: Vec<Token>,
    /// Set when this scope is the argument list of a call.
    call: Option<(String, usize)>,
}

impl Frame {
    fn root() -> Self {
        Frame {
            kind: ScopeKind::Group,
            open_column: 0,
            tokens: Vec::new(),
            call: None,
        }
    }

    /// Push an operand, inserting an implicit `*` if one directly follows
    /// another operand.
    fn push_operand(&mut self, token: Token) {
        if self.tokens.last().is_some_and(Token::is_operand) {
            self.tokens
                .push(Token::new(TokenKind::Op("*".to_string()), token.column));
        }
        self.tokens.push(token);
    }
}

pub fn tokenize(ctx: &Context, input: &str) -> Result<Vec<Token>, Error> {
    let chars: Vec<char> = input.chars().collect();
    let mut stack = vec![Frame::root()];
    let mut i = 0;

    while i < chars.len() {
        ctx.check_deadline()?;
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars, i + 1)) {
            let (value, end) = scan_number(&chars, i)?;
            top(&mut stack).push_operand(Token::new(TokenKind::Number(value), i));
            i = end;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            push_ident(ctx, top(&mut stack), ident, start);
            continue;
        }

        if let Some(kind) = open_bracket(c) {
            let frame = top(&mut stack);
            // `f(` with a known callable becomes a call scope; anything else
            // is grouping with implicit multiplication.
            let call = if kind == ScopeKind::Group {
                take_call_name(ctx, frame)
            } else {
                None
            };
            stack.push(Frame {
                kind,
                open_column: i,
                tokens: Vec::new(),
                call,
            });
            i += 1;
            continue;
        }

        if let Some(kind) = close_bracket(c) {
            if stack.len() == 1 {
                return Err(Error::UnmatchedBracket { column: i });
            }
            let frame = stack.pop().ok_or(Error::UnmatchedBracket { column: i })?;
            if frame.kind != kind {
                return Err(Error::MismatchedBracket { column: i });
            }
            let token = match frame.call {
                Some((name, column)) => Token::new(TokenKind::Call(name, frame.tokens), column),
                None => Token::new(TokenKind::Scope(frame.kind, frame.tokens), frame.open_column),
            };
            top(&mut stack).push_operand(token);
            i += 1;
            continue;
        }

        if ctx.operators().is_operator_char(c) {
            let start = i;
            while i < chars.len() && ctx.operators().is_operator_char(chars[i]) {
                i += 1;
            }
            let chunk: String = chars[start..i].iter().collect();
            let ops = ctx.operators().split_chunk(&chunk, start)?;
            let mut column = start;
            for op in ops {
                top(&mut stack)
                    .tokens
                    .push(Token::new(TokenKind::Op(op.symbol.clone()), column));
                column += op.symbol.chars().count();
            }
            continue;
        }

        return Err(Error::UnexpectedToken { text: c.to_string() });
    }

    if stack.len() > 1 {
        let open = stack
            .last()
            .map(|f| f.open_column)
            .unwrap_or(0);
        return Err(Error::UnmatchedBracket { column: open });
    }

    let root = stack.pop().map(|f| f.tokens).unwrap_or_default();
    trace!("tokenized {} top-level tokens", root.len());
    Ok(root)
}

fn top(stack: &mut Vec<Frame>) -> &mut Frame {
    debug_assert!(!stack.is_empty());
    let last = stack.len() - 1;
    &mut stack[last]
}

fn push_ident(ctx: &Context, frame: &mut Frame, ident: String, column: usize) {
    // With multi-character variables off, an unknown multi-letter run is a
    // product of single letters: `xy` is `x*y` unless `xy` is declared.
    let split = !ctx.settings().multicharacter_vars
        && ident.chars().count() > 1
        && ident.chars().all(|c| c.is_alphabetic())
        && !ctx.knows_name(&ident);
    if split {
        for (offset, c) in ident.chars().enumerate() {
            frame.push_operand(Token::new(TokenKind::Ident(c.to_string()), column + offset));
        }
    } else {
        frame.push_operand(Token::new(TokenKind::Ident(ident), column));
    }
}

/// If the last token in the frame is an identifier naming a callable, pop it
/// and return the call name.
fn take_call_name(ctx: &Context, frame: &mut Frame) -> Option<(String, usize)> {
    let is_call = matches!(
        frame.tokens.last(),
        Some(Token { kind: TokenKind::Ident(name), .. }) if ctx.is_function(name)
    );
    if !is_call {
        return None;
    }
    frame.tokens.pop().and_then(|t| match t.kind {
        TokenKind::Ident(name) => Some((name, t.column)),
        _ => None,
    })
}

fn open_bracket(c: char) -> Option<ScopeKind> {
    match c {
        '(' => Some(ScopeKind::Group),
        '[' => Some(ScopeKind::Vector),
        '{' => Some(ScopeKind::Set),
        _ => None,
    }
}

fn close_bracket(c: char) -> Option<ScopeKind> {
    match c {
        ')' => Some(ScopeKind::Group),
        ']' => Some(ScopeKind::Vector),
        '}' => Some(ScopeKind::Set),
        _ => None,
    }
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i).is_some_and(|c| c.is_ascii_digit())
}

/// Scan a numeric literal: digits, optional fraction, and an exponent part
/// only when `e`/`E` is verifiably followed by digits (`2e3`, `1.5e-2`).
/// Otherwise the `e` is left for the identifier scanner (`2e` is `2*e`).
fn scan_number(chars: &[char], start: usize) -> Result<(Rational, usize), Error> {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if next_is_digit(chars, j) {
            i = j;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text: String = chars[start..i].iter().collect();
    let value = Rational::from_decimal_str(&text).ok_or(Error::Parse {
        message: format!("invalid numeric literal '{}'", text),
        column: Some(start),
    })?;
    Ok((value, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new()
    }

    fn tok(input: &str) -> Vec<Token> {
        tokenize(&ctx(), input).unwrap()
    }

    fn kinds(tokens: &[Token]) -> Vec<&TokenKind> {
        tokens.iter().map(|t| &t.kind).collect()
    }

    #[test]
    fn test_simple_expression() {
        let tokens = tok("1+x");
        assert_eq!(
            kinds(&tokens),
            vec![
                &TokenKind::Number(Rational::integer(1)),
                &TokenKind::Op("+".to_string()),
                &TokenKind::Ident("x".to_string()),
            ]
        );
        assert_eq!(tokens[2].column, 2);
    }

    #[test]
    fn test_decimal_is_exact() {
        let tokens = tok("3.14");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Number(Rational::from_decimal_str("3.14").unwrap())
        );
    }

    #[test]
    fn test_implicit_multiplication() {
        // 2x -> 2 * x
        let tokens = tok("2x");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Op("*".to_string()));

        // (a)(b) -> (a) * (b)
        let tokens = tok("(a)(b)");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Op("*".to_string()));
    }

    #[test]
    fn test_scientific_vs_eulers_number() {
        // 2e3 is one literal; 2e is 2 * e
        let tokens = tok("2e3");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Number(Rational::integer(2000)));

        let tokens = tok("2e");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::Ident("e".to_string()));
    }

    #[test]
    fn test_known_function_becomes_call() {
        let tokens = tok("sin(x)");
        assert_eq!(tokens.len(), 1);
        match &tokens[0].kind {
            TokenKind::Call(name, args) => {
                assert_eq!(name, "sin");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_ident_before_paren_multiplies() {
        // x(x+1) with undeclared x is x * (x+1)
        let tokens = tok("x(x+1)");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].kind, TokenKind::Op("*".to_string()));
        assert!(matches!(
            tokens[2].kind,
            TokenKind::Scope(ScopeKind::Group, _)
        ));
    }

    #[test]
    fn test_nested_scopes() {
        let tokens = tok("(1+(2))");
        match &tokens[0].kind {
            TokenKind::Scope(ScopeKind::Group, inner) => {
                assert!(matches!(
                    inner[2].kind,
                    TokenKind::Scope(ScopeKind::Group, _)
                ));
            }
            other => panic!("expected scope, got {:?}", other),
        }
    }

    #[test]
    fn test_vector_and_set_scopes() {
        let tokens = tok("[1,2]");
        assert!(matches!(
            tokens[0].kind,
            TokenKind::Scope(ScopeKind::Vector, _)
        ));
        let tokens = tok("{1,2}");
        assert!(matches!(tokens[0].kind, TokenKind::Scope(ScopeKind::Set, _)));
    }

    #[test]
    fn test_unmatched_bracket_column() {
        let err = tokenize(&ctx(), "1+(2").unwrap_err();
        assert_eq!(err, Error::UnmatchedBracket { column: 2 });

        let err = tokenize(&ctx(), "1+2)").unwrap_err();
        assert_eq!(err, Error::UnmatchedBracket { column: 3 });
    }

    #[test]
    fn test_mismatched_bracket_column() {
        let err = tokenize(&ctx(), "(1+2]").unwrap_err();
        assert_eq!(err, Error::MismatchedBracket { column: 4 });
    }

    #[test]
    fn test_greedy_operator_chunking() {
        // "2**-3": ** then prefix -
        let tokens = tok("2**-3");
        assert_eq!(tokens[1].kind, TokenKind::Op("**".to_string()));
        assert_eq!(tokens[2].kind, TokenKind::Op("-".to_string()));
    }

    #[test]
    fn test_single_character_variable_splitting() {
        let mut ctx = Context::new();
        ctx.settings_mut().multicharacter_vars = false;
        let tokens = tokenize(&ctx, "xy").unwrap();
        // x * y
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Ident("x".to_string()));
        assert_eq!(tokens[2].kind, TokenKind::Ident("y".to_string()));
    }

    #[test]
    fn test_unknown_character_rejected() {
        let err = tokenize(&ctx(), "1 # 2").unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { .. }));
    }
}
