//! Symbolic algebra with canonical forms and exact rational arithmetic.
//!
//! Expressions parse directly into a canonical [`Symbol`]: like terms merge,
//! coefficients stay exact arbitrary-precision fractions, and two
//! mathematically equal inputs produce structurally equal values.
//!
//! ```
//! use canonic::{parse, text_default};
//!
//! let sum = parse("x+x").unwrap();
//! assert_eq!(text_default(&sum), "2*x");
//!
//! let exact = parse("1/3+1/6").unwrap();
//! assert_eq!(text_default(&exact), "1/2");
//! ```
//!
//! Stateful use goes through a [`Session`], which owns a [`Context`] with
//! settings, declared variables and functions, and custom operators:
//!
//! ```
//! use canonic::Session;
//!
//! let mut session = Session::new();
//! session.eval("a := 4").unwrap();
//! let result = session.eval("sqrt(a)+1").unwrap();
//! assert_eq!(session.text(&result), "3");
//! ```

pub mod algebra;
pub mod context;
pub mod display;
pub mod error;
pub mod functions;
pub mod parser;
pub mod rational;
pub mod symbol;

#[cfg(test)]
mod tests;

pub use context::{Context, Settings};
pub use display::{text, text_default, NumberFormat, TextOptions};
pub use error::{Error, ErrorKind};
pub use rational::Rational;
pub use symbol::{Group, Kind, Symbol};

/// Parse one expression with a fresh default context.
pub fn parse(input: &str) -> Result<Symbol, Error> {
    let ctx = Context::new();
    parser::parse(&ctx, input)
}

/// A stateful evaluation session: declarations made through [`Session::eval`]
/// persist and apply to later lines.
#[derive(Debug, Default)]
pub struct Session {
    ctx: Context,
}

impl Session {
    pub fn new() -> Self {
        Session { ctx: Context::new() }
    }

    pub fn with_context(ctx: Context) -> Self {
        Session { ctx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    /// Parse an expression against the session state without evaluating
    /// definitions.
    pub fn parse(&self, input: &str) -> Result<Symbol, Error> {
        parser::parse(&self.ctx, input)
    }

    /// Evaluate one line. A top-level `:=` makes a definition — `x := 2` binds
    /// a variable, `f(t) := t^2` a function — and returns the bound body.
    /// Anything else parses as an expression.
    pub fn eval(&mut self, input: &str) -> Result<Symbol, Error> {
        match split_assignment(input) {
            Some((lhs, rhs)) => self.define(lhs.trim(), rhs),
            None => self.parse(input),
        }
    }

    fn define(&mut self, lhs: &str, rhs: &str) -> Result<Symbol, Error> {
        let body = self.parse(rhs)?;
        match parse_signature(lhs) {
            Some((name, params)) => {
                self.ctx.define_function(name, params, body.clone())?;
            }
            None => {
                self.ctx.set_variable(lhs, body.clone())?;
            }
        }
        Ok(body)
    }

    pub fn set_variable(&mut self, name: &str, value: Symbol) -> Result<(), Error> {
        self.ctx.set_variable(name, value)
    }

    pub fn register_operator(
        &mut self,
        op: parser::operators::Operator,
    ) -> Result<(), Error> {
        self.ctx.register_operator(op)
    }

    /// Render a symbol using this session's precision settings.
    pub fn text(&self, symbol: &Symbol) -> String {
        let options = TextOptions {
            significant_digits: self.ctx.settings().precision,
            ..TextOptions::default()
        };
        display::text(symbol, &options)
    }
}

/// Find a top-level `:=` (outside any brackets) and split around it.
fn split_assignment(input: &str) -> Option<(&str, &str)> {
    let bytes = input.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b'=') => {
                return Some((&input[..i], &input[i + 2..]));
            }
            _ => {}
        }
    }
    None
}

/// `f(a,b)` → name and parameter list; `None` for a bare identifier.
fn parse_signature(lhs: &str) -> Option<(&str, Vec<String>)> {
    let open = lhs.find('(')?;
    let inner = lhs.strip_suffix(')')?;
    let name = lhs[..open].trim();
    let params: Vec<String> = inner[open + 1..]
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    Some((name, params))
}
