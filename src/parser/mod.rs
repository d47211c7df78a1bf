//! Parsing pipeline
//!
//! Three fixed stages: tokenize into a scope tree, shunting-yard each scope
//! into RPN, evaluate the RPN directly into a canonical [`Symbol`]. The
//! deadline is armed here and disarmed on every exit path; [`Error::Timeout`]
//! passes through the boundary unchanged.

pub mod evaluator;
pub mod operators;
pub mod rpn;
pub mod tokenizer;

use crate::context::Context;
use crate::error::Error;
use crate::symbol::Symbol;

/// Parse and canonicalize one expression.
pub fn parse(ctx: &Context, input: &str) -> Result<Symbol, Error> {
    if input.trim().is_empty() {
        return Err(Error::EmptyExpression);
    }
    ctx.arm_deadline();
    let result = run(ctx, input);
    ctx.disarm_deadline();
    result.map_err(Error::wrap_parse)
}

fn run(ctx: &Context, input: &str) -> Result<Symbol, Error> {
    let tokens = tokenizer::tokenize(ctx, input)?;
    let rpn = rpn::to_rpn(ctx, &tokens)?;
    evaluator::evaluate(ctx, &rpn)
}
