//! Shunting-yard
//!
//! Converts one scope's token list into reverse Polish order. Prefix
//! operators ride the same stack as a right-associative tier between `*` and
//! `^`, so `-x^2` stays `-(x^2)` while `-2*x` binds the sign to the 2.
//! Postfix operators bind immediately to the finished operand.
//!
//! The overloaded spellings are resolved here: `%` is modulo when an operand
//! follows and percent otherwise; `!` before an operand position is a
//! misplaced factorial rather than negation.

use crate::context::Context;
use crate::error::Error;
use crate::parser::operators::{Assoc, OpAction, PREC_PREFIX};
use crate::parser::tokenizer::{ScopeKind, Token, TokenKind};
use crate::rational::Rational;

/// One element of the evaluator's input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RpnItem {
    Number(Rational),
    Ident(String),
    Infix(OpAction, String),
    Prefix(OpAction, String),
    Postfix(OpAction, String),
    /// Apply the named callable to the value on top of the stack.
    Call(String),
    /// Marker for a call with an empty argument list.
    EmptyArgs,
}

#[derive(Debug)]
struct StackOp {
    action: OpAction,
    symbol: String,
    precedence: u8,
    assoc: Assoc,
    prefix: bool,
}

pub fn to_rpn(ctx: &Context, tokens: &[Token]) -> Result<Vec<RpnItem>, Error> {
    let mut output = Vec::new();
    let mut stack: Vec<StackOp> = Vec::new();
    let mut expect_operand = true;
    let mut last_op = String::new();

    for (idx, token) in tokens.iter().enumerate() {
        ctx.check_deadline()?;
        match &token.kind {
            TokenKind::Number(value) => {
                output.push(RpnItem::Number(value.clone()));
                expect_operand = false;
            }
            TokenKind::Ident(name) => {
                output.push(RpnItem::Ident(name.clone()));
                expect_operand = false;
            }
            TokenKind::Scope(ScopeKind::Group, inner) => {
                if inner.is_empty() {
                    return Err(Error::EmptyExpression);
                }
                output.extend(to_rpn(ctx, inner)?);
                expect_operand = false;
            }
            TokenKind::Scope(kind, inner) => {
                // Vector and set literals are calls to their constructors.
                append_call_args(ctx, &mut output, inner)?;
                let name = match kind {
                    ScopeKind::Vector => "vector",
                    _ => "set",
                };
                output.push(RpnItem::Call(name.to_string()));
                expect_operand = false;
            }
            TokenKind::Call(name, inner) => {
                append_call_args(ctx, &mut output, inner)?;
                output.push(RpnItem::Call(name.clone()));
                expect_operand = false;
            }
            TokenKind::Op(symbol) => {
                let op = ctx
                    .operators()
                    .get(symbol)
                    .ok_or_else(|| Error::UnknownOperator {
                        text: symbol.clone(),
                        column: token.column,
                    })?;

                if expect_operand {
                    if !op.prefix {
                        return Err(Error::MisplacedOperator {
                            text: symbol.clone(),
                        });
                    }
                    stack.push(StackOp {
                        action: op.action.clone(),
                        symbol: symbol.clone(),
                        precedence: PREC_PREFIX,
                        assoc: Assoc::Right,
                        prefix: true,
                    });
                    last_op = symbol.clone();
                    continue;
                }

                if op.postfix && postfix_position(ctx, tokens.get(idx + 1)) {
                    output.push(RpnItem::Postfix(postfix_action(&op.action), symbol.clone()));
                    // Operand position is unchanged: the result is still an
                    // operand.
                    continue;
                }

                while let Some(top) = stack.last() {
                    let pops = top.precedence > op.precedence
                        || (top.precedence == op.precedence && op.assoc == Assoc::Left);
                    if !pops {
                        break;
                    }
                    let popped = stack.pop().ok_or(Error::EmptyExpression)?;
                    output.push(stack_item(popped));
                }
                stack.push(StackOp {
                    action: op.action.clone(),
                    symbol: symbol.clone(),
                    precedence: op.precedence,
                    assoc: op.assoc,
                    prefix: false,
                });
                last_op = symbol.clone();
                expect_operand = true;
            }
        }
    }

    if expect_operand && !output.is_empty() {
        return Err(Error::MisplacedOperator { text: last_op });
    }

    while let Some(op) = stack.pop() {
        output.push(stack_item(op));
    }
    Ok(output)
}

fn append_call_args(
    ctx: &Context,
    output: &mut Vec<RpnItem>,
    inner: &[Token],
) -> Result<(), Error> {
    if inner.is_empty() {
        output.push(RpnItem::EmptyArgs);
    } else {
        output.extend(to_rpn(ctx, inner)?);
    }
    Ok(())
}

fn stack_item(op: StackOp) -> RpnItem {
    if op.prefix {
        RpnItem::Prefix(op.action, op.symbol)
    } else {
        RpnItem::Infix(op.action, op.symbol)
    }
}

/// An overloaded operator after an operand is postfix exactly when no new
/// operand can follow it: end of input, a closing context, or another
/// non-prefix operator.
fn postfix_position(ctx: &Context, next: Option<&Token>) -> bool {
    match next {
        None => true,
        Some(token) => match &token.kind {
            TokenKind::Op(symbol) => ctx
                .operators()
                .get(symbol)
                .map(|op| !op.prefix)
                .unwrap_or(true),
            _ => false,
        },
    }
}

/// The action an overloaded spelling performs in postfix position.
fn postfix_action(infix: &OpAction) -> OpAction {
    match infix {
        OpAction::Mod => OpAction::Percent,
        other => other.clone(),
    }
}
