//! Postfix evaluator
//!
//! Walks the RPN stream with an operand stack, building canonical symbols as
//! it goes. There is no intermediate tree: every infix action maps straight
//! onto the operator algebra, so the result of evaluation *is* the canonical
//! form.
//!
//! The comma is an ordinary operator that aggregates operands into an
//! argument list ([`StackValue::Args`]); a following call consumes the list.

use rustc_hash::FxHashMap;

use crate::algebra;
use crate::context::Context;
use crate::error::Error;
use crate::parser::operators::OpAction;
use crate::parser::rpn::RpnItem;
use crate::rational::Rational;
use crate::symbol::{Exponent, Kind, Symbol, IMAGINARY, INFINITY};

/// A value on the evaluation stack: a symbol, or an argument list being
/// assembled for a call.
#[derive(Debug, Clone)]
pub enum StackValue {
    Sym(Symbol),
    Args(Vec<Symbol>),
}

pub fn evaluate(ctx: &Context, rpn: &[RpnItem]) -> Result<Symbol, Error> {
    if rpn.is_empty() {
        return Err(Error::EmptyExpression);
    }

    let mut stack: Vec<StackValue> = Vec::new();
    for item in rpn {
        ctx.check_deadline()?;
        match item {
            RpnItem::Number(value) => stack.push(StackValue::Sym(Symbol::number(value.clone()))),
            RpnItem::Ident(name) => stack.push(StackValue::Sym(resolve_ident(ctx, name))),
            RpnItem::EmptyArgs => stack.push(StackValue::Args(Vec::new())),
            RpnItem::Prefix(action, symbol) => {
                let operand = pop_symbol(&mut stack, symbol)?;
                let value = match action {
                    OpAction::Subtract => operand.negate(),
                    OpAction::Add => operand,
                    OpAction::Call(name) => apply_function(ctx, name, vec![operand])?,
                    _ => {
                        return Err(Error::MisplacedOperator {
                            text: symbol.clone(),
                        })
                    }
                };
                stack.push(StackValue::Sym(value));
            }
            RpnItem::Postfix(action, symbol) => {
                let operand = pop_symbol(&mut stack, symbol)?;
                let value = match action {
                    OpAction::Factorial => factorial(ctx, operand)?,
                    OpAction::DoubleFactorial => double_factorial(ctx, operand)?,
                    OpAction::Percent => {
                        let mut scaled = operand;
                        scaled.multiplier = scaled.multiplier
                            * Rational::new(1.into(), 100.into())
                                .unwrap_or_else(Rational::one);
                        scaled
                    }
                    OpAction::Call(name) => apply_function(ctx, name, vec![operand])?,
                    _ => {
                        return Err(Error::MisplacedOperator {
                            text: symbol.clone(),
                        })
                    }
                };
                stack.push(StackValue::Sym(value));
            }
            RpnItem::Infix(OpAction::Comma, _) => {
                let b = stack.pop().ok_or(Error::MisplacedOperator {
                    text: ",".to_string(),
                })?;
                let a = stack.pop().ok_or(Error::MisplacedOperator {
                    text: ",".to_string(),
                })?;
                stack.push(StackValue::Args(merge_args(a, b)));
            }
            RpnItem::Infix(action, symbol) => {
                let b = pop_symbol(&mut stack, symbol)?;
                let a = pop_symbol(&mut stack, symbol)?;
                let value = apply_infix(ctx, action, symbol, a, b)?;
                stack.push(StackValue::Sym(value));
            }
            RpnItem::Call(name) => {
                let top = stack.pop().ok_or_else(|| Error::Parse {
                    message: format!("missing arguments for '{}'", name),
                    column: None,
                })?;
                let args = match top {
                    StackValue::Args(args) => args,
                    StackValue::Sym(s) => vec![s],
                };
                stack.push(StackValue::Sym(apply_function(ctx, name, args)?));
            }
        }
    }

    match (stack.pop(), stack.pop()) {
        (Some(StackValue::Sym(result)), None) => Ok(result),
        (Some(StackValue::Args(_)), None) => Err(Error::UnexpectedToken {
            text: ",".to_string(),
        }),
        _ => Err(Error::Parse {
            message: "expression did not reduce to a single value".to_string(),
            column: None,
        }),
    }
}

fn pop_symbol(stack: &mut Vec<StackValue>, op: &str) -> Result<Symbol, Error> {
    match stack.pop() {
        Some(StackValue::Sym(s)) => Ok(s),
        Some(StackValue::Args(_)) => Err(Error::UnexpectedToken {
            text: ",".to_string(),
        }),
        None => Err(Error::MisplacedOperator {
            text: op.to_string(),
        }),
    }
}

fn merge_args(a: StackValue, b: StackValue) -> Vec<Symbol> {
    let mut args = match a {
        StackValue::Args(v) => v,
        StackValue::Sym(s) => vec![s],
    };
    match b {
        StackValue::Args(v) => args.extend(v),
        StackValue::Sym(s) => args.push(s),
    }
    args
}

fn apply_infix(
    ctx: &Context,
    action: &OpAction,
    symbol: &str,
    a: Symbol,
    b: Symbol,
) -> Result<Symbol, Error> {
    match action {
        OpAction::Add => algebra::add(ctx, a, b),
        OpAction::Subtract => algebra::subtract(ctx, a, b),
        OpAction::Multiply => algebra::multiply(ctx, a, b),
        OpAction::Divide => algebra::divide(ctx, a, b),
        OpAction::Pow => algebra::pow(ctx, a, b),
        OpAction::Mod => apply_function(ctx, "mod", vec![a, b]),
        OpAction::Equal => Ok(Symbol::function("equals", vec![a, b])),
        OpAction::NotEqual => Ok(Symbol::function("nequals", vec![a, b])),
        OpAction::LessThan => Ok(Symbol::function("lt", vec![a, b])),
        OpAction::LessEqual => Ok(Symbol::function("lte", vec![a, b])),
        OpAction::GreaterThan => Ok(Symbol::function("gt", vec![a, b])),
        OpAction::GreaterEqual => Ok(Symbol::function("gte", vec![a, b])),
        OpAction::Call(name) => apply_function(ctx, name, vec![a, b]),
        // Assignment is a statement, handled before evaluation; reaching it
        // here means it was nested inside an expression.
        OpAction::Assign => Err(Error::MisplacedOperator {
            text: symbol.to_string(),
        }),
        OpAction::Comma | OpAction::Percent | OpAction::Factorial | OpAction::DoubleFactorial => {
            Err(Error::MisplacedOperator {
                text: symbol.to_string(),
            })
        }
    }
}

/// Identifier resolution order: declared variable, unit, built-in constant,
/// then a free variable.
fn resolve_ident(ctx: &Context, name: &str) -> Symbol {
    if let Some(value) = ctx.get_variable(name) {
        return value.clone();
    }
    if let Some(value) = ctx.get_unit(name) {
        return value.clone();
    }
    match name {
        INFINITY => Symbol::infinity(),
        IMAGINARY => Symbol::imaginary(),
        "pi" if ctx.settings().parse_to_number => {
            numeric_constant(std::f64::consts::PI, name)
        }
        "e" if ctx.settings().parse_to_number => numeric_constant(std::f64::consts::E, name),
        _ => Symbol::variable(name),
    }
}

fn numeric_constant(value: f64, fallback: &str) -> Symbol {
    match Rational::from_f64(value) {
        Some(r) => Symbol::number(r),
        None => Symbol::variable(fallback),
    }
}

/// Dispatch a call: user definitions shadow built-ins; unknown names are a
/// parse error.
pub fn apply_function(ctx: &Context, name: &str, args: Vec<Symbol>) -> Result<Symbol, Error> {
    ctx.check_deadline()?;

    if let Some(function) = ctx.get_function(name) {
        if args.len() != function.params.len() {
            return Err(Error::WrongArity {
                name: name.to_string(),
                expected: function.params.len().to_string(),
                got: args.len(),
            });
        }
        let mut bindings = FxHashMap::default();
        for (param, arg) in function.params.iter().zip(args) {
            bindings.insert(param.clone(), arg);
        }
        let body = function.body.clone();
        return substitute(ctx, &body, &bindings);
    }

    if let Some(def) = crate::functions::lookup(name) {
        if !def.arity.contains(&args.len()) {
            return Err(Error::WrongArity {
                name: name.to_string(),
                expected: crate::functions::arity_text(&def.arity),
                got: args.len(),
            });
        }
        return (def.eval)(ctx, args);
    }

    Err(Error::Parse {
        message: format!("unknown function '{}'", name),
        column: None,
    })
}

/// Replace variables by symbols throughout `target`, rebuilding every
/// composite through the operator algebra so the result is canonical.
pub fn substitute(
    ctx: &Context,
    target: &Symbol,
    bindings: &FxHashMap<String, Symbol>,
) -> Result<Symbol, Error> {
    ctx.check_deadline()?;

    let power = substitute_power(ctx, &target.power, bindings)?;
    let base = match &target.kind {
        Kind::Number | Kind::Surd(_) => {
            let mut clone = target.clone();
            clone.power = power;
            return Ok(clone.normalize());
        }
        Kind::Variable(name) => match bindings.get(name) {
            Some(replacement) => replacement.clone(),
            None => Symbol::variable(name.clone()),
        },
        Kind::Exponential(inner) => substitute(ctx, inner, bindings)?,
        Kind::Function { name, args } => {
            let new_args: Result<Vec<Symbol>, Error> = args
                .iter()
                .map(|a| substitute(ctx, a, bindings))
                .collect();
            apply_function(ctx, name, new_args?)?
        }
        Kind::Poly { terms, .. } | Kind::Sum(terms) => {
            let mut sum = Symbol::zero();
            for term in terms.values() {
                let replaced = substitute(ctx, term, bindings)?;
                sum = algebra::add(ctx, sum, replaced)?;
            }
            sum
        }
        Kind::Product(factors) => {
            let mut product = Symbol::one();
            for factor in factors.values() {
                let replaced = substitute(ctx, factor, bindings)?;
                product = algebra::multiply(ctx, product, replaced)?;
            }
            product
        }
    };

    let raised = algebra::pow(ctx, base, exponent_symbol(power))?;
    algebra::multiply(ctx, raised, Symbol::number(target.multiplier.clone()))
}

fn substitute_power(
    ctx: &Context,
    power: &Exponent,
    bindings: &FxHashMap<String, Symbol>,
) -> Result<Exponent, Error> {
    match power {
        Exponent::Num(r) => Ok(Exponent::Num(r.clone())),
        Exponent::Sym(s) => {
            let replaced = substitute(ctx, s, bindings)?;
            if replaced.is_number() {
                Ok(Exponent::Num(replaced.multiplier))
            } else {
                Ok(Exponent::Sym(Box::new(replaced)))
            }
        }
    }
}

fn exponent_symbol(power: Exponent) -> Symbol {
    match power {
        Exponent::Num(r) => Symbol::number(r),
        Exponent::Sym(s) => *s,
    }
}

fn factorial(ctx: &Context, operand: Symbol) -> Result<Symbol, Error> {
    crate::functions::factorial_eval(ctx, operand)
}

fn double_factorial(ctx: &Context, operand: Symbol) -> Result<Symbol, Error> {
    crate::functions::double_factorial_eval(ctx, operand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::rpn::to_rpn;
    use crate::parser::tokenizer::tokenize;
    use crate::symbol::Group;

    fn eval(input: &str) -> Result<Symbol, Error> {
        let ctx = Context::new();
        eval_with(&ctx, input)
    }

    fn eval_with(ctx: &Context, input: &str) -> Result<Symbol, Error> {
        let tokens = tokenize(ctx, input)?;
        let rpn = to_rpn(ctx, &tokens)?;
        evaluate(ctx, &rpn)
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let result = eval("1/3+1/6").unwrap();
        assert!(result.is_number());
        assert_eq!(
            result.multiplier,
            Rational::new(1.into(), 2.into()).unwrap()
        );
    }

    #[test]
    fn test_like_terms_collapse() {
        let result = eval("x+x").unwrap();
        assert_eq!(result.group(), Group::Variable);
        assert_eq!(result.multiplier, Rational::integer(2));
    }

    #[test]
    fn test_precedence_and_prefix() {
        // -2^2 = -(2^2) = -4
        let result = eval("-2^2").unwrap();
        assert_eq!(result.multiplier, Rational::integer(-4));
    }

    #[test]
    fn test_declared_variable_substitutes() {
        let mut ctx = Context::new();
        ctx.set_variable("a", Symbol::int(7)).unwrap();
        let result = eval_with(&ctx, "a+1").unwrap();
        assert_eq!(result.multiplier, Rational::integer(8));
    }

    #[test]
    fn test_percent_scales() {
        let result = eval("50%").unwrap();
        assert_eq!(
            result.multiplier,
            Rational::new(1.into(), 2.into()).unwrap()
        );
    }

    #[test]
    fn test_modulo() {
        let result = eval("10%3").unwrap();
        assert_eq!(result.multiplier, Rational::integer(1));
    }

    #[test]
    fn test_factorial_postfix() {
        let result = eval("5!").unwrap();
        assert_eq!(result.multiplier, Rational::integer(120));
    }

    #[test]
    fn test_function_call_with_args() {
        let result = eval("min(3,1,2)").unwrap();
        assert_eq!(result.multiplier, Rational::integer(1));
    }

    #[test]
    fn test_wrong_arity_reported() {
        let err = eval("sqrt(1,2)").unwrap_err();
        match err {
            Error::WrongArity { name, got, .. } => {
                assert_eq!(name, "sqrt");
                assert_eq!(got, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_relation_stays_symbolic() {
        let result = eval("x<2").unwrap();
        match &result.kind {
            Kind::Function { name, args } => {
                assert_eq!(name, "lt");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected relation function, got {:?}", other),
        }
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1/0").unwrap_err(), Error::DivisionByZero);
    }

    #[test]
    fn test_zero_pow_zero() {
        assert!(matches!(eval("0^0").unwrap_err(), Error::Undefined(_)));
    }

    #[test]
    fn test_substitute_rebuilds_canonically() {
        let ctx = Context::new();
        // x^2 + x with x := 3 gives 12
        let expr = eval_with(&ctx, "x^2+x").unwrap();
        let mut bindings = FxHashMap::default();
        bindings.insert("x".to_string(), Symbol::int(3));
        let result = substitute(&ctx, &expr, &bindings).unwrap();
        assert!(result.is_number());
        assert_eq!(result.multiplier, Rational::integer(12));
    }

    #[test]
    fn test_user_function_shadows_builtin() {
        let mut ctx = Context::new();
        ctx.define_function(
            "sin",
            vec!["t".to_string()],
            Symbol::variable("t"),
        )
        .unwrap();
        let result = eval_with(&ctx, "sin(4)").unwrap();
        assert_eq!(result.multiplier, Rational::integer(4));
    }
}
