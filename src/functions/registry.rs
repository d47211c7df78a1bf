//! Function registry and built-in implementations.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

use num_bigint::BigInt;
use rustc_hash::FxHashMap;

use crate::algebra;
use crate::context::Context;
use crate::error::Error;
use crate::rational::Rational;
use crate::symbol::Symbol;

/// Largest integer argument `factorial`/`dfactorial` will materialize.
const FACTORIAL_LIMIT: i64 = 1_000;

type EvalFn = fn(&Context, Vec<Symbol>) -> Result<Symbol, Error>;

/// A built-in callable: name, accepted argument count, and evaluator.
pub struct FunctionDefinition {
    pub name: &'static str,
    pub arity: RangeInclusive<usize>,
    pub eval: EvalFn,
}

static REGISTRY: OnceLock<FxHashMap<&'static str, FunctionDefinition>> = OnceLock::new();

pub fn lookup(name: &str) -> Option<&'static FunctionDefinition> {
    REGISTRY.get_or_init(build).get(name)
}

/// Human-readable form of an arity range for error messages.
pub fn arity_text(arity: &RangeInclusive<usize>) -> String {
    match (*arity.start(), *arity.end()) {
        (a, b) if a == b => a.to_string(),
        (a, usize::MAX) => format!("at least {}", a),
        (a, b) => format!("{} to {}", a, b),
    }
}

fn build() -> FxHashMap<&'static str, FunctionDefinition> {
    let defs = [
        def("abs", 1..=1, abs),
        def("sqrt", 1..=1, sqrt),
        def("nthroot", 2..=2, nthroot),
        def("exp", 1..=1, exp),
        def("log", 1..=1, log),
        def("sin", 1..=1, sin),
        def("cos", 1..=1, cos),
        def("tan", 1..=1, tan),
        def("asin", 1..=1, asin),
        def("acos", 1..=1, acos),
        def("atan", 1..=1, atan),
        def("floor", 1..=1, floor),
        def("ceil", 1..=1, ceil),
        def("round", 1..=1, round),
        def("sign", 1..=1, sign),
        def("min", 1..=usize::MAX, min),
        def("max", 1..=usize::MAX, max),
        def("mod", 2..=2, modulo),
        def("factorial", 1..=1, factorial),
        def("dfactorial", 1..=1, dfactorial),
        def("vector", 0..=usize::MAX, vector),
        def("set", 0..=usize::MAX, set),
    ];
    defs.into_iter().map(|d| (d.name, d)).collect()
}

fn def(name: &'static str, arity: RangeInclusive<usize>, eval: EvalFn) -> FunctionDefinition {
    FunctionDefinition { name, arity, eval }
}

// ---------------------------------------------------------------------------
// exact evaluators
// ---------------------------------------------------------------------------

fn one_arg(mut args: Vec<Symbol>) -> Symbol {
    args.pop().unwrap_or_else(Symbol::zero)
}

fn abs(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_number() {
        return Ok(Symbol::number(arg.multiplier.abs()));
    }
    if arg.is_infinity() {
        return Ok(Symbol::infinity());
    }
    // abs(-x) = abs(x): the sign never survives.
    let arg = if arg.multiplier.is_negative() {
        arg.negate()
    } else {
        arg
    };
    Ok(Symbol::function("abs", vec![arg]))
}

fn sqrt(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let half = Rational::new(1.into(), 2.into()).ok_or(Error::DivisionByZero)?;
    algebra::pow(ctx, one_arg(args), Symbol::number(half))
}

fn nthroot(ctx: &Context, mut args: Vec<Symbol>) -> Result<Symbol, Error> {
    let degree = args.pop().unwrap_or_else(Symbol::zero);
    let value = args.pop().unwrap_or_else(Symbol::zero);
    if !degree.is_number() {
        return Ok(Symbol::function("nthroot", vec![value, degree]));
    }
    let exponent = degree.multiplier.recip().ok_or(Error::DivisionByZero)?;
    algebra::pow(ctx, value, Symbol::number(exponent))
}

fn exp(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_zero() {
        return Ok(Symbol::one());
    }
    if ctx.settings().parse_to_number && arg.is_number() {
        return approximate(arg.multiplier.to_f64().exp());
    }
    algebra::pow(ctx, Symbol::variable("e"), arg)
}

fn log(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_one() {
        return Ok(Symbol::zero());
    }
    if let crate::symbol::Kind::Variable(name) = &arg.kind {
        if name == "e" && arg.power.is_one() && arg.multiplier.is_one() {
            return Ok(Symbol::one());
        }
    }
    if arg.is_number() {
        if !arg.multiplier.is_positive() {
            return Err(Error::Undefined("logarithm of a non-positive number"));
        }
        if ctx.settings().parse_to_number {
            return approximate(arg.multiplier.to_f64().ln());
        }
    }
    Ok(Symbol::function("log", vec![arg]))
}

fn sin(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_zero() {
        return Ok(Symbol::zero());
    }
    transcendental(ctx, "sin", arg, f64::sin)
}

fn cos(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_zero() {
        return Ok(Symbol::one());
    }
    transcendental(ctx, "cos", arg, f64::cos)
}

fn tan(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_zero() {
        return Ok(Symbol::zero());
    }
    transcendental(ctx, "tan", arg, f64::tan)
}

fn asin(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_zero() {
        return Ok(Symbol::zero());
    }
    transcendental(ctx, "asin", arg, f64::asin)
}

fn acos(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    transcendental(ctx, "acos", one_arg(args), f64::acos)
}

fn atan(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_zero() {
        return Ok(Symbol::zero());
    }
    transcendental(ctx, "atan", arg, f64::atan)
}

fn transcendental(
    ctx: &Context,
    name: &str,
    arg: Symbol,
    f: fn(f64) -> f64,
) -> Result<Symbol, Error> {
    if ctx.settings().parse_to_number && arg.is_number() {
        return approximate(f(arg.multiplier.to_f64()));
    }
    Ok(Symbol::function(name, vec![arg]))
}

fn approximate(value: f64) -> Result<Symbol, Error> {
    Rational::from_f64(value)
        .map(Symbol::number)
        .ok_or(Error::Undefined("numeric evaluation is not finite"))
}

fn floor(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_number() {
        return Ok(Symbol::number(arg.multiplier.floor()));
    }
    Ok(Symbol::function("floor", vec![arg]))
}

fn ceil(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_number() {
        return Ok(Symbol::number(arg.multiplier.ceil()));
    }
    Ok(Symbol::function("ceil", vec![arg]))
}

fn round(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_number() {
        let half = Rational::new(1.into(), 2.into()).unwrap_or_else(Rational::zero);
        return Ok(Symbol::number((arg.multiplier + half).floor()));
    }
    Ok(Symbol::function("round", vec![arg]))
}

fn sign(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    let arg = one_arg(args);
    if arg.is_number() {
        return Ok(Symbol::number(arg.multiplier.signum()));
    }
    Ok(Symbol::function("sign", vec![arg]))
}

fn min(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    extremum(args, "min", |a, b| a < b)
}

fn max(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    extremum(args, "max", |a, b| a > b)
}

fn extremum(
    args: Vec<Symbol>,
    name: &str,
    wins: fn(&Rational, &Rational) -> bool,
) -> Result<Symbol, Error> {
    if !args.iter().all(Symbol::is_number) {
        return Ok(Symbol::function(name, args));
    }
    let mut best: Option<Symbol> = None;
    for arg in args {
        let replace = match &best {
            Some(current) => wins(&arg.multiplier, &current.multiplier),
            None => true,
        };
        if replace {
            best = Some(arg);
        }
    }
    best.ok_or(Error::EmptyExpression)
}

fn modulo(_ctx: &Context, mut args: Vec<Symbol>) -> Result<Symbol, Error> {
    let b = args.pop().unwrap_or_else(Symbol::zero);
    let a = args.pop().unwrap_or_else(Symbol::zero);
    if a.is_number() && b.is_number() {
        if b.multiplier.is_zero() {
            return Err(Error::DivisionByZero);
        }
        // a - b*floor(a/b), so the result takes the divisor's sign.
        let quotient = a
            .multiplier
            .checked_div(&b.multiplier)
            .ok_or(Error::DivisionByZero)?;
        let result = a.multiplier - b.multiplier * quotient.floor();
        return Ok(Symbol::number(result));
    }
    Ok(Symbol::function("mod", vec![a, b]))
}

fn factorial(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    factorial_eval(ctx, one_arg(args))
}

fn dfactorial(ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    double_factorial_eval(ctx, one_arg(args))
}

/// `n!` exactly for non-negative integers up to the materialization limit;
/// symbolic otherwise.
pub fn factorial_eval(ctx: &Context, arg: Symbol) -> Result<Symbol, Error> {
    match integer_arg(&arg) {
        Some(n) if n < 0 => Err(Error::Undefined("factorial of a negative integer")),
        Some(n) if n <= FACTORIAL_LIMIT => {
            let mut acc = BigInt::from(1);
            for k in 2..=n {
                ctx.check_deadline()?;
                acc *= k;
            }
            Ok(Symbol::number(Rational::integer(acc)))
        }
        _ => Ok(Symbol::function("factorial", vec![arg])),
    }
}

/// `n!!`: the product of every second integer down to 1 (or 2).
pub fn double_factorial_eval(ctx: &Context, arg: Symbol) -> Result<Symbol, Error> {
    match integer_arg(&arg) {
        Some(n) if n < 0 => Err(Error::Undefined("double factorial of a negative integer")),
        Some(n) if n <= FACTORIAL_LIMIT => {
            let mut acc = BigInt::from(1);
            let mut k = n;
            while k > 1 {
                ctx.check_deadline()?;
                acc *= k;
                k -= 2;
            }
            Ok(Symbol::number(Rational::integer(acc)))
        }
        _ => Ok(Symbol::function("dfactorial", vec![arg])),
    }
}

fn integer_arg(arg: &Symbol) -> Option<i64> {
    if arg.is_number() {
        arg.multiplier.to_i64()
    } else {
        None
    }
}

// Containers stay symbolic; display renders them back to bracket syntax.

fn vector(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    Ok(Symbol::function("vector", args))
}

fn set(_ctx: &Context, args: Vec<Symbol>) -> Result<Symbol, Error> {
    Ok(Symbol::function("set", args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new()
    }

    fn rat(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("sqrt").is_some());
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn test_arity_text() {
        assert_eq!(arity_text(&(1..=1)), "1");
        assert_eq!(arity_text(&(2..=4)), "2 to 4");
        assert_eq!(arity_text(&(1..=usize::MAX)), "at least 1");
    }

    #[test]
    fn test_sqrt_exact() {
        let c = ctx();
        let result = sqrt(&c, vec![Symbol::int(9)]).unwrap();
        assert_eq!(result.multiplier, Rational::integer(3));
    }

    #[test]
    fn test_factorial_exact() {
        let c = ctx();
        let result = factorial_eval(&c, Symbol::int(6)).unwrap();
        assert_eq!(result.multiplier, Rational::integer(720));
    }

    #[test]
    fn test_factorial_negative_is_undefined() {
        let c = ctx();
        assert!(matches!(
            factorial_eval(&c, Symbol::int(-1)),
            Err(Error::Undefined(_))
        ));
    }

    #[test]
    fn test_double_factorial() {
        let c = ctx();
        let result = double_factorial_eval(&c, Symbol::int(7)).unwrap();
        // 7*5*3*1
        assert_eq!(result.multiplier, Rational::integer(105));
    }

    #[test]
    fn test_mod_takes_divisor_sign() {
        let c = ctx();
        let result = modulo(&c, vec![Symbol::int(-7), Symbol::int(3)]).unwrap();
        assert_eq!(result.multiplier, Rational::integer(2));
    }

    #[test]
    fn test_floor_ceil_round_exact() {
        let c = ctx();
        let x = Symbol::number(rat(7, 2));
        assert_eq!(
            floor(&c, vec![x.clone()]).unwrap().multiplier,
            Rational::integer(3)
        );
        assert_eq!(
            ceil(&c, vec![x.clone()]).unwrap().multiplier,
            Rational::integer(4)
        );
        assert_eq!(
            round(&c, vec![x]).unwrap().multiplier,
            Rational::integer(4)
        );
    }

    #[test]
    fn test_trig_symbolic_by_default() {
        let c = ctx();
        let result = sin(&c, vec![Symbol::int(1)]).unwrap();
        assert!(matches!(
            result.kind,
            crate::symbol::Kind::Function { .. }
        ));
    }

    #[test]
    fn test_trig_numeric_when_enabled() {
        let c = Context::new().with_parse_to_number(true);
        let result = cos(&c, vec![Symbol::zero()]).unwrap();
        assert!(result.is_one());
        let result = sin(&c, vec![Symbol::int(1)]).unwrap();
        assert!(result.is_number());
    }

    #[test]
    fn test_abs_strips_sign() {
        let c = ctx();
        let result = abs(&c, vec![Symbol::variable("x").negate()]).unwrap();
        match &result.kind {
            crate::symbol::Kind::Function { args, .. } => {
                assert!(args[0].multiplier.is_one());
            }
            other => panic!("expected function node, got {:?}", other),
        }
    }

    #[test]
    fn test_log_of_e_is_one() {
        let c = ctx();
        assert!(log(&c, vec![Symbol::variable("e")]).unwrap().is_one());
        assert!(log(&c, vec![Symbol::one()]).unwrap().is_zero());
    }
}
