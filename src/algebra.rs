//! Operator algebra
//!
//! The arithmetic layer deciding, case by case, how two canonical symbols
//! combine. Each operation short-circuits identities, takes the exact numeric
//! fast path when both operands are constants, and otherwise funnels into the
//! insertion engine so like terms merge under their canonical keys.
//!
//! Every entry point polls the session deadline: these functions recurse over
//! expression trees and are the hot paths the cooperative cancellation budget
//! is designed to unwind.

use log::trace;
use num_bigint::BigInt;
use num_integer::Roots;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::context::Context;
use crate::error::Error;
use crate::rational::Rational;
use crate::symbol::insert::{insert, InsertAction};
use crate::symbol::{Exponent, Group, Kind, Symbol, IMAGINARY};

/// Bound on trial divisors when extracting perfect-power factors out of a
/// surd. Larger prime-power factors simply stay under the radical.
const ROOT_TRIAL_LIMIT: u32 = 1_000;

// ---------------------------------------------------------------------------
// add / subtract
// ---------------------------------------------------------------------------

/// Canonical addition.
pub fn add(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    ctx.check_deadline()?;

    if a.is_zero() {
        return Ok(b);
    }
    if b.is_zero() {
        return Ok(a);
    }

    // Exact numeric fast path.
    if a.is_number() && b.is_number() {
        return Ok(Symbol::number(a.multiplier + b.multiplier));
    }

    // Infinity arithmetic: same-signed infinities absorb, opposite-signed
    // infinities are undefined.
    if a.is_infinity() || b.is_infinity() {
        return add_infinite(a, b);
    }

    // Structurally larger group on the left.
    let (a, b) = if a.group() < b.group() { (b, a) } else { (a, b) };

    // Same shape up to multiplier: fold.
    if a.base_text() == b.base_text() {
        let mut merged = a;
        merged.multiplier = merged.multiplier + b.multiplier;
        if merged.multiplier.is_zero() {
            return Ok(Symbol::zero());
        }
        return Ok(merged);
    }

    // Terms of one variable at distinct powers promote to a polynomial.
    if mergeable_poly_pair(&a, &b) {
        return poly_merge(ctx, a, b);
    }

    trace!("add: building sum shell for {} + {}", a.canonical(), b.canonical());
    let mut sum = Symbol::sum_shell();
    absorb_into_sum(ctx, &mut sum, a)?;
    absorb_into_sum(ctx, &mut sum, b)?;
    Ok(sum.normalize())
}

/// Canonical subtraction: negate, then add.
pub fn subtract(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    add(ctx, a, b.negate())
}

fn add_infinite(a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    match (a.is_infinity(), b.is_infinity()) {
        (true, true) => {
            if a.multiplier.is_negative() == b.multiplier.is_negative() {
                Ok(a)
            } else {
                Err(Error::IncompatibleInfinities)
            }
        }
        // Infinity absorbs any finite term.
        (true, false) => Ok(a),
        _ => Ok(b),
    }
}

/// True when both operands range over the same single variable with numeric
/// powers, so their sum is a `Poly` rather than a generic `Sum`.
fn mergeable_poly_pair(a: &Symbol, b: &Symbol) -> bool {
    let (Some(va), Some(vb)) = (a.poly_variable(), b.poly_variable()) else {
        return false;
    };
    if va != vb {
        return false;
    }
    poly_distributable(a) && poly_distributable(b)
}

fn poly_distributable(s: &Symbol) -> bool {
    match s.group() {
        Group::Variable => s.power_num().is_some(),
        Group::Poly => s.power.is_one(),
        _ => false,
    }
}

/// Merge two same-variable operands into one `Poly`, attaching term by term
/// (keyed by power, so distinct powers never collide).
fn poly_merge(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    let variable = a
        .poly_variable()
        .map(str::to_string)
        .unwrap_or_default();
    let mut poly = Symbol {
        multiplier: Rational::one(),
        power: Exponent::one(),
        kind: Kind::Poly {
            variable,
            terms: Default::default(),
        },
    };
    attach_poly_terms(ctx, &mut poly, a)?;
    attach_poly_terms(ctx, &mut poly, b)?;
    Ok(poly.normalize())
}

fn attach_poly_terms(ctx: &Context, poly: &mut Symbol, operand: Symbol) -> Result<(), Error> {
    match operand.kind {
        Kind::Variable(_) => insert(ctx, poly, operand, InsertAction::Attach),
        Kind::Poly { terms, .. } => {
            let scale = operand.multiplier;
            for (_, mut term) in terms {
                term.multiplier = term.multiplier * scale.clone();
                insert(ctx, poly, term, InsertAction::Attach)?;
            }
            Ok(())
        }
        // Guarded by poly_distributable.
        _ => Err(Error::Undefined("non-polynomial operand in poly merge")),
    }
}

/// Attach a term into a `Sum`, merging it with an existing same-variable
/// entry into a nested `Poly` when powers differ. Keeps `x + y + x^2 - y`
/// structurally identical to `x + x^2`.
fn absorb_into_sum(ctx: &Context, sum: &mut Symbol, term: Symbol) -> Result<(), Error> {
    ctx.check_deadline()?;
    if term.is_zero() {
        return Ok(());
    }

    // Splice nested power-1 sums term by term.
    if term.group() == Group::Sum && term.power.is_one() {
        let scale = term.multiplier.clone();
        if let Kind::Sum(terms) = term.kind {
            for (_, mut child) in terms {
                child.multiplier = child.multiplier * scale.clone();
                absorb_into_sum(ctx, sum, child)?;
            }
        }
        return Ok(());
    }

    if poly_distributable(&term) {
        if let Some(variable) = term.poly_variable().map(str::to_string) {
            let existing_key = find_sum_entry_for_variable(sum, &variable, &term);
            if let Some(key) = existing_key {
                let existing = match &mut sum.kind {
                    Kind::Sum(terms) => terms.remove(&key),
                    _ => None,
                };
                if let Some(existing) = existing {
                    let merged = poly_merge(ctx, existing, term)?;
                    return absorb_merged(ctx, sum, merged);
                }
            }
        }
    }

    insert(ctx, sum, term, InsertAction::Attach)
}

/// Re-insert a freshly merged child without re-triggering the poly scan.
fn absorb_merged(ctx: &Context, sum: &mut Symbol, merged: Symbol) -> Result<(), Error> {
    if merged.is_zero() {
        return Ok(());
    }
    insert(ctx, sum, merged, InsertAction::Attach)
}

/// Key of an existing `Sum` entry covering the same variable as `incoming`
/// at a *different* power (same power is the plain attach-merge case).
fn find_sum_entry_for_variable(sum: &Symbol, variable: &str, incoming: &Symbol) -> Option<String> {
    let terms = match &sum.kind {
        Kind::Sum(terms) => terms,
        _ => return None,
    };
    let incoming_text = incoming.base_text();
    for (key, entry) in terms {
        if entry.poly_variable() == Some(variable)
            && poly_distributable(entry)
            && entry.base_text() != incoming_text
        {
            return Some(key.clone());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// multiply / divide
// ---------------------------------------------------------------------------

/// Canonical multiplication.
pub fn multiply(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    ctx.check_deadline()?;

    if a.is_zero() || b.is_zero() {
        if a.is_infinity() || b.is_infinity() {
            return Err(Error::Undefined("0 * Infinity"));
        }
        return Ok(Symbol::zero());
    }

    // A pure number scales the other operand directly.
    if a.is_number() {
        let mut scaled = b;
        scaled.multiplier = scaled.multiplier * a.multiplier;
        return Ok(scaled);
    }
    if b.is_number() {
        let mut scaled = a;
        scaled.multiplier = scaled.multiplier * b.multiplier;
        return Ok(scaled);
    }

    // Like bases merge by adding powers.
    if same_base(&a, &b) {
        return merge_powers(ctx, a, b);
    }

    // Factorials whose arguments differ by an integer reduce through the
    // rising product instead of expanding.
    if let Some(result) = factorial_ratio(ctx, &a, &b)? {
        return Ok(result);
    }

    // Same-power surds multiply under one radical: √6·√2 = √12 = 2√3.
    if let (Kind::Surd(base_a), Kind::Surd(base_b)) = (&a.kind, &b.kind) {
        if a.power == b.power {
            if let Some(p) = a.power_num() {
                let multiplier = a.multiplier.clone() * b.multiplier.clone();
                let mut surd = reduce_surd(ctx, base_a.clone() * base_b.clone(), p.clone())?;
                surd.multiplier = surd.multiplier * multiplier;
                return Ok(surd.normalize());
            }
        }
    }

    // A power-1 polynomial distributes over a same-variable factor so the
    // result stays a canonical polynomial.
    if a.power.is_one() && matches!(a.kind, Kind::Poly { .. }) && shares_poly_variable(&a, &b) {
        return distribute_poly(ctx, a, b);
    }
    if b.power.is_one() && matches!(b.kind, Kind::Poly { .. }) && shares_poly_variable(&b, &a) {
        return distribute_poly(ctx, b, a);
    }

    trace!(
        "multiply: building product shell for {} * {}",
        a.canonical(),
        b.canonical()
    );
    let mut product = Symbol::product_shell();
    insert(ctx, &mut product, a, InsertAction::Combine)?;
    insert(ctx, &mut product, b, InsertAction::Combine)?;
    Ok(product.normalize())
}

/// Canonical division: invert the divisor, then multiply.
pub fn divide(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    if b.is_zero() {
        return Err(Error::DivisionByZero);
    }
    let inverse = pow(ctx, b, Symbol::int(-1))?;
    multiply(ctx, a, inverse)
}

/// Base identity equality: true when two non-numeric symbols denote powers of
/// the same underlying object.
fn same_base(a: &Symbol, b: &Symbol) -> bool {
    a.group() != Group::Number && b.group() != Group::Number && a.value_text() == b.value_text()
}

fn shares_poly_variable(poly: &Symbol, other: &Symbol) -> bool {
    match (poly.poly_variable(), other.poly_variable()) {
        (Some(a), Some(b)) => a == b && poly_distributable(other),
        _ => false,
    }
}

/// `x^p * x^q` → `x^(p+q)`, promoting to an exponential when either power is
/// symbolic and demoting back when the merged power turns numeric.
fn merge_powers(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    let multiplier = a.multiplier.clone() * b.multiplier.clone();
    let power_a = a.power.clone();
    let power_b = b.power.clone();

    // Underlying base stripped of power and multiplier.
    let base = strip_to_base(a);

    match add_exponents(ctx, power_a, power_b)? {
        Exponent::Num(p) => {
            // A numeric base carries its value in the multiplier; the merged
            // power has to be applied to it, not stored next to it.
            if base.is_number() {
                let raised = number_pow(ctx, base.multiplier, p)?;
                return multiply(ctx, Symbol::number(multiplier), raised);
            }
            let mut merged = base;
            merged.power = Exponent::Num(p);
            merged.multiplier = multiplier;
            Ok(merged.normalize())
        }
        Exponent::Sym(p) => Ok(Symbol {
            multiplier,
            power: Exponent::Sym(p),
            kind: Kind::Exponential(Box::new(base)),
        }),
    }
}

/// The power-1, multiplier-1 base a symbol is a power of. For exponentials
/// that is the inner base; for everything else the symbol itself, stripped
/// and renormalized so equal bases share one shape (a surd stripped to power
/// 1 folds back to a plain number).
fn strip_to_base(symbol: Symbol) -> Symbol {
    match symbol.kind {
        Kind::Exponential(base) => *base,
        kind => Symbol {
            multiplier: Rational::one(),
            power: Exponent::one(),
            kind,
        }
        .normalize(),
    }
}

fn add_exponents(ctx: &Context, a: Exponent, b: Exponent) -> Result<Exponent, Error> {
    match (a, b) {
        (Exponent::Num(p), Exponent::Num(q)) => Ok(Exponent::Num(p + q)),
        (a, b) => {
            let sa = exponent_symbol(a);
            let sb = exponent_symbol(b);
            let sum = add(ctx, sa, sb)?;
            if sum.is_number() {
                Ok(Exponent::Num(sum.multiplier))
            } else {
                Ok(Exponent::Sym(Box::new(sum)))
            }
        }
    }
}

fn exponent_symbol(e: Exponent) -> Symbol {
    match e {
        Exponent::Num(r) => Symbol::number(r),
        Exponent::Sym(s) => *s,
    }
}

/// Distribute a power-1 polynomial over a same-variable factor, re-summing
/// the produced terms so the result stays canonical.
fn distribute_poly(ctx: &Context, poly: Symbol, factor: Symbol) -> Result<Symbol, Error> {
    let scale = poly.multiplier.clone();
    let terms = match poly.kind {
        Kind::Poly { terms, .. } => terms,
        _ => return Err(Error::Undefined("distribute target is not a polynomial")),
    };
    let mut result = Symbol::zero();
    for (_, mut term) in terms {
        ctx.check_deadline()?;
        term.multiplier = term.multiplier * scale.clone();
        let product = multiply(ctx, term, factor.clone())?;
        result = add(ctx, result, product)?;
    }
    Ok(result)
}

/// Reduce `fact(x+d) * fact(x)^-1` (either orientation) to the rising
/// product `(x+1)(x+2)...(x+d)` without expanding the factorials.
fn factorial_ratio(ctx: &Context, a: &Symbol, b: &Symbol) -> Result<Option<Symbol>, Error> {
    let (num, den) = match (factorial_arg(a), factorial_arg(b)) {
        (Some((arg_a, pa)), Some((arg_b, pb))) if pa.is_one() && pb.is_neg_one() => {
            ((arg_a, a), (arg_b, b))
        }
        (Some((arg_a, pa)), Some((arg_b, pb))) if pa.is_neg_one() && pb.is_one() => {
            ((arg_b, b), (arg_a, a))
        }
        _ => return Ok(None),
    };

    let difference = subtract(ctx, num.0.clone(), den.0.clone())?;
    let Some(d) = difference
        .is_number()
        .then(|| difference.multiplier.to_i64())
        .flatten()
    else {
        return Ok(None);
    };
    if d <= 0 || d > 64 {
        // Negative differences invert the identity; large ones are not worth
        // materializing. Leave both factorials symbolic.
        return Ok(None);
    }

    let mut result = Symbol::number(num.1.multiplier.clone() * den.1.multiplier.clone());
    for k in 1..=d {
        ctx.check_deadline()?;
        let shifted = add(ctx, den.0.clone(), Symbol::int(k))?;
        result = multiply(ctx, result, shifted)?;
    }
    Ok(Some(result))
}

/// Argument and power of a single-argument factorial call.
fn factorial_arg(symbol: &Symbol) -> Option<(Symbol, Rational)> {
    match (&symbol.kind, symbol.power_num()) {
        (Kind::Function { name, args }, Some(p)) if name == "factorial" && args.len() == 1 => {
            Some((args[0].clone(), p.clone()))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// pow
// ---------------------------------------------------------------------------

/// Canonical exponentiation.
pub fn pow(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    ctx.check_deadline()?;

    if b.is_number() {
        pow_numeric(ctx, a, b.multiplier)
    } else {
        pow_symbolic(ctx, a, b)
    }
}

fn pow_numeric(ctx: &Context, a: Symbol, e: Rational) -> Result<Symbol, Error> {
    if a.is_zero() {
        if e.is_zero() {
            return Err(Error::Undefined("0^0"));
        }
        if e.is_negative() {
            return Err(Error::DivisionByZero);
        }
        return Ok(Symbol::zero());
    }
    if e.is_zero() {
        return Ok(Symbol::one());
    }
    if e.is_one() {
        return Ok(a);
    }

    if a.is_number() {
        return number_pow(ctx, a.multiplier, e);
    }

    // Split off a non-unit multiplier: (m*B)^e = m^e * B^e.
    if !a.multiplier.is_one() {
        let mut stripped = a;
        let m = stripped.take_multiplier();
        let scale = number_pow(ctx, m, e.clone())?;
        let body = pow_numeric(ctx, stripped, e)?;
        return multiply(ctx, scale, body);
    }

    // 1/Infinity is 0; positive powers leave it untouched.
    if a.is_infinity() {
        return Ok(if e.is_negative() { Symbol::zero() } else { a });
    }

    let distribute = e.is_integer() && a.power.is_one();
    match a.kind {
        // An integer power distributes over a product's factors.
        Kind::Product(factors) if distribute => {
            let mut result = Symbol::one();
            for (_, factor) in factors {
                ctx.check_deadline()?;
                let raised = pow_numeric(ctx, factor, e.clone())?;
                result = multiply(ctx, result, raised)?;
            }
            Ok(result)
        }
        // Numeric surds re-reduce exactly: (2^(1/2))^3 = 2*sqrt(2).
        Kind::Surd(base) => match a.power {
            Exponent::Num(p) => number_pow(ctx, base, p * e),
            Exponent::Sym(_) => Err(Error::Undefined("surd with symbolic power")),
        },
        kind => {
            let symbol = Symbol {
                multiplier: Rational::one(),
                power: a.power,
                kind,
            };
            raise_numeric(ctx, symbol, e)
        }
    }
}

/// Raise a multiplier-1 symbol to a numeric power by scaling its own power.
fn raise_numeric(ctx: &Context, mut symbol: Symbol, e: Rational) -> Result<Symbol, Error> {
    match symbol.power {
        Exponent::Num(p) => {
            symbol.power = Exponent::Num(p * e);
            Ok(symbol.normalize())
        }
        Exponent::Sym(p) => {
            // (B^s)^e = B^(s*e)
            let scaled = multiply(ctx, *p, Symbol::number(e))?;
            if scaled.is_number() {
                symbol.power = Exponent::Num(scaled.multiplier);
                Ok(symbol.normalize())
            } else {
                symbol.power = Exponent::Sym(Box::new(scaled));
                Ok(symbol)
            }
        }
    }
}

fn pow_symbolic(ctx: &Context, a: Symbol, b: Symbol) -> Result<Symbol, Error> {
    if a.is_one() {
        return Ok(Symbol::one());
    }
    if a.is_zero() {
        // Sign of a symbolic exponent is unknowable; refuse rather than guess.
        return Err(Error::Undefined("0 raised to a symbolic power"));
    }

    // A numeric base becomes the base of an exponential as-is: 2^x.
    if a.is_number() {
        return Ok(Symbol {
            multiplier: Rational::one(),
            power: Exponent::Sym(Box::new(b)),
            kind: Kind::Exponential(Box::new(a)),
        });
    }

    // An exponential's sign cannot ride on its inner base, so the whole
    // multiplier splits off: (m*2^x)^y = m^y * 2^(x*y).
    if !a.multiplier.is_one() && matches!(a.kind, Kind::Exponential(_)) {
        let mut stripped = a;
        let m = stripped.take_multiplier();
        let scale = pow_symbolic(ctx, Symbol::number(m), b.clone())?;
        let body = pow_symbolic(ctx, stripped, b)?;
        return multiply(ctx, scale, body);
    }

    // Split off a non-sign multiplier: (m*B)^y = m^y * B^y. The sign stays
    // on the base so (-x)^y and x^y remain distinct.
    if !a.multiplier.is_one() && !a.multiplier.is_neg_one() {
        let mut stripped = a;
        let m = stripped.take_multiplier();
        if m.is_negative() {
            stripped.multiplier = Rational::neg_one();
        }
        let scale = pow_symbolic(ctx, Symbol::number(m.abs()), b.clone())?;
        let body = pow_symbolic(ctx, stripped, b)?;
        return multiply(ctx, scale, body);
    }

    // The base's own power rides along: (B^p)^y = B^(p*y). For exponentials
    // the inner base is reused directly.
    let own_power = match &a.power {
        Exponent::Num(p) => {
            if p.is_one() {
                None
            } else {
                Some(Symbol::number(p.clone()))
            }
        }
        Exponent::Sym(p) => Some((**p).clone()),
    };
    let total = match own_power {
        Some(p) => multiply(ctx, b, p)?,
        None => b,
    };

    let base = match a.kind {
        Kind::Exponential(base) => base,
        kind => Box::new(Symbol {
            multiplier: a.multiplier,
            power: Exponent::one(),
            kind,
        }),
    };

    if total.is_number() {
        let demoted = Symbol {
            multiplier: Rational::one(),
            power: Exponent::Num(total.multiplier),
            kind: Kind::Exponential(base),
        };
        return Ok(demoted.normalize());
    }
    Ok(Symbol {
        multiplier: Rational::one(),
        power: Exponent::Sym(Box::new(total)),
        kind: Kind::Exponential(base),
    })
}

/// Exact exponentiation of a rational base: integer powers by repeated
/// squaring, fractional powers by perfect-root extraction with a `Surd`
/// remainder, even roots of negatives factoring out the imaginary unit.
fn number_pow(ctx: &Context, base: Rational, e: Rational) -> Result<Symbol, Error> {
    if base.is_zero() {
        if e.is_zero() {
            return Err(Error::Undefined("0^0"));
        }
        if e.is_negative() {
            return Err(Error::DivisionByZero);
        }
        return Ok(Symbol::zero());
    }

    if e.is_integer() {
        let exp = e.to_i64().ok_or(Error::Undefined("exponent out of range"))?;
        let value = base.pow_i(exp).ok_or(Error::DivisionByZero)?;
        return Ok(Symbol::number(value));
    }

    // Split e into whole and fractional parts: b^(q+r) = b^q * b^r.
    let whole = e.clone().floor();
    let frac = e - whole.clone();
    let whole_exp = whole.to_i64().ok_or(Error::Undefined("exponent out of range"))?;
    let whole_part = base.pow_i(whole_exp).ok_or(Error::DivisionByZero)?;

    if base.is_negative() {
        let positive = base.abs();
        let n = frac.denominator().clone();
        if (&n % BigInt::from(2)).is_zero() {
            if n == BigInt::from(2) {
                // (-c)^(m/2) = i^m * c^(m/2)
                let m = frac.numerator().clone();
                let root = reduce_surd(ctx, positive, frac.clone())?;
                let mut i_power = Symbol::imaginary();
                i_power.power = Exponent::Num(Rational::integer(m));
                let unit = i_power.normalize();
                let scaled = multiply(ctx, Symbol::number(whole_part), root)?;
                return multiply(ctx, scaled, unit);
            }
            // Higher even roots of negatives stay symbolic.
            let mut surd = Symbol::surd(base, frac);
            surd.multiplier = whole_part;
            return Ok(surd);
        }
        // Odd root: (-c)^(m/n) has sign (-1)^m.
        let negate = odd_numerator(&frac);
        let root = reduce_surd(ctx, positive, frac)?;
        let mut result = multiply(ctx, Symbol::number(whole_part), root)?;
        if negate {
            result = result.negate();
        }
        return Ok(result);
    }

    let root = reduce_surd(ctx, base, frac)?;
    multiply(ctx, Symbol::number(whole_part), root)
}

fn odd_numerator(e: &Rational) -> bool {
    (e.numerator() % BigInt::from(2)).abs().is_one()
}

/// `c^(m/n)` with `c > 0`, `0 < m/n < 1`: pull every perfect n-th-power
/// factor out of numerator and denominator, leaving a reduced `Surd` (or a
/// plain number when the radical vanishes).
fn reduce_surd(ctx: &Context, base: Rational, power: Rational) -> Result<Symbol, Error> {
    ctx.check_deadline()?;
    debug_assert!(!base.is_negative());

    let (Some(n), Some(m)) = (power.denominator().to_u32(), power.numerator().to_i64()) else {
        // Astronomically large root index: leave the surd untouched.
        return Ok(Symbol::surd(base, power));
    };

    let (out_num, in_num) = extract_root(base.numerator().abs(), n);
    let (out_den, in_den) = extract_root(base.denominator().clone(), n);

    let outside = Rational::new(out_num, out_den)
        .and_then(|r| r.pow_i(m))
        .unwrap_or_else(Rational::one);
    let inside = Rational::new(in_num, in_den).unwrap_or_else(Rational::one);

    if inside.is_one() {
        return Ok(Symbol::number(outside));
    }
    let mut surd = Symbol::surd(inside, power);
    surd.multiplier = outside;
    Ok(surd)
}

/// Split `value` into `(out, in)` with `value = out^n * in`, `out` maximal
/// over divisors up to the trial bound.
fn extract_root(value: BigInt, n: u32) -> (BigInt, BigInt) {
    if value.is_zero() || value.is_one() {
        return (value, BigInt::one());
    }

    // Perfect power?
    let root = value.nth_root(n);
    let mut check = BigInt::one();
    for _ in 0..n {
        check *= &root;
    }
    if check == value {
        return (root, BigInt::one());
    }

    let mut outside = BigInt::one();
    let mut remaining = value;
    let mut d = BigInt::from(2);
    let limit = BigInt::from(ROOT_TRIAL_LIMIT);
    while d <= limit {
        let mut dn = BigInt::one();
        for _ in 0..n {
            dn *= &d;
        }
        if &dn > &remaining {
            break;
        }
        while (&remaining % &dn).is_zero() {
            remaining /= &dn;
            outside *= &d;
        }
        d += 1;
    }
    (outside, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn ctx() -> Context {
        Context::new()
    }

    fn rat(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn test_add_numbers_exact() {
        let c = ctx();
        let sum = add(&c, Symbol::number(rat(1, 3)), Symbol::number(rat(1, 6))).unwrap();
        assert!(sum.is_number());
        assert_eq!(sum.multiplier, rat(1, 2));
    }

    #[test]
    fn test_add_like_terms() {
        // x + x = 2x, one term
        let c = ctx();
        let sum = add(&c, Symbol::variable("x"), Symbol::variable("x")).unwrap();
        assert_eq!(sum.group(), Group::Variable);
        assert_eq!(sum.multiplier, Rational::integer(2));
    }

    #[test]
    fn test_add_commutative() {
        let c = ctx();
        let ab = add(&c, Symbol::variable("x"), Symbol::variable("y")).unwrap();
        let ba = add(&c, Symbol::variable("y"), Symbol::variable("x")).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_add_promotes_poly() {
        // x + x^2 is a Poly keyed by power
        let c = ctx();
        let mut x2 = Symbol::variable("x");
        x2.power = Exponent::Num(Rational::integer(2));
        let sum = add(&c, Symbol::variable("x"), x2).unwrap();
        assert_eq!(sum.group(), Group::Poly);
        assert_eq!(sum.length(), 2);
    }

    #[test]
    fn test_add_history_independent() {
        // (x + y + x^2) - y must equal x + x^2 structurally
        let c = ctx();
        let mut x2 = Symbol::variable("x");
        x2.power = Exponent::Num(Rational::integer(2));

        let direct = add(&c, Symbol::variable("x"), x2.clone()).unwrap();

        let mixed = add(&c, Symbol::variable("x"), Symbol::variable("y")).unwrap();
        let mixed = add(&c, mixed, x2).unwrap();
        let reduced = subtract(&c, mixed, Symbol::variable("y")).unwrap();

        assert_eq!(direct, reduced);
    }

    #[test]
    fn test_subtract_cancels() {
        let c = ctx();
        let diff = subtract(&c, Symbol::variable("x"), Symbol::variable("x")).unwrap();
        assert!(diff.is_zero());
    }

    #[test]
    fn test_opposite_infinities_error() {
        let c = ctx();
        let err = add(&c, Symbol::infinity(), Symbol::infinity().negate()).unwrap_err();
        assert_eq!(err, Error::IncompatibleInfinities);
    }

    #[test]
    fn test_infinity_absorbs_finite() {
        let c = ctx();
        let sum = add(&c, Symbol::infinity(), Symbol::int(5)).unwrap();
        assert!(sum.is_infinity());
    }

    #[test]
    fn test_multiply_same_base_merges_powers() {
        // x * x = x^2
        let c = ctx();
        let sq = multiply(&c, Symbol::variable("x"), Symbol::variable("x")).unwrap();
        assert_eq!(sq.group(), Group::Variable);
        assert_eq!(sq.power, Exponent::Num(Rational::integer(2)));
    }

    #[test]
    fn test_multiply_inverse_cancels() {
        let c = ctx();
        let mut inv = Symbol::variable("x");
        inv.power = Exponent::Num(Rational::neg_one());
        let product = multiply(&c, Symbol::variable("x"), inv).unwrap();
        assert!(product.is_one());
    }

    #[test]
    fn test_multiply_folds_coefficients() {
        // 2x * 3y = 6xy with unit-multiplier children
        let c = ctx();
        let mut x = Symbol::variable("x");
        x.multiplier = Rational::integer(2);
        let mut y = Symbol::variable("y");
        y.multiplier = Rational::integer(3);
        let product = multiply(&c, x, y).unwrap();
        assert_eq!(product.group(), Group::Product);
        assert_eq!(product.multiplier, Rational::integer(6));
    }

    #[test]
    fn test_sqrt_product_perfect_square() {
        // sqrt(2) * sqrt(2) = 2
        let c = ctx();
        let s1 = Symbol::surd(Rational::integer(2), rat(1, 2));
        let s2 = Symbol::surd(Rational::integer(2), rat(1, 2));
        let product = multiply(&c, s1, s2).unwrap();
        assert!(product.is_number());
        assert_eq!(product.multiplier, Rational::integer(2));
    }

    #[test]
    fn test_sqrt_product_partial_extraction() {
        // sqrt(6) * sqrt(2) = 2*sqrt(3)
        let c = ctx();
        let s1 = Symbol::surd(Rational::integer(6), rat(1, 2));
        let s2 = Symbol::surd(Rational::integer(2), rat(1, 2));
        let product = multiply(&c, s1, s2).unwrap();
        assert_eq!(product.multiplier, Rational::integer(2));
        assert_eq!(product.kind, Kind::Surd(Rational::integer(3)));
    }

    #[test]
    fn test_divide_by_zero() {
        let c = ctx();
        let err = divide(&c, Symbol::one(), Symbol::zero()).unwrap_err();
        assert_eq!(err, Error::DivisionByZero);
    }

    #[test]
    fn test_divide_reduces_fraction() {
        // 2/4 = 1/2
        let c = ctx();
        let q = divide(&c, Symbol::int(2), Symbol::int(4)).unwrap();
        assert!(q.is_number());
        assert_eq!(q.multiplier, rat(1, 2));
    }

    #[test]
    fn test_pow_zero_zero_undefined() {
        let c = ctx();
        let err = pow(&c, Symbol::zero(), Symbol::zero()).unwrap_err();
        assert!(matches!(err, Error::Undefined(_)));
    }

    #[test]
    fn test_pow_zero_negative_is_division_by_zero() {
        let c = ctx();
        let err = pow(&c, Symbol::zero(), Symbol::int(-2)).unwrap_err();
        assert_eq!(err, Error::DivisionByZero);
    }

    #[test]
    fn test_pow_integer_exact() {
        // (2/3)^3 = 8/27, no floating point anywhere
        let c = ctx();
        let result = pow(&c, Symbol::number(rat(2, 3)), Symbol::int(3)).unwrap();
        assert_eq!(result.multiplier, rat(8, 27));
    }

    #[test]
    fn test_pow_fractional_extracts_roots() {
        // 8^(1/3) = 2
        let c = ctx();
        let result = pow(&c, Symbol::int(8), Symbol::number(rat(1, 3))).unwrap();
        assert!(result.is_number());
        assert_eq!(result.multiplier, Rational::integer(2));
    }

    #[test]
    fn test_pow_fractional_leaves_surd() {
        // 2^(3/5) stays a surd
        let c = ctx();
        let result = pow(&c, Symbol::int(2), Symbol::number(rat(3, 5))).unwrap();
        assert_eq!(result.group(), Group::Surd);
    }

    #[test]
    fn test_pow_splits_whole_part() {
        // 2^(7/2) = 8 * sqrt(2)
        let c = ctx();
        let result = pow(&c, Symbol::int(2), Symbol::number(rat(7, 2))).unwrap();
        assert_eq!(result.multiplier, Rational::integer(8));
        assert_eq!(result.kind, Kind::Surd(Rational::integer(2)));
    }

    #[test]
    fn test_sqrt_of_negative_factors_i() {
        // (-4)^(1/2) = 2i
        let c = ctx();
        let result = pow(&c, Symbol::int(-4), Symbol::number(rat(1, 2))).unwrap();
        assert_eq!(result.multiplier, Rational::integer(2));
        assert_eq!(result.kind, Kind::Variable(IMAGINARY.to_string()));
    }

    #[test]
    fn test_symbolic_power_makes_exponential() {
        // 2^x
        let c = ctx();
        let result = pow(&c, Symbol::int(2), Symbol::variable("x")).unwrap();
        assert_eq!(result.group(), Group::Exponential);
    }

    #[test]
    fn test_exponential_merges_on_multiply() {
        // 2^x * 2^x = 2^(2x); the power stays symbolic
        let c = ctx();
        let e1 = pow(&c, Symbol::int(2), Symbol::variable("x")).unwrap();
        let e2 = pow(&c, Symbol::int(2), Symbol::variable("x")).unwrap();
        let product = multiply(&c, e1, e2).unwrap();
        assert_eq!(product.group(), Group::Exponential);
        match &product.power {
            Exponent::Sym(p) => assert_eq!(p.multiplier, Rational::integer(2)),
            Exponent::Num(_) => panic!("expected symbolic power"),
        }
    }

    #[test]
    fn test_exponential_powers_cancel_to_base_value() {
        // 2^x * 2^(1-x) = 2^1 = 2: the collapsed power applies to the base.
        let c = ctx();
        let e1 = pow(&c, Symbol::int(2), Symbol::variable("x")).unwrap();
        let complement = subtract(&c, Symbol::one(), Symbol::variable("x")).unwrap();
        let e2 = pow(&c, Symbol::int(2), complement).unwrap();
        let product = multiply(&c, e1, e2).unwrap();
        assert!(product.is_number());
        assert_eq!(product.multiplier, Rational::integer(2));

        // 2^x * 2^(3-x) = 8
        let e1 = pow(&c, Symbol::int(2), Symbol::variable("x")).unwrap();
        let complement = subtract(&c, Symbol::int(3), Symbol::variable("x")).unwrap();
        let e2 = pow(&c, Symbol::int(2), complement).unwrap();
        let product = multiply(&c, e1, e2).unwrap();
        assert!(product.is_number());
        assert_eq!(product.multiplier, Rational::integer(8));
    }

    #[test]
    fn test_surd_and_exponential_share_base_shape() {
        // 2^(1/2) * 2^x must not depend on operand order: both sides merge
        // into one exponential over the plain number 2.
        let c = ctx();
        let surd = Symbol::surd(Rational::integer(2), rat(1, 2));
        let exp = pow(&c, Symbol::int(2), Symbol::variable("x")).unwrap();
        let left = multiply(&c, surd.clone(), exp.clone()).unwrap();
        let right = multiply(&c, exp, surd).unwrap();
        assert_eq!(left, right);
        match &left.kind {
            Kind::Exponential(base) => assert!(base.is_number()),
            other => panic!("expected exponential, got {:?}", other),
        }
    }

    #[test]
    fn test_negated_exponential_keeps_sign_under_power() {
        // (-(2^x))^y = (-1)^y * 2^(x*y), distinct from (2^x)^y.
        let c = ctx();
        let e = pow(&c, Symbol::int(2), Symbol::variable("x")).unwrap();
        let negated = pow(&c, e.clone().negate(), Symbol::variable("y")).unwrap();
        let plain = pow(&c, e, Symbol::variable("y")).unwrap();
        assert_ne!(negated, plain);
        assert_eq!(negated.group(), Group::Product);
    }

    #[test]
    fn test_i_squared_is_minus_one() {
        let c = ctx();
        let result = multiply(&c, Symbol::imaginary(), Symbol::imaginary()).unwrap();
        assert!(result.is_number());
        assert_eq!(result.multiplier, Rational::integer(-1));
    }

    #[test]
    fn test_factorial_ratio_reduces() {
        // fact(x+2)/fact(x) = (x+1)(x+2), expanded: x^2 + 3x + 2
        let c = ctx();
        let x = Symbol::variable("x");
        let arg = add(&c, x.clone(), Symbol::int(2)).unwrap();
        let big = Symbol::function("factorial", vec![arg]);
        let small = Symbol::function("factorial", vec![x]);
        let ratio = divide(&c, big, small).unwrap();
        // (x+1)*(x+2), left unexpanded
        assert_eq!(ratio.group(), Group::Product);
        assert_eq!(ratio.length(), 2);
    }

    #[test]
    fn test_extract_root() {
        let (out, inside) = extract_root(BigInt::from(12), 2);
        assert_eq!(out, BigInt::from(2));
        assert_eq!(inside, BigInt::from(3));

        let (out, inside) = extract_root(BigInt::from(27), 3);
        assert_eq!(out, BigInt::from(3));
        assert_eq!(inside, BigInt::one());
    }
}
