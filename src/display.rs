//! Text output
//!
//! Renders canonical symbols back to input syntax. With default options the
//! output is a fixed point: parsing it reproduces the same canonical
//! structure. Children render in their map order, so equal structures always
//! print identically.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::rational::Rational;
use crate::symbol::{Exponent, Kind, Symbol};

/// How numeric coefficients are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberFormat {
    /// Exact fractions: `1/2`. The only format guaranteed to round-trip.
    #[default]
    Fractions,
    /// Truncated decimal expansion: `0.5`, `3.333333`.
    Decimals,
    /// Whole part plus proper fraction: `3+1/2`.
    Mixed,
    /// Mantissa-exponent notation: `1.5e3`.
    Scientific,
    /// Repeating decimals with the period in parentheses: `0.(3)`.
    Recurring,
}

#[derive(Debug, Clone)]
pub struct TextOptions {
    pub format: NumberFormat,
    /// Digits emitted by the approximate formats.
    pub significant_digits: u32,
}

impl Default for TextOptions {
    fn default() -> Self {
        TextOptions {
            format: NumberFormat::Fractions,
            significant_digits: 21,
        }
    }
}

/// Render with default options (exact fractions).
pub fn text_default(symbol: &Symbol) -> String {
    text(symbol, &TextOptions::default())
}

pub fn text(symbol: &Symbol, options: &TextOptions) -> String {
    if symbol.is_number() {
        return number_text(&symbol.multiplier, options);
    }
    let body = powered_body(symbol, options);

    if symbol.multiplier.is_one() {
        return body;
    }
    // A low-precedence body needs parens once a coefficient is applied.
    let body = if has_top_level_sum(symbol) {
        format!("({})", body)
    } else {
        body
    };
    if symbol.multiplier.is_neg_one() {
        format!("-{}", body)
    } else {
        format!("{}*{}", number_text(&symbol.multiplier, options), body)
    }
}

/// Value and power, without the multiplier.
fn powered_body(symbol: &Symbol, options: &TextOptions) -> String {
    let value = value_body(symbol, options);
    match &symbol.power {
        Exponent::Num(p) if p.is_one() => value,
        Exponent::Num(p) => {
            let base = wrap_base(symbol, value);
            if p.is_integer() && !p.is_negative() {
                format!("{}^{}", base, p)
            } else {
                format!("{}^({})", base, p)
            }
        }
        Exponent::Sym(p) => {
            let base = wrap_base(symbol, value);
            let power = text(p, options);
            if is_atom(&power) {
                format!("{}^{}", base, power)
            } else {
                format!("{}^({})", base, power)
            }
        }
    }
}

fn value_body(symbol: &Symbol, options: &TextOptions) -> String {
    match &symbol.kind {
        Kind::Number => number_text(&symbol.multiplier, options),
        Kind::Surd(base) => base.to_string(),
        Kind::Variable(name) => name.clone(),
        Kind::Exponential(base) => text(base, options),
        Kind::Function { name, args } => function_body(name, args, options),
        Kind::Poly { terms, .. } | Kind::Sum(terms) => {
            signed_join(terms.values().map(|t| text(t, options)))
        }
        Kind::Product(factors) => {
            let parts: Vec<String> = factors
                .values()
                .map(|f| {
                    let rendered = text(f, options);
                    if has_top_level_sum(f) {
                        format!("({})", rendered)
                    } else {
                        rendered
                    }
                })
                .collect();
            parts.join("*")
        }
    }
}

/// Container and relation nodes print back as their input syntax; everything
/// else as a call.
fn function_body(name: &str, args: &[Symbol], options: &TextOptions) -> String {
    let rendered: Vec<String> = args.iter().map(|a| text(a, options)).collect();
    match (name, args.len()) {
        ("vector", _) => format!("[{}]", rendered.join(",")),
        ("set", _) => format!("{{{}}}", rendered.join(",")),
        ("equals", 2) => format!("{}={}", rendered[0], rendered[1]),
        ("nequals", 2) => format!("{}!={}", rendered[0], rendered[1]),
        ("lt", 2) => format!("{}<{}", rendered[0], rendered[1]),
        ("lte", 2) => format!("{}<={}", rendered[0], rendered[1]),
        ("gt", 2) => format!("{}>{}", rendered[0], rendered[1]),
        ("gte", 2) => format!("{}>={}", rendered[0], rendered[1]),
        _ => format!("{}({})", name, rendered.join(",")),
    }
}

/// Join rendered terms, folding each term's leading sign into the joiner.
fn signed_join(parts: impl Iterator<Item = String>) -> String {
    let mut out = String::new();
    for part in parts {
        if out.is_empty() {
            out.push_str(&part);
        } else if let Some(rest) = part.strip_prefix('-') {
            out.push('-');
            out.push_str(rest);
        } else {
            out.push('+');
            out.push_str(&part);
        }
    }
    out
}

/// Parenthesize a base that would not re-parse as the power's operand.
fn wrap_base(symbol: &Symbol, value: String) -> String {
    let needs_parens = match &symbol.kind {
        Kind::Number => !symbol.multiplier.is_integer() || symbol.multiplier.is_negative(),
        Kind::Surd(base) => !base.is_integer() || base.is_negative(),
        Kind::Variable(_) => false,
        Kind::Exponential(base) => {
            if base.is_number() {
                !base.multiplier.is_integer() || base.multiplier.is_negative()
            } else {
                !base.multiplier.is_one() || !base.power.is_one() || base.length() > 0
            }
        }
        Kind::Function { name, .. } => matches!(
            name.as_str(),
            "equals" | "nequals" | "lt" | "lte" | "gt" | "gte"
        ),
        Kind::Poly { .. } | Kind::Sum(_) | Kind::Product(_) => true,
    };
    if needs_parens {
        format!("({})", value)
    } else {
        value
    }
}

fn has_top_level_sum(symbol: &Symbol) -> bool {
    matches!(symbol.kind, Kind::Sum(_) | Kind::Poly { .. }) && symbol.power.is_one()
}

/// A rendering that binds tighter than `^` on its own: one identifier or an
/// unsigned integer.
fn is_atom(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// numeric formats
// ---------------------------------------------------------------------------

fn number_text(value: &Rational, options: &TextOptions) -> String {
    match options.format {
        NumberFormat::Fractions => value.to_string(),
        NumberFormat::Mixed => mixed_text(value),
        NumberFormat::Decimals => decimal_text(value, options.significant_digits),
        NumberFormat::Scientific => scientific_text(value, options.significant_digits),
        NumberFormat::Recurring => recurring_text(value, options.significant_digits),
    }
}

/// `7/2` as `3+1/2`, using the floor so the remainder is always positive.
fn mixed_text(value: &Rational) -> String {
    if value.is_integer() {
        return value.to_string();
    }
    let whole = value.floor();
    let rem = value.clone() - whole.clone();
    if whole.is_zero() {
        value.to_string()
    } else {
        format!("{}+{}", whole, rem)
    }
}

/// Truncated decimal expansion by long division; trailing zeros trimmed.
fn decimal_text(value: &Rational, digits: u32) -> String {
    if value.is_integer() {
        return value.to_string();
    }
    let negative = value.is_negative();
    let num = value.numerator().abs();
    let den = value.denominator().clone();
    let (whole, mut rem) = num.div_rem(&den);

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&whole.to_string());
    out.push('.');
    let mut frac = String::new();
    for _ in 0..digits {
        if rem.is_zero() {
            break;
        }
        rem *= 10;
        let (digit, next) = rem.div_rem(&den);
        frac.push_str(&digit.to_string());
        rem = next;
    }
    let trimmed = frac.trim_end_matches('0');
    if trimmed.is_empty() {
        out.push('0');
    } else {
        out.push_str(trimmed);
    }
    out
}

fn scientific_text(value: &Rational, digits: u32) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let approx = value.to_f64();
    let precision = digits.saturating_sub(1).min(17) as usize;
    format!("{:.*e}", precision, approx)
}

/// Repeating decimal with the period parenthesized (`1/3` → `0.(3)`).
/// Falls back to the exact fraction when the period exceeds the digit
/// budget.
fn recurring_text(value: &Rational, digits: u32) -> String {
    if value.is_integer() {
        return value.to_string();
    }
    let negative = value.is_negative();
    let num = value.numerator().abs();
    let den = value.denominator().clone();
    let (whole, mut rem) = num.div_rem(&den);

    // Long division, remembering where each remainder first appeared.
    let mut seen: Vec<(BigInt, usize)> = Vec::new();
    let mut expansion = String::new();
    let mut cycle_start = None;
    while !rem.is_zero() && expansion.len() < digits.max(2) as usize {
        if let Some((_, at)) = seen.iter().find(|(r, _)| *r == rem) {
            cycle_start = Some(*at);
            break;
        }
        seen.push((rem.clone(), expansion.len()));
        rem *= 10;
        let (digit, next) = rem.div_rem(&den);
        expansion.push_str(&digit.to_string());
        rem = next;
    }

    match cycle_start {
        Some(at) => {
            let mut out = String::new();
            if negative {
                out.push('-');
            }
            out.push_str(&whole.to_string());
            out.push('.');
            out.push_str(&expansion[..at]);
            out.push('(');
            out.push_str(&expansion[at..]);
            out.push(')');
            out
        }
        None if rem.is_zero() => decimal_text(value, digits),
        // Period longer than the digit budget: exact form instead.
        None => value.to_string(),
    }
}
