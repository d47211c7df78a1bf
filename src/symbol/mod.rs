//! Canonical expression model
//!
//! A [`Symbol`] is the engine's normal form: a rational scale factor
//! (`multiplier`), a power, and a [`Kind`] describing structural shape. The
//! eight-way [`Group`] classification drives key computation and operand
//! ordering in the operator algebra.
//!
//! The original engine stored a hash string on every composite and had to
//! remember to recompute it after each mutation. Here the canonical text is a
//! pure derivation of structure (children live in `BTreeMap`s, so iteration
//! order is deterministic) and can never go stale.

pub mod insert;

use crate::rational::Rational;
use std::collections::BTreeMap;
use std::fmt;

/// An exponent: a plain rational for most shapes, a full symbol for
/// exponentials (`2^x`).
#[derive(Debug, Clone, PartialEq)]
pub enum Exponent {
    Num(Rational),
    Sym(Box<Symbol>),
}

impl Exponent {
    pub fn one() -> Self {
        Exponent::Num(Rational::one())
    }

    pub fn num(&self) -> Option<&Rational> {
        match self {
            Exponent::Num(r) => Some(r),
            Exponent::Sym(_) => None,
        }
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Exponent::Num(r) if r.is_one())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Exponent::Num(r) if r.is_zero())
    }

    /// Text used in canonical keys: `2`, `-1/2`, or the canonical text of a
    /// symbolic power.
    pub fn text(&self) -> String {
        match self {
            Exponent::Num(r) => r.to_string(),
            Exponent::Sym(s) => s.canonical(),
        }
    }
}

/// Structural shape of a symbol. Exhaustive: every dispatch on shape is a
/// `match` over this enum.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    /// Pure numeric constant; the value is carried entirely by the multiplier.
    Number,
    /// Numeric base with a non-integer rational power that would not reduce,
    /// e.g. `2^(3/5)`. The base is stored here; the power on the symbol.
    Surd(Rational),
    /// A named variable.
    Variable(String),
    /// A base raised to a symbolic power. The only kind whose power is
    /// `Exponent::Sym`. The base owns its own sign and multiplier.
    Exponential(Box<Symbol>),
    /// A named function applied to arguments.
    Function { name: String, args: Vec<Symbol> },
    /// Terms of a single variable at distinct powers (`x + x^2`), keyed by
    /// power text.
    Poly {
        variable: String,
        terms: BTreeMap<String, Symbol>,
    },
    /// Composite combined by multiplication, keyed children.
    Product(BTreeMap<String, Symbol>),
    /// Composite combined by addition, keyed children.
    Sum(BTreeMap<String, Symbol>),
}

/// The group taxonomy. Ordered by structural "size": the operator algebra
/// puts the larger group on the left before dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    Number,
    Surd,
    Variable,
    Exponential,
    Function,
    Poly,
    Product,
    Sum,
}

/// Key under which all plain numbers collide inside a composite.
pub const NUMBER_KEY: &str = "#";

/// Name of the infinity constant.
pub const INFINITY: &str = "Infinity";

/// Name of the imaginary unit.
pub const IMAGINARY: &str = "i";

/// A canonical expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub multiplier: Rational,
    pub power: Exponent,
    pub kind: Kind,
}

impl Symbol {
    pub fn number(value: Rational) -> Self {
        Symbol {
            multiplier: value,
            power: Exponent::one(),
            kind: Kind::Number,
        }
    }

    pub fn int(n: i64) -> Self {
        Self::number(Rational::integer(n))
    }

    pub fn zero() -> Self {
        Self::int(0)
    }

    pub fn one() -> Self {
        Self::int(1)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Symbol {
            multiplier: Rational::one(),
            power: Exponent::one(),
            kind: Kind::Variable(name.into()),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Symbol>) -> Self {
        Symbol {
            multiplier: Rational::one(),
            power: Exponent::one(),
            kind: Kind::Function {
                name: name.into(),
                args,
            },
        }
    }

    pub fn infinity() -> Self {
        Self::variable(INFINITY)
    }

    pub fn imaginary() -> Self {
        Self::variable(IMAGINARY)
    }

    /// Unreduced numeric surd `base^power`. Callers are expected to have
    /// tried exact reduction first; `normalize` folds integral powers back.
    pub fn surd(base: Rational, power: Rational) -> Self {
        Symbol {
            multiplier: Rational::one(),
            power: Exponent::Num(power),
            kind: Kind::Surd(base),
        }
    }

    /// Empty `Sum` shell; illegal at rest, used transiently by the insertion
    /// engine.
    pub(crate) fn sum_shell() -> Self {
        Symbol {
            multiplier: Rational::one(),
            power: Exponent::one(),
            kind: Kind::Sum(BTreeMap::new()),
        }
    }

    /// Empty `Product` shell; illegal at rest, used transiently by the
    /// insertion engine.
    pub(crate) fn product_shell() -> Self {
        Symbol {
            multiplier: Rational::one(),
            power: Exponent::one(),
            kind: Kind::Product(BTreeMap::new()),
        }
    }

    /// Derived group classification.
    pub fn group(&self) -> Group {
        match &self.kind {
            Kind::Number => Group::Number,
            Kind::Surd(_) => Group::Surd,
            Kind::Variable(_) => Group::Variable,
            Kind::Exponential(_) => Group::Exponential,
            Kind::Function { .. } => Group::Function,
            Kind::Poly { .. } => Group::Poly,
            Kind::Product(_) => Group::Product,
            Kind::Sum(_) => Group::Sum,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self.kind, Kind::Number)
    }

    pub fn is_zero(&self) -> bool {
        self.is_number() && self.multiplier.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.is_number() && self.multiplier.is_one()
    }

    pub fn is_infinity(&self) -> bool {
        matches!(&self.kind, Kind::Variable(name) if name == INFINITY)
    }

    /// Numeric power, if the exponent is rational.
    pub fn power_num(&self) -> Option<&Rational> {
        self.power.num()
    }

    /// Integer power that fits an `i64`, if any.
    pub fn power_int(&self) -> Option<i64> {
        self.power.num().and_then(|r| r.to_i64())
    }

    pub fn negate(mut self) -> Self {
        self.multiplier = -self.multiplier;
        self
    }

    /// Replace the multiplier with 1, returning the old value. Used when a
    /// child's scale is folded into a composite parent.
    pub fn take_multiplier(&mut self) -> Rational {
        std::mem::replace(&mut self.multiplier, Rational::one())
    }

    // ---- canonical text -------------------------------------------------
    //
    // Three levels, each building on the previous:
    //   value_text  — shape identity, no power, no multiplier ("x", "sin(x)")
    //   base_text   — value_text plus power suffix             ("x^2")
    //   canonical   — multiplier plus base_text                ("3*x^2")
    //
    // Children iterate in BTreeMap key order, so equal structures always
    // produce equal text. This text *is* the hash the composites key by.

    /// Shape identity without power or multiplier.
    pub fn value_text(&self) -> String {
        match &self.kind {
            Kind::Number => self.multiplier.to_string(),
            Kind::Surd(base) => base.to_string(),
            Kind::Variable(name) => name.clone(),
            Kind::Exponential(base) => base.canonical(),
            Kind::Function { name, args } => {
                let rendered: Vec<String> = args.iter().map(|a| a.canonical()).collect();
                format!("{}({})", name, rendered.join(","))
            }
            Kind::Poly { terms, .. } | Kind::Sum(terms) => {
                let rendered: Vec<String> = terms.values().map(|t| t.canonical()).collect();
                format!("({})", rendered.join("+"))
            }
            Kind::Product(factors) => {
                let rendered: Vec<String> = factors.values().map(|t| t.canonical()).collect();
                format!("({})", rendered.join("*"))
            }
        }
    }

    /// Shape plus power, without multiplier.
    pub fn base_text(&self) -> String {
        let value = self.value_text();
        match &self.power {
            Exponent::Num(p) if p.is_one() => value,
            Exponent::Num(p) if p.is_integer() && !p.is_negative() => {
                format!("{}^{}", value, p)
            }
            Exponent::Num(p) => format!("{}^({})", value, p),
            Exponent::Sym(p) => format!("{}^({})", value, p.canonical()),
        }
    }

    /// Full canonical text: the derived hash of this symbol.
    pub fn canonical(&self) -> String {
        let base = self.base_text();
        if self.is_number() {
            return base;
        }
        if self.multiplier.is_one() {
            base
        } else if self.multiplier.is_neg_one() {
            format!("-{}", base)
        } else {
            format!("{}*{}", self.multiplier, base)
        }
    }

    /// Key of `self` when inserted as a child of a composite with group
    /// `parent`. Load-bearing: two structurally equal children must always
    /// produce the same key, and children that must not merge must never
    /// collide.
    pub fn key_for_group(&self, parent: Group) -> String {
        match parent {
            // Addition merges terms equal up to multiplier.
            Group::Sum => match self.group() {
                Group::Number => NUMBER_KEY.to_string(),
                _ => self.base_text(),
            },
            // Poly terms share one variable; only the power distinguishes.
            Group::Poly => self.power.text(),
            // Multiplication merges like bases across powers.
            Group::Product => match self.group() {
                Group::Number => NUMBER_KEY.to_string(),
                // Distinct exponentials (2^x vs 3^x) must not collide, so the
                // full base^power text is the key.
                Group::Exponential => self.base_text(),
                _ => self.value_text(),
            },
            _ => self.base_text(),
        }
    }

    /// Number of children in a composite; 0 for leaves.
    pub fn length(&self) -> usize {
        match &self.kind {
            Kind::Poly { terms, .. } | Kind::Sum(terms) => terms.len(),
            Kind::Product(factors) => factors.len(),
            _ => 0,
        }
    }

    /// Variant promotion/demotion: fold shapes whose contents no longer fit
    /// their tag back into the canonical one.
    ///
    /// - any shape to the power 0 becomes the number `multiplier`;
    /// - a `Number` with a non-unit power applies it to its value;
    /// - a `Surd` whose power turned integral becomes a `Number`;
    /// - an `Exponential` whose power turned numeric is demoted to its base
    ///   carrying that power;
    /// - an empty `Sum` collapses to 0, an empty `Product`/`Poly` to the
    ///   multiplier;
    /// - a single-child composite unwraps, the parent multiplier absorbed.
    pub fn normalize(mut self) -> Symbol {
        // power 0 ⇒ the whole structure is 1; only the multiplier survives.
        if self.power.is_zero() {
            return Symbol::number(self.multiplier);
        }

        match self.kind {
            Kind::Surd(ref base) => {
                if let Some(p) = self.power.num() {
                    if p.is_integer() {
                        if let Some(exp) = p.to_i64() {
                            if let Some(value) = base.pow_i(exp) {
                                return Symbol::number(self.multiplier * value);
                            }
                        }
                    }
                    if base.is_one() {
                        return Symbol::number(self.multiplier);
                    }
                }
                self
            }
            // An exponential whose power turned numeric is demoted back to
            // its base. The base of an exponential always carries a numeric
            // power itself (the symbolic part lives on the outer symbol).
            Kind::Exponential(base) => match self.power {
                Exponent::Num(p) => {
                    let mut demoted = *base;
                    if let Exponent::Num(own) = demoted.power {
                        demoted.power = Exponent::Num(own * p);
                    }
                    // Fold the power into the base before the outer multiplier
                    // is applied: a numeric base raises its value.
                    let mut demoted = demoted.normalize();
                    demoted.multiplier = demoted.multiplier * self.multiplier;
                    demoted
                }
                power @ Exponent::Sym(_) => Symbol {
                    multiplier: self.multiplier,
                    power,
                    kind: Kind::Exponential(base),
                },
            },
            Kind::Sum(ref mut terms) => {
                if terms.is_empty() {
                    return Symbol::number(self.multiplier * Rational::zero());
                }
                if terms.len() == 1 && self.power.is_one() {
                    let mut child = terms.pop_first().map(|(_, v)| v).unwrap_or_else(Symbol::zero);
                    child.multiplier = child.multiplier * self.multiplier;
                    return child.normalize();
                }
                self
            }
            Kind::Product(ref mut factors) => {
                if factors.is_empty() {
                    return Symbol::number(self.multiplier);
                }
                if factors.len() == 1 && self.power.is_one() {
                    let mut child = factors.pop_first().map(|(_, v)| v).unwrap_or_else(Symbol::one);
                    child.multiplier = child.multiplier * self.multiplier;
                    return child.normalize();
                }
                self
            }
            Kind::Poly { ref mut terms, .. } => {
                if terms.is_empty() {
                    return Symbol::number(self.multiplier * Rational::zero());
                }
                if terms.len() == 1 && self.power.is_one() {
                    let mut child = terms.pop_first().map(|(_, v)| v).unwrap_or_else(Symbol::zero);
                    child.multiplier = child.multiplier * self.multiplier;
                    return child.normalize();
                }
                self
            }
            // Integer powers of the imaginary unit cycle with period 4.
            Kind::Variable(ref name) if name == IMAGINARY => {
                let cycle = self
                    .power
                    .num()
                    .filter(|p| p.is_integer())
                    .and_then(|p| p.to_i64())
                    .map(|k| k.rem_euclid(4));
                match cycle {
                    Some(0) => Symbol::number(self.multiplier),
                    Some(2) => Symbol::number(-self.multiplier),
                    Some(k @ (1 | 3)) => Symbol {
                        multiplier: if k == 1 {
                            self.multiplier
                        } else {
                            -self.multiplier
                        },
                        power: Exponent::one(),
                        kind: Kind::Variable(IMAGINARY.to_string()),
                    },
                    _ => self,
                }
            }
            // A number's value lives entirely in the multiplier; a leftover
            // power is applied to it, falling back to a surd when fractional.
            Kind::Number => match &self.power {
                Exponent::Num(p) if !p.is_one() => {
                    if p.is_integer() {
                        match p.to_i64().and_then(|e| self.multiplier.pow_i(e)) {
                            Some(value) => Symbol::number(value),
                            None => self,
                        }
                    } else {
                        Symbol::surd(self.multiplier, p.clone())
                    }
                }
                _ => self,
            },
            Kind::Variable(_) | Kind::Function { .. } => self,
        }
    }

    /// The single variable name this symbol ranges over, when it has exactly
    /// one. Drives the `Poly` promotion in addition.
    pub fn poly_variable(&self) -> Option<&str> {
        match &self.kind {
            Kind::Variable(name) => Some(name),
            Kind::Poly { variable, .. } => Some(variable),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::display::text_default(self))
    }
}
