//! Insertion/combination engine
//!
//! The shared core behind the operator algebra: merging one symbol into a
//! composite while maintaining the canonical key invariant. `attach` is the
//! addition path (into `Sum`/`Poly`), `combine` the multiplication path
//! (into `Product`). Both funnel into [`insert`].

use crate::context::Context;
use crate::error::Error;
use crate::rational::Rational;
use crate::symbol::{Group, Kind, Symbol};

/// Which combining rule applies when a key is already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAction {
    /// Addition: same-key children merge by adding multipliers.
    Attach,
    /// Multiplication: same-key children merge through the operator algebra
    /// (powers add), multipliers folding into the parent.
    Combine,
}

/// Insert `child` into the composite `parent`.
///
/// Leaves `parent` flat and canonical but possibly degenerate (empty or
/// single-child); callers run [`Symbol::normalize`] once construction is
/// finished.
pub fn insert(
    ctx: &Context,
    parent: &mut Symbol,
    child: Symbol,
    action: InsertAction,
) -> Result<(), Error> {
    ctx.check_deadline()?;

    match action {
        InsertAction::Attach => attach(ctx, parent, child),
        InsertAction::Combine => combine(ctx, parent, child),
    }
}

fn attach(ctx: &Context, parent: &mut Symbol, mut child: Symbol) -> Result<(), Error> {
    // Adding zero never changes a sum.
    if child.is_zero() {
        return Ok(());
    }

    // Flatten: attaching a power-1 sum splices its children in, scaled.
    if child.group() == Group::Sum && child.power.is_one() {
        let scale = child.take_multiplier();
        if let Kind::Sum(terms) = child.kind {
            for (_, mut term) in terms {
                term.multiplier = term.multiplier * scale.clone();
                attach(ctx, parent, term)?;
            }
            return Ok(());
        }
        unreachable!("group checked above");
    }

    let parent_group = parent.group();
    debug_assert!(matches!(parent_group, Group::Sum | Group::Poly));
    let key = child.key_for_group(parent_group);

    let terms = match &mut parent.kind {
        Kind::Sum(terms) | Kind::Poly { terms, .. } => terms,
        _ => {
            return Err(Error::Undefined("attach target is not an additive composite"));
        }
    };

    match terms.get_mut(&key) {
        Some(existing) => {
            // Same key means same shape up to multiplier.
            existing.multiplier = existing.multiplier.clone() + child.multiplier;
            if existing.multiplier.is_zero() {
                terms.remove(&key);
            }
        }
        None => {
            terms.insert(key, child);
        }
    }
    Ok(())
}

fn combine(ctx: &Context, parent: &mut Symbol, mut child: Symbol) -> Result<(), Error> {
    // A numeric factor folds straight into the parent multiplier.
    if child.is_number() {
        parent.multiplier = parent.multiplier.clone() * child.multiplier;
        return Ok(());
    }

    // Flatten nested power-1 products.
    if child.group() == Group::Product && child.power.is_one() {
        let scale = child.take_multiplier();
        parent.multiplier = parent.multiplier.clone() * scale;
        if let Kind::Product(factors) = child.kind {
            for (_, factor) in factors {
                combine(ctx, parent, factor)?;
            }
            return Ok(());
        }
        unreachable!("group checked above");
    }

    // The child's scale factor always rides on the parent, never the child.
    let scale = child.take_multiplier();
    parent.multiplier = parent.multiplier.clone() * scale;

    let key = child.key_for_group(Group::Product);
    let factors = match &mut parent.kind {
        Kind::Product(factors) => factors,
        _ => {
            return Err(Error::Undefined(
                "combine target is not a multiplicative composite",
            ));
        }
    };

    match factors.remove(&key) {
        Some(existing) => {
            // Like bases: multiply through the algebra so powers merge.
            let merged = crate::algebra::multiply(ctx, existing, child)?;
            if merged.is_number() {
                // x * x^-1 style collapse: only a scale factor remains.
                parent.multiplier = parent.multiplier.clone() * merged.multiplier;
            } else {
                let mut merged = merged;
                let scale = merged.take_multiplier();
                parent.multiplier = parent.multiplier.clone() * scale;
                let new_key = merged.key_for_group(Group::Product);
                factors.insert(new_key, merged);
            }
        }
        None => {
            factors.insert(key, child);
        }
    }
    Ok(())
}

/// Zero multiplier wipes out the whole composite, whatever its children.
pub fn collapse_if_zero(symbol: Symbol) -> Symbol {
    if symbol.multiplier.is_zero() {
        Symbol::number(Rational::zero())
    } else {
        symbol
    }
}
