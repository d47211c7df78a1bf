//! Canonical-form guarantees: equal expressions have equal structure, and
//! the printed form is a fixed point of parsing.

use crate::tests::init_logging;
use crate::{parse, text_default, Error, Group};

fn render(input: &str) -> String {
    init_logging();
    text_default(&parse(input).unwrap())
}

#[test]
fn test_like_terms_merge() {
    assert_eq!(render("x+x"), "2*x");
    assert_eq!(render("2*x+3*x"), "5*x");
    assert_eq!(render("x-x"), "0");
}

#[test]
fn test_like_bases_merge() {
    assert_eq!(render("x*x"), "x^2");
    assert_eq!(render("x*x*x"), "x^3");
    assert_eq!(render("x^2/x"), "x");
    assert_eq!(render("x/x"), "1");
}

#[test]
fn test_fractions_stay_exact() {
    assert_eq!(render("2/4"), "1/2");
    assert_eq!(render("1/3+1/6"), "1/2");
    assert_eq!(render("0.1+0.2"), "3/10");
    assert_eq!(render("(2/3)^3"), "8/27");
}

#[test]
fn test_operand_order_is_irrelevant() {
    assert_eq!(parse("x+y+z").unwrap(), parse("z+y+x").unwrap());
    assert_eq!(parse("x*y*z").unwrap(), parse("z*y*x").unwrap());
    assert_eq!(parse("2*x*3").unwrap(), parse("6*x").unwrap());
}

#[test]
fn test_construction_history_is_irrelevant() {
    // Same value reached along different paths must be the same structure.
    assert_eq!(parse("x+y+x^2-y").unwrap(), parse("x+x^2").unwrap());
    assert_eq!(parse("(x+1)+(x-1)").unwrap(), parse("2*x").unwrap());
}

#[test]
fn test_single_variable_powers_form_poly() {
    let poly = parse("x^2+x+1").unwrap();
    assert_eq!(poly.group(), Group::Sum);
    let pure = parse("x^2+x").unwrap();
    assert_eq!(pure.group(), Group::Poly);
}

#[test]
fn test_surds_reduce() {
    assert_eq!(render("sqrt(4)"), "2");
    assert_eq!(render("sqrt(8)"), "2*2^(1/2)");
    assert_eq!(render("sqrt(2)*sqrt(2)"), "2");
    assert_eq!(render("8^(1/3)"), "2");
}

#[test]
fn test_imaginary_unit() {
    assert_eq!(render("i*i"), "-1");
    assert_eq!(render("i^4"), "1");
    assert_eq!(render("sqrt(-4)"), "2*i");
}

#[test]
fn test_infinity_arithmetic() {
    assert_eq!(render("Infinity+5"), "Infinity");
    assert_eq!(render("1/Infinity"), "0");
    assert_eq!(
        parse("Infinity-Infinity").unwrap_err(),
        Error::IncompatibleInfinities
    );
}

#[test]
fn test_symbolic_powers() {
    assert_eq!(parse("2^x*2^y").unwrap(), parse("2^(x+y)").unwrap());
    assert_eq!(parse("x^a*x^2").unwrap(), parse("x^(a+2)").unwrap());
    assert_eq!(render("(2^x)^2"), "2^(2*x)");
}

#[test]
fn test_collapsed_symbolic_powers_apply_to_base() {
    assert_eq!(render("2^x*2^(1-x)"), "2");
    assert_eq!(render("2^x*2^(3-x)"), "8");
    assert_eq!(render("2^x*2^(-x)"), "1");
}

#[test]
fn test_mixed_power_kinds_merge_order_independently() {
    assert_eq!(
        parse("2^(1/2)*2^x").unwrap(),
        parse("2^x*2^(1/2)").unwrap()
    );
}

#[test]
fn test_negated_exponential_base_is_distinct() {
    assert_ne!(parse("(-(2^x))^y").unwrap(), parse("(2^x)^y").unwrap());
}

#[test]
fn test_zero_and_one_identities() {
    assert_eq!(render("x+0"), "x");
    assert_eq!(render("x*1"), "x");
    assert_eq!(render("x*0"), "0");
    assert_eq!(render("x^1"), "x");
    assert_eq!(render("x^0"), "1");
}

#[test]
fn test_printed_form_is_fixed_point() {
    init_logging();
    for input in [
        "3*x^2+2*x+1",
        "x*y^2*z^3",
        "sin(x)+cos(x)",
        "(x+y)*(x-y)",
        "2^(1/2)+3^(1/3)",
        "a/b/c",
        "x^(y+1)",
        "factorial(n)",
    ] {
        let first = parse(input).unwrap();
        let printed = text_default(&first);
        let reparsed = parse(&printed).unwrap();
        assert_eq!(first, reparsed, "'{}' printed as '{}'", input, printed);
    }
}
