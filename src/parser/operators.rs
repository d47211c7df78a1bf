//! Operator table
//!
//! Every operator the tokenizer can emit maps to a closed [`OpAction`]; the
//! evaluator dispatches on the action, never on the spelling. Custom
//! operators registered at runtime route to a named function via
//! [`OpAction::Call`], so the dispatch set stays closed.

use rustc_hash::FxHashMap;

use crate::error::Error;

/// Associativity of an infix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// What an operator *does*. Exhaustive: the evaluator matches on this and
/// nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpAction {
    Add,
    Subtract,
    Multiply,
    Divide,
    Pow,
    Mod,
    Percent,
    Factorial,
    DoubleFactorial,
    Comma,
    Assign,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    /// Runtime-registered operator forwarding to a named function.
    Call(String),
}

/// One table entry. `prefix`/`postfix` mark the additional positions the
/// spelling is legal in besides plain infix.
#[derive(Debug, Clone)]
pub struct Operator {
    pub symbol: String,
    pub precedence: u8,
    pub assoc: Assoc,
    pub prefix: bool,
    pub postfix: bool,
    pub action: OpAction,
}

impl Operator {
    pub fn infix(symbol: &str, precedence: u8, assoc: Assoc, action: OpAction) -> Self {
        Operator {
            symbol: symbol.to_string(),
            precedence,
            assoc,
            prefix: false,
            postfix: false,
            action,
        }
    }

    fn postfix(symbol: &str, precedence: u8, action: OpAction) -> Self {
        Operator {
            symbol: symbol.to_string(),
            precedence,
            assoc: Assoc::Left,
            prefix: false,
            postfix: true,
            action,
        }
    }
}

// Precedence tiers. Comma is the floor so argument lists bind last.
pub const PREC_COMMA: u8 = 1;
pub const PREC_ASSIGN: u8 = 2;
pub const PREC_RELATION: u8 = 3;
pub const PREC_ADD: u8 = 4;
pub const PREC_MUL: u8 = 5;
pub const PREC_PREFIX: u8 = 6;
pub const PREC_POW: u8 = 7;
pub const PREC_POSTFIX: u8 = 8;

/// The mutable per-session operator table.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    entries: FxHashMap<String, Operator>,
    /// Every character appearing in any registered symbol; drives the
    /// tokenizer's greedy chunking.
    chars: Vec<char>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl OperatorTable {
    /// The built-in operator set.
    pub fn standard() -> Self {
        let mut table = OperatorTable {
            entries: FxHashMap::default(),
            chars: Vec::new(),
        };
        let standard = [
            Operator::infix(",", PREC_COMMA, Assoc::Left, OpAction::Comma),
            Operator::infix(":=", PREC_ASSIGN, Assoc::Right, OpAction::Assign),
            Operator::infix("=", PREC_RELATION, Assoc::Left, OpAction::Equal),
            Operator::infix("==", PREC_RELATION, Assoc::Left, OpAction::Equal),
            Operator::infix("!=", PREC_RELATION, Assoc::Left, OpAction::NotEqual),
            Operator::infix("<", PREC_RELATION, Assoc::Left, OpAction::LessThan),
            Operator::infix("<=", PREC_RELATION, Assoc::Left, OpAction::LessEqual),
            Operator::infix(">", PREC_RELATION, Assoc::Left, OpAction::GreaterThan),
            Operator::infix(">=", PREC_RELATION, Assoc::Left, OpAction::GreaterEqual),
            Operator {
                symbol: "+".to_string(),
                precedence: PREC_ADD,
                assoc: Assoc::Left,
                prefix: true,
                postfix: false,
                action: OpAction::Add,
            },
            Operator {
                symbol: "-".to_string(),
                precedence: PREC_ADD,
                assoc: Assoc::Left,
                prefix: true,
                postfix: false,
                action: OpAction::Subtract,
            },
            Operator::infix("*", PREC_MUL, Assoc::Left, OpAction::Multiply),
            Operator::infix("/", PREC_MUL, Assoc::Left, OpAction::Divide),
            // '%' is modulo between operands and percent after one; the
            // shunting-yard stage disambiguates by lookahead.
            Operator {
                symbol: "%".to_string(),
                precedence: PREC_MUL,
                assoc: Assoc::Left,
                prefix: false,
                postfix: true,
                action: OpAction::Mod,
            },
            Operator::infix("^", PREC_POW, Assoc::Right, OpAction::Pow),
            Operator::infix("**", PREC_POW, Assoc::Right, OpAction::Pow),
            Operator::postfix("!", PREC_POSTFIX, OpAction::Factorial),
            Operator::postfix("!!", PREC_POSTFIX, OpAction::DoubleFactorial),
        ];
        for op in standard {
            // The built-in set never collides with itself.
            let _ = table.insert(op);
        }
        table
    }

    fn insert(&mut self, op: Operator) -> Result<(), Error> {
        if op.symbol.is_empty() {
            return Err(Error::InvalidName(op.symbol));
        }
        for c in op.symbol.chars() {
            if c.is_alphanumeric() || c.is_whitespace() || "()[]{}.".contains(c) {
                return Err(Error::InvalidName(op.symbol));
            }
            if !self.chars.contains(&c) {
                self.chars.push(c);
            }
        }
        self.entries.insert(op.symbol.clone(), op);
        Ok(())
    }

    /// Register (or replace) a runtime operator. Bracket, alphanumeric, and
    /// whitespace spellings are rejected.
    pub fn register(&mut self, op: Operator) -> Result<(), Error> {
        self.insert(op)
    }

    pub fn get(&self, symbol: &str) -> Option<&Operator> {
        self.entries.get(symbol)
    }

    /// Whether `c` can start or continue an operator spelling.
    pub fn is_operator_char(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    /// Split a run of operator characters into operators, greedily taking the
    /// longest registered prefix each time (`"**-"` → `["**", "-"]`).
    pub fn split_chunk<'a>(
        &'a self,
        chunk: &str,
        column: usize,
    ) -> Result<Vec<&'a Operator>, Error> {
        let chars: Vec<char> = chunk.chars().collect();
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < chars.len() {
            let mut matched = None;
            for end in (pos + 1..=chars.len()).rev() {
                let candidate: String = chars[pos..end].iter().collect();
                if let Some(op) = self.entries.get(&candidate) {
                    matched = Some((op, end));
                    break;
                }
            }
            match matched {
                Some((op, end)) => {
                    out.push(op);
                    pos = end;
                }
                None => {
                    return Err(Error::UnknownOperator {
                        text: chars[pos..].iter().collect(),
                        column: column + pos,
                    });
                }
            }
        }
        Ok(out)
    }
}
