//! Session state
//!
//! All parser and engine state lives in an explicit [`Context`] value: the
//! settings, the operator table, declared variables and functions, registered
//! units, and the armed cancellation deadline. There are no globals; two
//! contexts never observe each other.

use std::cell::Cell;
use std::time::{Duration, Instant};

use log::debug;
use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::parser::operators::{Operator, OperatorTable};
use crate::symbol::Symbol;

/// Names with fixed meaning that can never be assigned to.
pub const RESERVED_NAMES: &[&str] = &[
    "Infinity",
    "i",
    "pi",
    "e",
    "undefined",
    "vector",
    "set",
];

/// Tunable engine behavior.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Evaluate transcendental functions and constants numerically instead of
    /// leaving them symbolic.
    pub parse_to_number: bool,
    /// Significant digits used by decimal text output.
    pub precision: u32,
    /// Cooperative cancellation budget per parse; `None` disables it.
    pub timeout: Option<Duration>,
    /// Treat `xy` as one variable rather than `x*y`.
    pub multicharacter_vars: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            parse_to_number: false,
            precision: 21,
            timeout: None,
            multicharacter_vars: true,
        }
    }
}

/// A user-defined function: parameter names plus a symbolic body the
/// evaluator substitutes arguments into.
#[derive(Debug, Clone)]
pub struct UserFunction {
    pub params: Vec<String>,
    pub body: Symbol,
}

/// One engine session: settings, operator table, declarations, units, and
/// the cancellation deadline.
#[derive(Debug)]
pub struct Context {
    settings: Settings,
    operators: OperatorTable,
    variables: FxHashMap<String, Symbol>,
    functions: FxHashMap<String, UserFunction>,
    units: FxHashMap<String, Symbol>,
    // Armed at the top of each parse, cleared on the way out. Interior
    // mutability so the hot check stays callable through `&Context`.
    deadline: Cell<Option<Instant>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Context {
            settings: Settings::default(),
            operators: OperatorTable::standard(),
            variables: FxHashMap::default(),
            functions: FxHashMap::default(),
            units: FxHashMap::default(),
            deadline: Cell::new(None),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = Some(timeout);
        self
    }

    pub fn with_parse_to_number(mut self, enabled: bool) -> Self {
        self.settings.parse_to_number = enabled;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Register a custom operator spelling.
    pub fn register_operator(&mut self, op: Operator) -> Result<(), Error> {
        debug!("registering operator '{}'", op.symbol);
        self.operators.register(op)
    }

    // ---- declarations ---------------------------------------------------

    /// Bind a variable to a value. The name must be a valid, non-reserved
    /// identifier.
    pub fn set_variable(&mut self, name: &str, value: Symbol) -> Result<(), Error> {
        validate_name(name)?;
        self.variables.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get_variable(&self, name: &str) -> Option<&Symbol> {
        self.variables.get(name)
    }

    pub fn clear_variable(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// Define a function by name, parameter list, and symbolic body.
    pub fn define_function(
        &mut self,
        name: &str,
        params: Vec<String>,
        body: Symbol,
    ) -> Result<(), Error> {
        validate_name(name)?;
        for param in &params {
            validate_name(param)?;
        }
        debug!("defining function {}({})", name, params.join(","));
        self.functions.insert(
            name.to_string(),
            UserFunction { params, body },
        );
        Ok(())
    }

    pub fn get_function(&self, name: &str) -> Option<&UserFunction> {
        self.functions.get(name)
    }

    /// True when `name` resolves to a callable: a user definition or a
    /// built-in.
    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name) || crate::functions::lookup(name).is_some()
    }

    // ---- units ----------------------------------------------------------

    /// Register a unit name resolving to the given symbol.
    pub fn register_unit(&mut self, name: &str, value: Symbol) -> Result<(), Error> {
        validate_name(name)?;
        self.units.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get_unit(&self, name: &str) -> Option<&Symbol> {
        self.units.get(name)
    }

    /// Whether an identifier has a declared meaning (variable, function, or
    /// unit). Drives single-character splitting when multi-character
    /// variables are disabled.
    pub fn knows_name(&self, name: &str) -> bool {
        self.variables.contains_key(name)
            || self.is_function(name)
            || self.units.contains_key(name)
            || RESERVED_NAMES.contains(&name)
    }

    // ---- cancellation ---------------------------------------------------

    /// Arm the deadline from the configured timeout. Called once at the top
    /// of each parse.
    pub fn arm_deadline(&self) {
        self.deadline
            .set(self.settings.timeout.map(|t| Instant::now() + t));
    }

    pub fn disarm_deadline(&self) {
        self.deadline.set(None);
    }

    /// Cooperative cancellation check: every loop in the tokenizer, the
    /// evaluator, and the operator algebra polls this.
    pub fn check_deadline(&self) -> Result<(), Error> {
        if let Some(deadline) = self.deadline.get() {
            if Instant::now() > deadline {
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }
}

/// A legal identifier: starts with a letter or underscore, continues with
/// letters, digits, or underscores, and is not reserved.
pub fn validate_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return Err(Error::InvalidName(name.to_string()));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(Error::ReservedName(name.to_string()));
    }
    Ok(())
}
