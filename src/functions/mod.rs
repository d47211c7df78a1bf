//! Built-in functions
//!
//! Callables resolve through a process-wide registry built once on first
//! use. Each definition carries an arity range checked before dispatch; the
//! eval functions decide for themselves whether to produce an exact value, a
//! numeric approximation (only under `parse_to_number`), or a symbolic
//! function node.

mod registry;

pub use registry::{
    arity_text, double_factorial_eval, factorial_eval, lookup, FunctionDefinition,
};
