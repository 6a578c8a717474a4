//! `where` rules: boolean predicates over a match environment.
//!
//! ```text
//! where :[x] == :[y]
//! where :[level] != "debug", not :[msg] == ""
//! where match :[op] { | "+" -> true | "-" -> true | _ -> false }
//! ```
//!
//! Rules are pure filters: they never change an environment.

pub mod ast;
mod eval;
pub mod errors;
mod parser;

pub use ast::{Arm, ArmPattern, Atom, Rule};
pub use errors::RuleError;
pub use eval::evaluate;
