//! Declarative cleanup rules.
//!
//! Rules are written in the config file as [`RuleSpec`]s and compiled into a
//! [`RuleSet`] once per scan. A compiled rule is a closed list of
//! `Criterion` variants that all have to hold; the scanner asks the rule set
//! for the most specific matching rule of every file it visits.

mod matcher;
mod parse;
mod spec;


pub use matcher::{EntryFacts, RuleSet};
use parse::{parse_age, parse_size};
pub use spec::{Quantity, RuleOverrides, RuleSpec, apply_overrides};
