//! Compiled rules and their evaluation.

use super::spec::RuleSpec;
use crate::candidate::{Category, RiskLevel};
use crate::error::{ReclaimError, Result};
use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use std::path::Path;
use std::time::Duration;

/// Facts about one filesystem entry that rules are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct EntryFacts<'a> {
    pub path: &'a Path,
    /// Path relative to the scan root.
    pub relative: &'a Path,
    pub size: u64,
    /// Time since last modification (zero for timestamps in the future).
    pub age: Duration,
    /// Category inferred from the path.
    pub inferred: Category,
}

impl EntryFacts<'_> {
    fn file_name(&self) -> &Path {
        self.path
            .file_name()
            .map(Path::new)
            .unwrap_or(self.relative)
    }
}

/// A single predicate of a rule.
#[derive(Debug, Clone)]
pub enum Criterion {
    /// Glob match; `whole_path` patterns see the root-relative path, the
    /// others only the file name.
    Pattern {
        matcher: GlobMatcher,
        whole_path: bool,
    },
    /// Inclusive byte bounds.
    SizeBound { min: Option<u64>, max: Option<u64> },
    /// Entry must be at least this old.
    AgeBound { older_than: Duration },
    /// Entry's inferred category must equal this one.
    Category(Category),
}

impl Criterion {
    pub fn pattern(glob: &str) -> Result<Self> {
        let matcher = Glob::new(glob)
            .map_err(|e| {
                ReclaimError::ConfigError(format!("invalid glob pattern '{}': {}", glob, e))
            })?
            .compile_matcher();
        Ok(Criterion::Pattern {
            matcher,
            whole_path: glob.contains('/'),
        })
    }

    pub fn matches(&self, facts: &EntryFacts<'_>) -> bool {
        match self {
            Criterion::Pattern {
                matcher,
                whole_path,
            } => {
                if *whole_path {
                    matcher.is_match(facts.relative)
                } else {
                    matcher.is_match(facts.file_name())
                }
            }
            Criterion::SizeBound { min, max } => {
                min.is_none_or(|min| facts.size >= min) && max.is_none_or(|max| facts.size <= max)
            }
            Criterion::AgeBound { older_than } => facts.age >= *older_than,
            Criterion::Category(category) => facts.inferred == *category,
        }
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    /// Explicit category tag; `None` means use the inferred category.
    pub category: Option<Category>,
    pub risk: RiskLevel,
    pub criteria: Vec<Criterion>,
    /// Literal characters in the rule's pattern; 0 without a pattern.
    pub specificity: usize,
}

impl Rule {
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        if spec.name.trim().is_empty() {
            return Err(ReclaimError::ConfigError(
                "rule names must be non-empty".to_string(),
            ));
        }
        if !spec.has_criteria() {
            return Err(ReclaimError::ConfigError(format!(
                "rule '{}' has no criteria (pattern, min_size, max_size, older_than or when_category)",
                spec.name
            )));
        }

        let mut criteria = Vec::new();
        let mut specificity = 0;

        if let Some(pattern) = &spec.pattern {
            criteria.push(Criterion::pattern(pattern)?);
            specificity = pattern_specificity(pattern);
        }

        let min = spec.min_size.as_ref().map(|q| q.to_bytes()).transpose()?;
        let max = spec.max_size.as_ref().map(|q| q.to_bytes()).transpose()?;
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(ReclaimError::ConfigError(format!(
                "rule '{}': min_size ({}) is larger than max_size ({})",
                spec.name, lo, hi
            )));
        }
        if min.is_some() || max.is_some() {
            criteria.push(Criterion::SizeBound { min, max });
        }

        if let Some(age) = &spec.older_than {
            criteria.push(Criterion::AgeBound {
                older_than: age.to_duration()?,
            });
        }

        if let Some(category) = spec.when_category {
            criteria.push(Criterion::Category(category));
        }

        Ok(Self {
            name: spec.name.clone(),
            category: spec.category,
            risk: spec.risk,
            criteria,
            specificity,
        })
    }

    pub fn matches(&self, facts: &EntryFacts<'_>) -> bool {
        self.criteria.iter().all(|c| c.matches(facts))
    }

    /// Category to report for an entry matched by this rule.
    pub fn category_for(&self, facts: &EntryFacts<'_>) -> Category {
        self.category.unwrap_or(facts.inferred)
    }
}

/// Count the literal characters of a glob, skipping wildcards and the
/// contents of `[...]` classes and `{...}` alternations.
fn pattern_specificity(pattern: &str) -> usize {
    let mut depth = 0usize;
    let mut count = 0;
    for c in pattern.chars() {
        match c {
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            '*' | '?' => {}
            _ if depth == 0 => count += 1,
            _ => {}
        }
    }
    count
}

/// Ordered, compiled rules plus global ignore patterns. Immutable per scan.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    ignore: GlobSet,
}

impl RuleSet {
    /// Compile enabled rules in declaration order.
    pub fn compile(specs: &[RuleSpec], ignore_patterns: &[String]) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for spec in specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(ReclaimError::ConfigError(format!(
                    "duplicate rule name '{}'",
                    spec.name
                )));
            }
        }

        let rules = specs
            .iter()
            .filter(|s| s.enabled)
            .map(Rule::compile)
            .collect::<Result<Vec<_>>>()?;

        let mut builder = GlobSetBuilder::new();
        for pattern in ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                ReclaimError::ConfigError(format!(
                    "invalid glob pattern in ignore_patterns: '{}' - {}",
                    pattern, e
                ))
            })?;
            builder.add(glob);
        }
        let ignore = builder.build().map_err(|e| {
            ReclaimError::ConfigError(format!("failed to compile ignore_patterns: {}", e))
        })?;

        Ok(Self { rules, ignore })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether a global ignore pattern excludes the entry.
    pub fn is_ignored(&self, facts: &EntryFacts<'_>) -> bool {
        self.ignore.is_match(facts.file_name()) || self.ignore.is_match(facts.relative)
    }

    /// The most specific matching rule, earliest declared on ties.
    pub fn best_match(&self, facts: &EntryFacts<'_>) -> Option<&Rule> {
        if self.is_ignored(facts) {
            return None;
        }
        self.rules
            .iter()
            .filter(|rule| rule.matches(facts))
            .fold(None, |best: Option<&Rule>, rule| match best {
                Some(b) if b.specificity >= rule.specificity => Some(b),
                _ => Some(rule),
            })
    }
}
