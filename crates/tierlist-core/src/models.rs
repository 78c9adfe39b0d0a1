//! Core data models for the tier list.
//!
//! [`FunctionRecord`] is the raw unit produced by the analysis backend.
//! [`Snapshot`] bundles the records of one analysis run. [`TierGroup`],
//! [`Stats`] and [`TierSummary`] are derived projections computed by the
//! [`view`](crate::view) engine and never mutated in place.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::source::FetchError;

/// Error returned when a tier, sort key, sort order, or function type
/// cannot be parsed from user input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {kind} '{value}' (expected one of: {expected})")]
pub struct ParseValueError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// One of the six ranked categories assigned upstream. `S` is the best.
///
/// The derived `Ord` follows rank order, so `BTreeMap<Tier, _>` iterates
/// `S, A, B, C, D, F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Tier {
    /// All tiers in display order.
    pub const ALL: [Tier; 6] = [Tier::S, Tier::A, Tier::B, Tier::C, Tier::D, Tier::F];

    /// Rank used by the `tier` sort key: `S = 0` through `F = 5`.
    pub fn rank(self) -> u8 {
        match self {
            Tier::S => 0,
            Tier::A => 1,
            Tier::B => 2,
            Tier::C => 3,
            Tier::D => 4,
            Tier::F => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
            Tier::D => "D",
            Tier::F => "F",
        }
    }

    /// Presentation label from the static tier table.
    pub fn label(self) -> &'static str {
        match self {
            Tier::S => "Hot path",
            Tier::A => "Heavily used",
            Tier::B => "Frequently used",
            Tier::C => "Occasionally used",
            Tier::D => "Rarely used",
            Tier::F => "Never called",
        }
    }

    /// Presentation colour (hex) from the static tier table.
    pub fn color(self) -> &'static str {
        match self {
            Tier::S => "#ff7f7f",
            Tier::A => "#ffbf7f",
            Tier::B => "#ffdf7f",
            Tier::C => "#ffff7f",
            Tier::D => "#bfff7f",
            Tier::F => "#7fbfff",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Ok(Tier::S),
            "A" => Ok(Tier::A),
            "B" => Ok(Tier::B),
            "C" => Ok(Tier::C),
            "D" => Ok(Tier::D),
            "F" => Ok(Tier::F),
            _ => Err(ParseValueError {
                kind: "tier",
                value: s.to_string(),
                expected: "S, A, B, C, D, F",
            }),
        }
    }
}

/// Kind of function as classified by the analysis backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    Function,
    Method,
    ArrowFunction,
    Closure,
    Constructor,
    Getter,
    Setter,
    Generator,
}

impl FunctionType {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionType::Function => "function",
            FunctionType::Method => "method",
            FunctionType::ArrowFunction => "arrow_function",
            FunctionType::Closure => "closure",
            FunctionType::Constructor => "constructor",
            FunctionType::Getter => "getter",
            FunctionType::Setter => "setter",
            FunctionType::Generator => "generator",
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single analysed function. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Opaque identifier. Numeric ids from the backend are kept as strings.
    #[serde(deserialize_with = "deserialize_opaque_id")]
    pub id: String,
    pub function_name: String,
    pub file_path: String,
    pub file_name: String,
    pub start_line: u32,
    pub function_type: FunctionType,
    pub tier: Tier,
    /// Number of calls from inside the analysed codebase. The ranking metric.
    pub internal_call_count: u64,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub is_exported: bool,
    #[serde(default)]
    pub is_entry_point: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpaqueId {
    Text(String),
    Number(u64),
}

fn deserialize_opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OpaqueId::deserialize(deserializer)? {
        OpaqueId::Text(s) => s,
        OpaqueId::Number(n) => n.to_string(),
    })
}

/// The full, unfiltered record list of one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub analysis_id: String,
    pub fetched_at: DateTime<Utc>,
    pub functions: Vec<FunctionRecord>,
}

impl Snapshot {
    pub fn new(analysis_id: impl Into<String>, functions: Vec<FunctionRecord>) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            fetched_at: Utc::now(),
            functions,
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// One tier's slice of the current view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierGroup {
    pub tier: Tier,
    pub label: &'static str,
    pub color: &'static str,
    pub functions: Vec<FunctionRecord>,
}

impl TierGroup {
    pub fn empty(tier: Tier) -> Self {
        Self {
            tier,
            label: tier.label(),
            color: tier.color(),
            functions: Vec::new(),
        }
    }
}

/// Aggregates over the unfiltered snapshot.
///
/// `total_calls` saturates at `u64::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_functions: usize,
    pub total_calls: u64,
    pub async_functions: usize,
    pub exported_functions: usize,
    pub entry_points: usize,
}

impl Stats {
    pub fn from_functions(functions: &[FunctionRecord]) -> Self {
        functions.iter().fold(Stats::default(), |mut acc, f| {
            acc.total_functions += 1;
            acc.total_calls = acc.total_calls.saturating_add(f.internal_call_count);
            acc.async_functions += usize::from(f.is_async);
            acc.exported_functions += usize::from(f.is_exported);
            acc.entry_points += usize::from(f.is_entry_point);
            acc
        })
    }
}

/// Per-tier record counts over the unfiltered snapshot.
///
/// Always holds all six tiers, with zero for tiers that have no records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TierSummary(BTreeMap<Tier, usize>);

impl TierSummary {
    pub fn from_functions(functions: &[FunctionRecord]) -> Self {
        let mut counts: BTreeMap<Tier, usize> = Tier::ALL.iter().map(|t| (*t, 0)).collect();
        for f in functions {
            *counts.entry(f.tier).or_insert(0) += 1;
        }
        Self(counts)
    }

    pub fn count(&self, tier: Tier) -> usize {
        self.0.get(&tier).copied().unwrap_or(0)
    }

    /// Iterate `(tier, count)` pairs in `S..F` order.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, usize)> + '_ {
        self.0.iter().map(|(t, c)| (*t, *c))
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}

impl Default for TierSummary {
    fn default() -> Self {
        Self::from_functions(&[])
    }
}

/// Parse a backend response body into records.
///
/// Accepts either a bare JSON array of records or an object of the form
/// `{"functions": [...]}`. Any record that fails to decode (unknown tier,
/// unknown function type, missing field) rejects the whole body.
pub fn parse_function_list(body: &[u8]) -> Result<Vec<FunctionRecord>, FetchError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| FetchError::Malformed(format!("invalid JSON: {}", e)))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("functions") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(FetchError::Malformed(
                    "expected an array of functions or an object with a 'functions' array"
                        .to_string(),
                ))
            }
        },
        _ => {
            return Err(FetchError::Malformed(
                "expected an array of functions or an object with a 'functions' array".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            FunctionRecord::deserialize(item)
                .map_err(|e| FetchError::Malformed(format!("record {}: {}", i, e)))
        })
        .collect()
}

/// Check record-level integrity that the type system cannot express.
///
/// Rejects empty names, a zero `start_line`, and duplicate ids.
pub fn validate_functions(functions: &[FunctionRecord]) -> Result<(), FetchError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(functions.len());
    for (i, f) in functions.iter().enumerate() {
        if f.function_name.trim().is_empty() {
            return Err(FetchError::Malformed(format!(
                "record {} ({}): function_name is empty",
                i, f.id
            )));
        }
        if f.start_line == 0 {
            return Err(FetchError::Malformed(format!(
                "record {} ({}): start_line must be >= 1",
                i, f.id
            )));
        }
        if !seen.insert(f.id.as_str()) {
            return Err(FetchError::Malformed(format!(
                "record {}: duplicate id '{}'",
                i, f.id
            )));
        }
    }
    Ok(())
}
