//! # Tier List
//!
//! Browse, search and sort the ranked function catalogue produced by a
//! code-analysis run.
//!
//! A backend classifies every function of an analysed codebase into a usage
//! tier (S through F) by its internal call count. Tier List fetches that
//! catalogue as an immutable snapshot, then derives a filtered, sorted view
//! grouped by tier together with aggregate stats.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌────────────────┐
//! │  Sources    │──▶│  SnapshotLoader   │──▶│  View engine   │
//! │ HTTP / File │   │ (race-safe fetch) │   │ filter/sort/   │
//! └─────────────┘   └──────────────────┘   │ group + memo   │
//!                                          └───────┬────────┘
//!                      ┌───────────────────────────┤
//!                      ▼                           ▼
//!                 ┌──────────┐               ┌──────────┐
//!                 │   CLI    │               │  browse  │
//!                 │ show/... │               │ session  │
//!                 └──────────┘               └──────────┘
//! ```
//!
//! The loader, derivation engine and data model live in `tierlist-core`,
//! which has no I/O. This crate adds the backends, configuration, logging
//! and text rendering.
//!
//! ## Quick Start
//!
//! ```bash
//! tierlist show run-42                         # grouped view
//! tierlist show run-42 --search parse --tier A # filtered
//! tierlist stats run-42 --json
//! tierlist browse run-42                       # interactive
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`source_http`] | HTTP analysis backend |
//! | [`source_file`] | Local JSON analysis backend |
//! | [`sources`] | Source selection from config |
//! | [`render`] | Plain-text view and stats rendering |
//! | [`browse`] | Interactive line-oriented session |
//! | [`commands`] | CLI subcommand implementations |

pub mod browse;
pub mod commands;
pub mod config;
pub mod logging;
pub mod render;
pub mod source_file;
pub mod source_http;
pub mod sources;

pub use tierlist_core::{
    FetchError, FunctionRecord, FunctionSource, FunctionType, LoadOutcome, Snapshot, SortKey,
    SortOrder, Stats, Tier, TierGroup, TierList, TierListState, TierSummary, ViewQuery,
};
