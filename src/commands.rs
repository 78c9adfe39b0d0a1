//! Implementations of the `tierlist` subcommands.
//!
//! Each `run_*` function loads what it needs from config, drives a
//! [`TierList`] and prints to stdout. A failed fetch is returned as an error
//! so the process exits non-zero.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use tierlist_core::source::FunctionSource;
use tierlist_core::{LoadOutcome, SortKey, SortOrder, Stats, Tier, TierList, TierSummary};

use crate::browse;
use crate::config::Config;
use crate::render::{format_stats, format_view};
use crate::sources::{create_source, list_analyses};

/// Query flags accepted by `tierlist show`.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    pub search: Option<String>,
    pub tier: Option<Tier>,
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub json: bool,
}

#[derive(Serialize)]
struct StatsReport<'a> {
    analysis_id: &'a str,
    stats: Stats,
    tier_summary: &'a TierSummary,
}

async fn open(config: &Config, analysis_id: &str) -> Result<TierList<dyn FunctionSource>> {
    let source = create_source(&config.source)?;
    let list = TierList::new(source);
    if list.set_analysis_id(Some(analysis_id.to_string())).await != LoadOutcome::Applied {
        let message = list
            .state()
            .error
            .unwrap_or_else(|| "load did not complete".to_string());
        bail!("Failed to load analysis '{}': {}", analysis_id, message);
    }
    Ok(list)
}

/// `tierlist show <id>`: load one analysis and print its grouped view.
pub async fn run_show(config: &Config, analysis_id: &str, opts: ShowOptions) -> Result<()> {
    let list = open(config, analysis_id).await?;

    if let Some(search) = opts.search {
        list.set_search_query(search);
    }
    list.set_tier_filter(opts.tier);
    if let Some(sort) = opts.sort {
        list.set_sort_by(sort);
    }
    if let Some(order) = opts.order {
        list.set_sort_order(order);
    }

    let state = list.state();
    if opts.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print!("{}", format_view(&state));
    }
    Ok(())
}

/// `tierlist stats <id>`: print aggregate counts for one analysis.
pub async fn run_stats(config: &Config, analysis_id: &str, json: bool) -> Result<()> {
    let list = open(config, analysis_id).await?;
    let state = list.state();

    if json {
        let (Some(stats), Some(tier_summary)) = (state.stats, state.tier_summary.as_ref()) else {
            bail!("No stats available for analysis '{}'", analysis_id);
        };
        let report = StatsReport {
            analysis_id,
            stats,
            tier_summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_stats(&state));
    }
    Ok(())
}

/// `tierlist list`: print analysis ids the configured source can enumerate.
pub fn run_list(config: &Config) -> Result<()> {
    let ids = list_analyses(&config.source)?;
    if ids.is_empty() {
        println!("No analyses found.");
        return Ok(());
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

/// `tierlist browse [<id>]`: interactive session over stdin.
pub async fn run_browse(config: &Config, analysis_id: Option<String>) -> Result<()> {
    let source: Arc<dyn FunctionSource> = create_source(&config.source)?;
    let list = TierList::new(source);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    browse::run_session(&list, analysis_id, stdin).await
}
