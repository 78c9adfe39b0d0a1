//! Plain-text rendering of a [`TierListState`].
//!
//! Renderers only read the derived state; filtering, sorting and grouping
//! all happen in `tierlist_core::view`. Output is built as a `String` so
//! the CLI can print it and tests can inspect it.

use std::fmt::Write;

use tierlist_core::{FunctionRecord, Tier, TierGroup, TierListState};

/// Widest function name column before names are truncated.
const MAX_NAME_WIDTH: usize = 40;

/// Full grouped view: header, badges, then one section per tier.
pub fn format_view(state: &TierListState) -> String {
    let mut out = String::new();

    let id = match &state.analysis_id {
        Some(id) => id,
        None => {
            out.push_str("No analysis selected.\n");
            return out;
        }
    };

    if state.is_loading {
        let _ = writeln!(out, "Loading analysis {}...", id);
    }
    if let Some(err) = &state.error {
        let _ = writeln!(out, "Error: {}", err);
    }

    let (stats, summary) = match (&state.stats, &state.tier_summary) {
        (Some(stats), Some(summary)) => (stats, summary),
        _ => {
            if !state.is_loading && state.error.is_none() {
                let _ = writeln!(out, "Analysis {} has not been loaded.", id);
            }
            return out;
        }
    };

    let _ = writeln!(
        out,
        "Analysis {}: {} functions, {} internal calls",
        id, stats.total_functions, stats.total_calls
    );
    let badges: Vec<String> = summary
        .iter()
        .map(|(tier, count)| format!("{} {}", tier, count))
        .collect();
    let _ = writeln!(out, "Tiers: {}", badges.join(" | "));

    if !state.query.is_default() {
        let tier = state
            .query
            .tier_filter
            .map(|t| t.to_string())
            .unwrap_or_else(|| "all".to_string());
        let _ = writeln!(
            out,
            "Query: search=\"{}\" tier={} sort={} {}",
            state.query.search.trim(),
            tier,
            state.query.sort_by,
            state.query.sort_order
        );
    }
    let _ = writeln!(
        out,
        "Showing {} of {} functions",
        state.visible_count(),
        stats.total_functions
    );

    let name_width = state
        .tier_groups
        .iter()
        .flat_map(|g| g.functions.iter())
        .map(|f| f.function_name.chars().count())
        .max()
        .unwrap_or(4)
        .clamp(4, MAX_NAME_WIDTH);

    for group in state.tier_groups.iter() {
        out.push('\n');
        write_group(&mut out, group, name_width);
    }

    out
}

fn write_group(out: &mut String, group: &TierGroup, name_width: usize) {
    let _ = writeln!(
        out,
        "[{}] {} ({})",
        group.tier,
        group.label,
        group.functions.len()
    );
    if group.functions.is_empty() {
        out.push_str("  (none)\n");
        return;
    }
    for f in &group.functions {
        let _ = writeln!(
            out,
            "  {:>7}  {:<width$}  {}:{}  {}{}",
            f.internal_call_count,
            truncate(&f.function_name, name_width),
            f.file_path,
            f.start_line,
            f.function_type,
            flags(f),
            width = name_width
        );
    }
}

fn flags(f: &FunctionRecord) -> String {
    let mut parts = Vec::new();
    if f.is_async {
        parts.push("async");
    }
    if f.is_exported {
        parts.push("exported");
    }
    if f.is_entry_point {
        parts.push("entry");
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("  [{}]", parts.join(", "))
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut short: String = name.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

/// Stats bar and per-tier breakdown over the whole snapshot.
pub fn format_stats(state: &TierListState) -> String {
    let mut out = String::new();
    let (stats, summary) = match (&state.stats, &state.tier_summary) {
        (Some(stats), Some(summary)) => (stats, summary),
        _ => {
            out.push_str("No analysis loaded.\n");
            return out;
        }
    };

    let _ = writeln!(out, "Tier List: Analysis Stats");
    let _ = writeln!(out, "=========================");
    out.push('\n');
    if let Some(id) = &state.analysis_id {
        let _ = writeln!(out, "  Analysis:      {}", id);
    }
    if let Some(at) = &state.fetched_at {
        let _ = writeln!(out, "  Fetched:       {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    out.push('\n');
    let _ = writeln!(out, "  Functions:     {}", stats.total_functions);
    let _ = writeln!(out, "  Calls:         {}", stats.total_calls);
    let _ = writeln!(out, "  Async:         {}", stats.async_functions);
    let _ = writeln!(out, "  Exported:      {}", stats.exported_functions);
    let _ = writeln!(out, "  Entry points:  {}", stats.entry_points);

    out.push('\n');
    let _ = writeln!(out, "  By tier:");
    let _ = writeln!(out, "  {:<5} {:<18} {:>6} {:>7}", "TIER", "LABEL", "COUNT", "SHARE");
    let _ = writeln!(out, "  {}", "-".repeat(39));
    for (tier, count) in summary.iter() {
        let _ = writeln!(
            out,
            "  {:<5} {:<18} {:>6} {:>6.1}%",
            tier,
            tier.label(),
            count,
            share(count, stats.total_functions)
        );
    }
    out
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

/// One-line summary used by the interactive session prompt.
pub fn format_status(state: &TierListState) -> String {
    let id = state.analysis_id.as_deref().unwrap_or("-");
    let visible = state.visible_count();
    let total = state.stats.map(|s| s.total_functions).unwrap_or(0);
    let tier = state
        .query
        .tier_filter
        .map(Tier::as_str)
        .unwrap_or("all");
    format!(
        "{} | {}/{} shown | tier={} sort={} {}{}",
        id,
        visible,
        total,
        tier,
        state.query.sort_by,
        state.query.sort_order,
        if state.is_loading { " | loading" } else { "" }
    )
}
