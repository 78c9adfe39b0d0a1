//! View derivation: snapshot + query parameters to grouped tier view.
//!
//! Everything here is a pure function of its inputs. The calling layer
//! owns the snapshot and the [`ViewQuery`] and re-derives whenever either
//! changes; [`ViewCache`] turns repeated derivations with unchanged inputs
//! into a pointer clone.
//!
//! # Pipeline
//!
//! 1. Keep records whose `function_name` contains the trimmed search query
//!    (case-insensitive). A blank query keeps everything.
//! 2. Keep records of the filtered tier, if a tier filter is set.
//! 3. Stable-sort by the selected [`SortKey`]; [`SortOrder::Desc`] reverses
//!    the ascending comparison, ties keep snapshot order.
//! 4. Partition into six [`TierGroup`]s in `S..F` order.
//!
//! [`Stats`] and [`TierSummary`] are always computed over the unfiltered
//! snapshot.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{FunctionRecord, ParseValueError, Snapshot, Stats, Tier, TierGroup, TierSummary};

/// Field the view is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CallCount,
    Name,
    File,
    Tier,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CallCount => "call_count",
            SortKey::Name => "name",
            SortKey::File => "file",
            SortKey::Tier => "tier",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call_count" | "calls" => Ok(SortKey::CallCount),
            "name" => Ok(SortKey::Name),
            "file" => Ok(SortKey::File),
            "tier" => Ok(SortKey::Tier),
            _ => Err(ParseValueError {
                kind: "sort key",
                value: s.to_string(),
                expected: "call_count, name, file, tier",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ParseValueError {
                kind: "sort order",
                value: s.to_string(),
                expected: "asc, desc",
            }),
        }
    }
}

/// User-adjustable view parameters.
///
/// `Default` is the reset state: empty search, no tier filter,
/// `call_count` descending.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ViewQuery {
    pub search: String,
    pub tier_filter: Option<Tier>,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

impl ViewQuery {
    pub fn is_default(&self) -> bool {
        self.search.trim().is_empty()
            && self.tier_filter.is_none()
            && self.sort_by == SortKey::default()
            && self.sort_order == SortOrder::default()
    }
}

/// Result of one derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierView {
    /// Exactly six groups, `S..F`. Shared with every state built from this view.
    pub tier_groups: Arc<[TierGroup]>,
    pub stats: Stats,
    pub tier_summary: TierSummary,
}

impl TierView {
    /// Number of records that survived search and tier filtering.
    pub fn visible_count(&self) -> usize {
        self.tier_groups.iter().map(|g| g.functions.len()).sum()
    }

    pub fn group(&self, tier: Tier) -> &TierGroup {
        &self.tier_groups[tier.rank() as usize]
    }
}

/// Six empty groups in display order.
pub fn empty_groups() -> Vec<TierGroup> {
    Tier::ALL.iter().map(|t| TierGroup::empty(*t)).collect()
}

/// Derive the full view for `functions` under `query`.
pub fn derive_view(functions: &[FunctionRecord], query: &ViewQuery) -> TierView {
    TierView {
        tier_groups: derive_groups(functions, query).into(),
        stats: Stats::from_functions(functions),
        tier_summary: TierSummary::from_functions(functions),
    }
}

/// Filter, sort and group `functions`. Steps 1 to 4 of the pipeline.
pub fn derive_groups(functions: &[FunctionRecord], query: &ViewQuery) -> Vec<TierGroup> {
    let mut visible = filter_functions(functions, query);
    sort_functions(&mut visible, query.sort_by, query.sort_order);
    group_by_tier(visible)
}

/// Apply the search query and tier filter, keeping snapshot order.
pub fn filter_functions<'a>(
    functions: &'a [FunctionRecord],
    query: &ViewQuery,
) -> Vec<&'a FunctionRecord> {
    let needle = query.search.trim().to_lowercase();
    functions
        .iter()
        .filter(|f| needle.is_empty() || f.function_name.to_lowercase().contains(&needle))
        .filter(|f| query.tier_filter.map_or(true, |tier| f.tier == tier))
        .collect()
}

/// Natural ascending comparison for `key`.
pub fn compare_by(a: &FunctionRecord, b: &FunctionRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::CallCount => a.internal_call_count.cmp(&b.internal_call_count),
        SortKey::Name => a
            .function_name
            .to_lowercase()
            .cmp(&b.function_name.to_lowercase()),
        SortKey::File => a.file_path.cmp(&b.file_path),
        SortKey::Tier => a.tier.rank().cmp(&b.tier.rank()),
    }
}

/// Stable sort in place.
pub fn sort_functions(functions: &mut [&FunctionRecord], key: SortKey, order: SortOrder) {
    functions.sort_by(|a, b| {
        let ord = compare_by(a, b, key);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Partition an already-sorted sequence into the six tier groups.
pub fn group_by_tier(sorted: Vec<&FunctionRecord>) -> Vec<TierGroup> {
    let mut groups = empty_groups();
    for f in sorted {
        groups[f.tier.rank() as usize].functions.push(f.clone());
    }
    groups
}

/// Memo for the last derivation.
///
/// Keyed on snapshot identity (`Arc::ptr_eq`) and the full [`ViewQuery`].
/// Aggregates are cached per snapshot so query edits never recount them.
#[derive(Default)]
pub struct ViewCache {
    aggregates: Option<(Arc<Snapshot>, Stats, TierSummary)>,
    view: Option<(Arc<Snapshot>, ViewQuery, Arc<TierView>)>,
    derivations: usize,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the view for `(snapshot, query)`, deriving only on a miss.
    pub fn get(&mut self, snapshot: &Arc<Snapshot>, query: &ViewQuery) -> Arc<TierView> {
        if let Some((cached_snapshot, cached_query, view)) = &self.view {
            if Arc::ptr_eq(cached_snapshot, snapshot) && cached_query == query {
                return Arc::clone(view);
            }
        }

        let (stats, tier_summary) = match &self.aggregates {
            Some((cached, stats, summary)) if Arc::ptr_eq(cached, snapshot) => {
                (*stats, summary.clone())
            }
            _ => {
                let stats = Stats::from_functions(&snapshot.functions);
                let summary = TierSummary::from_functions(&snapshot.functions);
                self.aggregates = Some((Arc::clone(snapshot), stats, summary.clone()));
                (stats, summary)
            }
        };

        let view = Arc::new(TierView {
            tier_groups: derive_groups(&snapshot.functions, query).into(),
            stats,
            tier_summary,
        });
        self.derivations += 1;
        self.view = Some((Arc::clone(snapshot), query.clone(), Arc::clone(&view)));
        view
    }

    /// Number of cache misses so far.
    pub fn derivations(&self) -> usize {
        self.derivations
    }

    pub fn clear(&mut self) {
        self.aggregates = None;
        self.view = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;

    fn sample() -> Vec<FunctionRecord> {
        vec![
            record("1", "foo", Tier::S, 50),
            record("2", "bar", Tier::S, 10),
            record("3", "baz", Tier::F, 0),
        ]
    }

    fn names(group: &TierGroup) -> Vec<&str> {
        group.functions.iter().map(|f| f.function_name.as_str()).collect()
    }

    fn larger() -> Vec<FunctionRecord> {
        let mut out = Vec::new();
        for (i, tier) in Tier::ALL.iter().cycle().take(30).enumerate() {
            let mut r = record(
                &i.to_string(),
                &format!("fn_{}", (i * 7) % 11),
                *tier,
                ((i * 13) % 9) as u64,
            );
            r.file_path = format!("src/mod_{}.rs", (i * 5) % 4);
            out.push(r);
        }
        out
    }

    #[test]
    fn test_default_view() {
        let view = derive_view(&sample(), &ViewQuery::default());
        assert_eq!(view.tier_groups.len(), 6);
        assert_eq!(names(view.group(Tier::S)), vec!["foo", "bar"]);
        assert_eq!(names(view.group(Tier::F)), vec!["baz"]);
        for tier in [Tier::A, Tier::B, Tier::C, Tier::D] {
            assert!(view.group(tier).functions.is_empty());
        }
        assert_eq!(view.stats.total_functions, 3);
        assert_eq!(view.stats.total_calls, 60);
    }

    #[test]
    fn test_search_keeps_stats() {
        let query = ViewQuery {
            search: "ba".to_string(),
            ..ViewQuery::default()
        };
        let view = derive_view(&sample(), &query);
        assert_eq!(names(view.group(Tier::S)), vec!["bar"]);
        assert_eq!(names(view.group(Tier::F)), vec!["baz"]);
        assert_eq!(view.stats.total_functions, 3);
        assert_eq!(view.stats.total_calls, 60);
    }

    #[test]
    fn test_search_is_case_insensitive_and_trimmed() {
        let query = ViewQuery {
            search: "  FO ".to_string(),
            ..ViewQuery::default()
        };
        let view = derive_view(&sample(), &query);
        assert_eq!(view.visible_count(), 1);
        assert_eq!(names(view.group(Tier::S)), vec!["foo"]);

        let blank = ViewQuery {
            search: "   ".to_string(),
            ..ViewQuery::default()
        };
        assert_eq!(derive_view(&sample(), &blank).visible_count(), 3);
    }

    #[test]
    fn test_search_ignores_file_path() {
        let mut functions = sample();
        functions[0].file_path = "src/needle.ts".to_string();
        let query = ViewQuery {
            search: "needle".to_string(),
            ..ViewQuery::default()
        };
        assert_eq!(derive_view(&functions, &query).visible_count(), 0);
    }

    #[test]
    fn test_tier_filter() {
        let query = ViewQuery {
            tier_filter: Some(Tier::S),
            ..ViewQuery::default()
        };
        let view = derive_view(&sample(), &query);
        assert_eq!(names(view.group(Tier::S)), vec!["foo", "bar"]);
        assert!(view.group(Tier::F).functions.is_empty());
        assert_eq!(view.tier_summary.count(Tier::F), 1);
    }

    #[test]
    fn test_sort_by_name_asc() {
        let query = ViewQuery {
            sort_by: SortKey::Name,
            sort_order: SortOrder::Asc,
            ..ViewQuery::default()
        };
        let view = derive_view(&sample(), &query);
        assert_eq!(names(view.group(Tier::S)), vec!["bar", "foo"]);
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let functions = vec![
            record("1", "beta", Tier::A, 0),
            record("2", "Alpha", Tier::A, 0),
            record("3", "alpha", Tier::A, 0),
        ];
        let query = ViewQuery {
            sort_by: SortKey::Name,
            sort_order: SortOrder::Asc,
            ..ViewQuery::default()
        };
        let view = derive_view(&functions, &query);
        assert_eq!(names(view.group(Tier::A)), vec!["Alpha", "alpha", "beta"]);
    }

    #[test]
    fn test_sort_ties_keep_snapshot_order_in_both_directions() {
        let functions = vec![
            record("1", "first", Tier::B, 5),
            record("2", "second", Tier::B, 5),
            record("3", "third", Tier::B, 9),
        ];
        for order in [SortOrder::Asc, SortOrder::Desc] {
            let query = ViewQuery {
                sort_order: order,
                ..ViewQuery::default()
            };
            let view = derive_view(&functions, &query);
            let group = names(view.group(Tier::B));
            let first = group.iter().position(|n| *n == "first").unwrap();
            let second = group.iter().position(|n| *n == "second").unwrap();
            assert!(first < second, "tie order changed for {:?}", order);
        }
    }

    #[test]
    fn test_sort_by_file_and_tier() {
        let functions = larger();
        let by_file = ViewQuery {
            sort_by: SortKey::File,
            sort_order: SortOrder::Asc,
            ..ViewQuery::default()
        };
        for group in derive_view(&functions, &by_file).tier_groups.iter() {
            for pair in group.functions.windows(2) {
                assert!(pair[0].file_path <= pair[1].file_path);
            }
        }

        // Within a group every record shares a tier, so tier sort keeps snapshot order.
        let by_tier = ViewQuery {
            sort_by: SortKey::Tier,
            ..ViewQuery::default()
        };
        let view = derive_view(&functions, &by_tier);
        let unsorted = derive_groups(
            &functions,
            &ViewQuery {
                sort_by: SortKey::Tier,
                sort_order: SortOrder::Asc,
                ..ViewQuery::default()
            },
        );
        assert_eq!(&view.tier_groups[..], &unsorted[..]);
    }

    #[test]
    fn test_call_count_desc_is_non_increasing() {
        let view = derive_view(&larger(), &ViewQuery::default());
        for group in view.tier_groups.iter() {
            for pair in group.functions.windows(2) {
                assert!(pair[0].internal_call_count >= pair[1].internal_call_count);
            }
        }
    }

    #[test]
    fn test_grouping_is_complete() {
        let functions = larger();
        let view = derive_view(&functions, &ViewQuery::default());
        let mut ids: Vec<&str> = view
            .tier_groups
            .iter()
            .flat_map(|g| g.functions.iter().map(|f| f.id.as_str()))
            .collect();
        let mut expected: Vec<&str> = functions.iter().map(|f| f.id.as_str()).collect();
        ids.sort();
        expected.sort();
        assert_eq!(ids, expected);
        for group in view.tier_groups.iter() {
            assert!(group.functions.iter().all(|f| f.tier == group.tier));
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let functions = larger();
        let query = ViewQuery {
            search: "fn_1".to_string(),
            tier_filter: Some(Tier::C),
            ..ViewQuery::default()
        };
        let once: Vec<FunctionRecord> = filter_functions(&functions, &query)
            .into_iter()
            .cloned()
            .collect();
        let twice: Vec<FunctionRecord> = filter_functions(&once, &query)
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_stats_stable_under_filtering() {
        let functions = larger();
        let base = derive_view(&functions, &ViewQuery::default());
        for tier in Tier::ALL {
            let query = ViewQuery {
                search: "fn_3".to_string(),
                tier_filter: Some(tier),
                ..ViewQuery::default()
            };
            let view = derive_view(&functions, &query);
            assert_eq!(view.stats, base.stats);
            assert_eq!(view.tier_summary, base.tier_summary);
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let view = derive_view(&[], &ViewQuery::default());
        assert_eq!(&view.tier_groups[..], &empty_groups()[..]);
        assert_eq!(view.stats, Stats::default());
        assert_eq!(view.tier_summary.total(), 0);
    }

    #[test]
    fn test_no_match_keeps_summary() {
        let query = ViewQuery {
            search: "zzz".to_string(),
            ..ViewQuery::default()
        };
        let view = derive_view(&sample(), &query);
        assert_eq!(view.visible_count(), 0);
        assert_eq!(view.tier_groups.len(), 6);
        assert_eq!(view.tier_summary.count(Tier::S), 2);
    }

    #[test]
    fn test_cleared_filters_reproduce_default() {
        let functions = larger();
        let cleared = ViewQuery {
            search: String::new(),
            tier_filter: None,
            sort_by: SortKey::CallCount,
            sort_order: SortOrder::Desc,
        };
        assert!(cleared.is_default());
        assert_eq!(
            derive_view(&functions, &cleared),
            derive_view(&functions, &ViewQuery::default())
        );
    }

    #[test]
    fn test_sort_key_and_order_parse() {
        assert_eq!("Name".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("call_count".parse::<SortKey>().unwrap(), SortKey::CallCount);
        assert!("size".parse::<SortKey>().is_err());
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("up".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_cache_hits_and_misses() {
        let snapshot = Arc::new(Snapshot::new("a1", sample()));
        let mut cache = ViewCache::new();
        let query = ViewQuery::default();

        let first = cache.get(&snapshot, &query);
        let second = cache.get(&snapshot, &query);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.derivations(), 1);

        let searched = ViewQuery {
            search: "ba".to_string(),
            ..ViewQuery::default()
        };
        let third = cache.get(&snapshot, &searched);
        assert_eq!(cache.derivations(), 2);
        assert_eq!(third.stats, first.stats);

        // Same contents, new snapshot identity: must re-derive.
        let replaced = Arc::new(Snapshot::new("a1", sample()));
        cache.get(&replaced, &searched);
        assert_eq!(cache.derivations(), 3);

        cache.clear();
        cache.get(&replaced, &searched);
        assert_eq!(cache.derivations(), 4);
    }
}
