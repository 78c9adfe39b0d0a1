//! Concurrent selection against a source whose fetches are released by hand.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tierlist::{FetchError, FunctionRecord, FunctionSource, FunctionType, LoadOutcome, Tier, TierList};
use tokio::sync::{mpsc, Mutex, Notify};

fn record(id: &str, name: &str, tier: Tier, calls: u64) -> FunctionRecord {
    FunctionRecord {
        id: id.to_string(),
        function_name: name.to_string(),
        file_path: format!("lib/{}.js", name),
        file_name: format!("{}.js", name),
        start_line: 1,
        function_type: FunctionType::ArrowFunction,
        tier,
        internal_call_count: calls,
        is_async: false,
        is_exported: false,
        is_entry_point: false,
    }
}

/// Each fetch reports that it started, then waits for its gate to open.
struct GatedSource {
    gates: HashMap<String, Arc<Notify>>,
    results: Mutex<HashMap<String, Result<Vec<FunctionRecord>, FetchError>>>,
    started: mpsc::UnboundedSender<String>,
}

impl GatedSource {
    fn new(
        results: Vec<(&str, Result<Vec<FunctionRecord>, FetchError>)>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gates = results
            .iter()
            .map(|(id, _)| (id.to_string(), Arc::new(Notify::new())))
            .collect();
        let results = results
            .into_iter()
            .map(|(id, r)| (id.to_string(), r))
            .collect();
        (
            Self {
                gates,
                results: Mutex::new(results),
                started: tx,
            },
            rx,
        )
    }

    fn release(&self, analysis_id: &str) {
        self.gates[analysis_id].notify_one();
    }
}

#[async_trait]
impl FunctionSource for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    async fn fetch_functions(&self, analysis_id: &str) -> Result<Vec<FunctionRecord>, FetchError> {
        let _ = self.started.send(analysis_id.to_string());
        let gate = self
            .gates
            .get(analysis_id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(analysis_id.to_string()))?;
        gate.notified().await;
        self.results
            .lock()
            .await
            .get(analysis_id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound(analysis_id.to_string())))
    }
}

#[tokio::test]
async fn test_late_response_for_previous_analysis_is_discarded() {
    let (source, mut started) = GatedSource::new(vec![
        ("A1", Ok(vec![record("1", "stale", Tier::S, 99)])),
        ("A2", Ok(vec![record("2", "fresh", Tier::B, 7)])),
    ]);
    let source = Arc::new(source);
    let list = Arc::new(TierList::new(source.clone()));

    let first = tokio::spawn({
        let list = list.clone();
        async move { list.set_analysis_id(Some("A1".to_string())).await }
    });
    assert_eq!(started.recv().await.unwrap(), "A1");

    let second = tokio::spawn({
        let list = list.clone();
        async move { list.set_analysis_id(Some("A2".to_string())).await }
    });
    assert_eq!(started.recv().await.unwrap(), "A2");
    assert!(list.state().is_loading);

    source.release("A2");
    assert_eq!(second.await.unwrap(), LoadOutcome::Applied);

    source.release("A1");
    assert_eq!(first.await.unwrap(), LoadOutcome::Superseded);

    let state = list.state();
    assert_eq!(state.analysis_id.as_deref(), Some("A2"));
    assert!(!state.is_loading);
    assert_eq!(state.stats.unwrap().total_functions, 1);
    assert_eq!(state.group(Tier::B).functions[0].function_name, "fresh");
    assert!(state.group(Tier::S).functions.is_empty());
}

#[tokio::test]
async fn test_late_failure_for_previous_analysis_is_discarded() {
    let (source, mut started) = GatedSource::new(vec![
        ("A1", Err(FetchError::Transport("connection reset".to_string()))),
        ("A2", Ok(vec![record("2", "fresh", Tier::B, 7)])),
    ]);
    let source = Arc::new(source);
    let list = Arc::new(TierList::new(source.clone()));

    let first = tokio::spawn({
        let list = list.clone();
        async move { list.set_analysis_id(Some("A1".to_string())).await }
    });
    started.recv().await.unwrap();
    let second = tokio::spawn({
        let list = list.clone();
        async move { list.set_analysis_id(Some("A2".to_string())).await }
    });
    started.recv().await.unwrap();

    source.release("A2");
    second.await.unwrap();
    source.release("A1");
    assert_eq!(first.await.unwrap(), LoadOutcome::Superseded);

    let state = list.state();
    assert!(state.error.is_none());
    assert_eq!(state.visible_count(), 1);
}

#[tokio::test]
async fn test_clearing_selection_while_loading() {
    let (source, mut started) =
        GatedSource::new(vec![("A1", Ok(vec![record("1", "main", Tier::S, 3)]))]);
    let source = Arc::new(source);
    let list = Arc::new(TierList::new(source.clone()));

    let pending = tokio::spawn({
        let list = list.clone();
        async move { list.set_analysis_id(Some("A1".to_string())).await }
    });
    started.recv().await.unwrap();

    assert_eq!(list.set_analysis_id(None).await, LoadOutcome::Skipped);
    let state = list.state();
    assert!(state.analysis_id.is_none());
    assert!(!state.is_loading);

    source.release("A1");
    assert_eq!(pending.await.unwrap(), LoadOutcome::Superseded);

    let state = list.state();
    assert_eq!(state.tier_groups.len(), 6);
    assert!(state.tier_groups.iter().all(|g| g.functions.is_empty()));
    assert!(state.stats.is_none());
    assert!(state.tier_summary.is_none());
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_refresh_keeps_rows_visible_until_result() {
    let (source, mut started) =
        GatedSource::new(vec![("A1", Ok(vec![record("1", "main", Tier::S, 3)]))]);
    let source = Arc::new(source);
    let list = Arc::new(TierList::new(source.clone()));

    source.release("A1");
    assert_eq!(
        list.set_analysis_id(Some("A1".to_string())).await,
        LoadOutcome::Applied
    );
    started.recv().await.unwrap();
    list.set_search_query("mai");

    let refresh = tokio::spawn({
        let list = list.clone();
        async move { list.refresh().await }
    });
    started.recv().await.unwrap();

    let state = list.state();
    assert!(state.is_loading);
    assert_eq!(state.visible_count(), 1);
    assert_eq!(list.query().search, "mai");

    source.release("A1");
    assert_eq!(refresh.await.unwrap(), LoadOutcome::Applied);
    assert!(!list.state().is_loading);
    assert_eq!(list.query().search, "mai");
}
