use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;

const CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that rewrites the WAL once enough appends pile up.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(CHECK_INTERVAL);
    loop {
        interval.tick().await;
        compact_if_needed(&engine, threshold).await;
    }
}

/// One compactor pass. Returns whether a compaction ran.
pub async fn compact_if_needed(engine: &Engine, threshold: u64) -> bool {
    let appends = engine.wal_appends_since_compact().await;
    if appends < threshold {
        debug!("compactor: {appends} appends, below threshold {threshold}");
        return false;
    }
    match engine.compact_wal().await {
        Ok(()) => {
            info!("compacted WAL after {appends} appends");
            true
        }
        Err(e) => {
            warn!("WAL compaction failed: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use super::*;
    use crate::model::*;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("courtside_test_compactor");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn candidate(slot: &str) -> Candidate {
        Candidate {
            date: "2025-07-01".parse().unwrap(),
            granularity: Granularity::SingleUnit,
            slots: BTreeSet::from([slot.parse().unwrap()]),
            requester: Requester::default(),
        }
    }

    #[tokio::test]
    async fn compacts_only_past_threshold() {
        let path = test_wal_path("threshold.wal");
        let engine = Engine::new(path.clone()).unwrap();

        let r = engine.submit(candidate("10:00")).await.unwrap();
        engine.approve(r.id, None).await.unwrap();
        engine.submit(candidate("11:00")).await.unwrap();
        assert_eq!(engine.wal_appends_since_compact().await, 3);

        assert!(!compact_if_needed(&engine, 10).await);
        assert!(compact_if_needed(&engine, 3).await);
        assert_eq!(engine.wal_appends_since_compact().await, 0);

        // Compacted log still rebuilds the same state.
        drop(engine);
        let reopened = Engine::new(path).unwrap();
        assert_eq!(reopened.reservation_count(), 2);
        assert_eq!(
            reopened.get_by_id(&r.id).await.map(|r| r.status),
            Some(Status::Approved)
        );
    }
}
