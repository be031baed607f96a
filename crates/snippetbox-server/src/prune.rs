use std::sync::Arc;
use std::time::Duration;

use snippetbox_db::SessionStore;
use tracing::{info, warn};

/// Background task that deletes expired sessions every `interval_secs`.
pub async fn run_prune_loop(store: Arc<dyn SessionStore>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let store = store.clone();
        match tokio::task::spawn_blocking(move || store.delete_expired()).await {
            Ok(Ok(0)) => {}
            Ok(Ok(count)) => info!("Pruned {} expired sessions", count),
            Ok(Err(e)) => warn!("Session prune error: {}", e),
            Err(e) => warn!("Session prune task failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snippetbox_db::memory::MemorySessionStore;

    #[tokio::test]
    async fn prunes_on_each_tick() {
        let store = Arc::new(MemorySessionStore::new());
        let past = chrono::Utc::now() - chrono::Duration::seconds(1);
        store.commit("stale", b"{}", past).unwrap();
        assert_eq!(store.len(), 1);

        let task = tokio::spawn(run_prune_loop(store.clone(), 60));
        tokio::time::sleep(Duration::from_millis(200)).await;
        task.abort();

        assert!(store.is_empty());
    }
}
