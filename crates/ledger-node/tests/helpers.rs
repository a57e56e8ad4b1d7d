use ledger_node::{config::NodeConfig, RunningNode};
use std::time::Duration;

pub async fn spawn_node() -> anyhow::Result<RunningNode> {
    ledger_node::spawn(&NodeConfig::ephemeral()).await
}

/// Poll `cond` until it holds or roughly five seconds pass.
pub async fn eventually<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}
