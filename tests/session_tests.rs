//! Session workflow tests against the real file store.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal_macros::dec;

use warden::adapter::FileStore;
use warden::application::session::SessionManager;
use warden::domain::{Direction, ExecutedTrade, PendingTrade, Position, WorkflowStage};
use warden::port::SessionStore;

fn pending(plan_id: &str) -> PendingTrade {
    PendingTrade {
        plan_id: plan_id.to_string(),
        token: "SOL".to_string(),
        direction: Direction::Long,
        risk_percent: dec!(5),
        queued_at: Utc::now(),
    }
}

#[tokio::test]
async fn full_workflow_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let session_id;

    // First "process": walk a session through the pipeline.
    {
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let mut manager = SessionManager::start(store).await.unwrap();
        session_id = manager.session_id().to_string();

        manager.add_insight("SOL volume doubled overnight").await.unwrap();
        manager
            .transition_stage(WorkflowStage::StrategyBuild, "insight found", "agent")
            .await
            .unwrap();
        manager
            .transition_stage(WorkflowStage::Execution, "strategy validated", "agent")
            .await
            .unwrap();
        manager.add_pending_trade(pending("p1")).await.unwrap();
        manager
            .update_positions(vec![Position {
                token: "ETH".to_string(),
                direction: Direction::Long,
                size: dec!(100),
                entry_price: dec!(2000),
                opened_at: Utc::now(),
            }])
            .await
            .unwrap();
    }

    // Second "process": everything is still there.
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let manager = SessionManager::load(store, &session_id).await.unwrap();

    assert_eq!(manager.current_stage(), WorkflowStage::Execution);
    assert_eq!(manager.state().stage_history.len(), 2);
    assert_eq!(manager.state().pending_trades.len(), 1);
    assert_eq!(manager.state().current_positions.len(), 1);
    assert_eq!(manager.state().discovery_insights.len(), 1);

    let ctx = manager.context_for_stage(WorkflowStage::Execution);
    assert_eq!(ctx.pending_trades.len(), 1);
    assert_eq!(ctx.positions.len(), 1);
}

#[tokio::test]
async fn stage_regression_records_who_triggered_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let mut manager = SessionManager::start(store.clone()).await.unwrap();

    manager
        .transition_stage(WorkflowStage::Backtest, "strategy drafted", "agent")
        .await
        .unwrap();
    manager
        .transition_stage(WorkflowStage::StrategyBuild, "backtest failed", "user")
        .await
        .unwrap();

    let loaded = store.load(manager.session_id()).await.unwrap().unwrap();
    assert_eq!(loaded.current_stage, WorkflowStage::StrategyBuild);
    let last = loaded.stage_history.last().unwrap();
    assert_eq!(last.from, WorkflowStage::Backtest);
    assert_eq!(last.to, WorkflowStage::StrategyBuild);
    assert_eq!(last.triggered_by, "user");
}

#[tokio::test]
async fn executed_trade_moves_out_of_pending() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let mut manager = SessionManager::start(store.clone()).await.unwrap();

    manager.add_pending_trade(pending("p1")).await.unwrap();
    manager
        .record_executed_trade(ExecutedTrade {
            plan_id: "p1".to_string(),
            token: "SOL".to_string(),
            direction: Direction::Long,
            risk_percent: dec!(5),
            executed_at: Utc::now(),
            pnl: Some(dec!(12)),
        })
        .await
        .unwrap();

    let loaded = store.load(manager.session_id()).await.unwrap().unwrap();
    assert!(loaded.pending_trades.is_empty());
    assert_eq!(loaded.executed_trades.len(), 1);
    assert_eq!(loaded.executed_trades[0].pnl, Some(dec!(12)));
}

#[tokio::test]
async fn sessions_are_listed_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());

    let a = SessionManager::start(store.clone()).await.unwrap();
    let b = SessionManager::start(store.clone()).await.unwrap();

    let ids = store.list().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.session_id().to_string()));

    assert!(store.delete(b.session_id()).await.unwrap());
    assert_eq!(store.list().await.unwrap().len(), 1);
}
