//! Tests for shared risk state across concurrent consumers.

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::json;
use tokio::sync::Barrier;

use warden::application::approval::ApprovalWorkflow;
use warden::application::risk::{BreakerState, RiskLimits, RiskManager, RiskState, ToolCtx, ToolOutcome};
use warden::port::NullNotifier;

fn manager_on(state: Arc<RiskState>) -> RiskManager {
    let workflow = Arc::new(ApprovalWorkflow::new(Arc::new(NullNotifier)));
    RiskManager::new(
        state,
        ["execute_trade".to_string()].into_iter().collect(),
        workflow,
    )
}

fn trade_ctx() -> ToolCtx {
    ToolCtx::from_input("execute_trade", &json!({"token": "SOL", "size": 10}))
}

#[tokio::test]
async fn breaker_tripped_by_one_run_blocks_another() {
    let state = Arc::new(RiskState::new(RiskLimits::default()));
    let loser = manager_on(state.clone());
    let other = manager_on(state.clone());

    let loss = ToolOutcome::from_result(r#"{"pnl": -10.0}"#);
    for _ in 0..3 {
        loser.post_tool_use(&trade_ctx(), &loss);
    }

    // A different manager sharing the state sees the tripped breaker.
    let result = other.pre_tool_use(&trade_ctx());
    assert!(!result.is_allowed());
    assert!(result.reason.unwrap().contains("consecutive losses"));
}

#[tokio::test]
async fn win_resets_streak_and_clears_trip() {
    let state = Arc::new(RiskState::new(RiskLimits::default()));
    let manager = manager_on(state.clone());

    let loss = ToolOutcome::from_result(r#"{"pnl": -10.0}"#);
    for _ in 0..3 {
        manager.post_tool_use(&trade_ctx(), &loss);
    }
    assert!(!manager.pre_tool_use(&trade_ctx()).is_allowed());

    let win = ToolOutcome::from_result(r#"{"pnl": 5.0}"#);
    manager.post_tool_use(&trade_ctx(), &win);

    assert!(manager.pre_tool_use(&trade_ctx()).is_allowed());
    assert_eq!(state.consecutive_losses(), 0);
}

#[tokio::test]
async fn expired_cooldown_resets_breaker_on_read() {
    let state = Arc::new(RiskState::new(RiskLimits {
        breaker_cooldown_minutes: 0,
        ..Default::default()
    }));
    let manager = manager_on(state.clone());

    for _ in 0..3 {
        state.record_loss_trade(dec!(1));
    }

    // The zero-minute cooldown has already elapsed; the next check resets.
    let result = manager.pre_tool_use(&trade_ctx());
    assert!(result.is_allowed());
    assert_eq!(
        state.breaker_snapshot(chrono::Utc::now()).state,
        BreakerState::Normal
    );
}

#[tokio::test]
async fn concurrent_losses_count_exactly() {
    let state = Arc::new(RiskState::new(RiskLimits {
        breaker_threshold: 100,
        ..Default::default()
    }));

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            for _ in 0..10 {
                state.record_loss_trade(dec!(2));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(state.consecutive_losses(), 80);
    assert_eq!(state.daily_loss(), dec!(160));
}

#[tokio::test]
async fn daily_reset_reopens_trading() {
    let state = Arc::new(RiskState::new(RiskLimits {
        daily_loss_limit: dec!(50),
        breaker_enabled: false,
        ..Default::default()
    }));
    let manager = manager_on(state.clone());

    state.add_daily_loss(dec!(50));
    assert!(!manager.pre_tool_use(&trade_ctx()).is_allowed());

    state.reset_daily_loss();
    assert!(manager.pre_tool_use(&trade_ctx()).is_allowed());
}
