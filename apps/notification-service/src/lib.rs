//! # SEIDO 通知サービス
//!
//! インターベンションのイベント通知と受信返信のルーティングを提供する内部 API。
//!
//! ## エンドポイント
//!
//! - `GET /health`
//! - `POST /internal/interventions/{id}/notifications`
//! - `POST /internal/inbound-emails`

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use handler::{
    InboundState,
    NotificationState,
    health_check,
    notify_intervention,
    route_inbound_email,
};

/// 全エンドポイントのルーターを組み立てる
pub fn router(notification: Arc<NotificationState>, inbound: Arc<InboundState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/internal/interventions/{id}/notifications",
            post(notify_intervention),
        )
        .with_state(notification)
        .route("/internal/inbound-emails", post(route_inbound_email))
        .with_state(inbound)
}
