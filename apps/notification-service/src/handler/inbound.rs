//! # 受信メール API ハンドラ
//!
//! 受信メールのエンベロープを受け取り、返信のルーティング先を返す。
//!
//! ```text
//! POST /internal/inbound-emails
//! ```
//!
//! ルーティングできない・署名が一致しない返信も `200` で返し、`status` で区別する。
//! 受信ゲートウェイは `status` を見て破棄またはスレッドへの投稿を決める。

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seido_domain::reply_address::{ReplyKind, ThreadType};
use seido_shared::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::{
    error::ServiceError,
    usecase::{InboundRoute, ReplyRouter},
};

/// 受信メールハンドラーの State
pub struct InboundState {
    pub router: ReplyRouter,
}

/// 受信メールのエンベロープ
#[derive(Debug, Deserialize)]
pub struct InboundEmailRequest {
    pub to:      Vec<String>,
    #[serde(default)]
    pub cc:      Vec<String>,
    pub from:    String,
    pub subject: Option<String>,
}

/// ルーティング結果 DTO
#[derive(Debug, Serialize)]
pub struct InboundRouteDto {
    pub status:          &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind:            Option<ReplyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervention_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_type:     Option<ThreadType>,
}

impl From<&InboundRoute> for InboundRouteDto {
    fn from(route: &InboundRoute) -> Self {
        let target = match route {
            InboundRoute::Routed(target) => Some(target),
            InboundRoute::Rejected | InboundRoute::Unroutable => None,
        };

        Self {
            status:          route.status(),
            kind:            target.map(|t| t.kind()),
            intervention_id: target.map(|t| t.intervention_id().to_string()),
            thread_type:     target.and_then(|t| t.thread_type()),
        }
    }
}

/// POST /internal/inbound-emails
pub async fn route_inbound_email(
    State(state): State<Arc<InboundState>>,
    payload: Result<Json<InboundEmailRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Json(req) = payload.map_err(|e| ServiceError::BadRequest(e.body_text()))?;

    tracing::debug!(
        from = %req.from,
        subject = req.subject.as_deref().unwrap_or_default(),
        "受信メールを評価"
    );

    let recipients: Vec<String> = req.to.into_iter().chain(req.cc).collect();
    let route = state.router.route(&recipients);

    let response = ApiResponse::new(InboundRouteDto::from(&route));
    Ok((StatusCode::OK, Json(response)).into_response())
}
