//! # 通知 API ハンドラ
//!
//! インターベンションのイベントを関係者にメールで通知する。
//!
//! ```text
//! POST /internal/interventions/{id}/notifications
//! ```
//!
//! 送信の失敗はエラーレスポンスにせず、`200` と受信者ごとの結果で返す。

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path,
        State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seido_domain::{
    intervention::InterventionId,
    notification::{NotificationEventType, RecipientFilter},
    reply_address::ThreadType,
    user::{UserId, UserRole},
};
use seido_shared::ApiResponse;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{
    error::ServiceError,
    usecase::{InterventionEvent, NotificationService},
};

/// 通知ハンドラーの State
pub struct NotificationState {
    pub service: NotificationService,
    /// シャットダウン時にキャンセルされるトークン
    pub cancel:  CancellationToken,
}

/// 通知リクエスト
#[derive(Debug, Deserialize)]
pub struct NotifyInterventionRequest {
    pub event:                NotificationEventType,
    pub exclude_user_id:      Option<UserId>,
    #[serde(default)]
    pub exclude_roles:        Vec<UserRole>,
    #[serde(default)]
    pub only_roles:           Vec<UserRole>,
    #[serde(default)]
    pub exclude_non_personal: bool,
    pub message:              Option<String>,
    /// 会話メッセージの宛先スレッド（省略時は全体スレッド）
    pub thread_type:          Option<ThreadType>,
}

impl NotifyInterventionRequest {
    fn into_parts(self) -> (InterventionEvent, RecipientFilter) {
        let event = InterventionEvent {
            event_type:  self.event,
            message:     self.message,
            thread_type: self.thread_type,
        };
        let filter = RecipientFilter {
            exclude_user_id:      self.exclude_user_id,
            exclude_roles:        self.exclude_roles,
            only_roles:           self.only_roles,
            exclude_non_personal: self.exclude_non_personal,
        };
        (event, filter)
    }
}

/// POST /internal/interventions/{id}/notifications
pub async fn notify_intervention(
    State(state): State<Arc<NotificationState>>,
    path: Result<Path<InterventionId>, PathRejection>,
    payload: Result<Json<NotifyInterventionRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let Path(id) = path.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    let Json(req) = payload.map_err(|e| ServiceError::BadRequest(e.body_text()))?;

    let (event, filter) = req.into_parts();
    let batch = state
        .service
        .notify_intervention_event(&id, event, &filter, &state.cancel.child_token())
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(batch))).into_response())
}
