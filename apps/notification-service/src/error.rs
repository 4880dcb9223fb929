//! # 通知サービスのエラー定義
//!
//! ハンドラが返すエラーと、RFC 7807 Problem Details レスポンスへの変換を定義する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seido_domain::intervention::InterventionId;
use seido_infra::InfraError;
use seido_shared::ErrorResponse;
use thiserror::Error;

use crate::usecase::notification::NotificationServiceError;

/// 通知サービスで発生するエラー
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("インターベンションが見つかりません: {0}")]
    InterventionNotFound(InterventionId),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 上流サービス（データベース API など）の失敗
    #[error("上流サービスエラー: {0}")]
    Upstream(#[from] InfraError),
}

impl From<NotificationServiceError> for ServiceError {
    fn from(err: NotificationServiceError) -> Self {
        match err {
            NotificationServiceError::InterventionNotFound(id) => Self::InterventionNotFound(id),
            NotificationServiceError::Repository(e) => Self::Upstream(e),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            ServiceError::InterventionNotFound(id) => ErrorResponse::not_found(self.to_string())
                .with_instance(format!("/interventions/{id}")),
            ServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            ServiceError::Upstream(e) => {
                tracing::error!(
                    error = %e,
                    upstream_status = e.upstream_status(),
                    span_trace = %e.span_trace(),
                    "上流サービスエラー"
                );
                ErrorResponse::bad_gateway()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(body)).into_response()
    }
}
