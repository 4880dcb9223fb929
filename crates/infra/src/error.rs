//! # インフラ層エラー
//!
//! Supabase（PostgREST / Auth）への HTTP 呼び出しで起きる失敗を表す。
//!
//! [`InfraError`] は種別と、生成時点の [`SpanTrace`] を持つ。ハンドラで 502 に変換して
//! ログに出すとき、どのユースケースのどのリポジトリ呼び出しで失敗したかが残る。
//!
//! メール送信の失敗はこの型ではなく `NotificationError` で表す。
//! リトライ判定（レート制限かどうか）をドメイン層で行うため。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// 接続失敗、タイムアウト、ボディの読み取り失敗
    #[error("HTTP エラー: {0}")]
    Http(#[source] reqwest::Error),

    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    /// 2xx 以外の応答
    #[error("外部サービスエラー: {service}（status={status}）: {message}")]
    ExternalService {
        /// "supabase-auth" / "supabase-rest"
        service: &'static str,
        status:  u16,
        message: String,
    },

    /// 呼び出し前に検出した不正な入力
    #[error("入力エラー: {0}")]
    InvalidInput(String),

    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    fn with_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 上流が返した HTTP ステータス（応答を受け取れた場合のみ）
    pub fn upstream_status(&self) -> Option<u16> {
        match &self.kind {
            InfraErrorKind::ExternalService { status, .. } => Some(*status),
            InfraErrorKind::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn external_service(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::ExternalService {
            service,
            status,
            message: message.into(),
        })
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::InvalidInput(msg.into()))
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Unexpected(msg.into()))
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(source: reqwest::Error) -> Self {
        Self::with_kind(InfraErrorKind::Http(source))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::with_kind(InfraErrorKind::Serialization(source))
    }
}
