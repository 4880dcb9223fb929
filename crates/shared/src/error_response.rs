//! # Problem Details レスポンス
//!
//! 内部 API が返すエラー本文（RFC 9457）。`type` は
//! `https://seido.example.com/errors/{code}` の形で、呼び出し側は `code` で分岐する。
//!
//! axum への変換はサービス側で行い、このクレートは axum に依存しない。

use serde::{Deserialize, Serialize};

const ERROR_TYPE_BASE: &str = "https://seido.example.com/errors";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
    /// 問題の対象となったリソース（例: `/interventions/{id}`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance:   Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, title: &str, status: u16, detail: impl Into<String>) -> Self {
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{code}"),
            title: title.to_string(),
            status,
            detail: detail.into(),
            instance: None,
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// リクエスト本文を解釈できない（400）
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new("bad-request", "Bad Request", 400, detail)
    }

    /// 対象が存在しない（404）
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new("not-found", "Not Found", 404, detail)
    }

    /// データベース API など上流の呼び出しに失敗した（502）
    ///
    /// 上流のエラー内容は本文に含めない。
    pub fn bad_gateway() -> Self {
        Self::new(
            "bad-gateway",
            "Bad Gateway",
            502,
            "上流サービスの呼び出しに失敗しました",
        )
    }

    /// `type` から末尾のコードを取り出す
    pub fn code(&self) -> &str {
        self.error_type
            .rsplit_once('/')
            .map_or(self.error_type.as_str(), |(_, code)| code)
    }
}
