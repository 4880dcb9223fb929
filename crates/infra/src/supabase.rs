//! # Supabase クライアント
//!
//! マジックリンク発行（Auth Admin API）とリポジトリ（PostgREST）が共有する
//! HTTP クライアント。どちらも service role キーで認証する。

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::InfraError;

/// 外部サービス名（エラーとログに使う）
pub(crate) const AUTH_SERVICE: &str = "supabase-auth";
pub(crate) const REST_SERVICE: &str = "supabase-rest";

/// Supabase 接続設定
#[derive(Clone)]
pub struct SupabaseConfig {
    /// プロジェクト URL（例: `https://xyz.supabase.co`）
    pub url:              String,
    pub service_role_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_role_key", &"[REDACTED]")
            .finish()
    }
}

/// Supabase HTTP クライアント
///
/// 内部の `reqwest::Client` はコネクションプールを共有するため、
/// clone して各アダプターに渡してよい。
#[derive(Clone)]
pub struct SupabaseClient {
    client:           reqwest::Client,
    base_url:         String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            client:           reqwest::Client::new(),
            base_url:         config.url.trim_end_matches('/').to_string(),
            service_role_key: config.service_role_key.clone(),
        }
    }

    /// service role キーの認証ヘッダー付きでリクエストを組み立てる
    pub(crate) fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }
}

/// Supabase レスポンスの共通ハンドリング
///
/// 成功時はボディを `T` にデシリアライズし、
/// それ以外のステータスは [`InfraError::external_service`] にする。
pub(crate) async fn handle_response<T: DeserializeOwned>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, InfraError> {
    let status = response.status();

    if status.is_success() {
        let body = response.bytes().await?;
        return Ok(serde_json::from_slice(&body)?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(InfraError::external_service(service, status.as_u16(), body))
}
