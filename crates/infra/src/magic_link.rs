//! # マジックリンク発行
//!
//! 受信者がパスワード入力なしでポータルにログインできる、
//! 一度きりのログインリンクを発行する。
//!
//! 発行元は Supabase Auth の Admin API（`POST /auth/v1/admin/generate_link`）。
//! 並行実行とチャンク分割はユースケース層が行い、この層は 1 件ずつ発行するだけ。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::InfraError,
    supabase::{AUTH_SERVICE, SupabaseClient, handle_response},
};

/// マジックリンク発行トレイト
#[async_trait]
pub trait MagicLinkIssuer: Send + Sync {
    /// 1 件のマジックリンクを発行する
    ///
    /// # 引数
    ///
    /// - `email`: ログインさせるユーザーのメールアドレス
    /// - `redirect_to`: ログイン後に遷移する URL
    async fn generate_link(&self, email: &str, redirect_to: &str) -> Result<String, InfraError>;
}

#[derive(Debug, Serialize)]
struct GenerateLinkRequest<'a> {
    #[serde(rename = "type")]
    link_type: &'static str,
    email:     &'a str,
    options:   GenerateLinkOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateLinkOptions<'a> {
    redirect_to: &'a str,
}

/// `action_link` はトップレベルか `properties` の下に入る（Auth のバージョンによる）
#[derive(Debug, Deserialize)]
struct GenerateLinkResponse {
    action_link: Option<String>,
    properties:  Option<GenerateLinkProperties>,
}

#[derive(Debug, Deserialize)]
struct GenerateLinkProperties {
    action_link: Option<String>,
}

impl GenerateLinkResponse {
    fn into_action_link(self) -> Option<String> {
        self.action_link
            .or_else(|| self.properties.and_then(|p| p.action_link))
            .filter(|link| !link.is_empty())
    }
}

/// Supabase Auth によるマジックリンク発行
pub struct SupabaseMagicLinkIssuer {
    client: SupabaseClient,
}

impl SupabaseMagicLinkIssuer {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MagicLinkIssuer for SupabaseMagicLinkIssuer {
    async fn generate_link(&self, email: &str, redirect_to: &str) -> Result<String, InfraError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(InfraError::invalid_input(format!(
                "メールアドレスが不正です: {email:?}"
            )));
        }

        let request = GenerateLinkRequest {
            link_type: "magiclink",
            email,
            options: GenerateLinkOptions { redirect_to },
        };

        let response = self
            .client
            .request(reqwest::Method::POST, "/auth/v1/admin/generate_link")
            .json(&request)
            .send()
            .await?;

        let body: GenerateLinkResponse = handle_response(AUTH_SERVICE, response).await?;

        body.into_action_link()
            .ok_or_else(|| InfraError::unexpected("action_link がレスポンスに含まれていません"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{
        Mock,
        MockServer,
        ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    use super::*;
    use crate::{InfraErrorKind, supabase::SupabaseConfig};

    fn make_issuer(server: &MockServer) -> SupabaseMagicLinkIssuer {
        SupabaseMagicLinkIssuer::new(SupabaseClient::new(&SupabaseConfig {
            url:              server.uri(),
            service_role_key: "service-key".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_トップレベルのaction_linkを返す() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/admin/generate_link"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(body_json(json!({
                "type": "magiclink",
                "email": "tenant@example.com",
                "options": {"redirect_to": "https://app.example.com/locataire/interventions/1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "action_link": "https://auth.example.com/verify?token=abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let link = make_issuer(&server)
            .generate_link(
                "tenant@example.com",
                "https://app.example.com/locataire/interventions/1",
            )
            .await
            .unwrap();

        assert_eq!(link, "https://auth.example.com/verify?token=abc");
    }

    #[tokio::test]
    async fn test_propertiesの下のaction_linkも読める() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/admin/generate_link"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "properties": {"action_link": "https://auth.example.com/verify?token=xyz"}
            })))
            .mount(&server)
            .await;

        let link = make_issuer(&server)
            .generate_link("tenant@example.com", "https://app.example.com/")
            .await
            .unwrap();

        assert_eq!(link, "https://auth.example.com/verify?token=xyz");
    }

    #[tokio::test]
    async fn test_エラーステータスは外部サービスエラーになる() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/admin/generate_link"))
            .respond_with(ResponseTemplate::new(422).set_body_string("User not found"))
            .mount(&server)
            .await;

        let err = make_issuer(&server)
            .generate_link("ghost@example.com", "https://app.example.com/")
            .await
            .unwrap_err();

        assert!(matches!(
            err.kind(),
            InfraErrorKind::ExternalService { status: 422, .. }
        ));
    }

    #[tokio::test]
    async fn test_空のメールアドレスはリクエストせずにエラー() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = make_issuer(&server)
            .generate_link("  ", "https://app.example.com/")
            .await
            .unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::InvalidInput(_)));
    }
}
