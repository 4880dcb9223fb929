//! Resend 通知送信実装
//!
//! Resend の HTTP API（`POST /emails`）を使用してメールを送信する。
//! 本番環境で使用する。Resend はアカウント全体で毎秒のリクエスト数を制限しており、
//! 超過すると 429 を返す。

use async_trait::async_trait;
use seido_domain::notification::{
    BuiltEmail,
    EmailTag,
    NotificationError,
    SentMessage,
    classify_provider_error,
};
use serde::{Deserialize, Serialize};

use super::NotificationSender;

/// Resend API のデフォルトのベース URL
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

/// 送信リクエスト
#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from:     &'a str,
    to:       [&'a str; 1],
    subject:  &'a str,
    html:     &'a str,
    text:     &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tags:     &'a [EmailTag],
}

/// 送信レスポンス
#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Resend 通知送信
pub struct ResendNotificationSender {
    client:       reqwest::Client,
    api_url:      String,
    api_key:      String,
    from_address: String,
}

impl ResendNotificationSender {
    /// 新しい Resend 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `api_url`: API のベース URL（通常は [`DEFAULT_RESEND_API_URL`]）
    /// - `api_key`: API キー（空文字列の場合は未設定扱い）
    /// - `from_address`: 送信元（例: `SEIDO <notifications@seido.example.com>`）
    pub fn new(api_url: &str, api_key: String, from_address: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            from_address,
        }
    }
}

#[async_trait]
impl NotificationSender for ResendNotificationSender {
    async fn send_email(&self, email: &BuiltEmail) -> Result<SentMessage, NotificationError> {
        let request = SendEmailRequest {
            from:     &self.from_address,
            to:       [&email.to],
            subject:  &email.subject,
            html:     &email.html_body,
            text:     &email.text_body,
            reply_to: email.reply_to.as_deref(),
            tags:     &email.tags,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::Transient(format!("Resend 通信失敗: {e}")))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .json::<SendEmailResponse>()
                .await
                .map_err(|e| NotificationError::Transient(format!("Resend 応答の解析失敗: {e}")))?;
            return Ok(SentMessage {
                message_id: body.id,
            });
        }

        let body = response.text().await.unwrap_or_default();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NotificationError::RateLimited(format!(
                "Resend 送信失敗 {status}: {body}"
            )));
        }

        Err(classify_provider_error(format!(
            "Resend 送信失敗 {status}: {body}"
        )))
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
