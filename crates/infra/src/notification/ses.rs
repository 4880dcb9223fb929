//! SES 通知送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    error::{DisplayErrorContext, SdkError},
    operation::send_email::SendEmailError,
    types::{Body, Content, Destination, EmailContent, Message, MessageTag},
};
use seido_domain::notification::{
    BuiltEmail,
    NotificationError,
    SentMessage,
    classify_provider_error,
};

use super::NotificationSender;

/// SES 通知送信
///
/// `aws_sdk_sesv2::Client` をラップする。
pub struct SesNotificationSender {
    client:       Client,
    from_address: String,
}

impl SesNotificationSender {
    /// 新しい SES 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `client`: AWS SES v2 クライアント
    /// - `from_address`: 送信元メールアドレス（SES で検証済みであること）
    pub fn new(client: Client, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }
}

fn content(data: &str, part: &str) -> Result<Content, NotificationError> {
    Content::builder()
        .data(data)
        .build()
        .map_err(|e| NotificationError::Rejected(format!("{part}構築失敗: {e}")))
}

/// SDK のエラーを送信エラーに変換する
///
/// 通信失敗は一時的、スロットリング系の例外はレート制限として扱う。
fn map_sdk_error<R>(error: SdkError<SendEmailError, R>) -> NotificationError
where
    R: std::fmt::Debug,
{
    match &error {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            return NotificationError::Transient(format!(
                "SES 通信失敗: {}",
                DisplayErrorContext(&error)
            ));
        }
        SdkError::ServiceError(service)
            if service.err().is_too_many_requests_exception()
                || service.err().is_limit_exceeded_exception() =>
        {
            return NotificationError::RateLimited(format!(
                "SES 送信失敗: {}",
                DisplayErrorContext(&error)
            ));
        }
        _ => {}
    }

    classify_provider_error(format!("SES 送信失敗: {}", DisplayErrorContext(&error)))
}

#[async_trait]
impl NotificationSender for SesNotificationSender {
    async fn send_email(&self, email: &BuiltEmail) -> Result<SentMessage, NotificationError> {
        let destination = Destination::builder().to_addresses(&email.to).build();

        let body = Body::builder()
            .html(content(&email.html_body, "HTML 本文")?)
            .text(content(&email.text_body, "テキスト本文")?)
            .build();

        let message = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(content(&email.subject, "件名")?)
                    .body(body)
                    .build(),
            )
            .build();

        let mut request = self
            .client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(destination)
            .content(message);

        if let Some(reply_to) = &email.reply_to {
            request = request.reply_to_addresses(reply_to);
        }

        for tag in &email.tags {
            let tag = MessageTag::builder()
                .name(&tag.name)
                .value(&tag.value)
                .build()
                .map_err(|e| NotificationError::Rejected(format!("タグ構築失敗: {e}")))?;
            request = request.email_tags(tag);
        }

        let output = request.send().await.map_err(map_sdk_error)?;

        Ok(SentMessage {
            message_id: output.message_id().map(str::to_string),
        })
    }
}
