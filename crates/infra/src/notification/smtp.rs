//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に接続する。

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::Error as SmtpError,
};
use seido_domain::notification::{
    BuiltEmail,
    NotificationError,
    SentMessage,
    classify_provider_error,
};

use super::NotificationSender;

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// SMTP はメッセージ ID を払い出さないため、送信結果の ID は常に None。
pub struct SmtpNotificationSender {
    transport:    AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `host`: SMTP サーバーのホスト名（例: "localhost"）
    /// - `port`: SMTP サーバーのポート番号（例: 1025 for Mailpit）
    /// - `from_address`: 送信元（表示名付きも可）
    pub fn new(host: &str, port: u16, from_address: String) -> Self {
        // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Self {
            transport,
            from_address,
        }
    }

    fn build_message(&self, email: &BuiltEmail) -> Result<Message, NotificationError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from_address, "送信元")?)
            .to(parse_mailbox(&email.to, "宛先")?)
            .subject(&email.subject);

        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to, "返信先")?);
        }

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::Rejected(format!("メッセージ構築失敗: {e}")))
    }
}

fn parse_mailbox(address: &str, label: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|e| NotificationError::Rejected(format!("{label}アドレス不正: {e}")))
}

/// SMTP の応答を送信エラーに変換する
///
/// 4xx の一時的な応答はレート制限の可能性があるため文字列でも判定する。
fn map_smtp_error(error: SmtpError) -> NotificationError {
    let message = format!("SMTP 送信失敗: {error}");
    if error.is_transient() {
        return match classify_provider_error(message) {
            NotificationError::Rejected(message) => NotificationError::Transient(message),
            rate_limited => rate_limited,
        };
    }
    if error.is_permanent() {
        return classify_provider_error(message);
    }
    NotificationError::Transient(message)
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &BuiltEmail) -> Result<SentMessage, NotificationError> {
        let message = self.build_message(email)?;

        self.transport.send(message).await.map_err(map_smtp_error)?;

        Ok(SentMessage::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_email(reply_to: Option<&str>) -> BuiltEmail {
        BuiltEmail {
            to:        "prestataire@example.com".to_string(),
            subject:   "[SEIDO] テスト".to_string(),
            html_body: "<p>本文</p>".to_string(),
            text_body: "本文".to_string(),
            reply_to:  reply_to.map(str::to_string),
            tags:      Vec::new(),
        }
    }

    fn make_sender() -> SmtpNotificationSender {
        SmtpNotificationSender::new(
            "localhost",
            1025,
            "SEIDO <notifications@seido.example.com>".to_string(),
        )
    }

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpNotificationSender>();
    }

    #[tokio::test]
    async fn 返信先付きのメッセージを構築できる() {
        let message = make_sender()
            .build_message(&make_email(Some(
                "SEIDO Intervention <reply+int_x_y@reply.example.com>",
            )))
            .unwrap();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Reply-To:"));
        assert!(formatted.contains("<reply+int_x_y@reply.example.com>"));
    }

    #[tokio::test]
    async fn 宛先が不正ならrejected() {
        let mut email = make_email(None);
        email.to = "not-an-address".to_string();

        let result = make_sender().build_message(&email);

        assert!(matches!(result, Err(NotificationError::Rejected(_))));
    }
}
