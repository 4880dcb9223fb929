//! `NOTIFICATION_BACKEND=noop`（既定値）のときの送信実装。

use async_trait::async_trait;
use seido_domain::notification::{BuiltEmail, NotificationError, SentMessage};

use super::NotificationSender;

/// `is_configured()` が `false` なので、ディスパッチャー経由ではここまで到達しない。
/// 直接呼ばれた場合も送信せず [`NotificationError::NotConfigured`] を返す。
#[derive(Debug, Clone)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &BuiltEmail) -> Result<SentMessage, NotificationError> {
        tracing::debug!(to = %email.to, tags = email.tags.len(), "送信バックエンド未設定");
        Err(NotificationError::NotConfigured)
    }

    fn is_configured(&self) -> bool {
        false
    }
}
