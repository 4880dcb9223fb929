//! # バッチディスパッチャー
//!
//! 受信者リストに対して 1 通ずつメールを送信し、受信者ごとの結果を集計する。
//!
//! ## 送信ポリシー
//!
//! - **逐次送信**: 送信プロバイダのレート制限（アカウント全体で毎秒数リクエスト）を守るため、
//!   同時に送信するのは常に 1 通だけ。2 通目以降の前に `rate_limit_delay` 待つ
//! - **レート制限のみリトライ**: [`NotificationError::RateLimited`] の場合だけ
//!   `retry_delay * retry_count` 待って再送する（線形バックオフ）。
//!   試行回数は最大 `1 + max_retries`
//! - **部分失敗はデータ**: 失敗はバッチを止めず、[`BatchResult`] に記録する
//! - **キャンセル**: 待機中と受信者の合間にのみキャンセルを確認する。送信中のリクエストは中断しない。
//!   キャンセル後の受信者には `"cancelled"` の失敗結果を入れ、結果の添字と入力の添字を一致させる

use std::{sync::Arc, time::Duration};

use seido_domain::{
    notification::{
        BatchResult,
        BuiltEmail,
        EmailSendResult,
        NotificationError,
        SendOutcome,
        SentMessage,
    },
    user::UserId,
};
use seido_infra::notification::NotificationSender;
use seido_shared::{
    event_log::{error, event},
    log_business_event,
};
use tokio_util::sync::CancellationToken;

/// キャンセルされた受信者に記録するエラー
pub const CANCELLED: &str = "cancelled";

/// 送信バックエンド未設定時に単発送信が返すエラー
pub const NOT_CONFIGURED: &str = "not configured";

/// 送信ポリシー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// 受信者間の待機時間
    pub rate_limit_delay: Duration,
    /// リトライ待機の単位（n 回目のリトライ前に n 倍待つ）
    pub retry_delay:      Duration,
    /// レート制限時の最大リトライ回数
    pub max_retries:      u32,
    /// 1 回の送信のタイムアウト
    pub send_timeout:     Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            rate_limit_delay: Duration::from_millis(500),
            retry_delay:      Duration::from_millis(1000),
            max_retries:      3,
            send_timeout:     Duration::from_millis(10_000),
        }
    }
}

/// ディスパッチャーが受信者に要求する情報
pub trait DispatchRecipient {
    fn user_id(&self) -> &UserId;
    fn email(&self) -> &str;
}

/// バッチディスパッチャー
pub struct EmailDispatcher {
    sender: Arc<dyn NotificationSender>,
    policy: DispatchPolicy,
}

impl EmailDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, policy: DispatchPolicy) -> Self {
        Self { sender, policy }
    }

    /// 送信バックエンドが設定されているか
    pub fn is_configured(&self) -> bool {
        self.sender.is_configured()
    }

    /// 受信者リストにメールを送信する
    ///
    /// `build` は受信者ごとに 1 回だけ呼ばれ、その受信者宛てのメールを返す。
    /// 送信バックエンドが未設定の場合は `build` を呼ばずに
    /// [`BatchResult::not_configured`] を返す。
    ///
    /// 戻り値の `results` は `recipients` と同じ順序・同じ長さを持つ。
    pub async fn send_batch<R, F>(
        &self,
        recipients: &[R],
        mut build: F,
        cancel: &CancellationToken,
    ) -> BatchResult
    where
        R: DispatchRecipient,
        F: FnMut(&R) -> Result<BuiltEmail, NotificationError>,
    {
        if !self.sender.is_configured() {
            tracing::warn!(
                recipients = recipients.len(),
                "メール送信が未設定のためバッチをスキップ"
            );
            return BatchResult::not_configured();
        }

        let mut results = Vec::with_capacity(recipients.len());

        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 && !pause(self.policy.rate_limit_delay, cancel).await {
                break;
            }
            if cancel.is_cancelled() {
                break;
            }

            let result = match build(recipient) {
                Ok(email) => self.send_with_retry(recipient, &email, cancel).await,
                Err(e) => {
                    tracing::warn!(
                        error.category = error::category::INFRASTRUCTURE,
                        error.kind = error::kind::TEMPLATE,
                        user_id = %recipient.user_id(),
                        error = %e,
                        "メールの組み立てに失敗"
                    );
                    EmailSendResult::failed(
                        recipient.user_id().clone(),
                        recipient.email(),
                        e.to_string(),
                    )
                }
            };

            log_send_result(&result);
            results.push(result);
        }

        if results.len() < recipients.len() {
            tracing::warn!(
                skipped = recipients.len() - results.len(),
                "バッチ送信がキャンセルされた"
            );
            for recipient in &recipients[results.len()..] {
                results.push(EmailSendResult::failed(
                    recipient.user_id().clone(),
                    recipient.email(),
                    CANCELLED,
                ));
            }
        }

        let batch = BatchResult::from_results(results);

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::BATCH_COMPLETED,
            event.entity_type = event::entity_type::EMAIL,
            event.result = if batch.success {
                event::result::SUCCESS
            } else {
                event::result::FAILURE
            },
            batch.total = batch.results.len(),
            batch.sent = batch.sent_count,
            batch.failed = batch.failed_count,
            "バッチ送信完了"
        );

        batch
    }

    /// 1 通だけ送信する
    ///
    /// 待機もリトライもしない（タイムアウトは適用する）。
    pub async fn send_direct(&self, email: &BuiltEmail) -> SendOutcome {
        if !self.sender.is_configured() {
            tracing::warn!(to = %email.to, "メール送信が未設定のため単発送信をスキップ");
            return SendOutcome {
                success:    false,
                message_id: None,
                error:      Some(NOT_CONFIGURED.to_string()),
            };
        }

        match self.send_once(email).await {
            Ok(sent) => SendOutcome {
                success:    true,
                message_id: sent.message_id,
                error:      None,
            },
            Err(e) => {
                tracing::warn!(
                    error.category = error::category::EXTERNAL_SERVICE,
                    error.kind = error::kind::EMAIL_TRANSPORT,
                    to = %email.to,
                    error = %e,
                    "単発送信に失敗"
                );
                SendOutcome {
                    success:    false,
                    message_id: None,
                    error:      Some(e.to_string()),
                }
            }
        }
    }

    async fn send_with_retry<R: DispatchRecipient>(
        &self,
        recipient: &R,
        email: &BuiltEmail,
        cancel: &CancellationToken,
    ) -> EmailSendResult {
        let mut retry_count: u32 = 0;

        loop {
            let error = match self.send_once(email).await {
                Ok(sent) => {
                    return EmailSendResult::sent(
                        recipient.user_id().clone(),
                        recipient.email(),
                        sent.message_id,
                    );
                }
                Err(e) => e,
            };

            if !error.is_rate_limited() || retry_count >= self.policy.max_retries {
                return EmailSendResult::failed(
                    recipient.user_id().clone(),
                    recipient.email(),
                    error.to_string(),
                );
            }

            retry_count += 1;
            let wait = self.policy.retry_delay * retry_count;
            tracing::warn!(
                user_id = %recipient.user_id(),
                retry_count,
                wait_ms = wait.as_millis() as u64,
                "レート制限のため再送を待機"
            );

            if !pause(wait, cancel).await {
                return EmailSendResult::failed(
                    recipient.user_id().clone(),
                    recipient.email(),
                    CANCELLED,
                );
            }
        }
    }

    async fn send_once(&self, email: &BuiltEmail) -> Result<SentMessage, NotificationError> {
        let timeout = self.policy.send_timeout;
        match tokio::time::timeout(timeout, self.sender.send_email(email)).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout(timeout.as_millis() as u64)),
        }
    }
}

/// キャンセル可能な待機。待機し終えたら true、キャンセルされたら false
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn log_send_result(result: &EmailSendResult) {
    if result.success {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_SENT,
            event.entity_type = event::entity_type::EMAIL,
            event.entity_id = %result.user_id,
            event.result = event::result::SUCCESS,
            notification.recipient = %result.email,
            notification.message_id = result.message_id.as_deref().unwrap_or(""),
            "通知メール送信成功"
        );
    } else {
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_FAILED,
            event.entity_type = event::entity_type::EMAIL,
            event.entity_id = %result.user_id,
            event.result = event::result::FAILURE,
            error.category = error::category::EXTERNAL_SERVICE,
            error.kind = error::kind::EMAIL_TRANSPORT,
            notification.recipient = %result.email,
            error = result.error.as_deref().unwrap_or(""),
            "通知メール送信失敗"
        );
    }
}
