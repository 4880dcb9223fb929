//! # 通知送信
//!
//! メール送信プロバイダとの境界を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **4 つの実装**: Resend（本番 API）、SES（AWS）、SMTP（Mailpit 開発用）、Noop（未設定時）
//! - **型付きエラー**: 各実装はプロバイダ固有のエラーを `NotificationError` に分類して返す。
//!   構造化コードがない場合は `classify_provider_error` に委ねる

mod noop;
mod resend;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
pub use resend::{DEFAULT_RESEND_API_URL, ResendNotificationSender};
use seido_domain::notification::{BuiltEmail, NotificationError, SentMessage};
pub use ses::SesNotificationSender;
pub use smtp::SmtpNotificationSender;

/// メール送信トレイト
///
/// 通知基盤の中核。メール送信の具体的な方法を抽象化する。
/// 1 回の呼び出しは 1 通の送信に対応し、リトライやペーシングは行わない。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &BuiltEmail) -> Result<SentMessage, NotificationError>;

    /// 送信に必要な認証情報が設定されているか
    ///
    /// `false` の場合、ディスパッチャーは送信を一切試行しない。
    fn is_configured(&self) -> bool {
        true
    }
}
