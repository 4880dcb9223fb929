//! # 通知
//!
//! メール通知の配信に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 用途 |
//! |---|------------|------|
//! | [`NotificationRecipient`] | 通知受信者 | 受信者解決の出力 |
//! | [`NotificationEventType`] | 通知イベント種別 | メールのタグと件名の決定 |
//! | [`BuiltEmail`] | メール記述子 | ビルダーが生成し、ディスパッチャーが一度だけ消費する |
//! | [`EmailSendResult`] | 受信者ごとの送信結果 | バッチ結果の要素 |
//! | [`BatchResult`] | バッチ結果 | 1 イベント分の送信の集計 |
//!
//! ## 設計方針
//!
//! - **部分失敗はデータで表現**: バッチの一部が失敗しても例外にせず、
//!   `failed_count` と `results` で呼び出し元に返す
//! - **型付きエラー**: レート制限かどうかは [`NotificationError::RateLimited`] で判定する。
//!   プロバイダのエラーメッセージの文字列判定は [`classify_provider_error`] に閉じ込める

mod email;
mod recipient;
mod result;

pub use email::{BuiltEmail, EmailTag, NotificationEventType};
pub use recipient::{NotificationRecipient, RecipientFilter, resolve_intervention_recipients};
pub use result::{BatchResult, EmailSendResult, SendOutcome, SentMessage};
use thiserror::Error;

/// 通知送信エラー
///
/// メール送信プロバイダの応答をリトライ判定に必要な粒度で分類する。
/// ディスパッチャーは [`RateLimited`](Self::RateLimited) のみをリトライする。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// プロバイダのレート制限（一時的、リトライ対象）
    #[error("レート制限: {0}")]
    RateLimited(String),

    /// プロバイダが拒否した（宛先不正、本文拒否など。リトライしない）
    #[error("送信拒否: {0}")]
    Rejected(String),

    /// ネットワーク障害など一時的な失敗
    #[error("一時的な送信失敗: {0}")]
    Transient(String),

    /// 1 回の送信がタイムアウトした
    #[error("送信タイムアウト: {0}ms")]
    Timeout(u64),

    /// メール本文の生成に失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// 送信バックエンドが設定されていない
    #[error("メール送信が設定されていません")]
    NotConfigured,
}

impl NotificationError {
    /// リトライ対象のレート制限エラーかどうか
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// レート制限を示すエラーメッセージの断片（小文字で比較する）
const RATE_LIMIT_MARKERS: &[&str] = &["429", "rate_limit", "too many requests"];

/// プロバイダのエラーメッセージを分類する
///
/// 構造化されたエラーコードを返さない送信プロバイダ向けのアダプター。
/// メッセージに `429` / `rate_limit` / `Too many requests` が含まれていれば
/// [`NotificationError::RateLimited`]、それ以外は
/// [`NotificationError::Rejected`] とする（大文字小文字は区別しない）。
pub fn classify_provider_error(message: impl Into<String>) -> NotificationError {
    let message = message.into();
    let lowered = message.to_lowercase();

    if RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        NotificationError::RateLimited(message)
    } else {
        NotificationError::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("429 Too Many Requests")]
    #[case("rate_limit_exceeded")]
    #[case("Too many requests. You can only make 2 requests per second.")]
    #[case("status=429")]
    fn test_レート制限メッセージはrate_limitedに分類される(#[case] message: &str) {
        let error = classify_provider_error(message);
        assert!(error.is_rate_limited(), "{message} は RateLimited であること");
    }

    #[rstest]
    #[case("The `to` field must be a valid email address")]
    #[case("validation_error")]
    #[case("")]
    fn test_それ以外のメッセージはrejectedに分類される(#[case] message: &str) {
        let error = classify_provider_error(message);
        assert_eq!(error, NotificationError::Rejected(message.to_string()));
    }

    #[test]
    fn test_rate_limited以外はリトライ対象ではない() {
        assert!(!NotificationError::Transient("接続断".to_string()).is_rate_limited());
        assert!(!NotificationError::Timeout(10_000).is_rate_limited());
        assert!(!NotificationError::NotConfigured.is_rate_limited());
    }
}
