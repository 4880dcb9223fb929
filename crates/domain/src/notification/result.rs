//! 送信結果
//!
//! 受信者ごとの送信結果と、バッチ全体の集計。いずれも生成後は不変。

use serde::Serialize;

use crate::user::UserId;

/// 送信プロバイダが受け付けたメッセージ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentMessage {
    /// プロバイダが払い出したメッセージ ID（SMTP など払い出さない場合は None）
    pub message_id: Option<String>,
}

/// 単発送信の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success:    bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:      Option<String>,
}

/// 受信者ごとの送信結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailSendResult {
    pub user_id:    UserId,
    pub email:      String,
    pub success:    bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:      Option<String>,
}

impl EmailSendResult {
    pub fn sent(user_id: UserId, email: impl Into<String>, message_id: Option<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            success: true,
            message_id,
            error: None,
        }
    }

    pub fn failed(user_id: UserId, email: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// バッチ結果
///
/// `results` は入力の受信者リストと同じ順序・同じ長さを持つ。
/// `configured = false` は送信バックエンド未設定により何も試行しなかったことを表し、
/// 「全件失敗」（`failed_count > 0`）とは区別される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub configured:   bool,
    pub success:      bool,
    pub sent_count:   usize,
    pub failed_count: usize,
    pub results:      Vec<EmailSendResult>,
}

impl BatchResult {
    /// 受信者ごとの結果から集計する
    pub fn from_results(results: Vec<EmailSendResult>) -> Self {
        let sent_count = results.iter().filter(|r| r.success).count();
        let failed_count = results.len() - sent_count;

        Self {
            configured: true,
            success: failed_count == 0,
            sent_count,
            failed_count,
            results,
        }
    }

    /// 受信者がいなかったバッチ（成功扱いの no-op）
    pub fn empty() -> Self {
        Self::from_results(Vec::new())
    }

    /// 送信バックエンド未設定のため何も試行しなかったバッチ
    pub fn not_configured() -> Self {
        Self {
            configured:   false,
            success:      false,
            sent_count:   0,
            failed_count: 0,
            results:      Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_失敗が1件でもあればsuccessはfalse() {
        let result = BatchResult::from_results(vec![
            EmailSendResult::sent(UserId::new(), "a@example.com", Some("msg-1".to_string())),
            EmailSendResult::failed(UserId::new(), "b@example.com", "拒否"),
        ]);

        assert!(result.configured);
        assert!(!result.success);
        assert_eq!(result.sent_count, 1);
        assert_eq!(result.failed_count, 1);
    }

    #[test]
    fn test_空のバッチは成功扱い() {
        let result = BatchResult::empty();

        assert!(result.success);
        assert_eq!(result.sent_count, 0);
        assert_eq!(result.failed_count, 0);
    }

    #[test]
    fn test_未設定は全件失敗と区別できる() {
        let not_configured = BatchResult::not_configured();
        let all_failed = BatchResult::from_results(vec![EmailSendResult::failed(
            UserId::new(),
            "a@example.com",
            "拒否",
        )]);

        assert!(!not_configured.configured);
        assert!(!not_configured.success);
        assert!(all_failed.configured);
        assert!(!all_failed.success);
        assert_ne!(not_configured.failed_count, all_failed.failed_count);
    }

    #[test]
    fn test_送信結果のjsonは未設定フィールドを省略する() {
        let result = EmailSendResult::sent(UserId::new(), "a@example.com", None);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
        assert!(json.get("message_id").is_none());
    }
}
