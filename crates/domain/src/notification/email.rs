//! メール記述子
//!
//! ビルダーが生成し、ディスパッチャーが消費するメールの形。
//! 本文はこのサブシステムにとって不透明な値として扱う。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// 通知イベント種別
///
/// メールの `type` タグと件名の決定に使う。snake_case でシリアライズされる。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationEventType {
    /// インターベンション作成 → 管理者に送信
    InterventionCreated,
    /// 承認 → 入居者・業者に送信
    InterventionApproved,
    /// 却下 → 申請した入居者に送信
    InterventionRejected,
    /// 日程確定 → 入居者・業者に送信
    InterventionScheduled,
    /// 作業完了 → 全関係者に送信
    InterventionCompleted,
    /// キャンセル → 全関係者に送信
    InterventionCancelled,
    /// 会話スレッドへの新着メッセージ
    ConversationMessage,
}

/// メールタグ
///
/// 送信プロバイダ側での集計・Webhook 振り分けに使う名前と値の組。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTag {
    pub name:  String,
    pub value: String,
}

impl EmailTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name:  name.into(),
            value: value.into(),
        }
    }
}

/// メール記述子
///
/// ビルダーが一度だけ生成し、ディスパッチャーが一度だけ消費する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltEmail {
    /// 送信先メールアドレス
    pub to:        String,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// プレーンテキスト本文
    pub text_body: String,
    /// 返信先（署名付きアドレス、未設定なら送信元に返信される）
    pub reply_to:  Option<String>,
    pub tags:      Vec<EmailTag>,
}

impl BuiltEmail {
    /// 指定した名前のタグの値を返す
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(NotificationEventType::InterventionCreated, "intervention_created")]
    #[case(NotificationEventType::InterventionApproved, "intervention_approved")]
    #[case(NotificationEventType::InterventionRejected, "intervention_rejected")]
    #[case(NotificationEventType::InterventionScheduled, "intervention_scheduled")]
    #[case(NotificationEventType::InterventionCompleted, "intervention_completed")]
    #[case(NotificationEventType::InterventionCancelled, "intervention_cancelled")]
    #[case(NotificationEventType::ConversationMessage, "conversation_message")]
    fn test_通知イベント種別の文字列変換が正しい(
        #[case] event: NotificationEventType,
        #[case] expected: &str,
    ) {
        assert_eq!(event.to_string(), expected);
        assert_eq!(NotificationEventType::from_str(expected).unwrap(), event);
        let as_str: &str = event.into();
        assert_eq!(as_str, expected);
    }

    #[test]
    fn test_tagは名前で値を引ける() {
        let email = BuiltEmail {
            to:        "a@example.com".to_string(),
            subject:   "件名".to_string(),
            html_body: String::new(),
            text_body: String::new(),
            reply_to:  None,
            tags:      vec![EmailTag::new("type", "intervention_created")],
        };

        assert_eq!(email.tag("type"), Some("intervention_created"));
        assert_eq!(email.tag("missing"), None);
    }
}
