//! # 返信先アドレス
//!
//! 送信メールの Reply-To に埋め込むルーティング対象と、
//! 受信した返信のアドレスを解釈する文法を定義する。
//!
//! ## ワイヤーフォーマット
//!
//! ```text
//! reply+int_{intervention-uuid}_{hmac8}@{inbound-domain}
//! reply+conv_{intervention-uuid}_{group|tenant_to_managers|provider_to_managers}_{hmac8}@{inbound-domain}
//! ```
//!
//! `{hmac8}` は署名対象文字列（[`ReplyTarget::canonical_string`]）に対する
//! HMAC-SHA256 の 16 進表現の先頭 8 文字。署名と検証は infra 層の
//! `ReplyAddressCodec` が担当し、このモジュールは純粋な構文のみを扱う。
//!
//! ## 設計方針
//!
//! - **サーバー側テーブル不要**: アドレス自体がルーティング対象を表す
//! - **厳密な文法**: 部分一致やセグメント欠落は受け付けない
//! - **失敗しないパース**: 公開インターネットから届く不正なアドレスは想定内の入力なので、
//!   エラーではなく `None` を返す

use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use uuid::Uuid;

use crate::intervention::InterventionId;

/// 会話スレッドの種別
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThreadType {
    /// 全関係者のスレッド
    Group,
    /// 入居者と管理者のスレッド
    TenantToManagers,
    /// 業者と管理者のスレッド
    ProviderToManagers,
}

/// 返信先アドレスの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReplyKind {
    Intervention,
    Conversation,
}

/// 返信のルーティング対象
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplyTarget {
    /// インターベンションそのものへの返信
    Intervention { intervention_id: InterventionId },
    /// インターベンション内の会話スレッドへの返信
    Conversation {
        intervention_id: InterventionId,
        thread_type:     ThreadType,
    },
}

impl ReplyTarget {
    pub fn kind(&self) -> ReplyKind {
        match self {
            Self::Intervention { .. } => ReplyKind::Intervention,
            Self::Conversation { .. } => ReplyKind::Conversation,
        }
    }

    pub fn intervention_id(&self) -> &InterventionId {
        match self {
            Self::Intervention { intervention_id } | Self::Conversation { intervention_id, .. } => {
                intervention_id
            }
        }
    }

    pub fn thread_type(&self) -> Option<ThreadType> {
        match self {
            Self::Intervention { .. } => None,
            Self::Conversation { thread_type, .. } => Some(*thread_type),
        }
    }

    /// 署名対象の正規化文字列
    ///
    /// - インターベンション: `intervention:{id}`
    /// - 会話: `conversation:{id}:{thread_type}`
    ///
    /// 種別をプレフィックスに含めるため、同じ ID でも種別が異なれば署名は一致しない。
    pub fn canonical_string(&self) -> String {
        match self {
            Self::Intervention { intervention_id } => format!("intervention:{intervention_id}"),
            Self::Conversation {
                intervention_id,
                thread_type,
            } => format!("conversation:{intervention_id}:{thread_type}"),
        }
    }

    /// 署名を付けたアドレスのローカル部を組み立てる
    pub fn local_part(&self, hmac8: &str) -> String {
        match self {
            Self::Intervention { intervention_id } => {
                format!("reply+int_{intervention_id}_{hmac8}")
            }
            Self::Conversation {
                intervention_id,
                thread_type,
            } => format!("reply+conv_{intervention_id}_{thread_type}_{hmac8}"),
        }
    }
}

/// 返信先アドレスの文法
///
/// 大文字小文字を区別せず、先頭から末尾まで完全一致したものだけを受け付ける。
static REPLY_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^reply\+(int|conv)_([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})(?:_(group|tenant_to_managers|provider_to_managers))?_([0-9a-f]{8})@([a-z0-9](?:[a-z0-9.-]*[a-z0-9])?)$",
    )
    .expect("返信先アドレスの正規表現は固定値")
});

/// パース済みの返信先アドレス
///
/// 署名はまだ検証されていない。`hmac8` を検証するまで `target` を信頼してはならない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReplyAddress {
    pub target: ReplyTarget,
    /// 埋め込まれていた署名（小文字 16 進 8 文字）
    pub hmac8:  String,
    /// アドレスのドメイン部（小文字）
    pub domain: String,
}

impl ParsedReplyAddress {
    /// アドレスをパースする
    ///
    /// `Display Name <reply+...@domain>` 形式と、山括弧のない素のアドレスの両方を受け付ける。
    /// 文法に一致しない場合は `None` を返す。
    pub fn parse(address: &str) -> Option<Self> {
        let bare = extract_address(address)?;
        let captures = REPLY_ADDRESS_RE.captures(bare)?;

        let kind = captures.get(1)?.as_str().to_ascii_lowercase();
        let uuid = Uuid::parse_str(captures.get(2)?.as_str()).ok()?;
        let intervention_id = InterventionId::from_uuid(uuid);
        let thread = captures.get(3).map(|m| m.as_str().to_ascii_lowercase());
        let hmac8 = captures.get(4)?.as_str().to_ascii_lowercase();
        let domain = captures.get(5)?.as_str().to_ascii_lowercase();

        let target = match (kind.as_str(), thread) {
            ("int", None) => ReplyTarget::Intervention { intervention_id },
            ("conv", Some(thread)) => ReplyTarget::Conversation {
                intervention_id,
                thread_type: ThreadType::from_str(&thread).ok()?,
            },
            _ => return None,
        };

        Some(Self {
            target,
            hmac8,
            domain,
        })
    }
}

/// 表示名付きの形式からアドレス部分を取り出す
fn extract_address(input: &str) -> Option<&str> {
    let input = input.trim();

    let bare = match (input.rfind('<'), input.rfind('>')) {
        (Some(start), Some(end)) if start < end && end == input.len() - 1 => &input[start + 1..end],
        (None, None) => input,
        _ => return None,
    };

    let bare = bare.trim();
    if bare.is_empty() { None } else { Some(bare) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const ID: &str = "11111111-1111-1111-1111-111111111111";

    fn intervention_id() -> InterventionId {
        InterventionId::from_uuid(Uuid::parse_str(ID).unwrap())
    }

    #[test]
    fn test_インターベンション返信を素のアドレスからパースできる() {
        let parsed =
            ParsedReplyAddress::parse(&format!("reply+int_{ID}_a1b2c3d4@reply.example.com"))
                .unwrap();

        assert_eq!(
            parsed,
            ParsedReplyAddress {
                target: ReplyTarget::Intervention {
                    intervention_id: intervention_id(),
                },
                hmac8:  "a1b2c3d4".to_string(),
                domain: "reply.example.com".to_string(),
            }
        );
    }

    #[rstest]
    #[case("group", ThreadType::Group)]
    #[case("tenant_to_managers", ThreadType::TenantToManagers)]
    #[case("provider_to_managers", ThreadType::ProviderToManagers)]
    fn test_会話返信を表示名付きアドレスからパースできる(
        #[case] thread: &str,
        #[case] expected: ThreadType,
    ) {
        let address = format!("SEIDO Intervention <reply+conv_{ID}_{thread}_0f0f0f0f@reply.example.com>");

        let parsed = ParsedReplyAddress::parse(&address).unwrap();

        assert_eq!(
            parsed.target,
            ReplyTarget::Conversation {
                intervention_id: intervention_id(),
                thread_type:     expected,
            }
        );
        assert_eq!(parsed.hmac8, "0f0f0f0f");
    }

    #[test]
    fn test_大文字のアドレスも小文字に正規化して受け付ける() {
        let address = format!(
            "REPLY+CONV_{}_GROUP_ABCDEF12@Reply.Example.com",
            ID.to_uppercase()
        );

        let parsed = ParsedReplyAddress::parse(&address).unwrap();

        assert_eq!(parsed.target.thread_type(), Some(ThreadType::Group));
        assert_eq!(parsed.hmac8, "abcdef12");
        assert_eq!(parsed.domain, "reply.example.com");
        assert_eq!(parsed.target.intervention_id(), &intervention_id());
    }

    #[rstest]
    #[case("", "空文字列")]
    #[case("noreply@reply.example.com", "通常のアドレス")]
    #[case("reply+int_11111111-1111-1111-1111-111111111111@reply.example.com", "署名なし")]
    #[case("reply+int_11111111-1111-1111-1111-111111111111_a1b2c3d@reply.example.com", "署名が 7 文字")]
    #[case("reply+int_11111111-1111-1111-1111-111111111111_a1b2c3d4e@reply.example.com", "署名が 9 文字")]
    #[case("reply+int_11111111-1111-1111-1111-111111111111_zzzzzzzz@reply.example.com", "署名が 16 進でない")]
    #[case("reply+int_11111111-1111-1111-1111-111111111111_group_a1b2c3d4@reply.example.com", "int にスレッド")]
    #[case("reply+conv_11111111-1111-1111-1111-111111111111_a1b2c3d4@reply.example.com", "conv にスレッドなし")]
    #[case("reply+conv_11111111-1111-1111-1111-111111111111_owners_a1b2c3d4@reply.example.com", "未知のスレッド")]
    #[case("reply+int_1111111-1111-1111-1111-111111111111_a1b2c3d4@reply.example.com", "UUID が短い")]
    #[case("reply+int_11111111111111111111111111111111_a1b2c3d4@reply.example.com", "ハイフンなし UUID")]
    #[case("reply+int_11111111-1111-1111-1111-111111111111_a1b2c3d4", "ドメインなし")]
    #[case("xreply+int_11111111-1111-1111-1111-111111111111_a1b2c3d4@reply.example.com", "先頭に余分な文字")]
    #[case("reply+int_11111111-1111-1111-1111-111111111111_a1b2c3d4@reply.example.com trailing", "末尾に余分な文字")]
    #[case("Name <reply+int_11111111-1111-1111-1111-111111111111_a1b2c3d4@reply.example.com", "閉じ括弧なし")]
    #[case("<>", "空の山括弧")]
    fn test_文法に一致しないアドレスはnoneを返す(#[case] input: &str, #[case] _reason: &str) {
        assert!(ParsedReplyAddress::parse(input).is_none());
    }

    #[test]
    fn test_正規化文字列は種別ごとに異なる() {
        let intervention = ReplyTarget::Intervention {
            intervention_id: intervention_id(),
        };
        let conversation = ReplyTarget::Conversation {
            intervention_id: intervention_id(),
            thread_type:     ThreadType::TenantToManagers,
        };

        assert_eq!(intervention.canonical_string(), format!("intervention:{ID}"));
        assert_eq!(
            conversation.canonical_string(),
            format!("conversation:{ID}:tenant_to_managers")
        );
    }

    #[test]
    fn test_ローカル部を組み立てると文法に一致する() {
        let target = ReplyTarget::Conversation {
            intervention_id: intervention_id(),
            thread_type:     ThreadType::ProviderToManagers,
        };

        let local = target.local_part("deadbeef");
        assert_eq!(local, format!("reply+conv_{ID}_provider_to_managers_deadbeef"));

        let parsed = ParsedReplyAddress::parse(&format!("{local}@reply.example.com")).unwrap();
        assert_eq!(parsed.target, target);
        assert_eq!(parsed.target.kind(), ReplyKind::Conversation);
    }
}
