//! # 署名付き返信先アドレス
//!
//! 送信メールの Reply-To に、ルーティング対象と HMAC 署名を埋め込む。
//! 受信側はアドレスだけで対象を復元し、署名で改ざんを検出する。
//!
//! ## 署名
//!
//! `hex(HMAC-SHA256(secret, canonical_string))` の先頭 8 文字（32 ビット）。
//! 32 ビットはアクセス権の証明には足りないが、返信の誤配送やなりすまし投稿を
//! 防ぐ用途では十分とし、メールアドレスの長さを優先している。
//!
//! ## 署名鍵がない場合
//!
//! 生成は `noreply@{domain}` を返し（返信はどこにもルーティングされない）、
//! 検証は常に失敗する。

use std::fmt;

use hmac::{Hmac, Mac};
use seido_domain::{
    intervention::InterventionId,
    reply_address::{ParsedReplyAddress, ReplyTarget, ThreadType},
};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// 署名の 16 進文字数
const HMAC_HEX_LEN: usize = 8;

/// 返信先アドレスの設定
#[derive(Clone)]
pub struct ReplyAddressConfig {
    /// HMAC 署名鍵（未設定なら返信ルーティングは無効）
    pub secret:         Option<String>,
    /// 受信用ドメイン（例: `reply.seido.example.com`）
    pub inbound_domain: String,
    /// Reply-To の表示名
    pub display_name:   String,
}

impl fmt::Debug for ReplyAddressConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyAddressConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("inbound_domain", &self.inbound_domain)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// 返信先アドレスのコーデック
///
/// 状態は不変の設定のみ。複数タスクから共有してよい。
#[derive(Debug, Clone)]
pub struct ReplyAddressCodec {
    config: ReplyAddressConfig,
}

impl ReplyAddressCodec {
    pub fn new(mut config: ReplyAddressConfig) -> Self {
        config.secret = config.secret.filter(|s| !s.is_empty());
        if config.secret.is_none() {
            tracing::warn!("返信先アドレスの署名鍵が未設定: 返信ルーティングは無効");
        }
        Self { config }
    }

    /// 署名鍵が設定されているか
    pub fn is_enabled(&self) -> bool {
        self.config.secret.is_some()
    }

    /// インターベンションへの返信先アドレスを生成する
    pub fn generate_intervention_reply_to(&self, intervention_id: &InterventionId) -> String {
        self.generate(&ReplyTarget::Intervention {
            intervention_id: intervention_id.clone(),
        })
    }

    /// 会話スレッドへの返信先アドレスを生成する
    pub fn generate_conversation_reply_to(
        &self,
        intervention_id: &InterventionId,
        thread_type: ThreadType,
    ) -> String {
        self.generate(&ReplyTarget::Conversation {
            intervention_id: intervention_id.clone(),
            thread_type,
        })
    }

    fn generate(&self, target: &ReplyTarget) -> String {
        let display_name = &self.config.display_name;
        let domain = &self.config.inbound_domain;

        match self.sign(target) {
            Some(hmac8) => format!("{display_name} <{}@{domain}>", target.local_part(&hmac8)),
            None => {
                tracing::warn!(
                    kind = %target.kind(),
                    "署名鍵が未設定のため noreply アドレスを使用"
                );
                format!("{display_name} <noreply@{domain}>")
            }
        }
    }

    /// 受信用ドメインと一致するか（大文字小文字は区別しない）
    pub fn is_inbound_domain(&self, domain: &str) -> bool {
        domain.eq_ignore_ascii_case(&self.config.inbound_domain)
    }

    /// アドレスをパースする（署名は検証しない）
    pub fn parse_reply_to_address(&self, address: &str) -> Option<ParsedReplyAddress> {
        ParsedReplyAddress::parse(address)
    }

    /// 署名を検証する
    ///
    /// 長さが異なれば即座に失敗し、同じ長さなら定数時間で比較する。
    pub fn verify_hash(&self, target: &ReplyTarget, provided: &str) -> bool {
        let Some(expected) = self.sign(target) else {
            return false;
        };

        let provided = provided.to_ascii_lowercase();
        if provided.len() != expected.len() {
            return false;
        }

        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    /// パース済みアドレスの署名を検証する
    pub fn verify(&self, parsed: &ParsedReplyAddress) -> bool {
        self.verify_hash(&parsed.target, &parsed.hmac8)
    }

    fn sign(&self, target: &ReplyTarget) -> Option<String> {
        let secret = self.config.secret.as_ref()?;

        // HMAC は任意長の鍵を受け付けるため new_from_slice は失敗しない
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(target.canonical_string().as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());

        Some(digest[..HMAC_HEX_LEN].to_string())
    }
}
