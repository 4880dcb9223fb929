//! # 受信返信のルーティング
//!
//! 受信メールの To / Cc から返信先アドレスを探し、署名を検証してルーティング対象を決める。
//!
//! 受信用ドメイン宛てで、かつ文法どおりにパースできた最初のアドレスだけを評価する。
//! 別ドメイン（似せたドメインを含む）宛ての `reply+...` は返信先として扱わない。
//! 署名が一致しないアドレスは認証されていない返信として拒否し、後続のアドレスは見ない。

use std::sync::Arc;

use seido_domain::reply_address::ReplyTarget;
use seido_infra::reply_address::ReplyAddressCodec;
use seido_shared::{event_log::event, log_business_event};

/// ルーティング結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundRoute {
    /// 署名が検証されたルーティング対象
    Routed(ReplyTarget),
    /// 返信先アドレスはあるが署名が一致しない
    Rejected,
    /// 返信先アドレスが見つからない
    Unroutable,
}

impl InboundRoute {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Routed(_) => "routed",
            Self::Rejected => "rejected",
            Self::Unroutable => "unroutable",
        }
    }
}

pub struct ReplyRouter {
    codec: Arc<ReplyAddressCodec>,
}

impl ReplyRouter {
    pub fn new(codec: Arc<ReplyAddressCodec>) -> Self {
        Self { codec }
    }

    /// 受信者アドレスの一覧からルーティング対象を決める
    pub fn route(&self, recipients: &[String]) -> InboundRoute {
        let Some(parsed) = recipients.iter().find_map(|address| {
            let parsed = self.codec.parse_reply_to_address(address)?;
            if self.codec.is_inbound_domain(&parsed.domain) {
                Some(parsed)
            } else {
                tracing::debug!(domain = %parsed.domain, "受信用ドメイン以外の返信先アドレスを無視");
                None
            }
        }) else {
            tracing::debug!(recipients = recipients.len(), "返信先アドレスが見つからない");
            return InboundRoute::Unroutable;
        };

        let target = parsed.target.clone();
        let entity_type = match target {
            ReplyTarget::Intervention { .. } => event::entity_type::INTERVENTION,
            ReplyTarget::Conversation { .. } => event::entity_type::CONVERSATION_THREAD,
        };

        if !self.codec.verify(&parsed) {
            tracing::warn!(
                intervention_id = %target.intervention_id(),
                domain = %parsed.domain,
                "署名が一致しない返信を拒否"
            );
            log_business_event!(
                event.category = event::category::INBOUND_REPLY,
                event.action = event::action::REPLY_REJECTED,
                event.entity_type = entity_type,
                event.entity_id = %target.intervention_id(),
                event.result = event::result::FAILURE,
                "認証されていない返信"
            );
            return InboundRoute::Rejected;
        }

        log_business_event!(
            event.category = event::category::INBOUND_REPLY,
            event.action = event::action::REPLY_ROUTED,
            event.entity_type = entity_type,
            event.entity_id = %target.intervention_id(),
            event.result = event::result::SUCCESS,
            reply.kind = %target.kind(),
            "返信をルーティング"
        );

        InboundRoute::Routed(target)
    }
}
