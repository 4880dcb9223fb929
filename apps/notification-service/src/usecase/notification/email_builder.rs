//! # メールビルダー
//!
//! tera テンプレートエンジンで、インターベンションのイベント通知メールを
//! HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **件名パターン**: `[SEIDO] {イベント表示名} : {reference} - {title}`
//! - **返信先**: インターベンションのイベントはインターベンション宛て、
//!   会話メッセージはスレッド宛ての署名付きアドレスを Reply-To に設定する
//! - **タグ**: `type` / `intervention_id` / `user_role` を付与し、プロバイダ側で集計できるようにする

use std::sync::Arc;

use seido_domain::{
    intervention::{InterventionId, InterventionWithAssignments},
    notification::{
        BuiltEmail,
        EmailTag,
        NotificationError,
        NotificationEventType,
        NotificationRecipient,
    },
    reply_address::ThreadType,
    user::{User, UserId, UserRole},
};
use seido_infra::reply_address::ReplyAddressCodec;
use tera::{Context, Tera};

use super::dispatcher::DispatchRecipient;

/// メールに差し込むインターベンションの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionEmailContext {
    pub intervention_id: InterventionId,
    pub reference:       String,
    pub title:           String,
    pub description:     Option<String>,
    pub location:        Option<String>,
    pub event:           NotificationEventType,
    /// 却下理由、日程の補足、会話メッセージの本文など
    pub message:         Option<String>,
    /// 会話メッセージの宛先スレッド（未指定なら全体スレッド）
    pub thread_type:     Option<ThreadType>,
}

impl InterventionEmailContext {
    pub fn new(intervention: &InterventionWithAssignments, event: NotificationEventType) -> Self {
        Self {
            intervention_id: intervention.id().clone(),
            reference: intervention.reference().to_string(),
            title: intervention.title().to_string(),
            description: intervention.description().map(str::to_string),
            location: intervention.location().map(str::to_string),
            event,
            message: None,
            thread_type: None,
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message.filter(|m| !m.trim().is_empty());
        self
    }

    pub fn with_thread_type(mut self, thread_type: Option<ThreadType>) -> Self {
        self.thread_type = thread_type;
        self
    }
}

/// 連絡先付きの通知受信者
///
/// 受信者解決の結果にユーザーの名前とメールアドレスを結合したもの。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecipientContact {
    pub user_id:     UserId,
    pub name:        String,
    pub email:       String,
    pub role:        UserRole,
    pub is_personal: bool,
}

impl NotificationRecipientContact {
    pub fn new(recipient: &NotificationRecipient, user: &User) -> Self {
        Self {
            user_id:     recipient.user_id.clone(),
            name:        user.name().to_string(),
            email:       user.email().as_str().to_string(),
            role:        recipient.role,
            is_personal: recipient.is_personal,
        }
    }
}

impl DispatchRecipient for NotificationRecipientContact {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn email(&self) -> &str {
        &self.email
    }
}

/// 件名に使うイベントの表示名
fn event_label(event: NotificationEventType) -> &'static str {
    match event {
        NotificationEventType::InterventionCreated => "Nouvelle demande d'intervention",
        NotificationEventType::InterventionApproved => "Intervention approuvée",
        NotificationEventType::InterventionRejected => "Intervention refusée",
        NotificationEventType::InterventionScheduled => "Intervention planifiée",
        NotificationEventType::InterventionCompleted => "Intervention terminée",
        NotificationEventType::InterventionCancelled => "Intervention annulée",
        NotificationEventType::ConversationMessage => "Nouveau message",
    }
}

fn thread_label(thread_type: ThreadType) -> &'static str {
    match thread_type {
        ThreadType::Group => "Discussion générale",
        ThreadType::TenantToManagers => "Locataire et gestionnaires",
        ThreadType::ProviderToManagers => "Prestataire et gestionnaires",
    }
}

/// メールビルダー
pub struct EmailBuilder {
    engine:             Tera,
    codec:              Arc<ReplyAddressCodec>,
    interactive_emails: bool,
}

impl EmailBuilder {
    /// 新しいビルダーを作成する
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new(
        codec: Arc<ReplyAddressCodec>,
        interactive_emails: bool,
    ) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "layout.html",
                    include_str!("../../../templates/notifications/layout.html"),
                ),
                (
                    "intervention_created.html",
                    include_str!("../../../templates/notifications/intervention_created.html"),
                ),
                (
                    "intervention_created.txt",
                    include_str!("../../../templates/notifications/intervention_created.txt"),
                ),
                (
                    "intervention_approved.html",
                    include_str!("../../../templates/notifications/intervention_approved.html"),
                ),
                (
                    "intervention_approved.txt",
                    include_str!("../../../templates/notifications/intervention_approved.txt"),
                ),
                (
                    "intervention_rejected.html",
                    include_str!("../../../templates/notifications/intervention_rejected.html"),
                ),
                (
                    "intervention_rejected.txt",
                    include_str!("../../../templates/notifications/intervention_rejected.txt"),
                ),
                (
                    "intervention_scheduled.html",
                    include_str!("../../../templates/notifications/intervention_scheduled.html"),
                ),
                (
                    "intervention_scheduled.txt",
                    include_str!("../../../templates/notifications/intervention_scheduled.txt"),
                ),
                (
                    "intervention_completed.html",
                    include_str!("../../../templates/notifications/intervention_completed.html"),
                ),
                (
                    "intervention_completed.txt",
                    include_str!("../../../templates/notifications/intervention_completed.txt"),
                ),
                (
                    "intervention_cancelled.html",
                    include_str!("../../../templates/notifications/intervention_cancelled.html"),
                ),
                (
                    "intervention_cancelled.txt",
                    include_str!("../../../templates/notifications/intervention_cancelled.txt"),
                ),
                (
                    "conversation_message.html",
                    include_str!("../../../templates/notifications/conversation_message.html"),
                ),
                (
                    "conversation_message.txt",
                    include_str!("../../../templates/notifications/conversation_message.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self {
            engine,
            codec,
            interactive_emails,
        })
    }

    /// 受信者 1 人分のメールを生成する
    ///
    /// # 引数
    ///
    /// - `context`: インターベンションとイベントの情報
    /// - `recipient`: 宛先
    /// - `link_url`: 本文のボタンに使う URL（マジックリンクまたは直リンク）
    pub fn build(
        &self,
        context: &InterventionEmailContext,
        recipient: &NotificationRecipientContact,
        link_url: &str,
    ) -> Result<BuiltEmail, NotificationError> {
        let event_type: &'static str = context.event.into();
        let subject = format!(
            "[SEIDO] {} : {} - {}",
            event_label(context.event),
            context.reference,
            context.title
        );
        let thread_type = context.thread_type.unwrap_or(ThreadType::Group);

        let mut template_context = Context::new();
        template_context.insert("subject", &subject);
        template_context.insert("recipient_name", &recipient.name);
        template_context.insert("reference", &context.reference);
        template_context.insert("title", &context.title);
        template_context.insert("description", &context.description);
        template_context.insert("location", &context.location);
        template_context.insert("message", &context.message);
        template_context.insert("link_url", link_url);
        template_context.insert("is_personal", &recipient.is_personal);
        template_context.insert("thread_label", thread_label(thread_type));
        template_context.insert(
            "show_confirm_button",
            &self.shows_confirm_button(context.event, recipient.role),
        );

        let html_body = self
            .engine
            .render(&format!("{event_type}.html"), &template_context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{event_type}.txt"), &template_context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let reply_to = match context.event {
            NotificationEventType::ConversationMessage => self
                .codec
                .generate_conversation_reply_to(&context.intervention_id, thread_type),
            _ => self
                .codec
                .generate_intervention_reply_to(&context.intervention_id),
        };

        let user_role: &'static str = recipient.role.into();

        Ok(BuiltEmail {
            to: recipient.email.clone(),
            subject,
            html_body,
            text_body,
            reply_to: Some(reply_to),
            tags: vec![
                EmailTag::new("type", event_type),
                EmailTag::new("intervention_id", context.intervention_id.to_string()),
                EmailTag::new("user_role", user_role),
            ],
        })
    }

    /// 日程確定メールに確認ボタンを埋め込むか
    fn shows_confirm_button(&self, event: NotificationEventType, role: UserRole) -> bool {
        self.interactive_emails
            && event == NotificationEventType::InterventionScheduled
            && matches!(role, UserRole::Provider | UserRole::Tenant)
    }
}
