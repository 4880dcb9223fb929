//! # 通知サービス
//!
//! インターベンションのイベント 1 件について、受信者解決 → 連絡先の取得 →
//! マジックリンク発行 → メール生成 → バッチ送信を統合する。
//!
//! ## 設計方針
//!
//! - **上流の失敗だけがエラー**: インターベンションが見つからない、リポジトリに接続できない
//!   場合のみ `Err` を返す。送信の失敗は [`BatchResult`] に記録する
//! - **連絡先のないユーザーも結果に残す**: ユーザーテーブルにいない受信者には送信せず、
//!   `"contact not found"` の失敗結果を受信者の順序どおりに差し込む
//! - **依存性注入**: リポジトリと送信は trait で抽象化し、`Arc<dyn Trait>` で受け取る

use std::{collections::HashMap, sync::Arc};

use seido_domain::{
    intervention::InterventionId,
    notification::{
        BatchResult,
        EmailSendResult,
        NotificationEventType,
        RecipientFilter,
        resolve_intervention_recipients,
    },
    reply_address::ThreadType,
    user::{User, UserId},
};
use seido_infra::{
    InfraError,
    repository::{InterventionRepository, UserRepository},
};
use seido_shared::event_log::error;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::{
    EmailBuilder,
    EmailDispatcher,
    InterventionEmailContext,
    MagicLinkBatchGenerator,
    MagicLinkRequest,
    NotificationRecipientContact,
};

/// ユーザーテーブルに連絡先がない受信者の失敗理由
pub const CONTACT_NOT_FOUND: &str = "contact not found";

/// 通知サービスのエラー
#[derive(Debug, Error)]
pub enum NotificationServiceError {
    /// 通知対象のインターベンションが存在しない
    #[error("インターベンションが見つかりません: {0}")]
    InterventionNotFound(InterventionId),

    /// リポジトリの取得に失敗
    #[error("リポジトリエラー: {0}")]
    Repository(#[from] InfraError),
}

/// 通知するイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionEvent {
    pub event_type:  NotificationEventType,
    /// 本文に差し込む補足（却下理由、会話メッセージなど）
    pub message:     Option<String>,
    /// 会話メッセージの宛先スレッド
    pub thread_type: Option<ThreadType>,
}

impl InterventionEvent {
    pub fn new(event_type: NotificationEventType) -> Self {
        Self {
            event_type,
            message: None,
            thread_type: None,
        }
    }
}

/// 通知サービス
pub struct NotificationService {
    interventions: Arc<dyn InterventionRepository>,
    users:         Arc<dyn UserRepository>,
    magic_links:   MagicLinkBatchGenerator,
    builder:       EmailBuilder,
    dispatcher:    EmailDispatcher,
}

impl NotificationService {
    pub fn new(
        interventions: Arc<dyn InterventionRepository>,
        users: Arc<dyn UserRepository>,
        magic_links: MagicLinkBatchGenerator,
        builder: EmailBuilder,
        dispatcher: EmailDispatcher,
    ) -> Self {
        Self {
            interventions,
            users,
            magic_links,
            builder,
            dispatcher,
        }
    }

    /// インターベンションのイベントを関係者に通知する
    ///
    /// # 戻り値
    ///
    /// - `Ok(batch)`: 送信を試みた結果（全件失敗や未設定もここに含まれる）
    /// - `Err(InterventionNotFound)`: インターベンションが存在しない
    /// - `Err(Repository)`: リポジトリの取得に失敗
    pub async fn notify_intervention_event(
        &self,
        intervention_id: &InterventionId,
        event: InterventionEvent,
        filter: &RecipientFilter,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, NotificationServiceError> {
        let intervention = self
            .interventions
            .find_with_assignments(intervention_id)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::REPOSITORY,
                    %intervention_id,
                    error = %e,
                    "インターベンションの取得に失敗"
                );
            })?
            .ok_or_else(|| NotificationServiceError::InterventionNotFound(intervention_id.clone()))?;

        let recipients = resolve_intervention_recipients(&intervention, filter);
        if recipients.is_empty() {
            tracing::info!(%intervention_id, "通知対象の受信者がいない");
            return Ok(BatchResult::empty());
        }

        if !self.dispatcher.is_configured() {
            tracing::warn!(
                %intervention_id,
                recipients = recipients.len(),
                "メール送信が未設定のため通知をスキップ"
            );
            return Ok(BatchResult::not_configured());
        }

        let user_ids: Vec<UserId> = recipients.iter().map(|r| r.user_id.clone()).collect();
        let users = self.users.find_by_ids(&user_ids).await?;
        let users_by_id: HashMap<&UserId, &User> = users.iter().map(|u| (u.id(), u)).collect();

        let contacts: Vec<NotificationRecipientContact> = recipients
            .iter()
            .filter_map(|recipient| match users_by_id.get(&recipient.user_id) {
                Some(user) => Some(NotificationRecipientContact::new(recipient, user)),
                None => {
                    tracing::warn!(
                        user_id = %recipient.user_id,
                        "連絡先が見つからない受信者には送信しない"
                    );
                    None
                }
            })
            .collect();

        let redirect_path = |contact: &NotificationRecipientContact| {
            format!(
                "{}/interventions/{}",
                contact.role.portal_path(),
                intervention_id
            )
        };

        let link_requests: Vec<MagicLinkRequest> = contacts
            .iter()
            .map(|contact| MagicLinkRequest {
                email:         contact.email.clone(),
                redirect_path: redirect_path(contact),
            })
            .collect();
        let links = self.magic_links.generate_links_batch(&link_requests).await;

        let context = InterventionEmailContext::new(&intervention, event.event_type)
            .with_message(event.message)
            .with_thread_type(event.thread_type);

        let batch = self
            .dispatcher
            .send_batch(
                &contacts,
                |contact| {
                    let link_url = links
                        .get(&contact.email)
                        .cloned()
                        .unwrap_or_else(|| self.magic_links.fallback_url(&redirect_path(contact)));
                    self.builder.build(&context, contact, &link_url)
                },
                cancel,
            )
            .await;

        if contacts.len() == recipients.len() || !batch.configured {
            return Ok(batch);
        }

        // 送信結果は contacts の順序なので、連絡先のない受信者の位置に失敗を差し込む
        let mut dispatched = batch.results.into_iter();
        let results = recipients
            .iter()
            .filter_map(|recipient| {
                if users_by_id.contains_key(&recipient.user_id) {
                    dispatched.next()
                } else {
                    Some(EmailSendResult::failed(
                        recipient.user_id.clone(),
                        "",
                        CONTACT_NOT_FOUND,
                    ))
                }
            })
            .collect();

        Ok(BatchResult::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use seido_domain::{
        intervention::{InterventionWithAssignments, TeamId},
        notification::NotificationError,
        user::{Email, UserRole},
    };
    use seido_infra::{
        mock::{
            MockInterventionRepository,
            MockMagicLinkIssuer,
            MockNotificationSender,
            MockUserRepository,
        },
        reply_address::{ReplyAddressCodec, ReplyAddressConfig},
    };

    use super::*;
    use crate::usecase::notification::DispatchPolicy;

    /// テスト用の依存一式
    struct Fixture {
        interventions: MockInterventionRepository,
        users:         MockUserRepository,
        issuer:        MockMagicLinkIssuer,
        sender:        MockNotificationSender,
        intervention:  InterventionWithAssignments,
        manager:       User,
        provider:      User,
        tenant:        User,
    }

    fn user(name: &str, email: &str, role: UserRole) -> User {
        User::new(UserId::new(), name, Email::new(email).unwrap(), role)
    }

    impl Fixture {
        fn new(sender: MockNotificationSender) -> Self {
            let manager = user("Gestionnaire", "manager@example.com", UserRole::Manager);
            let provider = user("Plombier", "provider@example.com", UserRole::Provider);
            let tenant = user("Locataire", "tenant@example.com", UserRole::Tenant);

            let intervention = InterventionWithAssignments::new(
                InterventionId::new(),
                TeamId::new(),
                "INT-2024-001",
                "Fuite d'eau",
            )
            .with_assignment(tenant.id().clone(), UserRole::Tenant)
            .with_assignment(provider.id().clone(), UserRole::Provider)
            .with_team_member(manager.id().clone(), UserRole::Manager);

            let interventions = MockInterventionRepository::new();
            interventions.add(intervention.clone());

            let users = MockUserRepository::new();
            for u in [&manager, &provider, &tenant] {
                users.add_user(u.clone());
            }

            Self {
                interventions,
                users,
                issuer: MockMagicLinkIssuer::new(),
                sender,
                intervention,
                manager,
                provider,
                tenant,
            }
        }

        fn service(&self) -> NotificationService {
            let codec = Arc::new(ReplyAddressCodec::new(ReplyAddressConfig {
                secret:         Some("test-signing-secret".to_string()),
                inbound_domain: "reply.seido.example.com".to_string(),
                display_name:   "SEIDO Intervention".to_string(),
            }));
            let policy = DispatchPolicy {
                rate_limit_delay: Duration::ZERO,
                retry_delay:      Duration::ZERO,
                max_retries:      3,
                send_timeout:     Duration::from_secs(10),
            };

            NotificationService::new(
                Arc::new(self.interventions.clone()),
                Arc::new(self.users.clone()),
                MagicLinkBatchGenerator::new(
                    Some(Arc::new(self.issuer.clone())),
                    "https://app.example.com",
                ),
                EmailBuilder::new(codec, false).unwrap(),
                EmailDispatcher::new(Arc::new(self.sender.clone()), policy),
            )
        }

        async fn notify(
            &self,
            event_type: NotificationEventType,
            filter: &RecipientFilter,
        ) -> Result<BatchResult, NotificationServiceError> {
            self.service()
                .notify_intervention_event(
                    self.intervention.id(),
                    InterventionEvent::new(event_type),
                    filter,
                    &CancellationToken::new(),
                )
                .await
        }
    }

    #[tokio::test]
    async fn test_割り当て順に全員へ送信する() {
        let fixture = Fixture::new(MockNotificationSender::new());

        let batch = fixture
            .notify(
                NotificationEventType::InterventionCompleted,
                &RecipientFilter::default(),
            )
            .await
            .unwrap();

        assert!(batch.success);
        assert_eq!(batch.sent_count, 3);
        assert_eq!(
            fixture.sender.attempts(),
            vec!["provider@example.com", "tenant@example.com", "manager@example.com"]
        );
    }

    #[tokio::test]
    async fn test_ロール別のポータルへのマジックリンクを本文に使う() {
        let fixture = Fixture::new(MockNotificationSender::new());
        let intervention_id = fixture.intervention.id().clone();

        fixture
            .notify(
                NotificationEventType::InterventionScheduled,
                &RecipientFilter::default(),
            )
            .await
            .unwrap();

        let calls = fixture.issuer.calls();
        assert!(calls.contains(&(
            "tenant@example.com".to_string(),
            format!("https://app.example.com/locataire/interventions/{intervention_id}")
        )));
        assert!(calls.contains(&(
            "provider@example.com".to_string(),
            format!("https://app.example.com/prestataire/interventions/{intervention_id}")
        )));

        let sent = fixture.sender.sent_emails();
        let tenant_email = sent.iter().find(|e| e.to == "tenant@example.com").unwrap();
        assert!(
            tenant_email
                .text_body
                .contains("https://auth.example.com/magic?email=tenant@example.com")
        );
    }

    #[tokio::test]
    async fn test_マジックリンクの発行に失敗したら直リンクを使う() {
        let fixture = Fixture::new(MockNotificationSender::new());
        fixture.issuer.fail_for("manager@example.com");
        let intervention_id = fixture.intervention.id().clone();

        let batch = fixture
            .notify(
                NotificationEventType::InterventionCreated,
                &RecipientFilter::default().only_roles([UserRole::Manager]),
            )
            .await
            .unwrap();

        assert!(batch.success);
        let sent = fixture.sender.sent_emails();
        assert!(sent[0].text_body.contains(&format!(
            "https://app.example.com/gestionnaire/interventions/{intervention_id}"
        )));
        assert!(!sent[0].text_body.contains("auth.example.com"));
    }

    #[tokio::test]
    async fn test_除外ユーザーには送信しない() {
        let fixture = Fixture::new(MockNotificationSender::new());

        let batch = fixture
            .notify(
                NotificationEventType::ConversationMessage,
                &RecipientFilter::default().excluding_user(fixture.provider.id().clone()),
            )
            .await
            .unwrap();

        assert_eq!(batch.sent_count, 2);
        assert_eq!(fixture.sender.attempts_for("provider@example.com"), 0);
    }

    #[tokio::test]
    async fn test_連絡先のない受信者は失敗として結果に残る() {
        let fixture = Fixture::new(MockNotificationSender::new());
        let ghost = UserId::new();
        let intervention = fixture
            .intervention
            .clone()
            .with_assignment(ghost.clone(), UserRole::Provider);
        let interventions = MockInterventionRepository::new();
        interventions.add(intervention);
        let fixture = Fixture {
            interventions,
            ..fixture
        };

        let batch = fixture
            .notify(
                NotificationEventType::InterventionApproved,
                &RecipientFilter::default(),
            )
            .await
            .unwrap();

        assert!(!batch.success);
        assert_eq!(batch.results.len(), 4);
        assert_eq!(batch.sent_count, 3);
        assert_eq!(batch.failed_count, 1);
        let missing = &batch.results[1];
        assert_eq!(missing.user_id, ghost);
        assert_eq!(missing.email, "");
        assert_eq!(missing.error.as_deref(), Some(CONTACT_NOT_FOUND));
        assert_eq!(fixture.sender.attempts().len(), 3);
    }

    #[tokio::test]
    async fn test_連絡先が一人もいなければ全員失敗() {
        let fixture = Fixture::new(MockNotificationSender::new());
        let fixture = Fixture {
            users: MockUserRepository::new(),
            ..fixture
        };

        let batch = fixture
            .notify(
                NotificationEventType::InterventionCreated,
                &RecipientFilter::default(),
            )
            .await
            .unwrap();

        assert!(batch.configured);
        assert!(!batch.success);
        assert_eq!(batch.failed_count, 3);
        assert!(
            batch
                .results
                .iter()
                .all(|r| r.error.as_deref() == Some(CONTACT_NOT_FOUND))
        );
        assert!(fixture.sender.attempts().is_empty());
        assert!(fixture.issuer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_受信者がいなければ空の成功バッチ() {
        let fixture = Fixture::new(MockNotificationSender::new());

        let batch = fixture
            .notify(
                NotificationEventType::InterventionCreated,
                &RecipientFilter::default()
                    .only_roles([UserRole::Manager])
                    .personal_only(),
            )
            .await
            .unwrap();

        assert_eq!(batch, BatchResult::empty());
        assert!(fixture.issuer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_未設定ならマジックリンクも発行しない() {
        let fixture = Fixture::new(MockNotificationSender::not_configured());

        let batch = fixture
            .notify(
                NotificationEventType::InterventionCreated,
                &RecipientFilter::default(),
            )
            .await
            .unwrap();

        assert!(!batch.configured);
        assert!(fixture.issuer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_送信失敗はエラーではなく結果に記録される() {
        let fixture = Fixture::new(MockNotificationSender::new());
        fixture.sender.always_fail(
            "tenant@example.com",
            NotificationError::Rejected("mailbox unavailable".to_string()),
        );

        let batch = fixture
            .notify(
                NotificationEventType::InterventionCancelled,
                &RecipientFilter::default(),
            )
            .await
            .unwrap();

        assert!(!batch.success);
        assert_eq!(batch.failed_count, 1);
        let failed = batch.results.iter().find(|r| !r.success).unwrap();
        assert_eq!(&failed.user_id, fixture.tenant.id());
    }

    #[tokio::test]
    async fn test_存在しないインターベンションはnot_found() {
        let fixture = Fixture::new(MockNotificationSender::new());

        let result = fixture
            .service()
            .notify_intervention_event(
                &InterventionId::new(),
                InterventionEvent::new(NotificationEventType::InterventionCreated),
                &RecipientFilter::default(),
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(NotificationServiceError::InterventionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_リポジトリエラーはそのまま返す() {
        let fixture = Fixture::new(MockNotificationSender::new());
        fixture.interventions.set_unavailable();

        let result = fixture
            .notify(
                NotificationEventType::InterventionCreated,
                &RecipientFilter::default(),
            )
            .await;

        assert!(matches!(result, Err(NotificationServiceError::Repository(_))));
        assert!(fixture.sender.attempts().is_empty());
    }
}
