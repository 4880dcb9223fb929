//! # 通知ユースケース
//!
//! インターベンションのイベント通知と、受信した返信のルーティングを扱う。
//!
//! ## モジュール構成
//!
//! - [`dispatcher`] - レート制限とリトライ付きの逐次バッチ送信
//! - [`magic_link`] - 受信者ごとのログインリンクのチャンク並行発行
//! - [`email_builder`] - tera テンプレートによるイベント別メール生成
//! - [`service`] - 受信者解決からバッチ送信までの統合サービス
//! - [`inbound`] - 受信返信の署名検証とルーティング

pub mod dispatcher;
pub mod email_builder;
pub mod inbound;
pub mod magic_link;
pub mod service;

pub use dispatcher::{DispatchPolicy, DispatchRecipient, EmailDispatcher};
pub use email_builder::{EmailBuilder, InterventionEmailContext, NotificationRecipientContact};
pub use inbound::{InboundRoute, ReplyRouter};
pub use magic_link::{MagicLinkBatchGenerator, MagicLinkRequest};
pub use service::{InterventionEvent, NotificationService, NotificationServiceError};
