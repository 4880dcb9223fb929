//! # SEIDO 通知ドメイン層
//!
//! 通知配信と返信ルーティングの中核となるドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **純粋性**: 外部サービス（メール送信、認証、DB）には一切依存しない
//! - **失敗しない関数**: 受信者解決と返信先アドレスのパースは、不正な入力に対しても
//!   panic やエラーではなく空リスト / `None` を返す
//! - **値オブジェクト**: ID や列挙値は Newtype / enum で型安全性を確保
//!
//! ## 依存関係の方向
//!
//! ```text
//! notification-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`user`] - ユーザーとロール
//! - [`intervention`] - インターベンション（修繕依頼）と担当割り当て
//! - [`notification`] - 受信者解決、メール記述子、送信結果
//! - [`reply_address`] - 返信先アドレスの文法とルーティング対象
//!
//! ## 使用例
//!
//! ```rust
//! use seido_domain::{
//!     intervention::{InterventionId, InterventionWithAssignments, TeamId},
//!     notification::{RecipientFilter, resolve_intervention_recipients},
//! };
//!
//! let intervention = InterventionWithAssignments::new(
//!     InterventionId::new(),
//!     TeamId::new(),
//!     "INT-2024-001",
//!     "水漏れ修理",
//! );
//!
//! // 割り当ても管理者もいなければ受信者は空
//! let recipients = resolve_intervention_recipients(&intervention, &RecipientFilter::default());
//! assert!(recipients.is_empty());
//! ```

#[macro_use]
mod macros;

pub mod error;
pub mod intervention;
pub mod notification;
pub mod reply_address;
pub mod user;

pub use error::{DomainError, EmailRejection};
