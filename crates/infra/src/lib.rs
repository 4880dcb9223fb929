//! # SEIDO インフラ層
//!
//! 通知サブシステムと外部サービスとの境界を担当する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: メール送信、マジックリンク発行、リポジトリは trait で定義し、
//!   ユースケース層は `Arc<dyn Trait>` で受け取る
//! - **設定の明示的な注入**: 署名鍵や API キーは構造体でコンストラクタに渡す。
//!   コンポーネント内部で環境変数を読まない
//! - **エラー変換**: reqwest / serde_json などのエラーを [`InfraError`] にラップする
//!
//! ## モジュール構成
//!
//! - [`error`] - インフラ層エラー（SpanTrace 付き）
//! - [`notification`] - メール送信（Resend / SMTP / SES / Noop）
//! - [`magic_link`] - マジックリンク発行（Supabase Auth Admin API）
//! - [`reply_address`] - 署名付き返信先アドレスの生成と検証
//! - [`repository`] - 割り当てグラフとユーザーを取得するリポジトリ
//! - [`supabase`] - Supabase（Auth Admin API / PostgREST）の共有 HTTP クライアント
//! - `mock` - テスト用インメモリ実装（`test-utils` feature）

pub mod error;
pub mod magic_link;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod reply_address;
pub mod repository;
pub mod supabase;

pub use error::{InfraError, InfraErrorKind};
