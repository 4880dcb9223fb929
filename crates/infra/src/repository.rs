//! # リポジトリ
//!
//! 通知に必要なドメインエンティティを取得するリポジトリ。
//!
//! ## 設計方針
//!
//! - **読み取り専用**: 通知サブシステムは割り当てグラフとユーザーを読むだけで、書き込まない
//! - **データベース非依存**: 永続化スキーマはこのサブシステムの外にあり、
//!   Supabase の PostgREST 経由で読み取る
//! - **テスタビリティ**: トレイト経由でモック可能な設計

pub mod intervention_repository;
pub mod user_repository;

pub use intervention_repository::{InterventionRepository, SupabaseInterventionRepository};
pub use user_repository::{SupabaseUserRepository, UserRepository};
