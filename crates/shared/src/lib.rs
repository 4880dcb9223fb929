//! # SEIDO 共有ユーティリティ
//!
//! 通知サブシステムの各クレートで使用される共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - 外部クレートへの依存は最小限に抑える（トレーシング関連は feature で有効化）

pub mod api_response;
pub mod error_response;
pub mod event_log;
pub mod observability;

pub use api_response::ApiResponse;
pub use error_response::ErrorResponse;
