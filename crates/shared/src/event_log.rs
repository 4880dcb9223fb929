//! # ビジネスイベントログ
//!
//! 送信結果と返信ルーティングの判定を、JSON ログから後で集計できる形で出力する。
//!
//! ```text
//! jq 'select(.["event.kind"] == "business_event" and .["event.action"] == "notification.failed")'
//! ```
//!
//! フィールド名はドット区切り（`event.action`、`error.kind`）。JSON 出力では
//! フラットなキーになる。値には下の定数を使い、表記揺れを防ぐ。

/// `event.kind = "business_event"` を付けて info レベルで出力する
///
/// `event.category` / `event.action` / `event.result` は必ず渡す。
/// 対象があれば `event.entity_type` と `event.entity_id` も渡す。
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

pub mod event {
    pub mod category {
        pub const NOTIFICATION: &str = "notification";
        pub const INBOUND_REPLY: &str = "inbound_reply";
    }

    pub mod action {
        // 送信
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
        pub const BATCH_COMPLETED: &str = "notification.batch_completed";

        // 返信ルーティング
        pub const REPLY_ROUTED: &str = "reply.routed";
        pub const REPLY_REJECTED: &str = "reply.rejected";
    }

    pub mod entity_type {
        pub const INTERVENTION: &str = "intervention";
        pub const CONVERSATION_THREAD: &str = "conversation_thread";
        pub const EMAIL: &str = "email";
    }

    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// 警告・エラーログに付ける `error.category` / `error.kind`
pub mod error {
    pub mod category {
        /// リポジトリ、テンプレート
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（メール送信プロバイダ、認証サービス）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    pub mod kind {
        pub const EMAIL_TRANSPORT: &str = "email_transport";
        pub const MAGIC_LINK: &str = "magic_link";
        pub const TEMPLATE: &str = "template";
        pub const REPOSITORY: &str = "repository";
    }
}
