//! # 通知サービス設定
//!
//! 環境変数から通知サービスの設定を読み込む。
//!
//! 各コンポーネントは環境変数を直接参照せず、ここで組み立てた構造体を
//! コンストラクタで受け取る。読み込みは [`AppConfig::from_lookup`] に集約し、
//! テストでは任意のキー・値の組を渡して検証する。

use std::{env, time::Duration};

use seido_infra::{
    notification::DEFAULT_RESEND_API_URL,
    reply_address::ReplyAddressConfig,
    supabase::SupabaseConfig,
};
use thiserror::Error;

use crate::usecase::notification::DispatchPolicy;

/// 設定の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{key} の値が不正です: {value}")]
    Invalid { key: &'static str, value: String },
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    /// Resend HTTP API（本番）
    Resend,
    /// Mailpit（開発）/ SMTP サーバー
    Smtp,
    /// Amazon SES v2
    Ses,
    /// 送信しない
    Noop,
}

impl NotificationBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resend" => Some(Self::Resend),
            "smtp" => Some(Self::Smtp),
            "ses" => Some(Self::Ses),
            "noop" => Some(Self::Noop),
            _ => None,
        }
    }
}

/// 通知サービスの設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// バインドアドレス
    pub host:                String,
    /// ポート番号
    pub port:                u16,
    pub notification:        NotificationConfig,
    pub reply_address:       ReplyAddressConfig,
    pub supabase:            SupabaseConfig,
    /// `false` ならマジックリンクを発行せず直リンクのみを使う
    pub magic_links_enabled: bool,
    pub dispatch:            DispatchPolicy,
}

/// メール送信の設定
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub backend:            NotificationBackend,
    /// Resend API キー（backend=resend の場合に必須）
    pub resend_api_key:     Option<String>,
    pub resend_api_url:     String,
    /// SMTP ホスト（backend=smtp の場合に使用）
    pub smtp_host:          String,
    /// SMTP ポート（backend=smtp の場合に使用）
    pub smtp_port:          u16,
    /// 送信元メールアドレス
    pub from_address:       String,
    /// フロントエンド URL（メール内リンク用）
    pub base_url:           String,
    /// 日程確定メールに確認ボタンを埋め込むか
    pub interactive_emails: bool,
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// キーから値を引く関数を使って設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup };

        let notification = NotificationConfig {
            backend:            vars.parse_with(
                "NOTIFICATION_BACKEND",
                NotificationBackend::Noop,
                NotificationBackend::parse,
            )?,
            resend_api_key:     vars.optional("RESEND_API_KEY"),
            resend_api_url:     vars.or("RESEND_API_URL", DEFAULT_RESEND_API_URL),
            smtp_host:          vars.or("SMTP_HOST", "localhost"),
            smtp_port:          vars.number("SMTP_PORT", 1025)?,
            from_address:       vars.or(
                "NOTIFICATION_FROM_ADDRESS",
                "SEIDO <notifications@seido.example.com>",
            ),
            base_url:           vars.or("NOTIFICATION_BASE_URL", "http://localhost:3000"),
            interactive_emails: vars.flag("INTERACTIVE_EMAILS_ENABLED", false)?,
        };

        if notification.backend == NotificationBackend::Resend
            && notification.resend_api_key.is_none()
        {
            return Err(ConfigError::Missing("RESEND_API_KEY"));
        }

        let defaults = DispatchPolicy::default();
        let dispatch = DispatchPolicy {
            rate_limit_delay: vars.millis(
                "NOTIFICATION_RATE_LIMIT_DELAY_MS",
                defaults.rate_limit_delay,
            )?,
            retry_delay:      vars.millis("NOTIFICATION_RETRY_DELAY_MS", defaults.retry_delay)?,
            max_retries:      vars.number("NOTIFICATION_MAX_RETRIES", defaults.max_retries)?,
            send_timeout:     vars.millis("NOTIFICATION_SEND_TIMEOUT_MS", defaults.send_timeout)?,
        };

        let port = vars.required("NOTIFICATION_PORT")?;
        let port = port.trim().parse().map_err(|_| ConfigError::Invalid {
            key:   "NOTIFICATION_PORT",
            value: port.clone(),
        })?;

        Ok(Self {
            host: vars.or("NOTIFICATION_HOST", "0.0.0.0"),
            port,
            notification,
            reply_address: ReplyAddressConfig {
                secret:         vars.optional("EMAIL_REPLY_SIGNING_SECRET"),
                inbound_domain: vars.or("EMAIL_INBOUND_DOMAIN", "reply.seido.example.com"),
                display_name:   vars.or("EMAIL_REPLY_DISPLAY_NAME", "SEIDO Intervention"),
            },
            supabase: SupabaseConfig {
                url:              vars.required("SUPABASE_URL")?,
                service_role_key: vars.required("SUPABASE_SERVICE_ROLE_KEY")?,
            },
            magic_links_enabled: vars.flag("MAGIC_LINKS_ENABLED", true)?,
            dispatch,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// 空文字列は未設定として扱う
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_with<T>(
        &self,
        key: &'static str,
        default: T,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => parse(&value).ok_or(ConfigError::Invalid { key, value }),
            None => Ok(default),
        }
    }

    fn number<T: std::str::FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        self.parse_with(key, default, |v| v.trim().parse().ok())
    }

    fn millis(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse_with(key, default, |v| {
            v.trim().parse().ok().map(Duration::from_millis)
        })
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        self.parse_with(key, default, |v| match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let mut vars: HashMap<String, String> = [
            ("NOTIFICATION_PORT", "13010"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service-role-key"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in pairs {
            vars.insert(k.to_string(), v.to_string());
        }

        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_必須項目だけでデフォルト値が埋まる() {
        let config = load(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 13010);
        assert_eq!(config.notification.backend, NotificationBackend::Noop);
        assert_eq!(config.notification.resend_api_url, "https://api.resend.com");
        assert_eq!(config.notification.smtp_port, 1025);
        assert_eq!(config.notification.base_url, "http://localhost:3000");
        assert!(!config.notification.interactive_emails);
        assert_eq!(config.reply_address.secret, None);
        assert_eq!(config.reply_address.inbound_domain, "reply.seido.example.com");
        assert!(config.magic_links_enabled);
        assert_eq!(config.dispatch, DispatchPolicy::default());
    }

    #[test]
    fn test_送信ポリシーをミリ秒で上書きできる() {
        let config = load(&[
            ("NOTIFICATION_RATE_LIMIT_DELAY_MS", "250"),
            ("NOTIFICATION_RETRY_DELAY_MS", "2000"),
            ("NOTIFICATION_MAX_RETRIES", "5"),
            ("NOTIFICATION_SEND_TIMEOUT_MS", "3000"),
        ])
        .unwrap();

        assert_eq!(
            config.dispatch,
            DispatchPolicy {
                rate_limit_delay: Duration::from_millis(250),
                retry_delay:      Duration::from_millis(2000),
                max_retries:      5,
                send_timeout:     Duration::from_millis(3000),
            }
        );
    }

    #[rstest]
    #[case("resend", NotificationBackend::Resend)]
    #[case("SMTP", NotificationBackend::Smtp)]
    #[case("ses", NotificationBackend::Ses)]
    #[case("noop", NotificationBackend::Noop)]
    fn test_送信バックエンドを切り替えられる(
        #[case] value: &str,
        #[case] expected: NotificationBackend,
    ) {
        let config = load(&[("NOTIFICATION_BACKEND", value), ("RESEND_API_KEY", "re_123")]).unwrap();

        assert_eq!(config.notification.backend, expected);
    }

    #[test]
    fn test_resendはapiキーが必須() {
        let result = load(&[("NOTIFICATION_BACKEND", "resend")]);

        assert_eq!(result.unwrap_err(), ConfigError::Missing("RESEND_API_KEY"));
    }

    #[rstest]
    #[case("NOTIFICATION_PORT")]
    #[case("SUPABASE_URL")]
    #[case("SUPABASE_SERVICE_ROLE_KEY")]
    fn test_必須項目が空ならエラー(#[case] key: &'static str) {
        let result = load(&[(key, "")]);

        assert_eq!(result.unwrap_err(), ConfigError::Missing(key));
    }

    #[rstest]
    #[case("NOTIFICATION_BACKEND", "sendgrid")]
    #[case("NOTIFICATION_PORT", "http")]
    #[case("SMTP_PORT", "70000")]
    #[case("NOTIFICATION_MAX_RETRIES", "-1")]
    #[case("MAGIC_LINKS_ENABLED", "maybe")]
    fn test_不正な値はエラー(#[case] key: &'static str, #[case] value: &str) {
        let result = load(&[(key, value)]);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                key,
                value: value.to_string(),
            }
        );
    }

    #[test]
    fn test_マジックリンクと確認ボタンを切り替えられる() {
        let config = load(&[
            ("MAGIC_LINKS_ENABLED", "false"),
            ("INTERACTIVE_EMAILS_ENABLED", "true"),
            ("EMAIL_REPLY_SIGNING_SECRET", "secret"),
        ])
        .unwrap();

        assert!(!config.magic_links_enabled);
        assert!(config.notification.interactive_emails);
        assert_eq!(config.reply_address.secret.as_deref(), Some("secret"));
    }
}
