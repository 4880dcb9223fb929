//! # トレーシング初期化
//!
//! 通知サービスのログ出力を組み立てる。
//!
//! - `LOG_FORMAT`: `json`（本番、1 行 1 イベント）または `pretty`（開発）
//! - `RUST_LOG`: フィルタ指定。未設定なら [`DEFAULT_FILTER`]
//!
//! JSON 出力ではビジネスイベントのドット記法フィールド（`event.action` など）が
//! トップレベルのキーになるよう、イベントをフラット化して出力する。

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,seido=debug,tower_http=info";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 JSON オブジェクト
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// 大文字小文字を区別せずにパースする。未知の値は `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub service_name: String,
    pub log_format:   LogFormat,
    /// `EnvFilter` のディレクティブ
    pub filter:       String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_format:   LogFormat::default(),
            filter:       DEFAULT_FILTER.to_string(),
        }
    }

    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// `LOG_FORMAT` と `RUST_LOG` を読む
    ///
    /// `LOG_FORMAT` が不正な値のときは Pretty のまま stderr に警告を出す
    /// （この時点ではまだ subscriber が無いため）。
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        service_name: impl Into<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Self::new(service_name);

        if let Some(raw) = lookup("LOG_FORMAT") {
            match LogFormat::parse(&raw) {
                Some(format) => config.log_format = format,
                None => eprintln!("LOG_FORMAT={raw:?} は不明な値のため pretty で出力します"),
            }
        }
        if let Some(filter) = lookup("RUST_LOG").filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }

        config
    }
}

/// グローバル subscriber を登録する
///
/// `tracing_error::ErrorLayer` も登録し、`InfraError` の `SpanTrace` に
/// ハンドラからリポジトリまでの呼び出し経路が残るようにする。
/// 既に subscriber が登録済みならエラーを返す。
#[cfg(feature = "observability")]
pub fn init_tracing(
    config: &TracingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
        eprintln!("RUST_LOG={:?} を解釈できません（{e}）", config.filter);
        EnvFilter::new(DEFAULT_FILTER)
    });

    let output = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(tracing_error::ErrorLayer::default())
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        format = ?config.log_format,
        "ログ出力を初期化"
    );
    Ok(())
}
