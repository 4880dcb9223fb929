//! # SEIDO 通知サービス サーバー
//!
//! ## 起動方法
//!
//! ```bash
//! cargo run -p seido-notification-service
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `NOTIFICATION_PORT` | Yes | ポート番号 |
//! | `SUPABASE_URL` | Yes | Supabase プロジェクト URL |
//! | `SUPABASE_SERVICE_ROLE_KEY` | Yes | service role キー |
//! | `NOTIFICATION_BACKEND` | No | `resend` / `smtp` / `ses` / `noop`（デフォルト: `noop`） |
//! | `EMAIL_REPLY_SIGNING_SECRET` | No | 返信先アドレスの署名鍵（未設定なら返信ルーティング無効） |
//!
//! その他の変数は `seido_notification_service::config` を参照。

use std::{net::SocketAddr, sync::Arc};

use seido_infra::{
    magic_link::{MagicLinkIssuer, SupabaseMagicLinkIssuer},
    notification::{
        NoopNotificationSender,
        NotificationSender,
        ResendNotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
    },
    reply_address::ReplyAddressCodec,
    repository::{SupabaseInterventionRepository, SupabaseUserRepository},
    supabase::SupabaseClient,
};
use seido_notification_service::{
    config::{AppConfig, NotificationBackend, NotificationConfig},
    handler::{InboundState, NotificationState},
    router,
    usecase::{
        NotificationService,
        ReplyRouter,
        notification::{EmailBuilder, EmailDispatcher, MagicLinkBatchGenerator},
    },
};
use seido_shared::observability::{TracingConfig, init_tracing};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("notification-service"))?;

    let config = AppConfig::from_env()?;

    tracing::info!(
        "通知サービスを起動します: {}:{}",
        config.host,
        config.port
    );

    let sender = build_sender(&config.notification).await;
    let supabase = SupabaseClient::new(&config.supabase);
    let codec = Arc::new(ReplyAddressCodec::new(config.reply_address.clone()));

    let issuer: Option<Arc<dyn MagicLinkIssuer>> = if config.magic_links_enabled {
        Some(Arc::new(SupabaseMagicLinkIssuer::new(supabase.clone())))
    } else {
        tracing::info!("マジックリンクは無効: 直リンクのみを使用");
        None
    };

    let service = NotificationService::new(
        Arc::new(SupabaseInterventionRepository::new(supabase.clone())),
        Arc::new(SupabaseUserRepository::new(supabase)),
        MagicLinkBatchGenerator::new(issuer, &config.notification.base_url),
        EmailBuilder::new(Arc::clone(&codec), config.notification.interactive_emails)?,
        EmailDispatcher::new(sender, config.dispatch.clone()),
    );

    let shutdown = CancellationToken::new();
    let notification_state = Arc::new(NotificationState {
        service,
        cancel: shutdown.clone(),
    });
    let inbound_state = Arc::new(InboundState {
        router: ReplyRouter::new(codec),
    });

    let app = router(notification_state, inbound_state)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("通知サービスが起動しました: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("通知サービスを停止しました");
    Ok(())
}

/// 設定に応じた送信バックエンドを組み立てる
async fn build_sender(config: &NotificationConfig) -> Arc<dyn NotificationSender> {
    match config.backend {
        NotificationBackend::Resend => {
            tracing::info!("通知バックエンド: Resend（{}）", config.resend_api_url);
            Arc::new(ResendNotificationSender::new(
                &config.resend_api_url,
                config.resend_api_key.clone().unwrap_or_default(),
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Smtp => {
            tracing::info!(
                "通知バックエンド: SMTP（{}:{}）",
                config.smtp_host,
                config.smtp_port
            );
            Arc::new(SmtpNotificationSender::new(
                &config.smtp_host,
                config.smtp_port,
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Ses => {
            tracing::info!("通知バックエンド: Amazon SES");
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = aws_sdk_sesv2::Client::new(&aws_config);
            Arc::new(SesNotificationSender::new(client, config.from_address.clone()))
        }
        NotificationBackend::Noop => {
            tracing::info!("通知バックエンド: Noop（送信しない）");
            Arc::new(NoopNotificationSender)
        }
    }
}

/// SIGINT / SIGTERM を待ち、受信したらキャンセルトークンを発火する
///
/// 実行中のバッチは次の待機または受信者の合間で打ち切られる。
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C ハンドラの登録に失敗");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM ハンドラの登録に失敗");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("SIGINT を受信: シャットダウンを開始"),
        () = terminate => tracing::info!("SIGTERM を受信: シャットダウンを開始"),
    }

    shutdown.cancel();
}
