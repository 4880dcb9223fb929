//! # マジックリンク一括生成
//!
//! 受信者ごとのログインリンクをチャンク単位で並行に発行する。
//! 発行に失敗した受信者はマップに含めず、呼び出し元は [`MagicLinkBatchGenerator::fallback_url`]
//! （ログインが必要な直リンク）を使う。

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use seido_infra::magic_link::MagicLinkIssuer;
use seido_shared::event_log::error;
use tokio::task::JoinSet;

/// 1 チャンクで同時に発行する件数
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// チャンク間の待機時間
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(100);

/// マジックリンクの発行依頼
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLinkRequest {
    pub email:         String,
    /// ログイン後の遷移先パス（例: `/locataire/interventions/{id}`）
    pub redirect_path: String,
}

/// マジックリンク一括生成
pub struct MagicLinkBatchGenerator {
    issuer:      Option<Arc<dyn MagicLinkIssuer>>,
    base_url:    String,
    chunk_size:  usize,
    chunk_delay: Duration,
}

impl MagicLinkBatchGenerator {
    /// 新しい生成器を作成する
    ///
    /// `issuer` が `None` の場合は何も発行せず、常に空のマップを返す。
    pub fn new(issuer: Option<Arc<dyn MagicLinkIssuer>>, base_url: &str) -> Self {
        Self {
            issuer,
            base_url: base_url.trim_end_matches('/').to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_delay: Duration) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.chunk_delay = chunk_delay;
        self
    }

    /// マジックリンクを使わない直リンク
    pub fn fallback_url(&self, redirect_path: &str) -> String {
        format!("{}{}", self.base_url, redirect_path)
    }

    /// メールアドレスからマジックリンクへのマップを返す
    ///
    /// 同じメールアドレスが複数回現れた場合は最初の依頼だけを発行する。
    pub async fn generate_links_batch(
        &self,
        requests: &[MagicLinkRequest],
    ) -> HashMap<String, String> {
        let mut links = HashMap::new();
        let Some(issuer) = &self.issuer else {
            return links;
        };

        let mut seen = HashSet::new();
        let unique: Vec<&MagicLinkRequest> = requests
            .iter()
            .filter(|r| seen.insert(r.email.as_str()))
            .collect();

        for (index, chunk) in unique.chunks(self.chunk_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.chunk_delay).await;
            }

            let mut tasks = JoinSet::new();
            for request in chunk {
                let issuer = Arc::clone(issuer);
                let email = request.email.clone();
                let redirect_to = self.fallback_url(&request.redirect_path);
                tasks.spawn(async move {
                    let result = issuer.generate_link(&email, &redirect_to).await;
                    (email, result)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((email, Ok(link))) => {
                        links.insert(email, link);
                    }
                    Ok((email, Err(e))) => {
                        tracing::warn!(
                            error.category = error::category::EXTERNAL_SERVICE,
                            error.kind = error::kind::MAGIC_LINK,
                            recipient = %email,
                            error = %e,
                            "マジックリンクの発行に失敗: 直リンクで代替"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "マジックリンク発行タスクが異常終了");
                    }
                }
            }
        }

        tracing::debug!(
            requested = unique.len(),
            issued = links.len(),
            "マジックリンクの一括発行完了"
        );

        links
    }
}
