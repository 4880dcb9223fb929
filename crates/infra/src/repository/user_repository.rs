//! # UserRepository
//!
//! 通知先のユーザー（名前・メールアドレス・ロール）を取得する。

use std::str::FromStr;

use async_trait::async_trait;
use seido_domain::user::{Email, User, UserId, UserRole};
use serde::Deserialize;

use crate::{
    error::InfraError,
    supabase::{REST_SERVICE, SupabaseClient, handle_response},
};

/// ユーザーリポジトリトレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 複数の ID でユーザーを一括検索
    ///
    /// 存在しない ID は無視し、見つかったユーザーのみ返す。
    /// 空の配列を渡した場合は空の Vec を返す。
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError>;
}

/// 送信できない行（メール未登録、未知のロール）は読み飛ばすため、
/// 型付けは組み立て時に行う
#[derive(Debug, Deserialize)]
struct UserRow {
    id:    UserId,
    #[serde(default)]
    name:  Option<String>,
    #[serde(default)]
    email: Option<String>,
    role:  String,
}

impl UserRow {
    fn into_domain(self) -> Result<User, &'static str> {
        let email = self
            .email
            .as_deref()
            .ok_or("メールアドレス未登録")
            .and_then(|raw| Email::new(raw).map_err(|_| "メールアドレスが不正"))?;
        let role = UserRole::from_str(&self.role).map_err(|_| "未知のロール")?;

        Ok(User::new(
            self.id,
            self.name.unwrap_or_default(),
            email,
            role,
        ))
    }
}

/// PostgREST 実装の UserRepository
#[derive(Clone)]
pub struct SupabaseUserRepository {
    client: SupabaseClient,
}

impl SupabaseUserRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserRepository for SupabaseUserRepository {
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .request(reqwest::Method::GET, "/rest/v1/users")
            .query(&[
                ("id", format!("in.({id_list})")),
                ("select", "id,name,email,role".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<UserRow> = handle_response(REST_SERVICE, response).await?;

        let users = rows
            .into_iter()
            .filter_map(|row| {
                let user_id = row.id.clone();
                row.into_domain()
                    .inspect_err(|reason| {
                        tracing::warn!(%user_id, reason, "送信できないユーザー行を読み飛ばす");
                    })
                    .ok()
            })
            .collect();

        Ok(users)
    }
}
