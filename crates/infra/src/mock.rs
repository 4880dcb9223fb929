//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! seido-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! いずれも `Clone` で内部状態を共有する。テストでは clone を `Arc<dyn Trait>` として
//! ユースケースに渡し、手元に残した方で呼び出し履歴を検査する。

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use seido_domain::{
    intervention::{InterventionId, InterventionWithAssignments},
    notification::{BuiltEmail, NotificationError, SentMessage},
    user::{User, UserId},
};

use crate::{
    error::InfraError,
    magic_link::MagicLinkIssuer,
    notification::NotificationSender,
    repository::{InterventionRepository, UserRepository},
};

// ===== MockNotificationSender =====

#[derive(Default)]
struct SenderState {
    /// 宛先ごとに、次の送信から順に返すエラー
    scripted:    HashMap<String, VecDeque<NotificationError>>,
    /// 宛先ごとに、常に返すエラー
    always_fail: HashMap<String, NotificationError>,
    attempts:    Vec<String>,
    sent:        Vec<BuiltEmail>,
}

/// 送信結果を宛先ごとに台本化できるメール送信モック
///
/// 台本のない宛先への送信は成功し、`mock-{n}` 形式のメッセージ ID を返す。
#[derive(Clone)]
pub struct MockNotificationSender {
    state:      Arc<Mutex<SenderState>>,
    configured: bool,
    latency:    Option<Duration>,
}

impl Default for MockNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self {
            state:      Arc::new(Mutex::new(SenderState::default())),
            configured: true,
            latency:    None,
        }
    }

    /// 送信バックエンド未設定を模擬する
    pub fn not_configured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// 1 回の送信にかかる時間を設定する（タイムアウトのテスト用）
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 指定した宛先への次の送信で、順にエラーを返す
    pub fn fail_next(&self, to: &str, errors: impl IntoIterator<Item = NotificationError>) {
        self.state
            .lock()
            .unwrap()
            .scripted
            .entry(to.to_string())
            .or_default()
            .extend(errors);
    }

    /// 指定した宛先への送信を常に失敗させる
    pub fn always_fail(&self, to: &str, error: NotificationError) {
        self.state
            .lock()
            .unwrap()
            .always_fail
            .insert(to.to_string(), error);
    }

    /// 送信を試行した宛先（試行順）
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// 指定した宛先への試行回数
    pub fn attempts_for(&self, to: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|a| a.as_str() == to)
            .count()
    }

    /// 送信に成功したメール（送信順）
    pub fn sent_emails(&self) -> Vec<BuiltEmail> {
        self.state.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &BuiltEmail) -> Result<SentMessage, NotificationError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().unwrap();
        state.attempts.push(email.to.clone());

        if let Some(error) = state.always_fail.get(&email.to) {
            return Err(error.clone());
        }
        if let Some(error) = state
            .scripted
            .get_mut(&email.to)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }

        state.sent.push(email.clone());
        Ok(SentMessage {
            message_id: Some(format!("mock-{}", state.sent.len())),
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

// ===== MockMagicLinkIssuer =====

/// マジックリンク発行モック
///
/// `https://auth.example.com/magic?email={email}&redirect_to={redirect_to}` を返す。
#[derive(Clone, Default)]
pub struct MockMagicLinkIssuer {
    failing:   Arc<Mutex<HashSet<String>>>,
    calls:     Arc<Mutex<Vec<(String, String)>>>,
    in_flight: Arc<AtomicUsize>,
    peak:      Arc<AtomicUsize>,
    latency:   Option<Duration>,
}

impl MockMagicLinkIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 1 件の発行にかかる時間を設定する（並行数の検査用）
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 指定したメールアドレスの発行を失敗させる
    pub fn fail_for(&self, email: &str) {
        self.failing.lock().unwrap().insert(email.to_string());
    }

    /// 呼び出し履歴（メールアドレス, リダイレクト先）
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// 同時に実行中だった発行数の最大値
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MagicLinkIssuer for MockMagicLinkIssuer {
    async fn generate_link(&self, email: &str, redirect_to: &str) -> Result<String, InfraError> {
        self.calls
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.to_string()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(email) {
            return Err(InfraError::external_service(
                "mock-auth",
                422,
                format!("{email} は発行できません"),
            ));
        }

        Ok(format!(
            "https://auth.example.com/magic?email={email}&redirect_to={redirect_to}"
        ))
    }
}

// ===== MockInterventionRepository =====

#[derive(Clone, Default)]
pub struct MockInterventionRepository {
    interventions: Arc<Mutex<Vec<InterventionWithAssignments>>>,
    unavailable:   Arc<Mutex<bool>>,
}

impl MockInterventionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, intervention: InterventionWithAssignments) {
        self.interventions.lock().unwrap().push(intervention);
    }

    /// 以降の取得を通信エラーにする
    pub fn set_unavailable(&self) {
        *self.unavailable.lock().unwrap() = true;
    }
}

#[async_trait]
impl InterventionRepository for MockInterventionRepository {
    async fn find_with_assignments(
        &self,
        id: &InterventionId,
    ) -> Result<Option<InterventionWithAssignments>, InfraError> {
        if *self.unavailable.lock().unwrap() {
            return Err(InfraError::unexpected("リポジトリに接続できません"));
        }
        Ok(self
            .interventions
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id() == id)
            .cloned())
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(u.id()))
            .cloned()
            .collect())
    }
}
