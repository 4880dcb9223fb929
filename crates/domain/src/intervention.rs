//! # インターベンション
//!
//! 通知のトリガーとなるインターベンション（修繕・作業依頼）と、
//! その担当割り当てグラフを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 用途 |
//! |---|------------|------|
//! | [`InterventionWithAssignments`] | 割り当て付きインターベンション | 受信者解決の入力 |
//! | [`InterventionAssignment`] | 直接割り当て | 個人宛て通知の対象 |
//! | [`TeamMember`] | チームメンバー | チーム宛て通知の対象（管理者のみ） |
//!
//! 永続化スキーマは扱わない。リポジトリはこの読み取りモデルを返す。

use crate::user::{UserId, UserRole};

define_uuid_id! {
    /// インターベンション ID
    ///
    /// 返信先アドレスに正規形（8-4-4-4-12 の小文字 16 進）で埋め込まれる。
    pub struct InterventionId;
}

define_uuid_id! {
    /// チーム ID
    pub struct TeamId;
}

/// インターベンションへの直接割り当て
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionAssignment {
    pub user_id: UserId,
    pub role:    UserRole,
}

/// チームメンバー
///
/// インターベンションに直接割り当てられていなくても、
/// チームの管理者は閲覧権限を持つため通知対象になりうる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    pub user_id: UserId,
    pub role:    UserRole,
}

/// 割り当て付きインターベンション（読み取りモデル）
///
/// `assignments` の順序はリポジトリが返した順序を保持する。
/// 受信者解決は同じロール内でこの順序に従う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterventionWithAssignments {
    id:           InterventionId,
    team_id:      TeamId,
    reference:    String,
    title:        String,
    description:  Option<String>,
    location:     Option<String>,
    assignments:  Vec<InterventionAssignment>,
    team_members: Vec<TeamMember>,
}

impl InterventionWithAssignments {
    /// 割り当てのないインターベンションを作成する
    pub fn new(
        id: InterventionId,
        team_id: TeamId,
        reference: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            team_id,
            reference: reference.into(),
            title: title.into(),
            description: None,
            location: None,
            assignments: Vec::new(),
            team_members: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// 直接割り当てを追加する
    pub fn with_assignment(mut self, user_id: UserId, role: UserRole) -> Self {
        self.assignments
            .push(InterventionAssignment { user_id, role });
        self
    }

    /// チームメンバーを追加する
    pub fn with_team_member(mut self, user_id: UserId, role: UserRole) -> Self {
        self.team_members.push(TeamMember { user_id, role });
        self
    }

    pub fn id(&self) -> &InterventionId {
        &self.id
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    /// 表示用の参照番号（例: `INT-2024-001`）
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// 物件・区画の表示名
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn assignments(&self) -> &[InterventionAssignment] {
        &self.assignments
    }

    pub fn team_members(&self) -> &[TeamMember] {
        &self.team_members
    }

    /// 指定ロールで直接割り当てられたユーザーを、割り当て順に返す
    pub fn assigned_with_role(&self, role: UserRole) -> impl Iterator<Item = &UserId> {
        self.assignments
            .iter()
            .filter(move |a| a.role == role)
            .map(|a| &a.user_id)
    }
}
