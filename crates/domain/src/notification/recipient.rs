//! 受信者解決
//!
//! インターベンションの割り当てグラフから、通知すべきユーザーの
//! 重複なしリストを求める純粋関数。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    intervention::InterventionWithAssignments,
    user::{UserId, UserRole},
};

/// 通知受信者
///
/// `is_personal = true` はトリガーとなったエンティティに直接割り当てられていることを表す。
/// `false` はチームメンバーとして閲覧権限があるだけの受信者。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecipient {
    pub user_id:     UserId,
    pub role:        UserRole,
    pub is_personal: bool,
}

/// 受信者フィルタ
///
/// `exclude_roles` と `only_roles` は排他。両方指定された場合は
/// `exclude_roles` が優先され、`only_roles` は無視される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecipientFilter {
    /// 通知から除外するユーザー（通常はイベントを起こした本人）
    pub exclude_user_id:      Option<UserId>,
    pub exclude_roles:        Vec<UserRole>,
    pub only_roles:           Vec<UserRole>,
    /// 直接割り当てられた受信者のみを残す
    pub exclude_non_personal: bool,
}

impl RecipientFilter {
    pub fn excluding_user(mut self, user_id: UserId) -> Self {
        self.exclude_user_id = Some(user_id);
        self
    }

    pub fn excluding_roles(mut self, roles: impl IntoIterator<Item = UserRole>) -> Self {
        self.exclude_roles = roles.into_iter().collect();
        self
    }

    pub fn only_roles(mut self, roles: impl IntoIterator<Item = UserRole>) -> Self {
        self.only_roles = roles.into_iter().collect();
        self
    }

    pub fn personal_only(mut self) -> Self {
        self.exclude_non_personal = true;
        self
    }

    fn keeps_role(&self, role: UserRole) -> bool {
        if !self.exclude_roles.is_empty() {
            return !self.exclude_roles.contains(&role);
        }
        if !self.only_roles.is_empty() {
            return self.only_roles.contains(&role);
        }
        true
    }
}

/// 直接割り当ての評価順。管理者 → 業者 → 入居者。
const ASSIGNMENT_ORDER: [UserRole; 3] = [UserRole::Manager, UserRole::Provider, UserRole::Tenant];

/// インターベンションの通知受信者を解決する
///
/// 1. 管理者として直接割り当てられたユーザー（個人宛て）
/// 2. 業者として直接割り当てられたユーザー（個人宛て）
/// 3. 入居者として直接割り当てられたユーザー（個人宛て）
/// 4. まだ含まれていないチームの管理者（チーム宛て）
///
/// 同じユーザーが複数回現れた場合は最初に追加されたものが残る。
/// したがって直接割り当てられた管理者は、チーム管理者としてではなく個人宛てで現れる。
/// `exclude_user_id` はどの段階でも追加されない。
///
/// 受信者がいない場合は空のリストを返す（呼び出し元は成功として扱う）。
pub fn resolve_intervention_recipients(
    intervention: &InterventionWithAssignments,
    filter: &RecipientFilter,
) -> Vec<NotificationRecipient> {
    let mut seen: HashSet<UserId> = HashSet::new();
    let mut recipients = Vec::new();

    let mut push = |user_id: &UserId, role: UserRole, is_personal: bool| {
        if filter.exclude_user_id.as_ref() == Some(user_id) {
            return;
        }
        if !seen.insert(user_id.clone()) {
            return;
        }
        recipients.push(NotificationRecipient {
            user_id: user_id.clone(),
            role,
            is_personal,
        });
    };

    for role in ASSIGNMENT_ORDER {
        for user_id in intervention.assigned_with_role(role) {
            push(user_id, role, true);
        }
    }

    for member in intervention.team_members() {
        if member.role == UserRole::Manager {
            push(&member.user_id, UserRole::Manager, false);
        }
    }

    recipients
        .into_iter()
        .filter(|r| !filter.exclude_non_personal || r.is_personal)
        .filter(|r| filter.keeps_role(r.role))
        .collect()
}
