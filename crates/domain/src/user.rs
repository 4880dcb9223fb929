//! # ユーザー
//!
//! 通知の受信者となるユーザーと、そのロールを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 用途 |
//! |---|------------|------|
//! | [`UserId`] | ユーザー ID | 受信者の一意識別子 |
//! | [`UserRole`] | ロール | 管理者（gestionnaire）、業者（prestataire）、入居者（locataire） |
//! | [`Email`] | メールアドレス | 送信先 |
//! | [`User`] | ユーザー | 通知文面の組み立てに使う読み取りモデル |
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use seido_domain::user::{Email, User, UserId, UserRole};
//!
//! let user = User::new(
//!     UserId::new(),
//!     "Marie Dupont",
//!     Email::new("marie@example.com")?,
//!     UserRole::Manager,
//! );
//!
//! assert_eq!(user.role().portal_path(), "/gestionnaire");
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, error::EmailRejection};

define_uuid_id! {
    /// ユーザー ID（一意識別子）
    pub struct UserId;
}

/// ユーザーロール
///
/// 通知受信者の立場を表す。snake_case でシリアライズされ、
/// メールのタグ（`user_role`）にもこの文字列が使われる。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
    /// 管理者（gestionnaire）
    Manager,
    /// 業者（prestataire）
    Provider,
    /// 入居者（locataire）
    Tenant,
}

impl UserRole {
    /// ロールごとのポータルのパスプレフィックスを返す
    ///
    /// マジックリンクのリダイレクト先や、リンク生成に失敗したときの
    /// フォールバック URL の組み立てに使う。
    pub fn portal_path(&self) -> &'static str {
        match self {
            Self::Manager => "/gestionnaire",
            Self::Provider => "/prestataire",
            Self::Tenant => "/locataire",
        }
    }
}

/// メールアドレス（値オブジェクト）
///
/// 生成時にバリデーションを実行し、不正な値の作成を防ぐ。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// メールアドレスを作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない（前後の空白は除去する）
    /// - `local@domain` の形式
    /// - 最大 255 文字
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        let reason = match value.split_once('@') {
            _ if value.is_empty() => Some(EmailRejection::Empty),
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                (value.len() > 255).then_some(EmailRejection::TooLong)
            }
            _ => Some(EmailRejection::Malformed),
        };

        if let Some(reason) = reason {
            return Err(DomainError::InvalidEmail { value, reason });
        }

        Ok(Self(value))
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 所有権を持つ文字列に変換する
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザー（読み取りモデル）
///
/// 受信者解決で得た `UserId` を、メール送信に必要な連絡先情報に展開するために使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id:    UserId,
    name:  String,
    email: Email,
    role:  UserRole,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, email: Email, role: UserRole) -> Self {
        Self {
            id,
            name: name.into(),
            email,
            role,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn role(&self) -> UserRole {
        self.role
    }
}
