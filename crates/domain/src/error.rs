//! # ドメイン層エラー
//!
//! 値オブジェクトの生成に失敗したときのエラー。
//!
//! 受信者解決と返信先アドレスのパースはこのエラーを返さない。
//! 公開インターネットから届く不正な入力は想定内の入力として、
//! 空リスト / `None` / `false` で表す。

use thiserror::Error;

/// メールアドレスが受け付けられない理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailRejection {
    Empty,
    Malformed,
    TooLong,
}

impl std::fmt::Display for EmailRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Empty => "空です",
            Self::Malformed => "local@domain の形式ではありません",
            Self::TooLong => "255 文字を超えています",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("メールアドレスが不正です（{reason}）: {value:?}")]
    InvalidEmail {
        value:  String,
        reason: EmailRejection,
    },

    /// UUID として読めない ID 文字列
    #[error("{id_type} の形式が不正です: {value:?}")]
    InvalidId { id_type: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_メッセージに理由と入力値を含む() {
        let err = DomainError::InvalidEmail {
            value:  "marie@".to_string(),
            reason: EmailRejection::Malformed,
        };

        assert_eq!(
            err.to_string(),
            "メールアドレスが不正です（local@domain の形式ではありません）: \"marie@\""
        );
    }
}
