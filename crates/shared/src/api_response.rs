//! # 成功レスポンスの包み
//!
//! 内部 API の成功レスポンスは常に `{ "data": ... }` の形で返す。
//! 呼び出し側（Next.js のサーバーアクション）は `data` だけを読む。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}
