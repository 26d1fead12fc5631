//! Errors - 生成 API のエラー分類
//!
//! AI 呼び出しの失敗は必ず `ErrorKind` のどれかに分類する。
//! 文字列マッチングで判定するのは adapter の内側だけ。

use serde::{Deserialize, Serialize};

/// ErrorKind は生成 API の失敗の分類
///
/// どの種類もリトライはしない（再実行はユーザー操作）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid or rejected API key.
    Auth,
    /// Rate limit or quota exhausted.
    Quota,
    /// Transport failure (connect, DNS, reset, timeout).
    Network,
    /// Blocked by the provider's content-safety policy.
    Safety,
    /// The provider answered but the payload was empty or not the expected shape.
    MalformedResponse,
    Unknown,
}

impl ErrorKind {
    /// Fixed user-facing message for this kind.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Auth => "Authentication failed: the API key is invalid. Check this channel's settings.",
            ErrorKind::Quota => "Quota exceeded: the service is busy. Wait a few seconds and try again.",
            ErrorKind::Network => "Network error: check your internet connection.",
            ErrorKind::Safety => "Content blocked: the request violates the provider's safety policy.",
            ErrorKind::MalformedResponse => "The AI returned no usable data.",
            ErrorKind::Unknown => "Unexpected system error.",
        }
    }
}

/// GenerationError は ContentGenerator が返す唯一のエラー型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} ({detail})", kind.user_message())]
pub struct GenerationError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl GenerationError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedResponse, detail)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, detail)
    }
}
