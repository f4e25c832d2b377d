//! DownstreamClient port - 下流 API 呼び出しの抽象化
//!
//! 下流 API は「任意のレイテンシで JSON を返すか、失敗する」不透明な
//! リモート呼び出しとして扱います。Worker のテストではスタブ実装に
//! 差し替えます。

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::DownstreamError;

/// Invokes the external API with the task's two URL parameters.
///
/// The call may take arbitrarily long; whether a deadline applies is an
/// implementation concern (see `HttpDownstreamClient`).
#[async_trait]
pub trait DownstreamClient: Send + Sync {
    /// One outbound request. Returns the parsed JSON body, or a
    /// [`DownstreamError`] describing transport failure, a non-success
    /// status, or an unparseable body.
    async fn invoke(&self, main_url: &str, meme_url: &str) -> Result<Value, DownstreamError>;
}
