//! Ports - 抽象化レイヤー
//!
//! 外部システム（QRS、通知先）と時刻・ID 生成へのインターフェース。
//! キューとルーターはこれらの trait だけに依存する。
//!
//! QRS と通知先の呼び出しは `*_isolated` を通す。呼び出しを別タスクで動かし、
//! panic も `Err` として返す。

pub mod clock;
pub mod id_generator;
pub mod metadata_gateway;
pub mod outcome_handler;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::metadata_gateway::{TaskMetadataGateway, exists_isolated, fetch_isolated};
pub use self::outcome_handler::{OutcomeHandler, deliver_outcome, deliver_outcome_isolated};

/// Run `call` on its own task. A panic inside it comes back as `Err(reason)`.
async fn isolate<T, F>(call: F) -> Result<T, String>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(call).await.map_err(|err| {
        if !err.is_panic() {
            return "task cancelled".to_string();
        }
        let payload = err.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn isolate_returns_the_value() {
        assert_eq!(isolate(async { 7 }).await, Ok(7));
    }

    async fn explode(message: String) {
        panic!("{message}");
    }

    #[tokio::test]
    async fn isolate_turns_a_panic_into_its_message() {
        let result = isolate(explode("sink exploded".to_string())).await;
        assert_eq!(result, Err("sink exploded".to_string()));
    }

    #[tokio::test]
    async fn isolate_reports_static_str_panics() {
        let result = isolate(async {
            let items: Vec<u32> = Vec::new();
            items.first().copied().unwrap_or_else(|| panic!("empty"))
        })
        .await;
        assert_eq!(result, Err("empty".to_string()));
    }
}
