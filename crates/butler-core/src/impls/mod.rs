//! Impls - ports の開発用・テスト用実装
//!
//! # 含まれる実装
//! - **InMemoryMetadataGateway**: 台本付きの QRS 代替
//! - **LoggingOutcomeHandler**: 結果をログに書く通知先
//! - **RecordingOutcomeHandler**: 呼び出しを記録する通知先（テスト用）
//!
//! 本番の QRS クライアントや通知先はこのクレートの外に置く。

pub mod inmem_gateway;
pub mod log_handler;
pub mod recording_handler;

pub use self::inmem_gateway::InMemoryMetadataGateway;
pub use self::log_handler::LoggingOutcomeHandler;
pub use self::recording_handler::{RecordedOutcome, RecordingOutcomeHandler};
