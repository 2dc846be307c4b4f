//! butler-core
//!
//! Tracks Qlik Sense Enterprise (client-managed) distribute tasks to completion and routes the
//! final outcome to success/failure handlers.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, QrsTaskType, ExecutionStatus, TaskMetadata, DistributionEvent, AdmissionId）
//! - **ports**: 抽象化レイヤー（TaskMetadataGateway, OutcomeHandler, Clock, IdGenerator）
//! - **queue**: DistributionTaskQueue とエントリの状態機械
//! - **app**: AppBuilder, DistributionEventRouter
//! - **impls**: 実装（InMemoryMetadataGateway など開発用）
//! - **config**: figment による設定読み込み
//! - **observability**: tracing subscriber の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
