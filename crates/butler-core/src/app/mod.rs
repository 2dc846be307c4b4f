//! App - アプリケーション層
//!
//! ports を組み合わせて distribute 完了通知の処理を実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: ワイヤリングと起動時検証
//! - **DistributionEventRouter**: イベントを「即通知・キュー投入・無視」に振り分け

pub mod builder;
pub mod router;

pub use self::builder::{App, AppBuilder};
pub use self::router::{DistributionEventRouter, RouteOutcome, log_route_outcome};
