//! AppBuilder - distribute 監視パイプラインの構築とワイヤリング
//!
//! # ポイント
//! - ports（gateway, clock, id generator）と handler を受け取り、Router と Queue を組み立てる
//! - 起動時検証（Fail-fast）: Distribute 用の handler が無ければ build() が失敗する

use std::sync::Arc;

use crate::domain::QrsTaskType;
use crate::error::ButlerError;
use crate::ports::{Clock, IdGenerator, OutcomeHandler, SystemClock, TaskMetadataGateway, UlidGenerator};
use crate::queue::{DistributionTaskQueue, QueueConfig};

use super::router::DistributionEventRouter;

/// AppBuilder は App を構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(gateway)
///     .with_queue_config(config.distribute_queue.queue_config())
///     .with_distribute_handler(Arc::new(LoggingOutcomeHandler))?
///     .build()?;
/// ```
pub struct AppBuilder {
    gateway: Arc<dyn TaskMetadataGateway>,
    queue_config: QueueConfig,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    handler: Option<Arc<dyn OutcomeHandler>>,
}

impl AppBuilder {
    /// SystemClock と既定の QueueConfig で開始
    pub fn new(gateway: Arc<dyn TaskMetadataGateway>) -> Self {
        Self {
            gateway,
            queue_config: QueueConfig::default(),
            clock: Arc::new(SystemClock),
            ids: None,
            handler: None,
        }
    }

    pub fn with_queue_config(mut self, queue_config: QueueConfig) -> Self {
        self.queue_config = queue_config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 未指定なら clock を使う UlidGenerator
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// distribute タスクの通知先を登録（二度目はエラー）
    pub fn with_distribute_handler(
        mut self,
        handler: Arc<dyn OutcomeHandler>,
    ) -> Result<Self, ButlerError> {
        if self.handler.is_some() {
            return Err(ButlerError::DuplicateHandler(QrsTaskType::Distribute));
        }
        self.handler = Some(handler);
        Ok(self)
    }

    /// App を生成
    ///
    /// # 検証
    /// - Distribute の handler が登録されていなければ `ButlerError::MissingHandler`
    pub fn build(self) -> Result<App, ButlerError> {
        let handler = self
            .handler
            .ok_or(ButlerError::MissingHandler(QrsTaskType::Distribute))?;
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(self.clock.clone())),
        };

        let queue = DistributionTaskQueue::new(
            self.queue_config,
            self.gateway.clone(),
            handler.clone(),
            self.clock,
            ids,
        );
        let router = DistributionEventRouter::new(self.gateway, handler, queue.clone());

        Ok(App { router, queue })
    }
}

/// 組み立て済みのパイプライン
///
/// router と queue は同じキューを共有している。
pub struct App {
    pub router: DistributionEventRouter,
    pub queue: DistributionTaskQueue,
}

impl App {
    /// ポーリングを止めてキューを空にする
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
