//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + 乱数で ULID を作る（本番用）

use crate::domain::AdmissionId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は admission ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数の受信コンテキストから `add()` されるため）
pub trait IdGenerator: Send + Sync {
    fn generate_admission_id(&self) -> AdmissionId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使うので、FixedClock と組み合わせると timestamp 部分が決定的になる。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_admission_id(&self) -> AdmissionId {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        AdmissionId::from(ulid)
    }
}
