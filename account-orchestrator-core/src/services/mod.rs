//! 业务逻辑服务层

mod checkin_service;
mod password_change_service;

pub use checkin_service::CheckinService;
pub use password_change_service::PasswordChangeService;

use std::sync::Arc;

use crate::traits::{AccountLedger, AccountPortal};

/// 服务上下文 - 持有所有依赖
///
/// 平台层需要创建此上下文，并注入具体的 ledger 与 portal 实现。
pub struct ServiceContext {
    /// 后端账本
    pub ledger: Arc<dyn AccountLedger>,
    /// 门户能力
    pub portal: Arc<dyn AccountPortal>,
}

impl ServiceContext {
    /// 创建服务上下文
    #[must_use]
    pub fn new(ledger: Arc<dyn AccountLedger>, portal: Arc<dyn AccountPortal>) -> Self {
        Self { ledger, portal }
    }
}
