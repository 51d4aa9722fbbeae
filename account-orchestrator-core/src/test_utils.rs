//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use account_orchestrator_portal::{
    AccountPortal, AcquireOutcome, CheckinMode, CheckinOutcome, PortalError, RotationOutcome,
    RotationRequest, UserSnapshot,
};

use crate::eligibility;
use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::traits::AccountLedger;
use crate::types::{
    Account, AccountPatch, AccountType, BalanceChange, EligibleBatch, PasswordChangeRequest,
    RotationReport, RotationStatus,
};

// ===== MockLedger =====

pub struct MockLedger {
    accounts: RwLock<Vec<Account>>,
    patches: RwLock<Vec<(String, AccountPatch)>>,
    rotation_reports: RwLock<Vec<(String, RotationReport)>>,
    /// 如果 Some，下一次 increment_balance 返回此错误（消费一次）
    increment_error: RwLock<Option<CoreError>>,
    /// 如果 Some，update_account 返回此错误
    update_error: RwLock<Option<String>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            patches: RwLock::new(Vec::new()),
            rotation_reports: RwLock::new(Vec::new()),
            increment_error: RwLock::new(None),
            update_error: RwLock::new(None),
        }
    }

    pub async fn insert_account(&self, account: Account) {
        self.accounts.write().await.push(account);
    }

    pub async fn account(&self, id: &str) -> Option<Account> {
        self.accounts
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub async fn patches(&self) -> Vec<(String, AccountPatch)> {
        self.patches.read().await.clone()
    }

    pub async fn rotation_reports(&self) -> Vec<(String, RotationReport)> {
        self.rotation_reports.read().await.clone()
    }

    pub async fn set_increment_error(&self, err: Option<CoreError>) {
        *self.increment_error.write().await = err;
    }

    pub async fn set_update_error(&self, err: Option<String>) {
        *self.update_error.write().await = err;
    }
}

#[async_trait]
impl AccountLedger for MockLedger {
    async fn find_due_for_checkin(&self, limit: Option<u32>) -> CoreResult<EligibleBatch> {
        let now = Utc::now();
        let accounts: Vec<Account> = self
            .accounts
            .read()
            .await
            .iter()
            .take(limit.map_or(usize::MAX, |l| l as usize))
            .cloned()
            .collect();
        Ok(EligibleBatch {
            accounts,
            as_of: Some(now),
            reference_date: eligibility::reference_date(now, chrono_tz::Asia::Shanghai),
        })
    }

    async fn increment_balance(
        &self,
        account_id: &str,
        amount: i64,
    ) -> CoreResult<BalanceChange> {
        if let Some(err) = self.increment_error.write().await.take() {
            return Err(err);
        }

        let mut accounts = self.accounts.write().await;
        let account = accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;

        let old_balance = account.balance;
        if amount < 0 && old_balance < -amount {
            return Err(CoreError::InsufficientBalance {
                account_id: account_id.to_string(),
                balance: old_balance,
                requested: -amount,
            });
        }
        account.balance = old_balance + amount;
        Ok(BalanceChange {
            old_balance,
            new_balance: account.balance,
        })
    }

    async fn update_account(&self, account_id: &str, patch: &AccountPatch) -> CoreResult<u64> {
        if let Some(ref msg) = *self.update_error.read().await {
            return Err(CoreError::LedgerError(msg.clone()));
        }

        self.patches
            .write()
            .await
            .push((account_id.to_string(), patch.clone()));

        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.iter_mut().find(|a| a.id == account_id) else {
            return Ok(0);
        };
        if let Some(ref username) = patch.username {
            account.username = username.clone();
        }
        if let Some(ref password) = patch.password {
            account.password = password.clone();
        }
        if let Some(ref session) = patch.session {
            account.session = session.clone();
            account.session_expire_time = patch.session_expire_time;
        }
        if let Some(checkin_date) = patch.checkin_date {
            account.checkin_date = Some(checkin_date);
        }
        if let Some(used) = patch.used {
            account.used = used;
        }
        Ok(1)
    }

    async fn update_rotation_request(
        &self,
        request_id: &str,
        report: &RotationReport,
    ) -> CoreResult<()> {
        self.rotation_reports
            .write()
            .await
            .push((request_id.to_string(), report.clone()));
        Ok(())
    }
}

// ===== MockPortal =====

pub struct MockPortal {
    acquire_results: RwLock<VecDeque<Result<AcquireOutcome, PortalError>>>,
    rotate_results: RwLock<VecDeque<Result<RotationOutcome, PortalError>>>,
    acquire_calls: RwLock<Vec<(String, String, CheckinMode)>>,
    rotate_calls: RwLock<Vec<RotationRequest>>,
}

impl MockPortal {
    pub fn new() -> Self {
        Self {
            acquire_results: RwLock::new(VecDeque::new()),
            rotate_results: RwLock::new(VecDeque::new()),
            acquire_calls: RwLock::new(Vec::new()),
            rotate_calls: RwLock::new(Vec::new()),
        }
    }

    pub async fn push_acquire(&self, result: Result<AcquireOutcome, PortalError>) {
        self.acquire_results.write().await.push_back(result);
    }

    pub async fn push_rotate(&self, result: Result<RotationOutcome, PortalError>) {
        self.rotate_results.write().await.push_back(result);
    }

    pub async fn acquire_calls(&self) -> Vec<(String, String, CheckinMode)> {
        self.acquire_calls.read().await.clone()
    }

    pub async fn rotate_calls(&self) -> Vec<RotationRequest> {
        self.rotate_calls.read().await.clone()
    }
}

#[async_trait]
impl AccountPortal for MockPortal {
    async fn acquire(
        &self,
        username: &str,
        password: &str,
        mode: CheckinMode,
    ) -> Result<AcquireOutcome, PortalError> {
        self.acquire_calls
            .write()
            .await
            .push((username.to_string(), password.to_string(), mode));
        self.acquire_results
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Err(PortalError::ApiError {
                    raw_code: None,
                    raw_message: "no scripted acquire result".to_string(),
                })
            })
    }

    async fn rotate_credentials(
        &self,
        rotation: &RotationRequest,
    ) -> Result<RotationOutcome, PortalError> {
        self.rotate_calls.write().await.push(rotation.clone());
        self.rotate_results
            .write()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Err(PortalError::ApiError {
                    raw_code: None,
                    raw_message: "no scripted rotate result".to_string(),
                })
            })
    }
}

// ===== 工厂方法 =====

pub struct TestContext {
    pub ctx: Arc<ServiceContext>,
    pub ledger: Arc<MockLedger>,
    pub portal: Arc<MockPortal>,
}

/// 创建测试用 `ServiceContext` 及其 mock 依赖
pub fn create_test_context() -> TestContext {
    let ledger = Arc::new(MockLedger::new());
    let portal = Arc::new(MockPortal::new());
    let ctx = Arc::new(ServiceContext::new(ledger.clone(), portal.clone()));
    TestContext {
        ctx,
        ledger,
        portal,
    }
}

/// 创建一个待签到的测试账户
pub fn test_account(id: &str, balance: i64) -> Account {
    Account {
        id: id.to_string(),
        owner_id: "user-1".to_string(),
        account_type: AccountType::Password,
        username: "alice".to_string(),
        password: "pw".to_string(),
        session: String::new(),
        session_expire_time: None,
        checkin_mode: CheckinMode::Portal,
        checkin_date: None,
        balance,
        used: 0,
        is_sold: false,
        can_sell: true,
    }
}

pub fn snapshot(username: &str, balance: i64) -> UserSnapshot {
    UserSnapshot {
        username: username.to_string(),
        balance,
        used: 0,
        extra: serde_json::Map::new(),
    }
}

pub fn test_outcome(
    session: &str,
    snapshot: UserSnapshot,
    checkin: CheckinOutcome,
) -> AcquireOutcome {
    AcquireOutcome {
        session: session.to_string(),
        user_id: "u-1".to_string(),
        snapshot,
        checkin,
    }
}

pub fn rotation_outcome(username: &str) -> RotationOutcome {
    RotationOutcome {
        user_id: "u-1".to_string(),
        snapshot: snapshot(username, 0),
    }
}

pub fn test_request(
    id: &str,
    new_username: Option<&str>,
    new_password: Option<&str>,
    error_count: u32,
) -> PasswordChangeRequest {
    PasswordChangeRequest {
        id: id.to_string(),
        old_username: "alice".to_string(),
        old_password: "pw".to_string(),
        new_username: new_username.map(str::to_string),
        new_password: new_password.map(str::to_string),
        status: RotationStatus::NotStarted,
        error_count,
        completed_at: None,
    }
}
