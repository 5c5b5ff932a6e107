//! Time deposit definitions.

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tellercore_common::time::constants;
use tellercore_common::{AccountNumber, DepositId, Money, Timestamp};

/// Time deposit status. The only transition is `Active -> Matured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositStatus {
    /// Principal is locked; interest accruing.
    Active,
    /// Principal plus interest credited back; terminal.
    Matured,
}

impl DepositStatus {
    /// Stable string form used by the relational backing.
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Active => "active",
            DepositStatus::Matured => "matured",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(DepositStatus::Active),
            "matured" => Some(DepositStatus::Matured),
            _ => None,
        }
    }
}

/// How fast a deposit reaches maturity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaturityWindow {
    /// Calendar months, approximated as 30 days each for determinism.
    Standard,
    /// Matures after 1 second. Exists purely for automated testing and must
    /// always be requested explicitly.
    Accelerated,
}

impl MaturityWindow {
    /// Time until maturity for a deposit of `duration_months`.
    pub fn window(&self, duration_months: u32) -> Duration {
        match self {
            MaturityWindow::Standard => constants::month_window() * duration_months as i32,
            MaturityWindow::Accelerated => constants::accelerated_window(),
        }
    }
}

/// A fixed-term deposit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeDeposit {
    /// Unique deposit identifier.
    pub deposit_id: DepositId,
    /// Owning account.
    pub account_number: AccountNumber,
    /// Locked principal, deducted from the account at creation.
    pub principal: Money,
    /// Term length in months (1-60).
    pub duration_months: u32,
    /// Annual interest rate as a decimal fraction (e.g. 0.025).
    pub interest_rate: Decimal,
    /// When the deposit was created.
    pub created_at: Timestamp,
    /// When the deposit may be matured.
    pub maturity_at: Timestamp,
    /// Current status.
    pub status: DepositStatus,
    /// When the deposit was matured, once it has been.
    pub matured_at: Option<Timestamp>,
    /// Principal plus interest, set at maturation.
    pub final_amount: Option<Money>,
}

impl TimeDeposit {
    /// Create a new active deposit.
    pub fn new(
        account_number: AccountNumber,
        principal: Money,
        duration_months: u32,
        interest_rate: Decimal,
        created_at: Timestamp,
        maturity_at: Timestamp,
    ) -> Self {
        Self {
            deposit_id: DepositId::new(),
            account_number,
            principal,
            duration_months,
            interest_rate,
            created_at,
            maturity_at,
            status: DepositStatus::Active,
            matured_at: None,
            final_amount: None,
        }
    }

    /// Check if the deposit has been matured.
    pub fn is_matured(&self) -> bool {
        self.status == DepositStatus::Matured
    }

    /// Mark the deposit matured. The deposit is immutable afterwards.
    pub fn mature(&mut self, final_amount: Money, at: Timestamp) {
        self.status = DepositStatus::Matured;
        self.matured_at = Some(at);
        self.final_amount = Some(final_amount);
    }
}
