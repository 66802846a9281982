//! Usage Ledger
//!
//! Records redemptions against promotion usage limits once a sale has been
//! committed. Each promotion's counters live in their own cell behind a
//! mutex; the limit check and the increment happen under one lock, so the
//! global count can never pass its limit however many threads redeem at once.

use std::{fmt, sync::Mutex};

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    ids::{CustomerId, PromotionId},
    promotions::{Promotion, usage::UsageLimits},
};

new_key_type! {
    /// Usage Cell Key
    pub struct UsageCellKey;
}

/// Errors raised by the ledger itself, as opposed to rejected redemptions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// A thread panicked while holding a promotion's counters.
    #[error("usage counters for promotion {0} are poisoned")]
    Poisoned(PromotionId),
}

/// Result of a single redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// The redemption was recorded; carries the new global usage count.
    Recorded(u32),

    /// The global usage limit had already been reached.
    LimitReached,

    /// The customer had already reached their per-customer limit.
    CustomerLimitReached,

    /// The promotion is not known to the ledger.
    UnknownPromotion,
}

impl RedemptionOutcome {
    /// Whether the redemption was recorded.
    pub const fn is_recorded(self) -> bool {
        matches!(self, Self::Recorded(_))
    }

    /// Short machine-readable name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recorded(_) => "recorded",
            Self::LimitReached => "limit_reached",
            Self::CustomerLimitReached => "customer_limit_reached",
            Self::UnknownPromotion => "unknown_promotion",
        }
    }
}

/// Outcome of redeeming every promotion applied to one sale.
///
/// Rejected entries are promotions the customer was shown but which could
/// no longer be honoured; checkout must re-subtract them and tell the customer.
/// Failed entries are attempts the ledger could not complete at all; whether
/// they were counted is unknown until reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedemptionReport {
    recorded: Vec<(PromotionId, u32)>,
    rejected: Vec<(PromotionId, RedemptionOutcome)>,
    failed: Vec<(PromotionId, String)>,
}

impl RedemptionReport {
    /// Whether `promotion_id` already has an entry in this report.
    pub fn contains(&self, promotion_id: &PromotionId) -> bool {
        self.recorded.iter().any(|(id, _)| id == promotion_id)
            || self.rejected.iter().any(|(id, _)| id == promotion_id)
            || self.failed.iter().any(|(id, _)| id == promotion_id)
    }

    /// Add an attempt that errored before reaching an outcome.
    pub fn push_failure(&mut self, promotion_id: PromotionId, error: impl fmt::Display) {
        self.failed.push((promotion_id, error.to_string()));
    }

    /// Promotions whose attempt errored, with the error message
    pub fn failed(&self) -> &[(PromotionId, String)] {
        &self.failed
    }

    /// Add one attempt's outcome to the report.
    pub fn push(&mut self, promotion_id: PromotionId, outcome: RedemptionOutcome) {
        match outcome {
            RedemptionOutcome::Recorded(count) => self.recorded.push((promotion_id, count)),
            rejected => self.rejected.push((promotion_id, rejected)),
        }
    }

    /// Recorded promotions with their new global usage counts
    pub fn recorded(&self) -> &[(PromotionId, u32)] {
        &self.recorded
    }

    /// Promotions that could not be redeemed, with the reason
    pub fn rejected(&self) -> &[(PromotionId, RedemptionOutcome)] {
        &self.rejected
    }

    /// Whether every attempt was recorded.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug)]
struct UsageCell {
    limits: UsageLimits,
    per_customer: FxHashMap<CustomerId, u32>,
}

impl UsageCell {
    fn redeem(&mut self, customer: Option<&CustomerId>) -> RedemptionOutcome {
        if !self.limits.has_remaining() {
            return RedemptionOutcome::LimitReached;
        }

        let customer_limit = self.limits.per_customer_limit.zip(customer);

        if let Some((limit, customer)) = customer_limit {
            let used = self.per_customer.get(customer).copied().unwrap_or_default();

            if used >= limit {
                return RedemptionOutcome::CustomerLimitReached;
            }
        }

        let Some(count) = self.limits.usage_count.checked_add(1) else {
            return RedemptionOutcome::LimitReached;
        };

        self.limits.usage_count = count;

        if let Some((_, customer)) = customer_limit {
            let used = self.per_customer.entry(customer.clone()).or_default();

            *used = used.saturating_add(1);
        }

        RedemptionOutcome::Recorded(count)
    }
}

/// In-process usage ledger.
///
/// Register promotions up front, then share the ledger across threads.
#[derive(Debug, Default)]
pub struct InMemoryUsageLedger {
    cells: SlotMap<UsageCellKey, Mutex<UsageCell>>,
    keys: FxHashMap<PromotionId, UsageCellKey>,
}

impl InMemoryUsageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger seeded with the usage limits of `promotions`.
    pub fn with_promotions<'p, 'a: 'p>(
        promotions: impl IntoIterator<Item = &'p Promotion<'a>>,
    ) -> Self {
        let mut ledger = Self::new();

        for promotion in promotions {
            ledger.register(promotion.id().clone(), *promotion.usage());
        }

        ledger
    }

    /// Register (or replace) the limits for a promotion.
    pub fn register(&mut self, promotion_id: PromotionId, limits: UsageLimits) -> UsageCellKey {
        let cell = Mutex::new(UsageCell {
            limits,
            per_customer: FxHashMap::default(),
        });

        if let Some(&key) = self.keys.get(&promotion_id)
            && let Some(existing) = self.cells.get_mut(key)
        {
            *existing = cell;

            return key;
        }

        let key = self.cells.insert(cell);

        self.keys.insert(promotion_id, key);

        key
    }

    /// Current limits and global count for a promotion.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Poisoned`] if the promotion's cell is poisoned.
    pub fn usage(&self, promotion_id: &PromotionId) -> Result<Option<UsageLimits>, LedgerError> {
        let Some(cell) = self.cell(promotion_id) else {
            return Ok(None);
        };

        let cell = cell
            .lock()
            .map_err(|_poisoned| LedgerError::Poisoned(promotion_id.clone()))?;

        Ok(Some(cell.limits))
    }

    /// Redemptions recorded for one customer against a promotion with a per-customer limit.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Poisoned`] if the promotion's cell is poisoned.
    pub fn customer_usage(
        &self,
        promotion_id: &PromotionId,
        customer: &CustomerId,
    ) -> Result<u32, LedgerError> {
        let Some(cell) = self.cell(promotion_id) else {
            return Ok(0);
        };

        let cell = cell
            .lock()
            .map_err(|_poisoned| LedgerError::Poisoned(promotion_id.clone()))?;

        Ok(cell.per_customer.get(customer).copied().unwrap_or_default())
    }

    /// Attempt to record one redemption of `promotion_id`.
    ///
    /// The global and per-customer counters are checked and incremented under
    /// the same lock, so either both move or neither does.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Poisoned`] if the promotion's cell is poisoned.
    pub fn try_record_redemption(
        &self,
        promotion_id: &PromotionId,
        customer: Option<&CustomerId>,
    ) -> Result<RedemptionOutcome, LedgerError> {
        let Some(cell) = self.cell(promotion_id) else {
            return Ok(RedemptionOutcome::UnknownPromotion);
        };

        let outcome = cell
            .lock()
            .map_err(|_poisoned| LedgerError::Poisoned(promotion_id.clone()))?
            .redeem(customer);

        match outcome {
            RedemptionOutcome::Recorded(usage_count) => {
                info!(promotion = %promotion_id, usage_count, "recorded redemption");
            }
            rejected => {
                warn!(
                    promotion = %promotion_id,
                    outcome = rejected.as_str(),
                    "redemption rejected"
                );
            }
        }

        Ok(outcome)
    }

    /// Record one redemption for each promotion applied to a committed sale.
    ///
    /// Each distinct promotion gets exactly one attempt; repeated IDs are
    /// ignored. Rejections and poisoned cells are collected in the report
    /// rather than retried, and the remaining promotions are still attempted.
    pub fn record_batch<'i>(
        &self,
        promotion_ids: impl IntoIterator<Item = &'i PromotionId>,
        customer: Option<&CustomerId>,
    ) -> RedemptionReport {
        let mut report = RedemptionReport::default();

        for promotion_id in promotion_ids {
            if report.contains(promotion_id) {
                continue;
            }

            match self.try_record_redemption(promotion_id, customer) {
                Ok(outcome) => report.push(promotion_id.clone(), outcome),
                Err(error) => {
                    warn!(promotion = %promotion_id, %error, "redemption failed");

                    report.push_failure(promotion_id.clone(), error);
                }
            }
        }

        report
    }

    fn cell(&self, promotion_id: &PromotionId) -> Option<&Mutex<UsageCell>> {
        self.keys
            .get(promotion_id)
            .and_then(|&key| self.cells.get(key))
    }
}
