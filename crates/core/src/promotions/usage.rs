//! Promotion Usage Limits

/// Redemption limits for a promotion and the global count so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageLimits {
    /// Maximum number of redemptions across all customers
    pub usage_limit: Option<u32>,

    /// Redemptions recorded so far
    pub usage_count: u32,

    /// Maximum number of redemptions per customer
    pub per_customer_limit: Option<u32>,
}

impl UsageLimits {
    /// Create limits with no constraints
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            usage_limit: None,
            usage_count: 0,
            per_customer_limit: None,
        }
    }

    /// Create limits with a global limit only
    #[must_use]
    pub const fn with_usage_limit(limit: u32, count: u32) -> Self {
        Self {
            usage_limit: Some(limit),
            usage_count: count,
            per_customer_limit: None,
        }
    }

    /// Create limits with a per-customer limit only
    #[must_use]
    pub const fn with_per_customer_limit(limit: u32) -> Self {
        Self {
            usage_limit: None,
            usage_count: 0,
            per_customer_limit: Some(limit),
        }
    }

    /// Check if these limits have any constraints
    #[must_use]
    pub const fn has_constraints(&self) -> bool {
        self.usage_limit.is_some() || self.per_customer_limit.is_some()
    }

    /// Whether another global redemption is still allowed.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.usage_limit
            .is_none_or(|limit| self.usage_count < limit)
    }
}
