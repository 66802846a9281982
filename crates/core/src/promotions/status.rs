//! Promotion Status
//!
//! Status is always derived from the pause switch, the date window and the
//! current time. It is never stored.

use std::fmt;

use jiff::Timestamp;

/// Inclusive date window; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveWindow {
    start_at: Option<Timestamp>,
    end_at: Option<Timestamp>,
}

impl ActiveWindow {
    /// Create a window. Ordering of the bounds is validated by the promotion builder.
    pub const fn new(start_at: Option<Timestamp>, end_at: Option<Timestamp>) -> Self {
        Self { start_at, end_at }
    }

    /// A window with neither bound.
    pub const fn open() -> Self {
        Self::new(None, None)
    }

    /// Start of the window
    pub const fn start_at(&self) -> Option<Timestamp> {
        self.start_at
    }

    /// End of the window
    pub const fn end_at(&self) -> Option<Timestamp> {
        self.end_at
    }

    /// `now < start_at`
    pub fn has_not_started(&self, now: Timestamp) -> bool {
        self.start_at.is_some_and(|start| now < start)
    }

    /// `now > end_at`
    pub fn has_ended(&self, now: Timestamp) -> bool {
        self.end_at.is_some_and(|end| now > end)
    }

    /// `start_at ≤ now ≤ end_at`, treating missing bounds as open.
    pub fn contains(&self, now: Timestamp) -> bool {
        !self.has_not_started(now) && !self.has_ended(now)
    }

    /// Whether the bounds are ordered.
    pub fn is_well_formed(&self) -> bool {
        match (self.start_at, self.end_at) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }
}

/// Display status of a promotion at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromotionStatus {
    /// Manually paused
    Paused,

    /// Window has not opened yet
    Scheduled,

    /// Window has closed
    Expired,

    /// Running
    Active,
}

impl PromotionStatus {
    /// Derive the status. Pausing wins over the window.
    pub fn derive(is_active: bool, window: &ActiveWindow, now: Timestamp) -> Self {
        if !is_active {
            Self::Paused
        } else if window.has_not_started(now) {
            Self::Scheduled
        } else if window.has_ended(now) {
            Self::Expired
        } else {
            Self::Active
        }
    }

    /// Display name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paused => "paused",
            Self::Scheduled => "scheduled",
            Self::Expired => "expired",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn window() -> Result<ActiveWindow, jiff::Error> {
        Ok(ActiveWindow::new(
            Some("2025-01-01T00:00:00Z".parse()?),
            Some("2025-01-31T23:59:59Z".parse()?),
        ))
    }

    #[test]
    fn paused_wins_over_window() -> TestResult {
        let now: Timestamp = "2025-01-15T12:00:00Z".parse()?;

        assert_eq!(
            PromotionStatus::derive(false, &window()?, now),
            PromotionStatus::Paused
        );

        Ok(())
    }

    #[test]
    fn before_start_is_scheduled() -> TestResult {
        let now: Timestamp = "2024-12-31T23:59:59Z".parse()?;

        assert_eq!(
            PromotionStatus::derive(true, &window()?, now),
            PromotionStatus::Scheduled
        );

        Ok(())
    }

    #[test]
    fn after_end_is_expired() -> TestResult {
        let now: Timestamp = "2025-02-01T00:00:00Z".parse()?;

        assert_eq!(
            PromotionStatus::derive(true, &window()?, now),
            PromotionStatus::Expired
        );

        Ok(())
    }

    #[test]
    fn window_bounds_are_inclusive() -> TestResult {
        let window = window()?;

        assert!(window.contains("2025-01-01T00:00:00Z".parse()?));
        assert!(window.contains("2025-01-31T23:59:59Z".parse()?));
        assert_eq!(
            PromotionStatus::derive(true, &window, "2025-01-01T00:00:00Z".parse()?),
            PromotionStatus::Active
        );

        Ok(())
    }

    #[test]
    fn open_window_is_always_active() {
        let window = ActiveWindow::open();

        assert_eq!(
            PromotionStatus::derive(true, &window, Timestamp::UNIX_EPOCH),
            PromotionStatus::Active
        );
        assert!(window.is_well_formed());
    }

    #[test]
    fn reversed_window_is_not_well_formed() -> TestResult {
        let window = ActiveWindow::new(
            Some("2025-02-01T00:00:00Z".parse()?),
            Some("2025-01-01T00:00:00Z".parse()?),
        );

        assert!(!window.is_well_formed());

        Ok(())
    }
}
