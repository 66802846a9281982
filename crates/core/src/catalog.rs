//! Promotion Catalog Filtering
//!
//! The structural eligibility filter applied to a catalog snapshot. Storage
//! backed catalogs apply the same conditions in their queries.

use jiff::Timestamp;

use crate::{ids::BusinessId, promotions::Promotion};

/// Whether `promotion` may be offered at `now`.
///
/// Requires the pause switch to be on, `now` to fall inside the date window,
/// and the global usage limit (if any) to have headroom.
pub fn is_structurally_eligible(promotion: &Promotion<'_>, now: Timestamp) -> bool {
    promotion.is_active() && promotion.window().contains(now) && promotion.usage().has_remaining()
}

/// The promotions of `business` that are structurally eligible at `now`.
///
/// No matches is an empty list, never an error.
pub fn eligible_at<'p, 'a: 'p>(
    promotions: impl IntoIterator<Item = &'p Promotion<'a>>,
    business: &BusinessId,
    now: Timestamp,
) -> Vec<Promotion<'a>> {
    promotions
        .into_iter()
        .filter(|promotion| promotion.business() == business)
        .filter(|promotion| is_structurally_eligible(promotion, now))
        .cloned()
        .collect()
}
