//! Promotions Repositories

pub(crate) mod promotions;
pub(crate) mod redemptions;
