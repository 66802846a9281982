//! Rebate Domain Concerns

pub mod promotions;
