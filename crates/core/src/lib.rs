//! Rebate
//!
//! Rebate is a promotion and discount calculation engine: it selects the
//! promotions a business has running, works out what each one is worth
//! against a cart, stacks them without ever exceeding the cart subtotal and
//! records redemptions against usage limits.

pub mod cart;
pub mod catalog;
pub mod discounts;
pub mod fixtures;
pub mod ids;
pub mod items;
pub mod ledger;
pub mod prelude;
pub mod pricing;
pub mod promotions;
pub mod receipt;
pub mod scope;
pub mod stacking;
