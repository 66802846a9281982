//! Rebate prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError},
    catalog::{eligible_at, is_structurally_eligible},
    discounts::{DiscountError, compute_discount, percent_from_points, percent_points},
    ids::{BusinessId, CustomerId, ProductId, PromotionId},
    items::CartItem,
    ledger::{InMemoryUsageLedger, LedgerError, RedemptionOutcome, RedemptionReport},
    pricing::{TotalPriceError, currency_from_code, total_price},
    promotions::{
        Promotion, PromotionBuilder, PromotionError,
        kind::{BuyXGetY, PromotionKind, PromotionKindTag},
        status::{ActiveWindow, PromotionStatus},
        usage::UsageLimits,
    },
    receipt::{Receipt, ReceiptError},
    scope::{PromotionScope, ScopeError, ScopeKind, ScopeMatch},
    stacking::{AppliedPromotion, DiscountResult, StackingError, resolve},
};
