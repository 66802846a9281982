//! Promotion Scope
//!
//! Which cart lines a promotion is allowed to discount.

use std::str::FromStr;

use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    cart::Cart,
    ids::ProductId,
    items::CartItem,
    pricing::{TotalPriceError, total_price},
};

/// Errors raised while decoding a scope from storage or fixtures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    /// The scope kind is not one the engine understands.
    #[error("unrecognised scope kind: {0}")]
    UnknownKind(String),

    /// A category scope was declared without a category.
    #[error("category scope requires a category")]
    MissingCategory,
}

/// Scope kinds as they are named at the storage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Every line
    All,

    /// Lines in one category
    Category,

    /// Lines for an explicit product list
    Products,
}

impl ScopeKind {
    /// Storage name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Category => "category",
            Self::Products => "products",
        }
    }
}

impl FromStr for ScopeKind {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "category" => Ok(Self::Category),
            "products" => Ok(Self::Products),
            _ => Err(ScopeError::UnknownKind(s.to_string())),
        }
    }
}

/// The subset of a cart a promotion may discount.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PromotionScope {
    /// All lines
    #[default]
    All,

    /// Lines whose category matches, ignoring case
    Category(String),

    /// Lines whose product is listed
    Products(FxHashSet<ProductId>),
}

impl PromotionScope {
    /// Build a scope from its storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::UnknownKind`] for unrecognised kinds and
    /// [`ScopeError::MissingCategory`] for a category scope without a category.
    pub fn from_parts(
        kind: &str,
        category: Option<String>,
        products: impl IntoIterator<Item = ProductId>,
    ) -> Result<Self, ScopeError> {
        match kind.parse::<ScopeKind>()? {
            ScopeKind::All => Ok(Self::All),
            ScopeKind::Category => category
                .filter(|category| !category.trim().is_empty())
                .map(Self::Category)
                .ok_or(ScopeError::MissingCategory),
            ScopeKind::Products => Ok(Self::Products(products.into_iter().collect())),
        }
    }

    /// Return the kind of this scope.
    #[must_use]
    pub const fn kind(&self) -> ScopeKind {
        match self {
            Self::All => ScopeKind::All,
            Self::Category(_) => ScopeKind::Category,
            Self::Products(_) => ScopeKind::Products,
        }
    }

    /// Whether a single line falls within this scope.
    #[must_use]
    pub fn contains(&self, item: &CartItem<'_>) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => same_category(item.category(), category),
            Self::Products(products) => products.contains(item.product()),
        }
    }

    /// Select the lines of `cart` within this scope and total them.
    ///
    /// # Errors
    ///
    /// Returns a [`TotalPriceError`] if the eligible subtotal overflows.
    pub fn matches<'c, 'a>(
        &self,
        cart: &'c Cart<'a>,
    ) -> Result<ScopeMatch<'c, 'a>, TotalPriceError> {
        let items: SmallVec<[&'c CartItem<'a>; 10]> =
            cart.iter().filter(|item| self.contains(item)).collect();

        let subtotal = total_price(items.iter().copied(), cart.currency())?;

        let quantity = items.iter().map(|item| u64::from(item.quantity())).sum();

        Ok(ScopeMatch {
            items,
            subtotal,
            quantity,
        })
    }
}

/// Case-insensitive category comparison, Unicode-aware for non-ASCII names.
fn same_category(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        a.eq_ignore_ascii_case(b)
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}

/// The lines matched by a scope, with their subtotal and unit count.
#[derive(Debug, Clone)]
pub struct ScopeMatch<'c, 'a> {
    items: SmallVec<[&'c CartItem<'a>; 10]>,
    subtotal: Money<'a, Currency>,
    quantity: u64,
}

impl<'c, 'a> ScopeMatch<'c, 'a> {
    /// Matched lines
    pub fn items(&self) -> &[&'c CartItem<'a>] {
        &self.items
    }

    /// `Σ quantity × unit_price` over the matched lines
    pub fn subtotal(&self) -> Money<'a, Currency> {
        self.subtotal
    }

    /// Total units across the matched lines
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
