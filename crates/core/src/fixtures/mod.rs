//! Fixtures
//!
//! YAML promotion catalogs and carts, laid out as
//! `<base>/promotions/<set>.yml` and `<base>/carts/<set>.yml`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use jiff::Timestamp;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    fixtures::{carts::CartFixture, promotions::PromotionsFixture},
    ids::{BusinessId, CustomerId},
    pricing::currency_from_code,
    promotions::{Promotion, PromotionError},
    scope::ScopeError,
};

pub mod carts;
pub mod promotions;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Invalid percentage format
    #[error("Invalid percentage format: {0}")]
    InvalidPercentage(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Promotion failed validation (promotion ID, cause)
    #[error("Invalid promotion {0}: {1}")]
    Promotion(String, #[source] PromotionError),

    /// Promotion scope could not be decoded (promotion ID, cause)
    #[error("Invalid scope for promotion {0}: {1}")]
    Scope(String, #[source] ScopeError),

    /// Cart failed validation
    #[error("Invalid cart: {0}")]
    Cart(#[from] CartError),

    /// No promotions file loaded yet
    #[error("No promotions loaded; business unknown")]
    NoPromotions,

    /// No cart file loaded yet
    #[error("No cart loaded")]
    NoCart,
}

/// Fixture
#[derive(Debug)]
pub struct Fixture<'a> {
    /// Base path for fixture files
    base_path: PathBuf,

    business: Option<BusinessId>,
    promotions: Vec<Promotion<'a>>,
    cart: Option<Cart<'a>>,
    customer: Option<CustomerId>,
    claimed_subtotal: Option<Money<'a, Currency>>,
    now: Option<Timestamp>,
}

impl Default for Fixture<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Fixture<'a> {
    /// Create a new empty fixture with default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a new empty fixture with custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            business: None,
            promotions: Vec::new(),
            cart: None,
            customer: None,
            claimed_subtotal: None,
            now: None,
        }
    }

    /// Load promotions from a YAML fixture file
    ///
    /// Promotions are kept sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if any
    /// promotion in it is invalid.
    pub fn load_promotions(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self
            .base_path
            .join("promotions")
            .join(format!("{name}.yml"));

        let contents = fs::read_to_string(&file_path)?;
        let fixture: PromotionsFixture = serde_norway::from_str(&contents)?;

        let currency = currency_from_code(&fixture.currency)
            .ok_or_else(|| FixtureError::UnknownCurrency(fixture.currency.clone()))?;

        for (id, promotion_fixture) in fixture.promotions {
            let promotion =
                promotion_fixture.try_into_promotion(&id, &fixture.business, currency)?;

            self.promotions.push(promotion);
        }

        self.promotions.sort_by(|a, b| a.id().cmp(b.id()));

        self.business = Some(fixture.business);

        Ok(self)
    }

    /// Load a cart from a YAML fixture file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the cart is invalid.
    pub fn load_cart(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("carts").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CartFixture = serde_norway::from_str(&contents)?;

        self.cart = Some(fixture.to_cart()?);
        self.claimed_subtotal = fixture.claimed_subtotal()?;
        self.customer = fixture.customer;
        self.now = fixture.now;

        Ok(self)
    }

    /// Load a complete fixture set (promotions and cart with the same name)
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        Self::from_set_in("./fixtures", name)
    }

    /// Load a complete fixture set from a custom base path
    ///
    /// # Errors
    ///
    /// Returns an error if any of the fixture files cannot be loaded.
    pub fn from_set_in(base_path: impl AsRef<Path>, name: &str) -> Result<Self, FixtureError> {
        let mut fixture = Self::with_base_path(base_path.as_ref());

        fixture.load_promotions(name)?.load_cart(name)?;

        Ok(fixture)
    }

    /// Business the promotions belong to
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoPromotions`] if no promotions file was loaded.
    pub fn business(&self) -> Result<&BusinessId, FixtureError> {
        self.business.as_ref().ok_or(FixtureError::NoPromotions)
    }

    /// Every loaded promotion, eligible or not
    pub fn promotions(&self) -> &[Promotion<'a>] {
        &self.promotions
    }

    /// The loaded cart
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NoCart`] if no cart file was loaded.
    pub fn cart(&self) -> Result<&Cart<'a>, FixtureError> {
        self.cart.as_ref().ok_or(FixtureError::NoCart)
    }

    /// Customer named in the cart file
    pub fn customer(&self) -> Option<&CustomerId> {
        self.customer.as_ref()
    }

    /// Subtotal claimed in the cart file
    pub fn claimed_subtotal(&self) -> Option<Money<'a, Currency>> {
        self.claimed_subtotal
    }

    /// Evaluation time named in the cart file, or the current time.
    pub fn now(&self) -> Timestamp {
        self.now.unwrap_or_else(Timestamp::now)
    }
}
