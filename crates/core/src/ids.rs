//! Identifiers
//!
//! Opaque string identifiers handed to the engine by its collaborators.

use std::{
    borrow::Borrow,
    fmt::{Display, Formatter, Result as FmtResult},
};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id! {
    /// Promotion identifier
    PromotionId
}

string_id! {
    /// Business (tenant) identifier
    BusinessId
}

string_id! {
    /// Customer identifier
    CustomerId
}

string_id! {
    /// Product identifier
    ProductId
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashSet;

    use super::*;

    #[test]
    fn ids_display_their_inner_value() {
        assert_eq!(PromotionId::new("promo-1").to_string(), "promo-1");
        assert_eq!(ProductId::from("prod-1").as_str(), "prod-1");
    }

    #[test]
    fn ids_can_be_looked_up_by_str() {
        let products: FxHashSet<ProductId> = [ProductId::from("prod-1")].into_iter().collect();

        assert!(products.contains("prod-1"));
        assert!(!products.contains("prod-2"));
    }
}
