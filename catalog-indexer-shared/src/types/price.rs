//! Price range types, shaped like the storefront's price range.

use serde::{Deserialize, Serialize};

/// An amount tagged with its currency. Both parts are `None` when prices are hidden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub value: Option<f64>,
    pub currency: Option<String>,
}

impl Money {
    pub fn new(value: f64, currency: impl Into<String>) -> Self {
        Self {
            value: Some(value),
            currency: Some(currency.into()),
        }
    }
}

/// Difference between a regular and a final price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub amount_off: f64,
    pub percent_off: f64,
}

/// Price values at one end of a range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub regular_price: Money,
    pub final_price: Money,
    pub discount: Option<Discount>,
}

impl PriceBand {
    /// The hidden-price sentinel: every value is null, not zero.
    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn is_hidden(&self) -> bool {
        self.regular_price.value.is_none() && self.final_price.value.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub minimum_price: PriceBand,
    pub maximum_price: PriceBand,
}
