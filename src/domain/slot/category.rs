//! Sport categories and per-category pricing

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::errors::DomainError;

/// Sport a slot can be booked for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum Category {
    Cricket,
    Football,
    Badminton,
    Tennis,
    Basketball,
    Pickleball,
    Volleyball,
    TableTennis,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Self::Cricket,
        Self::Football,
        Self::Badminton,
        Self::Tennis,
        Self::Basketball,
        Self::Pickleball,
        Self::Volleyball,
        Self::TableTennis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cricket => "Cricket",
            Self::Football => "Football",
            Self::Badminton => "Badminton",
            Self::Tennis => "Tennis",
            Self::Basketball => "Basketball",
            Self::Pickleball => "Pickleball",
            Self::Volleyball => "Volleyball",
            Self::TableTennis => "TableTennis",
        }
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| DomainError::Validation(format!("Unknown category: {}", s)))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Price per category, in major currency units (e.g. 1000 = ₹1000.00).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceMap(BTreeMap<Category, Decimal>);

impl PriceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a price map, rejecting zero or negative prices.
    pub fn try_from_iter(
        prices: impl IntoIterator<Item = (Category, Decimal)>,
    ) -> Result<Self, DomainError> {
        let map: BTreeMap<Category, Decimal> = prices.into_iter().collect();
        if let Some((category, price)) = map.iter().find(|(_, p)| **p <= Decimal::ZERO) {
            return Err(DomainError::Validation(format!(
                "Price for {} must be positive, got {}",
                category, price
            )));
        }
        Ok(Self(map))
    }

    pub fn with(mut self, category: Category, price: Decimal) -> Self {
        self.0.insert(category, price);
        self
    }

    pub fn get(&self, category: Category) -> Option<Decimal> {
        self.0.get(&category).copied()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains_key(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &Decimal)> {
        self.0.iter()
    }

    /// Price for `category` converted to integer currency subunits.
    pub fn amount_in_subunits(&self, category: Category, subunit_factor: u32) -> Option<i64> {
        let price = self.get(category)?;
        (price * Decimal::from(subunit_factor)).round().to_i64()
    }
}
