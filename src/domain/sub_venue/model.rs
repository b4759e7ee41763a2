//! Sub-venue domain entity

use chrono::{DateTime, Utc};

use crate::domain::slot::Category;

/// A bookable court/pitch inside a venue
#[derive(Debug, Clone)]
pub struct SubVenue {
    pub id: String,
    pub venue_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Sports this sub-venue can host
    pub categories: Vec<Category>,
    pub created_at: DateTime<Utc>,
}

impl SubVenue {
    pub fn supports(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}
