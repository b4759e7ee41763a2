//! Read-side booking queries for the payer.

use std::sync::Arc;

use reqwest::Url;

use crate::domain::booking::Booking;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

const CALENDAR_TEMPLATE_URL: &str = "https://calendar.google.com/calendar/render";
const CALENDAR_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

pub struct BookingQueries {
    repos: Arc<dyn RepositoryProvider>,
}

impl BookingQueries {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Newest first
    pub async fn list_for_payer(&self, payer_id: &str) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_for_payer(payer_id).await
    }

    pub async fn get_for_payer(&self, payer_id: &str, booking_id: &str) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", "id", booking_id))?;

        if !booking.is_owned_by(payer_id) {
            return Err(DomainError::Unauthorized(
                "You can only view your own bookings".to_string(),
            ));
        }
        Ok(booking)
    }

    /// "Add to Google Calendar" link for a booking.
    pub async fn calendar_link(&self, payer_id: &str, booking_id: &str) -> DomainResult<Url> {
        let booking = self.get_for_payer(payer_id, booking_id).await?;
        let snapshot = booking.snapshot();

        let place = self
            .repos
            .sub_venues()
            .find_by_id(&snapshot.sub_venue_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_else(|| snapshot.sub_venue_id.clone());

        let dates = format!(
            "{}/{}",
            snapshot.start_at.format(CALENDAR_DATE_FORMAT),
            snapshot.end_at.format(CALENDAR_DATE_FORMAT)
        );
        let details = format!(
            "{} booking {} ({})",
            snapshot.category,
            booking.id,
            booking.status()
        );
        let location = format!("{},{}", snapshot.latitude, snapshot.longitude);
        let title = format!("{} at {}", snapshot.category, place);

        Url::parse_with_params(
            CALENDAR_TEMPLATE_URL,
            &[
                ("action", "TEMPLATE"),
                ("text", title.as_str()),
                ("dates", dates.as_str()),
                ("details", details.as_str()),
                ("location", location.as_str()),
            ],
        )
        .map_err(|e| DomainError::InvariantViolation(format!("Invalid calendar link: {}", e)))
    }
}
