//! Why an event is being cancelled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cancellation reason selected by the organizer in the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    OrganizerDecision,
    LowTicketSales,
    VenueIssue,
    ForceMajeure,
    SafetyConcern,
    WeatherConditions,
    ArtistUnavailable,
    Other,
}

impl CancellationReason {
    /// All reasons in the order they are offered to the organizer.
    pub const ALL: [CancellationReason; 8] = [
        CancellationReason::OrganizerDecision,
        CancellationReason::LowTicketSales,
        CancellationReason::VenueIssue,
        CancellationReason::ForceMajeure,
        CancellationReason::SafetyConcern,
        CancellationReason::WeatherConditions,
        CancellationReason::ArtistUnavailable,
        CancellationReason::Other,
    ];

    /// Short label.
    pub fn display_text(&self) -> &'static str {
        match self {
            CancellationReason::OrganizerDecision => "Organizer decision",
            CancellationReason::LowTicketSales => "Low ticket sales",
            CancellationReason::VenueIssue => "Venue issue",
            CancellationReason::ForceMajeure => "Force majeure",
            CancellationReason::SafetyConcern => "Safety concern",
            CancellationReason::WeatherConditions => "Weather conditions",
            CancellationReason::ArtistUnavailable => "Artist unavailable",
            CancellationReason::Other => "Other",
        }
    }

    /// Sentence used in attendee notifications.
    pub fn attendee_explanation(&self) -> &'static str {
        match self {
            CancellationReason::OrganizerDecision => {
                "The organizer has decided not to go ahead with the event."
            }
            CancellationReason::LowTicketSales => {
                "Ticket sales were not sufficient for the event to take place."
            }
            CancellationReason::VenueIssue => "The venue is no longer able to host the event.",
            CancellationReason::ForceMajeure => {
                "Circumstances beyond our control prevent the event from taking place."
            }
            CancellationReason::SafetyConcern => {
                "The event cannot be held safely and has been called off."
            }
            CancellationReason::WeatherConditions => {
                "Forecast weather conditions make it impossible to hold the event."
            }
            CancellationReason::ArtistUnavailable => {
                "The headlining performer is no longer able to attend."
            }
            CancellationReason::Other => "The event has been cancelled by the organizer.",
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}
