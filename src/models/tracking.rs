use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::job::Carrier;

/// Normalized shipment status across carriers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TrackingStatus {
    InTransit,
    Delivered,
    Exception,
    InfoReceived,
    OutForDelivery,
    Unknown,
}

/// A single scan event on a shipment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    /// Local carrier time. `None` when the carrier's date/time could not be parsed.
    pub date: Option<NaiveDateTime>,
    pub description: String,
    pub location: String,
    pub country: String,
}

/// Carrier-agnostic tracking result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub tracking_number: String,
    pub carrier: Carrier,
    pub status: TrackingStatus,
    pub delivery_date: Option<NaiveDateTime>,
    pub events: Vec<TrackingEvent>,
}

impl TrackingInfo {
    /// Build a result from events in whatever order the carrier returned them.
    ///
    /// The delivery date is the date of the first event, in carrier order, whose
    /// description mentions "delivered" (any case). Events are then sorted
    /// ascending by date; undated events sort first.
    pub fn normalize(
        tracking_number: impl Into<String>,
        carrier: Carrier,
        status: TrackingStatus,
        mut events: Vec<TrackingEvent>,
    ) -> Self {
        let delivery_date = events
            .iter()
            .find(|e| e.description.to_lowercase().contains("delivered"))
            .and_then(|e| e.date);

        events.sort_by_key(|e| e.date);

        Self {
            tracking_number: tracking_number.into(),
            carrier,
            status,
            delivery_date,
            events,
        }
    }
}
