//! UPS payload to [`TrackingInfo`] mapping.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::job::Carrier;
use crate::models::tracking::{TrackingEvent, TrackingInfo, TrackingStatus};
use crate::models::ups::{UpsTrackDetail, UpsTrackResponse};
use crate::services::tracker::TrackError;

/// Map a raw UPS response into a normalized result.
///
/// Only the first track detail is used. A response without any detail is a lookup failure;
/// unparseable dates on individual events are not.
pub fn ups_to_tracking(response: UpsTrackResponse) -> Result<TrackingInfo, TrackError> {
    let detail = response.track_details.into_iter().next().ok_or_else(|| {
        TrackError::Lookup(format!(
            "UPS response contained no tracking details (status {})",
            response.status_text.as_deref().unwrap_or("unknown")
        ))
    })?;

    Ok(detail_to_tracking(detail))
}

fn detail_to_tracking(detail: UpsTrackDetail) -> TrackingInfo {
    let status = parse_status(&detail.package_status);

    let events = detail
        .milestones
        .into_iter()
        .map(|milestone| {
            let (location, country) = parse_location(&milestone.location);
            TrackingEvent {
                date: parse_date(&milestone.date, &milestone.time),
                description: milestone.name,
                location,
                country,
            }
        })
        .collect();

    TrackingInfo::normalize(
        detail.requested_tracking_number,
        Carrier::Ups,
        status,
        events,
    )
}

/// Exact, case-sensitive match on the UPS package status text.
pub fn parse_status(status: &str) -> TrackingStatus {
    match status {
        "In Transit" => TrackingStatus::InTransit,
        "Delivered" => TrackingStatus::Delivered,
        "Exception" => TrackingStatus::Exception,
        "Info Received" => TrackingStatus::InfoReceived,
        "Out for Delivery" => TrackingStatus::OutForDelivery,
        _ => TrackingStatus::Unknown,
    }
}

/// Split `"City, ST, CC"` on the last comma into `("City, ST", "CC")`.
pub fn parse_location(raw: &str) -> (String, String) {
    match raw.rsplit_once(',') {
        Some((location, country)) => (location.trim().to_string(), country.trim().to_string()),
        None => (raw.to_string(), String::new()),
    }
}

/// Combine a `M/D/YYYY` date and a `H:MM AM` time.
pub fn parse_date(date: &str, time: &str) -> Option<NaiveDateTime> {
    let mut parts = date.trim().split('/');
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let (clock, meridiem) = time.trim().split_once(' ')?;
    let (hour, minute) = clock.split_once(':')?;
    let mut hour: u32 = hour.trim().parse().ok()?;
    let minute: u32 = minute.trim().parse().ok()?;

    let meridiem = meridiem.trim_start();
    if meridiem.starts_with(['P', 'p']) && hour != 12 {
        hour = hour.checked_add(12)?;
    } else if meridiem.starts_with(['A', 'a']) && hour == 12 {
        hour = 0;
    }

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}
