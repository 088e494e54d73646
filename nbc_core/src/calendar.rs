//! Turns bookings into an iCalendar feed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use ical::{
    generator::{IcalCalendar, IcalCalendarBuilder, IcalEvent, Property},
    ical_property,
};
use tracing::info;

use crate::booking_client::{self, Booking, BookingStatusCode, FetchOptions, Session};

static PROD_ID: &str = "-//Naver Booking//booking.naver.com";
static CALENDAR_NAME: &str = "네이버 예약";
static TIMEZONE: &str = "Etc/UTC";
static FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// One calendar entry derived from a booking.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub uid: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub title: String,
    pub address: String,
    pub geo: Option<Geo>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geo {
    pub lat: f64,
    pub lon: f64,
}

impl CalendarEvent {
    /// Build the event for a booking, `None` if the booking was cancelled.
    pub fn from_booking(booking: &Booking) -> Option<Self> {
        if booking.booking_status_code == BookingStatusCode::Cancelled {
            return None;
        }
        let location = booking.business.as_ref().and_then(|business| {
            let address = business.address_json.as_ref()?;
            let text = address.text()?;
            let geo = match (address.pos_lat, address.pos_long) {
                (Some(lat), Some(lon)) => Some(Geo { lat, lon }),
                _ => None,
            };
            Some(Location {
                title: business.service_name.clone(),
                address: String::from(text),
                geo,
            })
        });
        Some(CalendarEvent {
            uid: uid(&booking.booking_id),
            start: booking.start_date,
            end: booking.end_date,
            created: booking.reg_date_time,
            title: title(booking),
            description: description(booking),
            location,
        })
    }

    // Times are UTC with a `Z` suffix, so no TZID as `IcalEventBuilder` would add.
    fn to_ical_event(&self, changed: &str) -> IcalEvent {
        let mut event = IcalEvent::new();
        event.properties.extend([
            ical_property!("UID", &self.uid),
            ical_property!("DTSTAMP", changed),
            ical_property!("DTSTART", self.start.format(FORMAT).to_string()),
            ical_property!("DTEND", self.end.format(FORMAT).to_string()),
            ical_property!("CREATED", self.created.format(FORMAT).to_string()),
            ical_property!("SUMMARY", escape_text(&self.title)),
            ical_property!("STATUS", "CONFIRMED"),
        ]);
        if let Some(description) = &self.description {
            event
                .properties
                .push(ical_property!("DESCRIPTION", escape_text(description)));
        }
        if let Some(location) = &self.location {
            event.properties.push(ical_property!(
                "LOCATION",
                escape_text(&format!("{}\n{}", location.title, location.address))
            ));
            if let Some(geo) = location.geo {
                event
                    .properties
                    .push(ical_property!("GEO", format!("{};{}", geo.lat, geo.lon)));
            }
        }
        event
    }
}

/// Get the calendar of the session's bookings.
pub async fn get(session: &Session, options: &FetchOptions) -> Result<IcalCalendar> {
    let response = booking_client::fetch(session, options).await?;
    let calendar = get_calendar(&response.data.booking.bookings);
    info!(events = calendar.events.len(), "built calendar");
    Ok(calendar)
}

/// Build the events of all bookings which were not cancelled, in order.
pub fn build_events(bookings: &[Booking]) -> Vec<CalendarEvent> {
    bookings
        .iter()
        .filter_map(CalendarEvent::from_booking)
        .collect()
}

/// Build the calendar from the bookings.
pub fn get_calendar(bookings: &[Booking]) -> IcalCalendar {
    let changed = Utc::now().format(FORMAT).to_string();
    let mut calendar = IcalCalendarBuilder::version("2.0")
        .gregorian()
        .prodid(PROD_ID)
        .build();
    calendar.properties.extend([
        ical_property!("X-WR-CALNAME", CALENDAR_NAME),
        ical_property!("X-WR-TIMEZONE", TIMEZONE),
    ]);
    for event in build_events(bookings) {
        calendar.events.push(event.to_ical_event(&changed));
    }
    calendar
}

/// Get a unique id for a booking.
///
/// Changing this function is a breaking change!
fn uid(booking_id: &str) -> String {
    format!("NaverBooking_{booking_id}@booking.naver.com")
}

fn title(booking: &Booking) -> String {
    let snapshot = booking.snapshot_json.as_ref();
    let biz_item_name = snapshot
        .and_then(|snapshot| snapshot.biz_item_name.as_deref())
        .filter(|name| !name.is_empty());
    if let Some(biz_item_name) = biz_item_name {
        let service_name = snapshot
            .and_then(|snapshot| snapshot.service_name.as_deref())
            .unwrap_or(&booking.business_name);
        format!("{service_name} - {biz_item_name}")
    } else if booking.service_name.is_empty() {
        booking.business_name.clone()
    } else {
        format!("{} - {}", booking.business_name, booking.service_name)
    }
}

/// The names of the booked options, one per line.
fn description(booking: &Booking) -> Option<String> {
    let options = &booking.snapshot_json.as_ref()?.booking_option_json;
    if options.is_empty() {
        return None;
    }
    Some(
        options
            .iter()
            .map(|option| option.name.as_str())
            .collect::<Vec<&str>>()
            .join("\n"),
    )
}

/// Escape a TEXT value (RFC 5545, section 3.3.11).
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(character),
        }
    }
    escaped
}

pub trait GetIcalProperty {
    fn get_ical_property_value(&self, name: &str) -> Option<&String>;
}

impl GetIcalProperty for IcalEvent {
    fn get_ical_property_value(&self, name: &str) -> Option<&String> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .and_then(|property| property.value.as_ref())
    }
}
