//! This client fetches the reservations of the logged-in user from Naver booking.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use reqwest::{
    cookie::{CookieStore, Jar},
    header::{COOKIE, USER_AGENT},
    Response, Url,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

pub static ENDPOINT: &str = "https://m.booking.naver.com/graphql";
static OPERATION_NAME: &str = "bookings";
static BUSINESS_MAIN_CATEGORY: &str = "ALL";
static USER_AGENT_VALUE: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.5 Safari/605.1.15";

static COOKIE_AUT: &str = "NID_AUT";
static COOKIE_SES: &str = "NID_SES";

static QUERY: &str = r#"query bookings($input: BookingParams) {
  booking(input: $input) {
    id
    totalCount
    bookings {
      bookingId
      businessName
      serviceName
      bookingStatusCode
      isCompleted
      startDate
      endDate
      regDateTime
      completedDateTime
      cancelledDateTime
      snapshotJson
      business {
        addressJson
        name
        serviceName
      }
    }
  }
}
"#;

/// The two Naver session cookies.
#[derive(Clone)]
pub struct Session {
    pub aut: String,
    pub ses: String,
}

impl Session {
    pub fn new(aut: impl Into<String>, ses: impl Into<String>) -> Self {
        Self {
            aut: aut.into(),
            ses: ses.into(),
        }
    }

    fn cookie_jar(&self, url: &Url) -> Jar {
        let jar = Jar::default();
        jar.add_cookie_str(&format!("{COOKIE_AUT}={}", self.aut), url);
        jar.add_cookie_str(&format!("{COOKIE_SES}={}", self.ses), url);
        jar
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("aut", &"<redacted>")
            .field("ses", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BookingStatusCode {
    #[serde(rename = "RC05")]
    Reserved,
    #[serde(rename = "RC08")]
    Completed,
    #[serde(rename = "RC04")]
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl BookingStatusCode {
    /// The wire code, `None` for codes this client does not know.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            BookingStatusCode::Reserved => Some("RC05"),
            BookingStatusCode::Completed => Some("RC08"),
            BookingStatusCode::Cancelled => Some("RC04"),
            BookingStatusCode::Unknown => None,
        }
    }
}

impl fmt::Display for BookingStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BookingStatusCode::Reserved => "reserved",
            BookingStatusCode::Completed => "completed",
            BookingStatusCode::Cancelled => "cancelled",
            BookingStatusCode::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// What to ask the booking API for.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub endpoint: String,
    pub query_types: Vec<BookingStatusCode>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub size: usize,
    pub page: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            endpoint: String::from(ENDPOINT),
            query_types: vec![
                BookingStatusCode::Completed,
                BookingStatusCode::Cancelled,
                BookingStatusCode::Reserved,
            ],
            start_date: None,
            end_date: None,
            size: 4,
            page: 0,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest {
    operation_name: &'static str,
    variables: Variables,
    query: &'static str,
}

#[derive(Debug, Serialize)]
struct Variables {
    input: BookingParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingParams {
    query_type: String,
    business_main_category: &'static str,
    start_date: Option<String>,
    end_date: Option<String>,
    size: usize,
    page: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingsResponse {
    pub data: BookingsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingsData {
    pub booking: BookingList,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingList {
    #[serde(default)]
    pub id: Option<String>,
    pub total_count: u32,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(deserialize_with = "deserialize_id")]
    pub booking_id: String,
    pub business_name: String,
    pub service_name: String,
    pub booking_status_code: BookingStatusCode,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub end_date: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub reg_date_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub completed_date_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub cancelled_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub snapshot_json: Option<BookingSnapshot>,
    #[serde(default)]
    pub business: Option<Business>,
}

/// What was booked, as recorded at booking time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSnapshot {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub biz_item_name: Option<String>,
    #[serde(default)]
    pub booking_option_json: Vec<BookingOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingOption {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub name: String,
    pub service_name: String,
    #[serde(default)]
    pub address_json: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub road_addr: Option<String>,
    #[serde(default)]
    pub pos_lat: Option<f64>,
    #[serde(default)]
    pub pos_long: Option<f64>,
}

impl Address {
    /// The display address, falling back to the road address.
    pub fn text(&self) -> Option<&str> {
        self.address
            .as_deref()
            .or(self.road_addr.as_deref())
            .filter(|text| !text.is_empty())
    }
}

/// Fetch the bookings of the session's user.
pub async fn fetch(session: &Session, options: &FetchOptions) -> Result<BookingsResponse> {
    debug!(
        endpoint = %options.endpoint,
        size = options.size,
        page = options.page,
        "fetching bookings"
    );
    let response = get_response(session, options).await?;
    let body = response
        .text()
        .await
        .context("failed to read the bookings response")?;
    let bookings_response = parse(&body)?;
    info!(
        total = bookings_response.data.booking.total_count,
        fetched = bookings_response.data.booking.bookings.len(),
        "fetched bookings"
    );
    Ok(bookings_response)
}

/// Send the GraphQL request to the booking server.
async fn get_response(session: &Session, options: &FetchOptions) -> Result<Response> {
    let url = Url::parse(&options.endpoint)
        .with_context(|| format!("invalid endpoint `{}`", options.endpoint))?;
    let cookies = session
        .cookie_jar(&url)
        .cookies(&url)
        .context("the session cookies were rejected")?;
    let client = reqwest::Client::new();
    let response = client
        .post(url)
        .header(COOKIE, cookies)
        .header(USER_AGENT, USER_AGENT_VALUE)
        .json(&request_body(options))
        .send()
        .await
        .context("failed to send the bookings request")?
        .error_for_status()
        .context("the bookings request was rejected")?;
    Ok(response)
}

fn request_body(options: &FetchOptions) -> GraphqlRequest {
    let query_type = options
        .query_types
        .iter()
        .filter_map(BookingStatusCode::code)
        .collect::<Vec<&str>>()
        .join(",");
    GraphqlRequest {
        operation_name: OPERATION_NAME,
        variables: Variables {
            input: BookingParams {
                query_type,
                business_main_category: BUSINESS_MAIN_CATEGORY,
                start_date: options.start_date.map(rfc3339),
                end_date: options.end_date.map(rfc3339),
                size: options.size,
                page: options.page,
            },
        },
        query: QUERY,
    }
}

/// Format a date bound the way serde writes a `DateTime<Utc>`.
fn rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse the GraphQL response body.
fn parse(body: &str) -> Result<BookingsResponse> {
    serde_json::from_str(body)
        .with_context(|| format!("failed to parse the bookings response\n{body}"))
}

/// Parse an upstream timestamp.
///
/// Accepts RFC 3339, a date-time without offset (taken as UTC) or a plain date (UTC midnight).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.with_timezone(&Utc));
    }
    if let Ok(date_time) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(date_time.with_timezone(&Utc));
    }
    if let Ok(date_time) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&date_time));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| Utc.from_utc_datetime(&date_time))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_timestamp(&value)
        .ok_or_else(|| de::Error::custom(format!("invalid timestamp `{value}`")))
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => parse_timestamp(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp `{value}`"))),
        None => Ok(None),
    }
}

/// Booking ids come as strings or as numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!("invalid booking id {other}"))),
    }
}
