//! This crate turns the Naver booking reservations of a user into an iCalendar feed.
//! It backs the feed server and a CLI which just writes a single iCalendar file.
//!
//! The reservations are read from <https://m.booking.naver.com/graphql>.

pub use ical;

pub mod booking_client;
pub mod calendar;
