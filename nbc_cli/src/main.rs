use std::{
    fs::write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use nbc_core::{
    booking_client::{self, FetchOptions, Session},
    calendar,
    ical::generator::{Emitter, IcalCalendar},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Write your Naver booking reservations to an iCalendar file")]
pub struct Arguments {
    /// the NID_AUT session cookie
    #[arg(long, env = "NID_AUT", hide_env_values = true)]
    pub nid_aut: String,
    /// the NID_SES session cookie
    #[arg(long, env = "NID_SES", hide_env_values = true)]
    pub nid_ses: String,
    /// where to write the calendar
    #[arg(long, short, default_value = "calendar.ics")]
    pub output: PathBuf,
    /// the booking GraphQL endpoint
    #[arg(long, env = "NBC_ENDPOINT", default_value = booking_client::ENDPOINT)]
    pub endpoint: String,
    /// how many bookings to fetch
    #[arg(long, default_value_t = 4)]
    pub size: usize,
    /// which page of bookings to fetch
    #[arg(long, default_value_t = 0)]
    pub page: usize,
}

impl From<&Arguments> for FetchOptions {
    fn from(value: &Arguments) -> Self {
        FetchOptions {
            endpoint: value.endpoint.clone(),
            size: value.size,
            page: value.page,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Arguments::parse();
    let session = Session::new(args.nid_aut.as_str(), args.nid_ses.as_str());
    let calendar = calendar::get(&session, &FetchOptions::from(&args)).await?;
    write_calendar(&calendar, &args.output)?;
    info!(path = %args.output.display(), events = calendar.events.len(), "wrote calendar");
    Ok(())
}

/// Write the emitted calendar to `path`, replacing any existing file.
fn write_calendar(calendar: &IcalCalendar, path: &Path) -> Result<()> {
    write(path, calendar.generate())
        .with_context(|| format!("failed to write {}", path.display()))
}
