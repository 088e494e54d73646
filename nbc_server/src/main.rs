//! This binary serves the Naver booking reservations of one user as an iCalendar feed.
//!
//! The bookings are fetched once at startup and optionally refetched on an interval.
//! The feed is served at `/` and `/calendar`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{value_parser, Args, Parser};
use nbc_core::{
    booking_client::{self, FetchOptions, Session},
    calendar,
};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod route;
mod snapshot;
#[cfg(test)]
mod test_support;

#[derive(Debug, Parser)]
#[command(about = "Serve your Naver booking reservations as an iCalendar feed")]
pub struct Arguments {
    /// the NID_AUT session cookie
    #[arg(long, env = "NID_AUT", hide_env_values = true)]
    pub nid_aut: String,
    /// the NID_SES session cookie
    #[arg(long, env = "NID_SES", hide_env_values = true)]
    pub nid_ses: String,
    /// the address to listen on
    #[arg(long, env = "NBC_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,
    /// refetch the bookings every this many seconds
    #[arg(long, env = "NBC_REFRESH_INTERVAL", value_parser = value_parser!(u64).range(1..))]
    pub refresh_interval: Option<u64>,
    #[command(flatten)]
    pub fetch: FetchArgs,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
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

impl From<&FetchArgs> for FetchOptions {
    fn from(value: &FetchArgs) -> Self {
        FetchOptions {
            endpoint: value.endpoint.clone(),
            size: value.size,
            page: value.page,
            ..Default::default()
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let args = Arguments::parse();
    let session = Session::new(args.nid_aut, args.nid_ses);
    let options = FetchOptions::from(&args.fetch);

    let calendar = calendar::get(&session, &options)
        .await
        .context("failed to build the initial calendar")?;
    let snapshot = Arc::new(RwLock::new(calendar));
    if let Some(seconds) = args.refresh_interval {
        info!(seconds, "refreshing the calendar periodically");
        snapshot::spawn_refresh(
            snapshot.clone(),
            session,
            options,
            Duration::from_secs(seconds),
        );
    }

    let app = route::app(snapshot);
    info!(address = %args.listen, "listening");
    axum::Server::try_bind(&args.listen)
        .with_context(|| format!("failed to bind {}", args.listen))?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use nbc_core::booking_client::{FetchOptions, ENDPOINT};

    use super::Arguments;

    #[test]
    fn test_arguments_defaults() {
        let args =
            Arguments::try_parse_from(["nbc_server", "--nid-aut", "aut", "--nid-ses", "ses"])
                .unwrap();
        assert_eq!(args.listen.to_string(), "127.0.0.1:3000");
        assert_eq!(args.refresh_interval, None);
        let options = FetchOptions::from(&args.fetch);
        assert_eq!(options.endpoint, ENDPOINT);
        assert_eq!(options.size, 4);
        assert_eq!(options.page, 0);
    }

    #[test]
    fn test_arguments_reject_zero_interval() {
        let result = Arguments::try_parse_from([
            "nbc_server",
            "--nid-aut",
            "aut",
            "--nid-ses",
            "ses",
            "--refresh-interval",
            "0",
        ]);
        assert!(result.is_err());
    }
}
