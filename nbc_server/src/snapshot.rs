use std::{sync::Arc, time::Duration};

use anyhow::Result;
use nbc_core::{
    booking_client::{FetchOptions, Session},
    calendar,
    ical::generator::IcalCalendar,
};
use tokio::{
    sync::RwLock,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{error, info};

/// The calendar served to every request.
pub type Snapshot = Arc<RwLock<IcalCalendar>>;

/// Refetch the bookings and swap the new calendar in.
///
/// On error the previous calendar stays in place.
pub async fn refresh(snapshot: &Snapshot, session: &Session, options: &FetchOptions) -> Result<()> {
    let calendar = calendar::get(session, options).await?;
    let events = calendar.events.len();
    *snapshot.write().await = calendar;
    info!(events, "refreshed the calendar");
    Ok(())
}

/// Refresh the snapshot every `period`, starting one period from now.
pub fn spawn_refresh(
    snapshot: Snapshot,
    session: Session,
    options: FetchOptions,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = refresh(&snapshot, &session, &options).await {
                error!("failed to refresh the calendar: {err:#}");
            }
        }
    })
}
