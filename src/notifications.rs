//! Periodic heartbeat pushed to every connected listener. Purely
//! cosmetic: nothing about board consistency depends on it.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::api::Notification;

const CHANNEL_CAPACITY: usize = 16;

pub fn channel() -> broadcast::Sender<Notification> {
    let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
    sender
}

pub fn heartbeat_message<Tz>(at: &DateTime<Tz>) -> Notification
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    Notification {
        message: format!("Server notification: {}", at.format("%-m/%-d/%Y, %-I:%M:%S %p")),
    }
}

/// Sends one heartbeat per `period` until the returned task is aborted.
pub fn spawn_heartbeat(
    sender: broadcast::Sender<Notification>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            // Err only means nobody is listening right now.
            if let Ok(listeners) = sender.send(heartbeat_message(&Local::now())) {
                tracing::trace!(listeners, "Heartbeat sent");
            }
        }
    })
}
