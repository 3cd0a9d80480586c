//! # Visible Date Range
//!
//! The window of history currently loaded: from `start` to the end of today.
//! It only ever grows backwards. Each expansion asks the server for the start
//! of the newest block older than the current `start`, and moves `start` to
//! that day's UTC midnight. A 404 means there is nothing older: the range is
//! exhausted and further expansion requests are dropped.
//!
//! Expansion requests are processed one at a time by a background worker.
//! Every change of `start` is published on a `watch` channel, which the
//! ranged sync engines observe to refetch their collections.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::api::{ApiError, SessionRemote};
use crate::core::action::Action;

/// Results of the expansion worker, applied on the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeUpdate {
    Expanded(DateTime<Utc>),
    Exhausted,
    Failed(ApiError),
}

/// UTC midnight of the day containing `ts`.
pub fn day_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::default()).and_utc()
}

/// Last millisecond of the day containing `ts`.
pub fn day_end(ts: DateTime<Utc>) -> DateTime<Utc> {
    day_start(ts) + Duration::days(1) - Duration::milliseconds(1)
}

pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exhausted: bool,
    in_flight: usize,
    error: Option<ApiError>,
    publisher: watch::Sender<DateTime<Utc>>,
    requests: Option<mpsc::UnboundedSender<()>>,
}

impl DateRange {
    /// A range covering just the day of `now`, with no worker attached.
    pub fn today(now: DateTime<Utc>) -> Self {
        let start = day_start(now);
        let (publisher, _) = watch::channel(start);
        Self {
            start,
            end: day_end(now),
            exhausted: false,
            in_flight: 0,
            error: None,
            publisher,
            requests: None,
        }
    }

    /// Spawn the expansion worker. Must be called inside a tokio runtime.
    pub fn attach(&mut self, remote: Arc<dyn SessionRemote>, actions: mpsc::UnboundedSender<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(expand_worker(remote, self.start, rx, actions));
        self.requests = Some(tx);
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True once the server reported that no older data exists.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_expanding(&self) -> bool {
        self.in_flight > 0
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Observe changes of `start`.
    pub fn subscribe(&self) -> watch::Receiver<DateTime<Utc>> {
        self.publisher.subscribe()
    }

    /// Ask for older data. Returns `false` when the request was dropped
    /// because the range is exhausted or no worker is attached.
    pub fn request_expand(&mut self) -> bool {
        if self.exhausted {
            debug!("Range exhausted, ignoring expand request");
            return false;
        }
        let Some(requests) = &self.requests else {
            warn!("Expand requested without an attached worker");
            return false;
        };
        if requests.send(()).is_err() {
            warn!("Range worker is gone, dropping expand request");
            return false;
        }
        self.in_flight += 1;
        true
    }

    pub fn apply(&mut self, update: RangeUpdate) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match update {
            RangeUpdate::Expanded(start) => {
                self.start = start;
                self.end = day_end(Utc::now()).max(self.end);
                self.error = None;
                self.publisher.send_replace(start);
                info!("Visible range now starts at {}", start);
            }
            RangeUpdate::Exhausted => {
                self.exhausted = true;
                info!("No blocks older than {}", self.start);
            }
            RangeUpdate::Failed(e) => {
                warn!("Failed to expand range: {}", e);
                self.error = Some(e);
            }
        }
    }
}

async fn expand_worker(
    remote: Arc<dyn SessionRemote>,
    mut start: DateTime<Utc>,
    mut requests: mpsc::UnboundedReceiver<()>,
    actions: mpsc::UnboundedSender<Action>,
) {
    let mut exhausted = false;
    while requests.recv().await.is_some() {
        let update = if exhausted {
            RangeUpdate::Exhausted
        } else {
            match remote.next_before(start).await {
                Ok(found) => {
                    start = day_start(found);
                    RangeUpdate::Expanded(start)
                }
                Err(e) if e.is_not_found() => {
                    exhausted = true;
                    RangeUpdate::Exhausted
                }
                Err(e) => RangeUpdate::Failed(e),
            }
        };
        if actions.send(Action::Range(update)).is_err() {
            debug!("Action receiver dropped, stopping range worker");
            return;
        }
    }
}
