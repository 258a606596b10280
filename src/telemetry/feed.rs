use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::config::FeedConfig;
use crate::error::ScopeError;
use crate::telemetry::rts::{RtsResponse, RtsTracker, StationDirectory};

/// Where intensity snapshots and the station directory come from.
pub trait TelemetryFeed: Send + Sync + 'static {
    /// `replay_time == 0` asks for the live snapshot, anything else for the
    /// snapshot recorded at that time.
    fn fetch(&self, replay_time: i64) -> Result<RtsResponse, ScopeError>;

    fn stations(&self) -> Result<StationDirectory, ScopeError>;
}

/// Serves recorded snapshots, ordered by time.
#[derive(Clone, Debug, Default)]
pub struct ReplayFeed {
    directory: StationDirectory,
    snapshots: Vec<RtsResponse>,
}

impl ReplayFeed {
    pub fn new(directory: StationDirectory, mut snapshots: Vec<RtsResponse>) -> Self {
        snapshots.sort_by_key(|s| s.time);
        Self {
            directory,
            snapshots,
        }
    }

    pub fn from_json_documents<'a>(
        directory: StationDirectory,
        documents: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ScopeError> {
        let snapshots = documents
            .into_iter()
            .map(RtsResponse::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(directory, snapshots))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl TelemetryFeed for ReplayFeed {
    fn fetch(&self, replay_time: i64) -> Result<RtsResponse, ScopeError> {
        let found = if replay_time == 0 {
            self.snapshots.last()
        } else {
            self.snapshots.iter().rev().find(|s| s.time <= replay_time)
        };
        found
            .cloned()
            .ok_or_else(|| ScopeError::Fetch(format!("no snapshot at or before {replay_time}")))
    }

    fn stations(&self) -> Result<StationDirectory, ScopeError> {
        Ok(self.directory.clone())
    }
}

/// A long-lived thread that runs `fetch` calls one at a time. At most one
/// request is in flight; a poll that finds the previous one still running
/// gives up at once instead of queueing behind it.
pub struct FetchWorker {
    requests: mpsc::Sender<i64>,
    replies: mpsc::Receiver<Result<RtsResponse, ScopeError>>,
    in_flight: bool,
}

impl FetchWorker {
    pub fn spawn<F: TelemetryFeed + ?Sized>(feed: Arc<F>) -> Result<Self, ScopeError> {
        let (requests, request_rx) = mpsc::channel::<i64>();
        let (reply_tx, replies) = mpsc::channel();
        thread::Builder::new()
            .name("telemetry-fetch".into())
            .spawn(move || {
                for replay_time in request_rx {
                    if reply_tx.send(feed.fetch(replay_time)).is_err() {
                        break;
                    }
                }
                debug!("telemetry fetch thread exiting");
            })
            .map_err(|e| ScopeError::Fetch(e.to_string()))?;
        Ok(Self {
            requests,
            replies,
            in_flight: false,
        })
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Waits at most `budget` for the answer. A reply that lands after its
    /// budget is discarded by the next call.
    pub fn fetch(&mut self, replay_time: i64, budget: Duration) -> Result<RtsResponse, ScopeError> {
        if self.in_flight {
            match self.replies.try_recv() {
                Ok(_) => {
                    debug!("discarding late telemetry reply");
                    self.in_flight = false;
                }
                Err(mpsc::TryRecvError::Empty) => {
                    warn!("previous telemetry fetch still running, skipping poll");
                    return Err(ScopeError::Timeout(budget));
                }
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.in_flight = false;
                    return Err(ScopeError::Fetch("fetch thread exited".into()));
                }
            }
        }
        self.requests
            .send(replay_time)
            .map_err(|_| ScopeError::Fetch("fetch thread exited".into()))?;
        self.in_flight = true;
        match self.replies.recv_timeout(budget) {
            Ok(result) => {
                self.in_flight = false;
                result
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("telemetry fetch exceeded {budget:?}");
                Err(ScopeError::Timeout(budget))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.in_flight = false;
                Err(ScopeError::Fetch("fetch thread exited without a result".into()))
            }
        }
    }
}

/// Polls a feed with a time budget, advances the replay clock and drops
/// snapshots that are not newer than the last one accepted.
pub struct TelemetryPoller<F: TelemetryFeed + ?Sized> {
    feed: Arc<F>,
    budget: Duration,
    replay_time: i64,
    tracker: RtsTracker,
    directory: Option<StationDirectory>,
    fetcher: Option<FetchWorker>,
}

impl<F: TelemetryFeed + ?Sized> TelemetryPoller<F> {
    pub fn new(feed: Arc<F>, config: &FeedConfig) -> Self {
        Self {
            feed,
            budget: config.timeout(),
            replay_time: config.replay_time,
            tracker: RtsTracker::new(),
            directory: None,
            fetcher: None,
        }
    }

    pub fn replay_time(&self) -> i64 {
        self.replay_time
    }

    pub fn latest_time(&self) -> i64 {
        self.tracker.latest()
    }

    /// `Ok(None)` means the snapshot was stale and nothing changed.
    pub fn poll(&mut self) -> Result<Option<RtsResponse>, ScopeError> {
        let requested = self.replay_time;
        if self.replay_time != 0 {
            self.replay_time += 1;
        }
        if self.fetcher.is_none() {
            self.fetcher = Some(FetchWorker::spawn(Arc::clone(&self.feed))?);
        }
        let response = match self.fetcher.as_mut() {
            Some(fetcher) => fetcher.fetch(requested, self.budget)?,
            None => return Err(ScopeError::Fetch("fetch thread unavailable".into())),
        };
        match self.tracker.accept(&response) {
            Ok(()) => Ok(Some(response)),
            Err(err) if err.is_stale() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Fetched once, then served from cache.
    pub fn directory(&mut self) -> Result<&StationDirectory, ScopeError> {
        if self.directory.is_none() {
            let directory = self.feed.stations()?;
            debug!("station directory loaded with {} entries", directory.len());
            self.directory = Some(directory);
        }
        self.directory
            .as_ref()
            .ok_or_else(|| ScopeError::Fetch("station directory unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn snapshot(time: i64) -> RtsResponse {
        RtsResponse {
            time,
            ..RtsResponse::default()
        }
    }

    struct SlowFeed;

    impl TelemetryFeed for SlowFeed {
        fn fetch(&self, _replay_time: i64) -> Result<RtsResponse, ScopeError> {
            thread::sleep(Duration::from_millis(500));
            Ok(snapshot(1))
        }

        fn stations(&self) -> Result<StationDirectory, ScopeError> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn replay_picks_latest_at_or_before() {
        let feed = ReplayFeed::new(HashMap::new(), vec![snapshot(30), snapshot(10), snapshot(20)]);
        assert_eq!(feed.fetch(0).unwrap().time, 30);
        assert_eq!(feed.fetch(25).unwrap().time, 20);
        assert!(feed.fetch(5).is_err());
    }

    /// Blocks every fetch until the test releases it.
    struct GatedFeed {
        calls: AtomicUsize,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl TelemetryFeed for GatedFeed {
        fn fetch(&self, _replay_time: i64) -> Result<RtsResponse, ScopeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
            let gate = self.gate.lock().map_err(|e| ScopeError::Fetch(e.to_string()))?;
            gate.recv().map_err(|e| ScopeError::Fetch(e.to_string()))?;
            Ok(snapshot(call + 1))
        }

        fn stations(&self) -> Result<StationDirectory, ScopeError> {
            Ok(HashMap::new())
        }
    }

    #[test]
    fn slow_fetch_times_out() {
        let mut fetcher = FetchWorker::spawn(Arc::new(SlowFeed)).unwrap();
        let err = fetcher.fetch(0, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, ScopeError::Timeout(_)));
        assert!(fetcher.in_flight());
    }

    #[test]
    fn hung_fetch_is_not_stacked() {
        let (release, gate) = mpsc::channel();
        let feed = Arc::new(GatedFeed {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(gate),
        });
        let config = FeedConfig {
            timeout_ms: 200,
            ..FeedConfig::default()
        };
        let mut poller = TelemetryPoller::new(Arc::clone(&feed), &config);
        for _ in 0..20 {
            let err = poller.poll().unwrap_err();
            assert!(matches!(err, ScopeError::Timeout(_)));
        }
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

        release.send(()).unwrap();
        release.send(()).unwrap();
        let mut accepted = None;
        for _ in 0..200 {
            if let Ok(Some(response)) = poller.poll() {
                accepted = Some(response.time);
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(accepted, Some(2));
        assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn poller_advances_replay_and_drops_stale() {
        let feed = Arc::new(ReplayFeed::new(
            HashMap::new(),
            vec![snapshot(100), snapshot(101)],
        ));
        let config = FeedConfig {
            replay_time: 100,
            ..FeedConfig::default()
        };
        let mut poller = TelemetryPoller::new(feed, &config);
        assert_eq!(poller.poll().unwrap().unwrap().time, 100);
        assert_eq!(poller.poll().unwrap().unwrap().time, 101);
        assert_eq!(poller.replay_time(), 102);
        assert!(poller.poll().unwrap().is_none());
        assert_eq!(poller.latest_time(), 101);
    }

    #[test]
    fn live_polling_keeps_replay_at_zero() {
        let feed = Arc::new(ReplayFeed::new(HashMap::new(), vec![snapshot(7)]));
        let mut poller = TelemetryPoller::new(feed, &FeedConfig::default());
        assert!(poller.poll().unwrap().is_some());
        assert!(poller.poll().unwrap().is_none());
        assert_eq!(poller.replay_time(), 0);
    }
}
