//! Background thread that owns every piece of mutable pipeline state.
//!
//! Callers talk to it only through [`ProcessingWorker`]; each request gets its
//! own id and reply channel, so several requests of the same kind can be in
//! flight at once.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::config::ScopeConfig;
use crate::error::ScopeError;
use crate::spectrogram::{SpectrogramBank, SpectrogramRaster};
use crate::stream::{StationSnapshot, StreamManager, TickReport, WaveformFrame};
use crate::telemetry::{RtsResponse, StationDirectory, TelemetryBoard, TelemetryUpdate};
use crate::waveform::{build_chart, WaveformRenderData};

/// Unique among the requests of one worker, numbered from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the worker flushes on its own clock or only on request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickMode {
    Timer,
    Manual,
}

/// Broadcast to fault subscribers when a request or a scheduled flush panicked.
/// `request` is `None` for work the worker started on its own.
#[derive(Clone, Debug)]
pub struct WorkerFault {
    pub request: Option<RequestId>,
    pub message: String,
}

struct Reply<T> {
    id: RequestId,
    tx: Sender<Result<T, ScopeError>>,
}

impl<T> Reply<T> {
    fn send(self, value: Result<T, ScopeError>) {
        if self.tx.send(value).is_err() {
            debug!("request {} was abandoned before its reply", self.id);
        }
    }
}

/// Receiving end of one request.
pub struct PendingReply<T> {
    id: RequestId,
    rx: Receiver<Result<T, ScopeError>>,
}

impl<T> PendingReply<T> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn wait(self) -> Result<T, ScopeError> {
        self.rx.recv().map_err(|_| ScopeError::WorkerGone)?
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<T, ScopeError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ScopeError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ScopeError::WorkerGone),
        }
    }
}

enum Command {
    Ingest(WaveformFrame),
    Flush(Reply<TickReport>),
    Chart(Reply<WaveformRenderData>),
    Spectrogram(u32, Reply<Option<SpectrogramRaster>>),
    Snapshot(u32, Reply<Option<StationSnapshot>>),
    Telemetry(Box<RtsResponse>, Reply<TelemetryUpdate>),
    Directory(StationDirectory, Reply<()>),
    Subscribe(Sender<WorkerFault>),
    #[cfg(test)]
    Panic(Reply<()>),
    #[cfg(test)]
    FailNextTick(Reply<()>),
    Shutdown,
}

impl Command {
    fn request_id(&self) -> Option<RequestId> {
        match self {
            Command::Flush(reply) => Some(reply.id),
            Command::Chart(reply) => Some(reply.id),
            Command::Spectrogram(_, reply) => Some(reply.id),
            Command::Snapshot(_, reply) => Some(reply.id),
            Command::Telemetry(_, reply) => Some(reply.id),
            Command::Directory(_, reply) => Some(reply.id),
            #[cfg(test)]
            Command::Panic(reply) | Command::FailNextTick(reply) => Some(reply.id),
            Command::Ingest(_) | Command::Subscribe(_) | Command::Shutdown => None,
        }
    }
}

struct WorkerState {
    config: ScopeConfig,
    stream: StreamManager,
    spectrograms: SpectrogramBank,
    telemetry: TelemetryBoard,
    subscribers: Vec<Sender<WorkerFault>>,
    #[cfg(test)]
    fail_next_tick: bool,
}

impl WorkerState {
    fn new(config: ScopeConfig) -> Self {
        Self {
            stream: StreamManager::new(config.display.clone()),
            spectrograms: SpectrogramBank::new(config.spectrogram.clone()),
            telemetry: TelemetryBoard::default(),
            subscribers: Vec::new(),
            config,
            #[cfg(test)]
            fail_next_tick: false,
        }
    }

    fn tick(&mut self) -> Result<TickReport, ScopeError> {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_tick) {
            panic!("scheduled flush failure");
        }
        let report = self.stream.tick()?;
        if report.evicted_filters > 0 {
            debug!("evicted {} idle filters", report.evicted_filters);
        }
        Ok(report)
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Ingest(frame) => {
                if let Err(err) = self.stream.ingest(&frame) {
                    warn!("dropping frame from station {}: {err}", frame.station_id);
                }
            }
            Command::Flush(reply) => reply.send(self.tick()),
            Command::Chart(reply) => {
                let snapshot = self.stream.snapshot();
                reply.send(Ok(build_chart(&snapshot, &self.config.display)));
            }
            Command::Spectrogram(station_id, reply) => {
                let result = match self.stream.station_snapshot(station_id) {
                    Some(snapshot) => self.spectrograms.rasterize(
                        station_id,
                        snapshot.config.sample_rate as f32,
                        &snapshot.samples,
                    ),
                    None => Ok(None),
                };
                reply.send(result);
            }
            Command::Snapshot(station_id, reply) => {
                reply.send(Ok(self.stream.station_snapshot(station_id)))
            }
            Command::Telemetry(response, reply) => {
                let result = self.telemetry.ingest(&response);
                if let Err(err) = &result {
                    if !err.is_stale() {
                        warn!("telemetry rejected: {err}");
                    }
                }
                reply.send(result);
            }
            Command::Directory(directory, reply) => {
                self.telemetry.set_directory(directory);
                reply.send(Ok(()));
            }
            Command::Subscribe(tx) => self.subscribers.push(tx),
            #[cfg(test)]
            Command::Panic(_reply) => panic!("requested failure"),
            #[cfg(test)]
            Command::FailNextTick(reply) => {
                self.fail_next_tick = true;
                reply.send(Ok(()));
            }
            Command::Shutdown => {}
        }
    }

    fn broadcast(&mut self, fault: WorkerFault) {
        self.subscribers.retain(|tx| tx.send(fault.clone()).is_ok());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs `work`, turning a panic into a fault for every subscriber.
fn guarded(state: &mut WorkerState, request: Option<RequestId>, work: impl FnOnce(&mut WorkerState)) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&mut *state)));
    if let Err(payload) = outcome {
        let message = panic_message(payload.as_ref());
        match request {
            Some(id) => error!("worker request {id} panicked: {message}"),
            None => error!("scheduled flush panicked: {message}"),
        }
        state.broadcast(WorkerFault { request, message });
    }
}

fn run(mut state: WorkerState, rx: Receiver<Command>, mode: TickMode) {
    let interval = state.config.display.flush_interval();
    let mut next_tick = Instant::now() + interval;
    loop {
        let received = match mode {
            TickMode::Timer => {
                rx.recv_timeout(next_tick.saturating_duration_since(Instant::now()))
            }
            TickMode::Manual => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(command) => {
                let request = command.request_id();
                guarded(&mut state, request, |state| state.handle(command));
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
        if mode == TickMode::Timer && Instant::now() >= next_tick {
            guarded(&mut state, None, |state| {
                if let Err(err) = state.tick() {
                    warn!("scheduled flush failed: {err}");
                }
            });
            next_tick += interval;
        }
    }
    info!("processing worker stopped");
}

/// Handle to the processing thread. Dropping it stops and joins the thread.
pub struct ProcessingWorker {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
    next_id: AtomicU64,
}

impl ProcessingWorker {
    pub fn spawn(config: ScopeConfig, mode: TickMode) -> Result<Self, ScopeError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel();
        let state = WorkerState::new(config);
        let handle = thread::Builder::new()
            .name("quakescope-worker".into())
            .spawn(move || run(state, rx, mode))
            .map_err(|e| ScopeError::Config(format!("cannot start worker thread: {e}")))?;
        info!("processing worker started ({mode:?} ticks)");
        Ok(Self {
            tx,
            handle: Some(handle),
            next_id: AtomicU64::new(1),
        })
    }

    fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<PendingReply<T>, ScopeError> {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel();
        self.tx
            .send(make(Reply { id, tx }))
            .map_err(|_| ScopeError::WorkerGone)?;
        Ok(PendingReply { id, rx })
    }

    /// Fire and forget; the frame is queued until the next flush.
    pub fn ingest(&self, frame: WaveformFrame) -> Result<(), ScopeError> {
        self.tx
            .send(Command::Ingest(frame))
            .map_err(|_| ScopeError::WorkerGone)
    }

    pub fn flush(&self) -> Result<PendingReply<TickReport>, ScopeError> {
        self.request(Command::Flush)
    }

    pub fn chart_frame(&self) -> Result<PendingReply<WaveformRenderData>, ScopeError> {
        self.request(Command::Chart)
    }

    pub fn spectrogram(
        &self,
        station_id: u32,
    ) -> Result<PendingReply<Option<SpectrogramRaster>>, ScopeError> {
        self.request(|reply| Command::Spectrogram(station_id, reply))
    }

    pub fn station_snapshot(
        &self,
        station_id: u32,
    ) -> Result<PendingReply<Option<StationSnapshot>>, ScopeError> {
        self.request(|reply| Command::Snapshot(station_id, reply))
    }

    /// Replies with `StaleTelemetry` when the snapshot is not newer than the last one.
    pub fn ingest_telemetry(
        &self,
        response: RtsResponse,
    ) -> Result<PendingReply<TelemetryUpdate>, ScopeError> {
        self.request(|reply| Command::Telemetry(Box::new(response), reply))
    }

    pub fn set_directory(&self, directory: StationDirectory) -> Result<PendingReply<()>, ScopeError> {
        self.request(|reply| Command::Directory(directory, reply))
    }

    pub fn subscribe_faults(&self) -> Result<Receiver<WorkerFault>, ScopeError> {
        let (tx, rx) = mpsc::channel();
        self.tx
            .send(Command::Subscribe(tx))
            .map_err(|_| ScopeError::WorkerGone)?;
        Ok(rx)
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(Command::Shutdown);
            if handle.join().is_err() {
                error!("processing worker thread panicked");
            }
        }
    }
}

impl Drop for ProcessingWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
