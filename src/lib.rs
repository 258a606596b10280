//! Seismic telemetry processing: band-pass filtering of station streams,
//! rolling display buffers, STFT spectrograms and chart/map-facing render data.

pub mod config;
pub mod dsp;
pub mod error;
pub mod spectrogram;
pub mod stream;
pub mod surface;
pub mod telemetry;
pub mod waveform;
pub mod worker;

pub use config::ScopeConfig;
pub use error::ScopeError;
pub use worker::{PendingReply, ProcessingWorker, RequestId, TickMode, WorkerFault};
