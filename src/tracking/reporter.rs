//! Periodic device sampling.
//!
//! The reporter owns a single background task. Each tick runs to completion
//! before the next one is considered, and ticks that come due while a fix is
//! still outstanding are skipped rather than queued. Manual ticks go through
//! the same guard, so there is never more than one position request in
//! flight.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{LocationUnavailable, ReportError, ReporterError};
use crate::models::{LocationSample, PositionOptions};
use crate::services::live::PositionSink;

use super::positioning::Positioning;
use super::session::ShiftSession;

/// Dashboard cadence: one fix every 7.5 minutes.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(450_000);
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub interval: Duration,
    pub position_options: PositionOptions,
    /// Upper bound on a position-sink upload.
    pub collaborator_timeout: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
            position_options: PositionOptions::default(),
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }
}

struct Worker {
    positioning: Arc<dyn Positioning>,
    sink: Arc<dyn PositionSink>,
    session: Arc<ShiftSession>,
    config: ReporterConfig,
    /// Held for the whole of a tick, timer-driven or manual.
    in_flight: AsyncMutex<()>,
}

impl Worker {
    /// Runs one sampling cycle. Returns false when the tick was dropped
    /// because another one was still in flight.
    ///
    /// `cancel` only interrupts the wait for a fix. Once a fix has been
    /// handed to the session it is always uploaded, and any violation it
    /// raised is always delivered.
    async fn tick(&self, cancel: &CancellationToken) -> bool {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            debug!("Sample still in flight, dropping tick");
            return false;
        };

        self.session.check_completion().await;

        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => return true,
            acquired = self.acquire() => acquired,
        };

        match acquired {
            Ok(sample) => {
                self.session.handle_sample(sample).await;
                if let Err(e) = self.upload(&sample).await {
                    warn!(error = %e, "Position upload failed");
                }
            }
            Err(e) => warn!(error = %e, "Location unavailable, skipping sample"),
        }
        true
    }

    async fn acquire(&self) -> Result<LocationSample, LocationUnavailable> {
        let options = self.config.position_options;
        let request = self.positioning.current_position(options);

        let position = if options.timeout_ms == 0 {
            request.await?
        } else {
            tokio::time::timeout(Duration::from_millis(options.timeout_ms), request)
                .await
                .map_err(|_| LocationUnavailable::Timeout)??
        };

        Ok(position.into())
    }

    async fn upload(&self, sample: &LocationSample) -> Result<(), ReportError> {
        tokio::time::timeout(
            self.config.collaborator_timeout,
            self.sink.report(sample.latitude, sample.longitude),
        )
        .await
        .map_err(|_| ReportError::Timeout)?
    }

    async fn run(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.tick(&cancel).await;
        }

        debug!("Sampling loop exited");
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Samples the device position on a timer and feeds a [`ShiftSession`].
///
/// Every successful fix is uploaded to the position sink whether or not a
/// shift is active. Failed fixes are logged and the cycle continues. Stopping
/// while a fix is outstanding abandons it; stopping after it arrived waits
/// for the upload.
pub struct LocationReporter {
    worker: Arc<Worker>,
    running: Mutex<Option<RunningLoop>>,
}

impl LocationReporter {
    pub fn new(
        positioning: Arc<dyn Positioning>,
        sink: Arc<dyn PositionSink>,
        session: Arc<ShiftSession>,
        config: ReporterConfig,
    ) -> Self {
        Self {
            worker: Arc::new(Worker {
                positioning,
                sink,
                session,
                config,
                in_flight: AsyncMutex::new(()),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<ShiftSession> {
        &self.worker.session
    }

    /// Starts sampling at the configured interval; the first sample is taken
    /// right away. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), ReporterError> {
        self.start_with(self.worker.config.interval)
    }

    /// Like [`LocationReporter::start`], with an explicit interval.
    pub fn start_with(&self, interval: Duration) -> Result<(), ReporterError> {
        if interval.is_zero() {
            return Err(ReporterError::InvalidInterval);
        }

        let mut running = self.running.lock();
        if matches!(running.as_ref(), Some(r) if !r.task.is_finished()) {
            return Err(ReporterError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.worker.clone().run(interval, cancel.clone()));
        *running = Some(RunningLoop { cancel, task });

        info!(interval_ms = interval.as_millis() as u64, "Location reporter started");
        Ok(())
    }

    /// Stops sampling. Once this returns no further sample is processed.
    /// Calling it again, or before `start`, does nothing.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        if let Some(RunningLoop { cancel, task }) = running {
            cancel.cancel();
            if let Err(e) = task.await {
                warn!(error = %e, "Sampling task ended abnormally");
            }
            info!("Location reporter stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.running.lock().as_ref(), Some(r) if !r.task.is_finished())
    }

    /// Runs a single sampling tick outside the timer. Returns false, without
    /// requesting a fix, when a tick is already in flight.
    pub async fn sample_now(&self) -> bool {
        self.worker.tick(&CancellationToken::new()).await
    }
}

impl Drop for LocationReporter {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.cancel.cancel();
        }
    }
}
