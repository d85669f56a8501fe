//! Debounced recompute pipeline.
//!
//! Edits to a dynamic model arm a trailing debounce. When it fires, one request
//! carrying the latest snapshot runs on a worker thread, and its result comes
//! back over a channel that `poll` drains without blocking.
//!
//! Every dispatch gets a sequence number. A completion older than the newest
//! applied one is dropped, so a slow early response can never overwrite a
//! fresher chart.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::chart::{ChartSeries, derive_series};
use crate::config::AppConfig;
use crate::data::{CalibrationBackend, CalibrationRequest, run_request};
use crate::domain::{CalibrationOutcome, ModelType, ParameterSet, Widget};
use crate::error::AppError;
use crate::recompute::debounce::Debouncer;

/// Surfaced when the health probe before a manual calibration fails.
pub const CONNECTION_FAILED: &str = "Backend connection failed. Please check if the backend server is running.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Debounce timer armed.
    Pending,
    /// A live request is running.
    InFlight,
}

struct Completion {
    seq: u64,
    result: Result<CalibrationOutcome, AppError>,
}

pub struct RecomputePipeline {
    backend: Arc<dyn CalibrationBackend>,
    asv_delay: Duration,
    zabr_delay: Duration,
    model: ModelType,
    debounce: Debouncer<Arc<ParameterSet>>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    next_seq: u64,
    /// Completions with `seq <= applied_seq` are discarded.
    applied_seq: u64,
    in_flight: BTreeSet<u64>,
    outcome: Option<CalibrationOutcome>,
    series: Option<ChartSeries>,
    error: Option<String>,
}

impl RecomputePipeline {
    pub fn new(backend: Arc<dyn CalibrationBackend>, model: ModelType, config: &AppConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            asv_delay: config.asv_debounce,
            zabr_delay: config.zabr_debounce,
            model,
            debounce: Debouncer::new(config.debounce_for(model.widget())),
            tx,
            rx,
            next_seq: 0,
            applied_seq: 0,
            in_flight: BTreeSet::new(),
            outcome: None,
            series: None,
            error: None,
        }
    }

    pub fn model(&self) -> ModelType {
        self.model
    }

    pub fn state(&self) -> PipelineState {
        if self.is_calculating() {
            PipelineState::InFlight
        } else if self.debounce.is_armed() {
            PipelineState::Pending
        } else {
            PipelineState::Idle
        }
    }

    /// Whether a request that could still be applied is running.
    pub fn is_calculating(&self) -> bool {
        self.in_flight.iter().any(|seq| *seq > self.applied_seq)
    }

    pub fn outcome(&self) -> Option<&CalibrationOutcome> {
        self.outcome.as_ref()
    }

    pub fn series(&self) -> Option<&ChartSeries> {
        self.series.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Deadline of the armed debounce timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// React to a parameter edit. Returns whether the timer was (re)armed.
    ///
    /// Only dynamic models recompute on edit. An edit during a running
    /// request arms a new timer and leaves that request alone.
    pub fn on_edit(&mut self, params: Arc<ParameterSet>, now: Instant) -> bool {
        if !self.model.is_dynamic() {
            return false;
        }
        self.debounce.arm(params, now);
        true
    }

    /// Manual "Calibrate": cancel the timer, probe `/health`, then calibrate.
    pub fn trigger_now(&mut self, params: Arc<ParameterSet>) {
        self.debounce.cancel();
        self.dispatch(params, true);
    }

    /// Switch model type. Clears result, series and error; in-flight results
    /// for the previous model are ignored. Dynamic models get an initial
    /// computation on the next `poll`.
    pub fn select_model(&mut self, model: ModelType, params: Arc<ParameterSet>, now: Instant) {
        self.model = model;
        self.debounce.cancel();
        self.debounce.set_delay(match model.widget() {
            Widget::Asv => self.asv_delay,
            Widget::Zabr => self.zabr_delay,
        });
        self.applied_seq = self.next_seq;
        self.outcome = None;
        self.series = None;
        self.error = None;
        if model.is_dynamic() {
            self.debounce.arm_at(params, now);
        }
        debug!(model = %model, "pipeline switched model");
    }

    /// Apply finished requests and fire the timer if due.
    ///
    /// Returns whether anything visible changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(done) => changed |= self.apply(done),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        if let Some(params) = self.debounce.take_due(now) {
            self.dispatch(params, false);
            changed = true;
        }
        changed
    }

    /// Block until no timer is armed and no live request remains, or until
    /// `timeout` elapses. Returns whether the pipeline went idle.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let give_up = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            self.poll(now);
            if self.state() == PipelineState::Idle {
                return true;
            }
            if now >= give_up {
                return false;
            }
            let wake = self.debounce.deadline().map_or(give_up, |d| d.min(give_up));
            let wait = wake.saturating_duration_since(now).max(Duration::from_millis(1));
            match self.rx.recv_timeout(wait) {
                Ok(done) => {
                    self.apply(done);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn dispatch(&mut self, params: Arc<ParameterSet>, probe: bool) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let request = CalibrationRequest::new(self.model, params);
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();

        self.error = None;
        debug!(seq, model = %self.model, probe, "dispatching calibration");

        let spawned = thread::Builder::new()
            .name(format!("calib-request-{seq}"))
            .spawn(move || {
                let result = execute(&*backend, &request, probe);
                // receiver gone means the pipeline was dropped
                let _ = tx.send(Completion { seq, result });
            });

        match spawned {
            Ok(_) => {
                self.in_flight.insert(seq);
            }
            Err(e) => {
                warn!(seq, error = %e, "failed to spawn request worker");
                self.error = Some(format!("Failed to start calibration: {e}"));
            }
        }
    }

    fn apply(&mut self, done: Completion) -> bool {
        self.in_flight.remove(&done.seq);
        if done.seq <= self.applied_seq {
            debug!(seq = done.seq, applied = self.applied_seq, "discarding stale response");
            return false;
        }
        self.applied_seq = done.seq;

        match done.result {
            Ok(outcome) => {
                info!(
                    seq = done.seq,
                    model = %outcome.model,
                    response_time_ms = outcome.response_time_ms,
                    "calibration applied"
                );
                self.series = Some(derive_series(&outcome));
                self.outcome = Some(outcome);
                self.error = None;
            }
            Err(e) => {
                warn!(seq = done.seq, error = %e, "calibration failed");
                self.error = Some(e.message().to_string());
            }
        }
        true
    }
}

impl Drop for RecomputePipeline {
    fn drop(&mut self) {
        if self.debounce.cancel() {
            debug!("pipeline dropped with an armed timer");
        }
    }
}

fn execute(
    backend: &dyn CalibrationBackend,
    request: &CalibrationRequest,
    probe: bool,
) -> Result<CalibrationOutcome, AppError> {
    if probe {
        backend.health().map_err(|e| {
            warn!(error = %e, "health probe failed");
            AppError::backend(CONNECTION_FAILED)
        })?;
    }
    run_request(backend, request)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::domain::{CalibrationData, CalibrationResponse, ComputationType, ParamValue, ZabrModel};
    use crate::params::ParameterStore;

    /// Echoes `atm` back as the single vol; sleeps `sleep_ms` first.
    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<ParameterSet>>,
        fail: AtomicBool,
        unhealthy: AtomicBool,
    }

    impl CalibrationBackend for FakeBackend {
        fn health(&self) -> Result<serde_json::Value, AppError> {
            if self.unhealthy.load(Ordering::SeqCst) {
                return Err(AppError::backend("connection refused"));
            }
            Ok(serde_json::json!({"status": "healthy"}))
        }

        fn calibrate(&self, request: &CalibrationRequest) -> Result<CalibrationResponse, AppError> {
            let params = request.complete_params();
            self.calls.lock().unwrap().push(params.clone());
            if let Some(ms) = params.number("sleep_ms") {
                thread::sleep(Duration::from_millis(ms as u64));
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::backend("HTTP error! status: 500"));
            }
            Ok(CalibrationResponse {
                data: CalibrationData {
                    strikes: vec![2000.0],
                    vols: Some(vec![params.number("atm").unwrap_or(0.0)]),
                    ..CalibrationData::default()
                },
                ..CalibrationResponse::default()
            })
        }
    }

    const DYNAMIC: ModelType = ModelType::Asv(ComputationType::DynamicAsv);

    fn setup(model: ModelType) -> (Arc<FakeBackend>, RecomputePipeline, ParameterStore) {
        let backend = Arc::new(FakeBackend::default());
        let config = AppConfig {
            asv_debounce: Duration::from_millis(50),
            zabr_debounce: Duration::from_millis(30),
            ..AppConfig::default()
        };
        let pipeline = RecomputePipeline::new(backend.clone(), model, &config);
        (backend, pipeline, ParameterStore::new(model))
    }

    fn shown_vol(p: &RecomputePipeline) -> Option<f64> {
        p.series()?.points.first()?.calibrated_vol
    }

    #[test]
    fn burst_of_edits_sends_one_trailing_request() {
        let (backend, mut pipeline, mut store) = setup(DYNAMIC);
        let t0 = Instant::now();

        for (i, atm) in ["0.2", "0.3", "0.4"].iter().enumerate() {
            let snap = store.set("atm", atm);
            assert!(pipeline.on_edit(snap, t0 + Duration::from_millis(10 * i as u64)));
        }
        assert_eq!(pipeline.state(), PipelineState::Pending);
        assert!(!pipeline.poll(t0 + Duration::from_millis(60)));
        assert!(pipeline.poll(t0 + Duration::from_millis(70)));

        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].number("atm"), Some(0.4));
        assert_eq!(shown_vol(&pipeline), Some(0.4));
    }

    #[test]
    fn stale_response_never_overwrites_newer_one() {
        let (backend, mut pipeline, mut store) = setup(DYNAMIC);

        store.set("sleep_ms", "300");
        pipeline.trigger_now(store.set("atm", "0.2"));
        store.set("sleep_ms", "0");
        pipeline.trigger_now(store.set("atm", "0.3"));

        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));
        assert_eq!(shown_vol(&pipeline), Some(0.3));

        // let the slow first request land, then drain it
        thread::sleep(Duration::from_millis(500));
        pipeline.poll(Instant::now());
        assert_eq!(backend.calls.lock().unwrap().len(), 2);
        assert_eq!(shown_vol(&pipeline), Some(0.3));
        assert!(!pipeline.is_calculating());
    }

    #[test]
    fn edit_during_running_request_arms_new_timer() {
        let (backend, mut pipeline, mut store) = setup(DYNAMIC);

        store.set("sleep_ms", "300");
        pipeline.trigger_now(store.set("atm", "0.2"));
        store.set("sleep_ms", "0");
        let t0 = Instant::now();
        assert!(pipeline.on_edit(store.set("atm", "0.3"), t0));

        assert_eq!(pipeline.state(), PipelineState::InFlight);
        assert!(pipeline.deadline().is_some());

        // the timer fires while the first request is still sleeping
        assert!(pipeline.poll(t0 + Duration::from_millis(60)));
        assert!(pipeline.deadline().is_none());
        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));
        assert_eq!(shown_vol(&pipeline), Some(0.3));

        thread::sleep(Duration::from_millis(500));
        pipeline.poll(Instant::now());
        let mut sent: Vec<f64> = backend
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p.number("atm"))
            .collect();
        sent.sort_by(f64::total_cmp);
        assert_eq!(sent, vec![0.2, 0.3]);
        assert_eq!(shown_vol(&pipeline), Some(0.3));
        assert_eq!(pipeline.error(), None);
    }

    #[test]
    fn failure_keeps_prior_series_and_sets_error() {
        let (backend, mut pipeline, mut store) = setup(DYNAMIC);
        pipeline.trigger_now(store.set("atm", "0.25"));
        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));
        let before = pipeline.series().cloned();
        assert!(before.is_some());

        backend.fail.store(true, Ordering::SeqCst);
        pipeline.trigger_now(store.set("atm", "0.5"));
        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));

        assert_eq!(pipeline.series().cloned(), before);
        assert_eq!(pipeline.error(), Some("HTTP error! status: 500"));
    }

    #[test]
    fn failed_health_probe_sends_nothing() {
        let (backend, mut pipeline, store) = setup(ModelType::Asv(ComputationType::VolatilityAsv));
        backend.unhealthy.store(true, Ordering::SeqCst);
        pipeline.trigger_now(store.snapshot());
        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));
        assert_eq!(pipeline.error(), Some(CONNECTION_FAILED));
        assert!(backend.calls.lock().unwrap().is_empty());
        assert!(pipeline.series().is_none());
    }

    #[test]
    fn non_dynamic_edits_never_arm_timer() {
        let (backend, mut pipeline, mut store) = setup(ModelType::Asv(ComputationType::Density));
        let t0 = Instant::now();
        assert!(!pipeline.on_edit(store.set("rho", "0.1"), t0));
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(!pipeline.poll(t0 + Duration::from_secs(1)));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn model_switch_clears_result_and_schedules_dynamic_run() {
        let (backend, mut pipeline, mut store) = setup(DYNAMIC);
        pipeline.trigger_now(store.snapshot());
        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));
        assert!(pipeline.outcome().is_some());

        let zabr = ModelType::Zabr(ZabrModel::SabrPde);
        let snap = store.select(zabr);
        let t0 = Instant::now();
        pipeline.select_model(zabr, snap, t0);
        assert!(pipeline.outcome().is_none());
        assert!(pipeline.series().is_none());
        assert_eq!(pipeline.state(), PipelineState::Pending);

        assert!(pipeline.poll(t0));
        assert!(pipeline.wait_until_idle(Duration::from_secs(5)));
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].number("alpha"), Some(0.035));
        assert_eq!(calls[1].get("use_vol_adjustement"), Some(&ParamValue::Flag(true)));
    }

    #[test]
    fn dropping_pipeline_with_armed_timer_sends_nothing() {
        let (backend, mut pipeline, store) = setup(DYNAMIC);
        pipeline.on_edit(store.snapshot(), Instant::now());
        drop(pipeline);
        thread::sleep(Duration::from_millis(100));
        assert!(backend.calls.lock().unwrap().is_empty());
    }
}
