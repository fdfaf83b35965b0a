//! The alert loop.
//!
//! One tick: read the feed, upsert and prune the table, look up newly seen
//! airframes, select the subject, advance the refresh cycle, publish the
//! record, then launch the render job if a cycle started. The engine owns
//! every piece of mutable state; collaborators only return data.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use overhead_core::{
    parse_feed, AircraftSnapshot, AircraftTable, AlertCriteria, AlertInputs, AlertRecord,
    CyclePhase, LatLon, OverheadError, RefreshCycle, Result, SchedulePolicy, TrackedAircraft,
};

use crate::publish;

/// Wait before asking the registry again after a failed call.
const REGISTRY_RETRY_SECS: i64 = 60;
use crate::sources::Collaborators;

/// Fixed settings for one engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub alert_path: PathBuf,
    pub png_url: String,
    pub refresh_interval_ms: u64,
    /// Upper bound on any single collaborator call.
    pub call_timeout: Duration,
}

/// Tick counters, exposed on `/api/status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub cycles_started: u64,
    pub refresh_ticks: u64,
    pub registry_lookups: u64,
    pub publish_failures: u64,
    pub last_tick: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub stats: EngineStats,
    pub phase: CyclePhase,
    pub within_schedule: bool,
    pub tracked: usize,
    pub subject: Option<String>,
    pub last_alerted_flight: Option<String>,
}

/// Latest state for the read-only HTTP API.
#[derive(Debug, Clone, Serialize)]
pub struct LiveView {
    pub alert: Option<AlertRecord>,
    pub aircraft: Vec<TrackedAircraft>,
    pub status: StatusView,
}

impl Default for LiveView {
    fn default() -> Self {
        LiveView {
            alert: None,
            aircraft: Vec::new(),
            status: StatusView {
                stats: EngineStats::default(),
                phase: CyclePhase::Idle,
                within_schedule: false,
                tracked: 0,
                subject: None,
                last_alerted_flight: None,
            },
        }
    }
}

pub struct Engine {
    table: AircraftTable,
    cycle: RefreshCycle,
    criteria: AlertCriteria,
    policy: SchedulePolicy,
    sources: Collaborators,
    settings: EngineSettings,

    /// Identity codes the registry answered not-found for; never asked again.
    registry_misses: HashSet<String>,
    /// Identity codes whose lookup failed, with the earliest retry time.
    registry_retry: HashMap<String, DateTime<Utc>>,
    last_temperature: Option<f64>,
    last_subject: Option<String>,
    stats: EngineStats,
    view: Option<watch::Sender<LiveView>>,
}

/// Await a collaborator call, giving up after `limit`.
async fn bounded<T>(limit: Duration, what: &str, call: impl Future<Output = Option<T>>) -> Option<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(collaborator = what, "lookup timed out");
            None
        }
    }
}

/// Read and parse the aircraft feed document.
pub async fn read_feed(path: &Path) -> Result<Vec<AircraftSnapshot>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| OverheadError::Feed(format!("{}: {e}", path.display())))?;
    parse_feed(&text)
}

impl Engine {
    pub fn new(
        table: AircraftTable,
        cycle: RefreshCycle,
        criteria: AlertCriteria,
        policy: SchedulePolicy,
        sources: Collaborators,
        settings: EngineSettings,
    ) -> Self {
        Engine {
            table,
            cycle,
            criteria,
            policy,
            sources,
            settings,
            registry_misses: HashSet::new(),
            registry_retry: HashMap::new(),
            last_temperature: None,
            last_subject: None,
            stats: EngineStats::default(),
            view: None,
        }
    }

    /// Publish every tick's state on `tx`.
    pub fn with_view(mut self, tx: watch::Sender<LiveView>) -> Self {
        self.view = Some(tx);
        self
    }

    pub fn table(&self) -> &AircraftTable {
        &self.table
    }

    pub fn cycle(&self) -> &RefreshCycle {
        &self.cycle
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Record a tick that could not run (feed unreadable). Table untouched.
    pub fn skip_tick(&mut self, reason: &OverheadError) {
        self.stats.skipped_ticks += 1;
        warn!(error = %reason, "feed unavailable, skipping tick");
    }

    /// Run one tick against this tick's snapshots.
    pub async fn tick(&mut self, now: DateTime<Utc>, snapshots: Vec<AircraftSnapshot>) -> AlertRecord {
        self.stats.ticks += 1;
        self.stats.last_tick = Some(now);

        let mut seen = HashSet::with_capacity(snapshots.len());
        let mut new_codes = Vec::new();
        for snap in &snapshots {
            seen.insert(snap.hex.clone());
            if self.table.upsert(snap, now) && !self.registry_misses.contains(&snap.hex) {
                new_codes.push(snap.hex.clone());
            }
        }
        let evicted = self.table.prune(&seen, now);
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted stale aircraft");
        }

        self.registry_retry.retain(|hex, _| self.table.get(hex).is_some());
        new_codes.extend(
            self.registry_retry
                .iter()
                .filter(|(_, retry_at)| **retry_at <= now)
                .map(|(hex, _)| hex.clone()),
        );
        self.lookup_registry(now, new_codes).await;

        let within_schedule = self.policy.is_publishing_allowed(now);
        let subject: Option<(String, String, LatLon, f64)> = self.criteria.select(&self.table).map(|ac| {
            (
                ac.hex.clone(),
                ac.flight().unwrap_or_default().to_string(),
                ac.position,
                ac.distance_km,
            )
        });

        let asset_mtime = self.sources.render.asset_modified().await;
        let mut render_flight = None;

        match &subject {
            Some((hex, flight, position, distance_km)) => {
                if self.last_subject.as_deref() != Some(hex.as_str()) {
                    info!(flight = %flight, hex = %hex, distance_km = *distance_km, "new alert subject");
                }
                let limit = self.settings.call_timeout;
                let temperature = if self.cycle.try_start(now, asset_mtime) {
                    self.stats.cycles_started += 1;
                    info!(flight = %flight, hex = %hex, "refresh cycle started");
                    let (schedule, temperature) = tokio::join!(
                        bounded(limit, "schedule", self.sources.schedule.lookup(flight)),
                        bounded(limit, "weather", self.sources.weather.temperature_c(*position)),
                    );
                    match schedule {
                        Some(info) => self.table.attach_schedule(hex, info),
                        None => debug!(flight = %flight, "no schedule data"),
                    }
                    render_flight = Some(flight.clone());
                    temperature
                } else {
                    bounded(limit, "weather", self.sources.weather.temperature_c(*position)).await
                };
                if temperature.is_some() {
                    self.last_temperature = temperature;
                }
            }
            None => {
                if let Some(prev) = self.last_subject.take() {
                    debug!(hex = %prev, "alert subject cleared");
                }
            }
        }
        self.last_subject = subject.as_ref().map(|(hex, ..)| hex.clone());

        let refresh = self.cycle.pulse(
            now,
            subject.as_ref().map(|(_, flight, ..)| flight.as_str()),
            within_schedule,
            asset_mtime,
        );
        if refresh {
            self.stats.refresh_ticks += 1;
        }

        let subject_hex = subject.as_ref().map(|(hex, ..)| hex.as_str());
        let record = AlertRecord::build(AlertInputs {
            now,
            display: within_schedule,
            refresh,
            refresh_interval_ms: self.settings.refresh_interval_ms,
            png_url: &self.settings.png_url,
            subject: subject_hex.and_then(|hex| self.table.get(hex)),
            temperature_c: self.last_temperature,
        });

        match publish::write_alert(&self.settings.alert_path, &record).await {
            Ok(()) => {
                if let Some(hex) = subject_hex {
                    self.table.mark_alerted(hex);
                }
            }
            Err(e) => {
                self.stats.publish_failures += 1;
                warn!(path = %self.settings.alert_path.display(), error = %e, "publish failed");
            }
        }

        if let Some(flight) = render_flight {
            self.sources.render.trigger(&self.settings.alert_path, &flight).await;
        }

        self.broadcast(now, within_schedule, &record);
        record
    }

    async fn lookup_registry(&mut self, now: DateTime<Utc>, codes: Vec<String>) {
        if codes.is_empty() {
            return;
        }
        self.stats.registry_lookups += codes.len() as u64;

        let registry = self.sources.registry.clone();
        let registry = &registry;
        let limit = self.settings.call_timeout;
        let results = join_all(codes.iter().map(|hex| async move {
            tokio::time::timeout(limit, registry.lookup(hex))
                .await
                .unwrap_or_else(|_| Err(OverheadError::Lookup(format!("registry {hex}: timed out"))))
        }))
        .await;

        for (hex, result) in codes.into_iter().zip(results) {
            match result {
                Ok(Some(info)) => {
                    self.registry_retry.remove(&hex);
                    self.table.attach_registry(&hex, info);
                }
                Ok(None) => {
                    self.registry_retry.remove(&hex);
                    self.registry_misses.insert(hex);
                }
                Err(e) => {
                    warn!(error = %e, "registry lookup failed");
                    self.registry_retry
                        .insert(hex, now + chrono::Duration::seconds(REGISTRY_RETRY_SECS));
                }
            }
        }
    }

    fn broadcast(&self, now: DateTime<Utc>, within_schedule: bool, record: &AlertRecord) {
        let Some(tx) = &self.view else {
            return;
        };
        tx.send_replace(LiveView {
            alert: Some(record.clone()),
            aircraft: self.table.by_distance().into_iter().cloned().collect(),
            status: StatusView {
                stats: self.stats.clone(),
                phase: self.cycle.phase(now),
                within_schedule,
                tracked: self.table.len(),
                subject: self.last_subject.clone(),
                last_alerted_flight: self.cycle.last_alerted_flight().map(str::to_string),
            },
        });
    }

    /// Tick every `period` until ctrl-c.
    pub async fn run(mut self, feed_path: PathBuf, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(feed = %feed_path.display(), period_ms = period.as_millis() as u64, "alert loop started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = async {
                    interval.tick().await;
                    let now = Utc::now();
                    match read_feed(&feed_path).await {
                        Ok(snapshots) => {
                            self.tick(now, snapshots).await;
                        }
                        Err(e) => self.skip_tick(&e),
                    }
                } => {}
            }
        }
        info!(ticks = self.stats.ticks, skipped = self.stats.skipped_ticks, "shutting down");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveTime, TimeZone};
    use overhead_core::geo::destination;
    use overhead_core::schedule::TimeWindow;
    use overhead_core::{AircraftInfo, FlightInfo, DEFAULT_REFERENCE};

    use crate::sources::{AircraftRegistry, FlightSchedule, RenderTrigger, WeatherSource};

    // -- Recording stubs ----------------------------------------------------

    #[derive(Default)]
    struct StubRegistry {
        calls: Mutex<Vec<String>>,
        known: Vec<String>,
        /// The first call sleeps this long.
        first_delay: Option<Duration>,
    }

    #[async_trait]
    impl AircraftRegistry for StubRegistry {
        async fn lookup(&self, hex: &str) -> Result<Option<AircraftInfo>> {
            let first = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(hex.to_string());
                calls.len() == 1
            };
            if let (true, Some(d)) = (first, self.first_delay) {
                tokio::time::sleep(d).await;
            }
            Ok(self.known.iter().any(|k| k == hex).then(|| AircraftInfo {
                registration: Some("C-GROV".into()),
                type_name: Some("A220-300".into()),
                ..Default::default()
            }))
        }
    }

    #[derive(Default)]
    struct StubSchedule {
        calls: Mutex<Vec<String>>,
        answer: Option<FlightInfo>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl FlightSchedule for StubSchedule {
        async fn lookup(&self, callsign: &str) -> Option<FlightInfo> {
            self.calls.lock().unwrap().push(callsign.to_string());
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            self.answer.clone()
        }
    }

    struct StubWeather {
        temperature: Mutex<Option<f64>>,
    }

    #[async_trait]
    impl WeatherSource for StubWeather {
        async fn temperature_c(&self, _at: LatLon) -> Option<f64> {
            *self.temperature.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct StubRender {
        triggers: Mutex<Vec<String>>,
        mtime: Mutex<Option<DateTime<Utc>>>,
    }

    #[async_trait]
    impl RenderTrigger for StubRender {
        async fn trigger(&self, _alert_path: &Path, flight: &str) -> bool {
            self.triggers.lock().unwrap().push(flight.to_string());
            true
        }

        async fn asset_modified(&self) -> Option<DateTime<Utc>> {
            *self.mtime.lock().unwrap()
        }
    }

    struct Harness {
        engine: Engine,
        registry: Arc<StubRegistry>,
        schedule: Arc<StubSchedule>,
        weather: Arc<StubWeather>,
        render: Arc<StubRender>,
        _dir: tempfile::TempDir,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap()
    }

    fn always_open() -> SchedulePolicy {
        let all_day = TimeWindow::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        );
        SchedulePolicy {
            timezone: chrono_tz::UTC,
            disabled_months: vec![],
            weekday: all_day,
            weekend: all_day,
        }
    }

    fn scheduled_flight() -> FlightInfo {
        FlightInfo {
            flight: Some("ABC 123".into()),
            takeoff_time_actual: Some(t0() - ChronoDuration::hours(2)),
            landing_time_estimated: Some(t0() + ChronoDuration::minutes(20)),
            arrival_time_estimated: Some(t0() + ChronoDuration::hours(2)),
            ..Default::default()
        }
    }

    fn harness_with(schedule: StubSchedule, registry: StubRegistry, policy: SchedulePolicy) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(registry);
        let schedule = Arc::new(schedule);
        let weather = Arc::new(StubWeather {
            temperature: Mutex::new(Some(22.5)),
        });
        let render = Arc::new(StubRender {
            mtime: Mutex::new(Some(t0() - ChronoDuration::hours(1))),
            ..Default::default()
        });
        let sources = Collaborators {
            registry: registry.clone(),
            schedule: schedule.clone(),
            weather: weather.clone(),
            render: render.clone(),
        };
        let engine = Engine::new(
            AircraftTable::new(DEFAULT_REFERENCE),
            RefreshCycle::default(),
            AlertCriteria::default(),
            policy,
            sources,
            EngineSettings {
                alert_path: dir.path().join("alert.json"),
                png_url: "http://display.local/flight_card.png".into(),
                refresh_interval_ms: 10_000,
                call_timeout: Duration::from_millis(200),
            },
        );
        Harness {
            engine,
            registry,
            schedule,
            weather,
            render,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(
            StubSchedule {
                answer: Some(scheduled_flight()),
                ..Default::default()
            },
            StubRegistry::default(),
            always_open(),
        )
    }

    /// Aircraft `km` south of the reference, flying north.
    fn inbound(hex: &str, km: f64, callsign: &str) -> AircraftSnapshot {
        AircraftSnapshot {
            hex: hex.to_string(),
            position: destination(DEFAULT_REFERENCE, 180.0, km),
            altitude_ft: Some(3000),
            ground_speed_kts: Some(160.0),
            heading_deg: Some(0.0),
            callsign: Some(callsign.to_string()),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + ChronoDuration::seconds(secs)
    }

    // -- Scenarios ----------------------------------------------------------

    #[tokio::test]
    async fn test_cycle_starts_then_throttles() {
        let mut h = harness();

        let rec = h.engine.tick(at(0), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;
        assert_eq!(rec.flight, "ABC123");
        assert_eq!(rec.eta_minutes, Some(20));
        assert!(!rec.refresh);
        assert_eq!(*h.schedule.calls.lock().unwrap(), vec!["ABC123".to_string()]);
        assert_eq!(*h.render.triggers.lock().unwrap(), vec!["ABC123".to_string()]);
        assert_eq!(h.engine.cycle().last_cycle_start(), Some(at(0)));
        assert_eq!(h.engine.cycle().baseline_mtime(), Some(t0() - ChronoDuration::hours(1)));

        let rec = h.engine.tick(at(30), vec![inbound("a1b2c3", 4.0, "ABC123")]).await;
        assert_eq!(h.schedule.calls.lock().unwrap().len(), 1);
        assert_eq!(h.render.triggers.lock().unwrap().len(), 1);
        // recomputed from the cached schedule
        assert_eq!(rec.eta_minutes, Some(19));
        assert_eq!(rec.flight_info.flight.as_deref(), Some("ABC 123"));
        assert_eq!(h.engine.stats().cycles_started, 1);
    }

    #[tokio::test]
    async fn test_new_cycle_after_interval() {
        let mut h = harness();
        for secs in [0, 20, 40, 59] {
            h.engine.tick(at(secs), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;
        }
        assert_eq!(h.render.triggers.lock().unwrap().len(), 1);

        h.engine.tick(at(60), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;
        assert_eq!(h.render.triggers.lock().unwrap().len(), 2);
        assert_eq!(h.schedule.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_pulse_after_render() {
        let mut h = harness();
        let feed = || vec![inbound("a1b2c3", 5.0, "ABC123")];

        assert!(!h.engine.tick(at(0), feed()).await.refresh);
        assert!(!h.engine.tick(at(1), feed()).await.refresh);

        // render job lands
        *h.render.mtime.lock().unwrap() = Some(at(1));
        assert!(h.engine.tick(at(2), feed()).await.refresh);
        assert!(h.engine.tick(at(10), feed()).await.refresh);
        assert!(h.engine.tick(at(15), feed()).await.refresh);
        // 13 s after first assertion the pulse drops and stays down
        assert!(!h.engine.tick(at(16), feed()).await.refresh);
        assert!(!h.engine.tick(at(30), feed()).await.refresh);
        assert_eq!(h.engine.cycle().last_alerted_flight(), Some("ABC123"));
        assert_eq!(h.engine.stats().refresh_ticks, 3);
    }

    #[tokio::test]
    async fn test_nearest_subject_selected() {
        let mut h = harness();
        let rec = h
            .engine
            .tick(
                at(0),
                vec![inbound("bbbbbb", 6.0, "FAR600"), inbound("aaaaaa", 3.0, "NEAR300")],
            )
            .await;
        assert_eq!(rec.flight, "NEAR300");
        assert!(h.engine.table().get("aaaaaa").unwrap().alerted);
        assert!(!h.engine.table().get("bbbbbb").unwrap().alerted);
    }

    #[tokio::test]
    async fn test_registry_looked_up_once() {
        let mut h = harness_with(
            StubSchedule::default(),
            StubRegistry {
                known: vec!["a1b2c3".into()],
                ..Default::default()
            },
            always_open(),
        );

        let rec = h
            .engine
            .tick(at(0), vec![inbound("a1b2c3", 5.0, "ACA123"), inbound("dead00", 30.0, "XYZ1")])
            .await;
        assert_eq!(rec.aircraft_info.registration.as_deref(), Some("C-GROV"));
        assert_eq!(rec.aircraft_info.operator.as_deref(), Some("Air Canada"));
        assert_eq!(h.registry.calls.lock().unwrap().len(), 2);

        h.engine.tick(at(1), vec![inbound("a1b2c3", 5.0, "ACA123"), inbound("dead00", 30.0, "XYZ1")]).await;
        assert_eq!(h.registry.calls.lock().unwrap().len(), 2);

        // dead00 leaves, gets evicted, and comes back: the miss is remembered
        h.engine.tick(at(1000), vec![inbound("a1b2c3", 5.0, "ACA123")]).await;
        assert!(h.engine.table().get("dead00").is_none());
        h.engine.tick(at(1001), vec![inbound("dead00", 30.0, "XYZ1")]).await;
        assert_eq!(h.registry.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_registry_outage_is_retried() {
        let mut h = harness_with(
            StubSchedule::default(),
            StubRegistry {
                known: vec!["a1b2c3".into()],
                first_delay: Some(Duration::from_secs(5)),
                ..Default::default()
            },
            always_open(),
        );
        let feed = || vec![inbound("a1b2c3", 5.0, "ACA123")];

        let rec = h.engine.tick(at(0), feed()).await;
        assert_eq!(rec.aircraft_info.registration, None);
        assert_eq!(h.registry.calls.lock().unwrap().len(), 1);

        // not asked again until the retry delay passes
        h.engine.tick(at(30), feed()).await;
        assert_eq!(h.registry.calls.lock().unwrap().len(), 1);

        let rec = h.engine.tick(at(60), feed()).await;
        assert_eq!(h.registry.calls.lock().unwrap().len(), 2);
        assert_eq!(rec.aircraft_info.registration.as_deref(), Some("C-GROV"));

        h.engine.tick(at(120), feed()).await;
        assert_eq!(h.registry.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_registry_outage_then_reacquired() {
        let mut h = harness_with(
            StubSchedule::default(),
            StubRegistry {
                known: vec!["a1b2c3".into()],
                first_delay: Some(Duration::from_secs(5)),
                ..Default::default()
            },
            always_open(),
        );

        h.engine.tick(at(0), vec![inbound("a1b2c3", 5.0, "ACA123")]).await;
        // leaves before the retry and is evicted
        h.engine.tick(at(10), vec![]).await;
        h.engine.tick(at(1000), vec![]).await;
        assert!(h.engine.table().get("a1b2c3").is_none());

        let rec = h.engine.tick(at(3600), vec![inbound("a1b2c3", 5.0, "ACA123")]).await;
        assert_eq!(h.registry.calls.lock().unwrap().len(), 2);
        assert_eq!(rec.aircraft_info.registration.as_deref(), Some("C-GROV"));
    }

    #[tokio::test]
    async fn test_no_subject_carries_temperature() {
        let mut h = harness();
        h.engine.tick(at(0), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;

        *h.weather.temperature.lock().unwrap() = Some(5.0);
        let rec = h.engine.tick(at(1), vec![inbound("a1b2c3", 20.0, "ABC123")]).await;
        assert_eq!(rec.flight, "");
        assert_eq!(rec.png_url, "");
        assert_eq!(rec.eta_minutes, None);
        assert_eq!(rec.temperature_c, Some(22.5));
        assert!(rec.display);
    }

    #[tokio::test]
    async fn test_outside_schedule_hides_card() {
        let mut closed = always_open();
        closed.disabled_months = (1..=12).collect();
        let mut h = harness_with(
            StubSchedule {
                answer: Some(scheduled_flight()),
                ..Default::default()
            },
            StubRegistry::default(),
            closed,
        );
        *h.render.mtime.lock().unwrap() = None;

        let rec = h.engine.tick(at(0), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;
        *h.render.mtime.lock().unwrap() = Some(at(0));
        let rec2 = h.engine.tick(at(1), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;

        assert!(!rec.display);
        assert_eq!(rec.png_url, "");
        assert_eq!(rec.flight, "ABC123");
        assert!(!rec2.refresh);
    }

    #[tokio::test]
    async fn test_slow_schedule_times_out() {
        let mut h = harness_with(
            StubSchedule {
                answer: Some(scheduled_flight()),
                delay: Some(Duration::from_secs(10)),
                ..Default::default()
            },
            StubRegistry::default(),
            always_open(),
        );
        let rec = h.engine.tick(at(0), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;
        assert_eq!(rec.flight, "ABC123");
        assert_eq!(rec.eta_minutes, None);
        assert_eq!(rec.flight_info, FlightInfo::default());
        // render still fires with empty schedule data
        assert_eq!(h.render.triggers.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_published_to_disk() {
        let mut h = harness();
        let (tx, rx) = watch::channel(LiveView::default());
        h.engine = h.engine.with_view(tx);

        let rec = h.engine.tick(at(0), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;

        let path = h._dir.path().join("alert.json");
        let on_disk: AlertRecord = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(on_disk, rec);

        let view = rx.borrow();
        assert_eq!(view.alert.as_ref().map(|a| a.flight.as_str()), Some("ABC123"));
        assert_eq!(view.aircraft.len(), 1);
        assert_eq!(view.status.subject.as_deref(), Some("a1b2c3"));
        assert_eq!(view.status.stats.ticks, 1);
    }

    #[tokio::test]
    async fn test_malformed_feed_skips_tick() {
        let mut h = harness();
        h.engine.tick(at(0), vec![inbound("a1b2c3", 5.0, "ABC123")]).await;

        let feed = h._dir.path().join("aircraft.json");
        std::fs::write(&feed, "{\"aircraft\": [").unwrap();
        let err = read_feed(&feed).await.unwrap_err();
        assert!(matches!(err, OverheadError::Feed(_)));
        h.engine.skip_tick(&err);

        let missing = read_feed(&h._dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(missing, OverheadError::Feed(_)));

        assert_eq!(h.engine.stats().skipped_ticks, 1);
        assert_eq!(h.engine.stats().ticks, 1);
        assert_eq!(h.engine.table().len(), 1);
    }
}
