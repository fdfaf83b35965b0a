//! Configuration file management for overhead.
//!
//! Reads/writes `~/.overhead/config.yaml` with the reference point, feed
//! location, alert thresholds, output paths, render command, publishing
//! schedule, and collaborator endpoints.

use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::cycle::RefreshCycle;
use crate::schedule::{parse_months, SchedulePolicy, TimeWindow};
use crate::selector::AlertCriteria;
use crate::types::{LatLon, OverheadError, Result, DEFAULT_REFERENCE};

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub reference: ReferenceConfig,
    pub feed: FeedConfig,
    pub alert: AlertConfig,
    pub output: OutputConfig,
    pub render: RenderConfig,
    pub schedule: ScheduleConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceConfig {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub path: String,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertConfig {
    pub max_distance_km: f64,
    pub max_closest_approach_km: f64,
    pub blacklist: Vec<String>,
    pub min_interval_secs: i64,
    pub refresh_window_ms: i64,
    pub refresh_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub alert_path: String,
    pub png_url: String,
    /// Bind address for the read-only HTTP API, `None` to disable.
    pub serve: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub command: Option<String>,
    pub asset_path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub timezone: String,
    pub disabled_months: Vec<u32>,
    pub weekday: String,
    pub weekend: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServicesConfig {
    pub registry_url: String,
    pub schedule_url: String,
    pub weather_url: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let alert = AlertCriteria::default();
        let mut blacklist: Vec<String> = alert.blacklist.into_iter().collect();
        blacklist.sort();
        Config {
            reference: ReferenceConfig {
                lat: DEFAULT_REFERENCE.lat,
                lon: DEFAULT_REFERENCE.lon,
            },
            feed: FeedConfig {
                path: "/run/dump1090-fa/aircraft.json".into(),
                interval_secs: 1,
            },
            alert: AlertConfig {
                max_distance_km: alert.max_distance_km,
                max_closest_approach_km: alert.max_closest_approach_km,
                blacklist,
                min_interval_secs: crate::cycle::DEFAULT_MIN_ALERT_INTERVAL_SECS,
                refresh_window_ms: crate::cycle::DEFAULT_REFRESH_WINDOW_MS,
                refresh_interval_ms: crate::alert::DEFAULT_REFRESH_INTERVAL_MS,
            },
            output: OutputConfig {
                alert_path: "/usr/share/skyaware/html/flight_alert.json".into(),
                png_url: "http://127.0.0.1:8080/flight_card.png".into(),
                serve: None,
            },
            render: RenderConfig {
                command: None,
                asset_path: "/usr/share/skyaware/html/flight_card.png".into(),
            },
            schedule: ScheduleConfig {
                timezone: "America/New_York".into(),
                disabled_months: vec![12, 1, 2],
                weekday: "16:00-22:00".into(),
                weekend: "09:00-23:00".into(),
            },
            services: ServicesConfig {
                registry_url: "https://api.adsbdb.com/v0/aircraft".into(),
                schedule_url: "https://www.flightaware.com/live/flight".into(),
                weather_url: "https://api.open-meteo.com/v1/forecast".into(),
                timeout_secs: 5,
            },
        }
    }
}

impl Config {
    pub fn reference_point(&self) -> LatLon {
        LatLon::new(self.reference.lat, self.reference.lon)
    }

    pub fn criteria(&self) -> AlertCriteria {
        AlertCriteria {
            max_distance_km: self.alert.max_distance_km,
            max_closest_approach_km: self.alert.max_closest_approach_km,
            blacklist: self.alert.blacklist.iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }

    pub fn refresh_cycle(&self) -> RefreshCycle {
        RefreshCycle::new(
            Duration::seconds(self.alert.min_interval_secs),
            Duration::milliseconds(self.alert.refresh_window_ms),
        )
    }

    /// Build the publishing policy. Fails on an unknown timezone or a
    /// malformed window.
    pub fn schedule_policy(&self) -> Result<SchedulePolicy> {
        let timezone = self
            .schedule
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| OverheadError::Config(format!("bad timezone '{}': {e}", self.schedule.timezone)))?;
        Ok(SchedulePolicy {
            timezone,
            disabled_months: self.schedule.disabled_months.clone(),
            weekday: TimeWindow::parse(&self.schedule.weekday)?,
            weekend: TimeWindow::parse(&self.schedule.weekend)?,
        })
    }
}

/// Get the config directory path (`~/.overhead/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".overhead")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.overhead/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    load_config_from(&config_file())
}

/// Load config from an explicit path, falling back to defaults.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(_) => Config::default(),
    }
}

/// Save config to `~/.overhead/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| OverheadError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config)).map_err(|e| OverheadError::Config(e.to_string()))
}

/// Parse simple YAML-like config text. Unknown keys and unparseable values
/// keep their defaults.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }
        let Some(section) = current_section.as_deref() else {
            continue;
        };

        match (section, key) {
            ("reference", "lat") => set(&mut config.reference.lat, parse_float_value(val)),
            ("reference", "lon") => set(&mut config.reference.lon, parse_float_value(val)),

            ("feed", "path") => set(&mut config.feed.path, parse_string_value(val)),
            ("feed", "interval_secs") => set(&mut config.feed.interval_secs, val.parse().ok()),

            ("alert", "max_distance_km") => {
                set(&mut config.alert.max_distance_km, parse_float_value(val))
            }
            ("alert", "max_closest_approach_km") => {
                set(&mut config.alert.max_closest_approach_km, parse_float_value(val))
            }
            ("alert", "blacklist") => {
                config.alert.blacklist = parse_string_value(val)
                    .map(|v| split_list(&v))
                    .unwrap_or_default()
            }
            ("alert", "min_interval_secs") => {
                set(&mut config.alert.min_interval_secs, val.parse().ok())
            }
            ("alert", "refresh_window_ms") => {
                set(&mut config.alert.refresh_window_ms, val.parse().ok())
            }
            ("alert", "refresh_interval_ms") => {
                set(&mut config.alert.refresh_interval_ms, val.parse().ok())
            }

            ("output", "alert_path") => set(&mut config.output.alert_path, parse_string_value(val)),
            ("output", "png_url") => set(&mut config.output.png_url, parse_string_value(val)),
            ("output", "serve") => config.output.serve = parse_string_value(val),

            ("render", "command") => config.render.command = parse_string_value(val),
            ("render", "asset_path") => set(&mut config.render.asset_path, parse_string_value(val)),

            ("schedule", "timezone") => set(&mut config.schedule.timezone, parse_string_value(val)),
            ("schedule", "disabled_months") => {
                let text = parse_string_value(val).unwrap_or_default();
                set(&mut config.schedule.disabled_months, parse_months(&text).ok())
            }
            ("schedule", "weekday") => set(&mut config.schedule.weekday, parse_string_value(val)),
            ("schedule", "weekend") => set(&mut config.schedule.weekend, parse_string_value(val)),

            ("services", "registry_url") => {
                set(&mut config.services.registry_url, parse_string_value(val))
            }
            ("services", "schedule_url") => {
                set(&mut config.services.schedule_url, parse_string_value(val))
            }
            ("services", "weather_url") => {
                set(&mut config.services.weather_url, parse_string_value(val))
            }
            ("services", "timeout_secs") => set(&mut config.services.timeout_secs, val.parse().ok()),

            _ => {}
        }
    }

    config
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

fn split_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    let quoted = (val.starts_with('"') && val.ends_with('"'))
        || (val.starts_with('\'') && val.ends_with('\''));
    if quoted && val.len() >= 2 {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

fn opt_string(val: &Option<String>) -> String {
    match val {
        Some(v) => format!("\"{v}\""),
        None => "null".into(),
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let months: Vec<String> = config.schedule.disabled_months.iter().map(u32::to_string).collect();
    let lines = [
        "# overhead configuration".to_string(),
        String::new(),
        "# Point alerts are measured against".into(),
        "reference:".into(),
        format!("  lat: {}", config.reference.lat),
        format!("  lon: {}", config.reference.lon),
        String::new(),
        "feed:".into(),
        format!("  path: \"{}\"", config.feed.path),
        format!("  interval_secs: {}", config.feed.interval_secs),
        String::new(),
        "alert:".into(),
        format!("  max_distance_km: {}", config.alert.max_distance_km),
        format!("  max_closest_approach_km: {}", config.alert.max_closest_approach_km),
        format!("  blacklist: \"{}\"", config.alert.blacklist.join(", ")),
        format!("  min_interval_secs: {}", config.alert.min_interval_secs),
        format!("  refresh_window_ms: {}", config.alert.refresh_window_ms),
        format!("  refresh_interval_ms: {}", config.alert.refresh_interval_ms),
        String::new(),
        "output:".into(),
        format!("  alert_path: \"{}\"", config.output.alert_path),
        format!("  png_url: \"{}\"", config.output.png_url),
        format!("  serve: {}", opt_string(&config.output.serve)),
        String::new(),
        "# Launched once per cycle with OVERHEAD_ALERT_PATH and OVERHEAD_FLIGHT set".into(),
        "render:".into(),
        format!("  command: {}", opt_string(&config.render.command)),
        format!("  asset_path: \"{}\"", config.render.asset_path),
        String::new(),
        "# Local-time windows, inclusive".into(),
        "schedule:".into(),
        format!("  timezone: \"{}\"", config.schedule.timezone),
        format!("  disabled_months: \"{}\"", months.join(",")),
        format!("  weekday: \"{}\"", config.schedule.weekday),
        format!("  weekend: \"{}\"", config.schedule.weekend),
        String::new(),
        "services:".into(),
        format!("  registry_url: \"{}\"", config.services.registry_url),
        format!("  schedule_url: \"{}\"", config.services.schedule_url),
        format!("  weather_url: \"{}\"", config.services.weather_url),
        format!("  timeout_secs: {}", config.services.timeout_secs),
    ];

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
