//! Temperature and fan readings from a hardware monitor's daily log.

use chrono::{Local, NaiveDate};
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;

/// Latest temperatures (degrees C) and fan speed (RPM).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readings {
    pub temps: [i64; 4],
    pub fan: i64,
}

impl Readings {
    /// Parses one tab-separated log record: a timestamp followed by four
    /// temperatures and the fan speed.
    pub fn parse_record(line: &str) -> Option<Self> {
        let values: Vec<i64> = line
            .trim_end()
            .split('\t')
            .skip(1)
            .take(5)
            .map(|field| field.trim().parse::<f64>().ok().map(|v| v.trunc() as i64))
            .collect::<Option<_>>()?;

        match values.as_slice() {
            [t0, t1, t2, t3, fan] => Some(Self {
                temps: [*t0, *t1, *t2, *t3],
                fan: *fan,
            }),
            _ => None,
        }
    }
}

/// Reads the newest record of the dated log, at most once per interval.
pub struct TempsSource {
    pattern: String,
    sample_interval: Duration,
    last_sample: Option<Instant>,
    readings: Readings,
}

impl TempsSource {
    /// Creates a source for a strftime-style log path pattern.
    pub fn new(pattern: &str, sample_interval: Duration) -> Self {
        Self {
            pattern: pattern.to_string(),
            sample_interval,
            last_sample: None,
            readings: Readings::default(),
        }
    }

    /// Returns the log path for a given day.
    pub fn log_path(&self, date: NaiveDate) -> PathBuf {
        let mut path = String::new();
        if write!(path, "{}", date.format(&self.pattern)).is_err() {
            // Not a valid date pattern, use it as a plain path
            path = self.pattern.clone();
        }
        PathBuf::from(path)
    }

    fn read_latest(&self) -> Option<Readings> {
        let path = self.log_path(Local::now().date_naive());
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Temperature log {:?} unavailable: {}", path, e);
                return None;
            }
        };
        let line = content.lines().rev().find(|line| !line.trim().is_empty())?;
        let readings = Readings::parse_record(line);
        if readings.is_none() {
            debug!("Unrecognised temperature record: {:?}", line);
        }
        readings
    }

    /// Returns the latest readings, keeping the previous ones when the log
    /// cannot be read.
    pub fn sample(&mut self) -> Readings {
        let due = self
            .last_sample
            .map_or(true, |at| at.elapsed() >= self.sample_interval);
        if due {
            if let Some(readings) = self.read_latest() {
                self.readings = readings;
            }
            self.last_sample = Some(Instant::now());
        }
        self.readings
    }
}
