use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;
use std::time::{Duration, Instant};

/// Records named timestamps through a detection run.
#[derive(Clone, Debug)]
pub struct TimeProfile {
    /// Start timestamp
    now: Instant,
    /// Named timestamps
    stamps: Vec<TimeProfileEntry>,
}

impl Default for TimeProfile {
    fn default() -> Self {
        Self {
            now: Instant::now(),
            stamps: Default::default(),
        }
    }
}

#[derive(Clone, Debug)]
struct TimeProfileEntry {
    /// Entry name
    name: Cow<'static, str>,
    /// Entry timestamp
    timestamp: Instant,
}

impl TimeProfile {
    fn start(&self) -> Instant {
        self.now
    }

    /// Clear all records
    pub fn clear(&mut self) {
        self.stamps.clear();
        self.now = Instant::now();
    }

    /// Record a timestamp right now
    #[inline]
    pub fn stamp(&mut self, name: impl Into<Cow<'static, str>>) {
        let entry = TimeProfileEntry {
            name: name.into(),
            timestamp: Instant::now(),
        };

        self.stamps.push(entry);
    }

    /// Get duration from the first to the last recorded timestamp
    pub fn total_duration(&self) -> Duration {
        let stamps = &self.stamps;
        if stamps.is_empty() {
            return Duration::ZERO;
        }

        let first = stamps.first().unwrap();
        let last = stamps.last().unwrap();

        last.timestamp - first.timestamp
    }
}

impl Display for TimeProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stamps = &self.stamps;

        // Find maximums for scaling output
        let max_name_length = stamps
            .iter()
            .map(|stamp| stamp.name.len())
            .max()
            .unwrap_or(0)
            .max(1);

        let total_time = match stamps.last() {
            Some(last_stamp) => last_stamp.timestamp - self.now,
            None => Duration::ZERO,
        };

        let mut last_time = self.now;
        for (i, stamp) in stamps.iter().enumerate() {
            let cumtime = stamp.timestamp - self.now;
            let parttime = stamp.timestamp - last_time;

            writeln!(
                f,
                "{:2} {:0width$} {:12.6} ms {:12.6} ms {:3.0}%",
                i,
                stamp.name,
                parttime.as_secs_f64() * 1000.,
                cumtime.as_secs_f64() * 1000.,
                100. * parttime.as_secs_f64() / total_time.as_secs_f64().max(f64::EPSILON),
                width = max_name_length
            )?;

            last_time = stamp.timestamp;
        }

        Ok(())
    }
}

/// Tracks statistics of multiple time profiles
#[derive(Default)]
pub struct TimeProfileStatistics {
    /// Entry information
    values: HashMap<String, Vec<Duration>>,
    /// Entry keys, in order
    keys: Vec<String>,
}

impl TimeProfileStatistics {
    pub fn add(&mut self, tp: &TimeProfile) {
        let mut last_time = tp.start();
        for stamp in tp.stamps.iter() {
            let name: &str = &stamp.name;

            let duration = stamp.timestamp - last_time;
            last_time = stamp.timestamp;

            match self.values.entry(name.into()) {
                std::collections::hash_map::Entry::Occupied(mut e) => e.get_mut().push(duration),
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(Vec::new()).push(duration);
                    self.keys.push(name.into());
                }
            }
        }
    }
}

impl Display for TimeProfileStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let max_name = self
            .keys
            .iter()
            .map(|stamp| stamp.len())
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            " # {:width$} {:>15} {:>15} {:>15} {:>15}",
            "Name",
            "Average",
            "Min",
            "Max",
            "Std.dev",
            width = max_name
        )?;

        for (i, key) in self.keys.iter().enumerate() {
            let entry = self.values.get(key).unwrap();
            let mut max = Duration::ZERO;
            let mut min = Duration::from_nanos(u64::MAX);
            let mut sum = 0.;
            let mut stddev_acc = 0.;
            for d in entry.iter().copied() {
                let d_s = d.as_secs_f64();
                sum += d_s;
                stddev_acc += d_s * d_s;
                if d > max {
                    max = d;
                }
                if d < min {
                    min = d;
                }
            }
            let len = entry.len().max(1);
            let avg = sum / (len as f64);
            let stddev = (stddev_acc / (len as f64)).sqrt();

            writeln!(
                f,
                "{:2} {:0width$} {:12.6} ms {:12.6} ms {:12.6} ms {:12.6} ms",
                i,
                key,
                avg * 1e3,
                min.as_secs_f64() * 1e3,
                max.as_secs_f64() * 1e3,
                stddev * 1e3,
                width = max_name
            )?;
        }

        Ok(())
    }
}
