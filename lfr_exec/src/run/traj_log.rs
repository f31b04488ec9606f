//! Trajectory log

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use comms_if::{
    ctrl::{ControlCommand, TrackingError},
    sim::Pose,
};
use util::archive::{ArchiveError, Archiver};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogRecord {
    pub step: u64,

    /// Simulation time at the start of the step
    pub time_s: f64,

    /// Pose at the start of the step
    pub pose: Pose,

    /// Tracking error computed for the pose
    pub error: TrackingError,

    /// Command issued for the step
    pub cmd: ControlCommand,

    pub tracking_lost: bool,

    /// True if a disturbance was applied during the step
    pub disturbance_active: bool,
}

/// Flattened form of a [`LogRecord`], used for CSV archives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogRow {
    pub step: u64,
    pub time_s: f64,
    pub x_m: f64,
    pub y_m: f64,
    pub head_rad: f64,
    pub lat_err_m: f64,
    pub head_err_rad: f64,
    pub lat_err_rate_ms: f64,
    pub speed_ms: f64,
    pub ang_vel_rads: f64,
    pub tracking_lost: bool,
    pub disturbance_active: bool,
}

/// Ordered, append-only log of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryLog {
    records: Vec<LogRecord>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogError {
    #[error("Step index must increase: last was {last}, found {found}")]
    NonIncreasingStep { last: u64, found: u64 },

    #[error("Time must increase: last was {last} s, found {found} s")]
    NonIncreasingTime { last: f64, found: f64 },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajectoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a record to the log. The record's step index and time must both
    /// be greater than those of the last record.
    pub fn push(&mut self, record: LogRecord) -> Result<(), LogError> {
        if let Some(last) = self.records.last() {
            if record.step <= last.step {
                return Err(LogError::NonIncreasingStep {
                    last: last.step,
                    found: record.step,
                });
            }
            // Also rejects NaN
            if !(record.time_s > last.time_s) {
                return Err(LogError::NonIncreasingTime {
                    last: last.time_s,
                    found: record.time_s,
                });
            }
        }

        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&LogRecord> {
        self.records.last()
    }

    /// Iterate over the log as flat rows.
    pub fn rows(&self) -> impl Iterator<Item = LogRow> + '_ {
        self.records.iter().map(LogRow::from)
    }

    /// Write the whole log into the given archive.
    pub fn archive(&self, archiver: &mut Archiver) -> Result<(), ArchiveError> {
        for row in self.rows() {
            archiver.serialise(row)?;
        }
        Ok(())
    }
}

impl From<&LogRecord> for LogRow {
    fn from(r: &LogRecord) -> Self {
        Self {
            step: r.step,
            time_s: r.time_s,
            x_m: r.pose.x_m,
            y_m: r.pose.y_m,
            head_rad: r.pose.head_rad,
            lat_err_m: r.error.lat_err_m,
            head_err_rad: r.error.head_err_rad,
            lat_err_rate_ms: r.error.lat_err_rate_ms,
            speed_ms: r.cmd.speed_ms,
            ang_vel_rads: r.cmd.ang_vel_rads,
            tracking_lost: r.tracking_lost,
            disturbance_active: r.disturbance_active,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(step: u64, time_s: f64) -> LogRecord {
        LogRecord {
            step,
            time_s,
            pose: Pose::new(time_s, 0.5, 0.1),
            error: TrackingError {
                lat_err_m: -0.5,
                head_err_rad: -0.1,
                lat_err_rate_ms: 0.0,
            },
            cmd: ControlCommand::new(1.0, -0.2),
            tracking_lost: false,
            disturbance_active: step % 2 == 0,
        }
    }

    #[test]
    fn test_append_only() {
        let mut log = TrajectoryLog::new();
        assert!(log.is_empty());

        log.push(record(0, 0.0)).unwrap();
        log.push(record(1, 0.1)).unwrap();

        assert_eq!(
            log.push(record(1, 0.2)),
            Err(LogError::NonIncreasingStep { last: 1, found: 1 })
        );
        assert!(matches!(
            log.push(record(2, 0.1)),
            Err(LogError::NonIncreasingTime { .. })
        ));
        assert!(log.push(record(2, std::f64::NAN)).is_err());

        // Rejected records are not appended
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().map(|r| r.step), Some(1));
    }

    #[test]
    fn test_rows() {
        let mut log = TrajectoryLog::new();
        log.push(record(0, 0.0)).unwrap();

        let rows: Vec<LogRow> = log.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].y_m, 0.5);
        assert_eq!(rows[0].lat_err_m, -0.5);
        assert_eq!(rows[0].ang_vel_rads, -0.2);
        assert!(rows[0].disturbance_active);
    }
}
