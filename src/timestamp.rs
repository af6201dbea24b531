//! Entry modification timestamps.
//!
//! Entries carry their last-modified time as milliseconds since the Unix
//! epoch. Zip records store an MS-DOS date and time instead:
//! - two-second resolution
//! - years 1980 through 2107 only
//! - no time zone (this crate reads and writes them as UTC)
//!
//! Converting a [`Timestamp`] to a zip date-time therefore rounds odd seconds
//! down and clamps values outside the representable range.
//!
//! # Example
//!
//! ```rust
//! use atlas::Timestamp;
//!
//! let ts = Timestamp::from_millis(1_700_000_000_000);
//! let dos = ts.to_zip();
//! assert_eq!(dos.year(), 2023);
//! assert_eq!(Timestamp::from_zip(dos).unwrap().as_millis(), 1_700_000_000_000);
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds per second.
const MILLIS_PER_SECOND: i64 = 1000;

/// A last-modified time in milliseconds since January 1, 1970 (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Timestamp = Timestamp { millis: 0 };

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    /// Returns milliseconds since the Unix epoch.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.millis
    }

    /// Returns whole seconds since the Unix epoch, rounding toward negative infinity.
    pub const fn as_unix_secs(&self) -> i64 {
        self.millis.div_euclid(MILLIS_PER_SECOND)
    }

    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Creates a timestamp from a `SystemTime`, saturating at the `i64` range.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Self::from_millis(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)),
            Err(e) => {
                let before = i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX);
                Self::from_millis(-before)
            }
        }
    }

    /// Converts to a `SystemTime`.
    pub fn as_system_time(&self) -> SystemTime {
        let magnitude = Duration::from_millis(self.millis.unsigned_abs());
        if self.millis >= 0 {
            UNIX_EPOCH + magnitude
        } else {
            UNIX_EPOCH - magnitude
        }
    }

    /// Creates a timestamp from a zip record's date and time.
    ///
    /// Returns `None` if the record holds an impossible date (for example
    /// month 13), which some writers emit for "unknown".
    pub fn from_zip(datetime: zip::DateTime) -> Option<Self> {
        let month = time::Month::try_from(datetime.month()).ok()?;
        let date =
            time::Date::from_calendar_date(i32::from(datetime.year()), month, datetime.day())
                .ok()?;
        let clock =
            time::Time::from_hms(datetime.hour(), datetime.minute(), datetime.second()).ok()?;
        let secs = time::PrimitiveDateTime::new(date, clock)
            .assume_utc()
            .unix_timestamp();
        Some(Self::from_millis(secs * MILLIS_PER_SECOND))
    }

    /// Converts to a zip date and time, clamping to 1980-01-01 00:00:00 and
    /// 2107-12-31 23:59:58.
    pub fn to_zip(&self) -> zip::DateTime {
        if let Some(datetime) = self.try_to_zip() {
            return datetime;
        }

        log::warn!(
            "timestamp {}ms is outside the zip date range, clamping",
            self.millis
        );
        if self.millis < 0 || self.as_unix_secs() < DOS_EPOCH_UNIX_SECS {
            zip::DateTime::default()
        } else {
            zip::DateTime::from_date_and_time(2107, 12, 31, 23, 59, 58)
                .unwrap_or_default()
        }
    }

    fn try_to_zip(&self) -> Option<zip::DateTime> {
        let utc = time::OffsetDateTime::from_unix_timestamp(self.as_unix_secs()).ok()?;
        let year = u16::try_from(utc.year()).ok()?;
        zip::DateTime::from_date_and_time(
            year,
            u8::from(utc.month()),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second(),
        )
        .ok()
    }
}

/// 1980-01-01 00:00:00 UTC, the earliest zip date.
const DOS_EPOCH_UNIX_SECS: i64 = 315_532_800;

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}
