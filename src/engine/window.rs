use crate::domain::Frequency;
use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, Months, NaiveDate, Utc};
use thiserror::Error;

/// The inclusive `[start, end]` span of one frequency window.
///
/// Both bounds carry the offset of the timestamp the window was computed
/// from. `end` is the last representable millisecond before the next
/// window starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no {frequency} window can be computed for {timestamp}")]
pub struct WindowError {
    pub timestamp: String,
    pub frequency: Frequency,
}

impl Window {
    /// Window of `frequency` that contains `t`, in `t`'s own offset.
    pub fn containing(t: DateTime<FixedOffset>, frequency: Frequency) -> Result<Self, WindowError> {
        let err = || WindowError {
            timestamp: t.to_rfc3339(),
            frequency,
        };

        let day = t.date_naive();
        let (first, next) = match frequency {
            Frequency::Daily => (Some(day), day.succ_opt()),
            Frequency::Weekly => {
                let back = u64::from(day.weekday().num_days_from_monday());
                let monday = day.checked_sub_days(Days::new(back));
                (monday, monday.and_then(|m| m.checked_add_days(Days::new(7))))
            }
            Frequency::Monthly => {
                let first = day.with_day(1);
                (first, first.and_then(|f| f.checked_add_months(Months::new(1))))
            }
        };

        let offset = *t.offset();
        let start = first.and_then(|d| midnight(d, offset)).ok_or_else(err)?;
        let next_start = next.and_then(|d| midnight(d, offset)).ok_or_else(err)?;
        let end = next_start - Duration::milliseconds(1);

        Ok(Window { start, end })
    }

    /// Window of `frequency` that contains `t` on the UTC calendar.
    ///
    /// Every deposit of a task is placed with this, whatever offset it was
    /// recorded in, so two windows of one frequency are either equal or
    /// disjoint.
    pub fn canonical(t: DateTime<FixedOffset>, frequency: Frequency) -> Result<Self, WindowError> {
        Self::containing(t.with_timezone(&Utc).fixed_offset(), frequency)
    }

    /// True when `t` falls inside the window, bounds included.
    pub fn contains(&self, t: &DateTime<FixedOffset>) -> bool {
        self.start <= *t && *t <= self.end
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

fn midnight(day: NaiveDate, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    day.and_hms_opt(0, 0, 0)?.and_local_timezone(offset).single()
}
