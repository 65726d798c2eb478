use chrono::{FixedOffset, NaiveDate, Utc};
use compact_str::{CompactString, format_compact};

use crate::parse::AttendanceMap;

/// Seoul civil time; Korea observes no daylight saving.
pub const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Source of "today".
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        let Some(kst) = FixedOffset::east_opt(KST_OFFSET_SECS) else {
            return Utc::now().date_naive();
        };
        Utc::now().with_timezone(&kst).date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    #[inline]
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Outcome of one check.
#[derive(Debug, Clone)]
pub struct Attendance {
    pub date: NaiveDate,
    pub present: bool,
    pub map: AttendanceMap,
    pub weekly: Option<String>,
}

impl Attendance {
    pub fn message(&self) -> String {
        let date = date_key(self.date);
        if self.present {
            format!("✅ {date} 출석 완료!")
        } else {
            format!("❌ {date} 아직 미출석입니다.")
        }
    }
}

#[inline]
pub fn date_key(date: NaiveDate) -> CompactString {
    format_compact!("{}", date.format("%Y-%m-%d"))
}

fn is_truthy(marker: &str) -> bool {
    !matches!(marker.trim(), "" | "N" | "n" | "0" | "false")
}

pub fn is_present_on(map: &AttendanceMap, date: NaiveDate) -> bool {
    map.get(&date_key(date)).is_some_and(|m| is_truthy(m))
}

pub fn is_present_today(map: &AttendanceMap, clock: &impl Clock) -> bool {
    is_present_on(map, clock.today())
}
