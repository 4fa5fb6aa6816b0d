//! Extraction of dates and date ranges from Korean announcement text.
//!
//! Announcement copy is wildly inconsistent: sometimes slash-formatted with
//! an explicit offset marker, sometimes `8월 22일 20:30(KST)`, often missing
//! the year entirely. Rather than one general grammar, each extractor is an
//! explicit ordered chain of matchers, most specific first; the first matcher
//! whose pattern fires decides the outcome. A wrong date silently accepted is
//! worse than a recognized failure, so a fired pattern with an impossible
//! calendar value aborts the whole chain instead of falling through.

use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// A single extracted timestamp. `Moment` is only produced when both a clock
/// time and a KST marker were present in the text; it renders with the fixed
/// +09:00 offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stamp {
    Day(NaiveDate),
    Moment(NaiveDate, NaiveTime),
}

impl Stamp {
    /// ISO rendering: `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:00+09:00`.
    pub fn iso(&self) -> String {
        match self {
            Stamp::Day(d) => d.format("%Y-%m-%d").to_string(),
            Stamp::Moment(d, t) => format!("{}T{}:00+09:00", d.format("%Y-%m-%d"), t.format("%H:%M")),
        }
    }

    /// Date-only ISO rendering, dropping any time-of-day.
    pub fn iso_date(&self) -> String {
        self.date().format("%Y-%m-%d").to_string()
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Stamp::Day(d) => *d,
            Stamp::Moment(d, _) => *d,
        }
    }

    /// Display form used inside descriptions: `M/D`, or `M/D HH:MM`.
    pub fn human_md(&self) -> String {
        match self {
            Stamp::Day(d) => format!("{}/{}", d.month(), d.day()),
            Stamp::Moment(d, t) => format!("{}/{} {}", d.month(), d.day(), t.format("%H:%M")),
        }
    }
}

/// An extracted date range. `start` is `None` for "update-triggered" ranges
/// whose opening boundary is stated only as `업데이트 후`; callers resolve it
/// from the version→start cache before persisting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
}

/// Outcome of one matcher in a chain.
enum MatchOutcome<T> {
    /// Pattern did not fire; try the next matcher.
    Miss,
    /// Pattern fired but the captured numbers are not a real calendar date.
    /// Aborts the chain: the text named a date we cannot trust.
    Invalid,
    Hit(T),
}

type StampMatcher = fn(&str, NaiveDate) -> MatchOutcome<Stamp>;
type RangeMatcher = fn(&str, NaiveDate) -> MatchOutcome<DateRange>;

/// Single-timestamp chain, most specific first. The slash+offset form must
/// precede the bare slash form or the looser pattern would swallow it.
const STAMP_MATCHERS: &[StampMatcher] = &[
    slash_datetime_utc8,
    slash_datetime,
    month_day_time_kst,
    month_day,
];

const RANGE_MATCHERS: &[RangeMatcher] = &[
    after_update_until,
    slash_datetime_pair,
    year_month_day_time_pair,
    year_month_day_pair,
    month_day_pair,
];

/// Extract a single date or date+time from free-form Korean text.
/// `today` supplies the assumed year for patterns that omit it.
pub fn find_datetime(text: &str, today: NaiveDate) -> Option<Stamp> {
    for matcher in STAMP_MATCHERS {
        match matcher(text, today) {
            MatchOutcome::Miss => continue,
            MatchOutcome::Invalid => return None,
            MatchOutcome::Hit(stamp) => return Some(stamp),
        }
    }
    None
}

/// Extract a start/end date pair from free-form Korean text.
pub fn find_date_range(text: &str, today: NaiveDate) -> Option<DateRange> {
    for matcher in RANGE_MATCHERS {
        match matcher(text, today) {
            MatchOutcome::Miss => continue,
            MatchOutcome::Invalid => return None,
            MatchOutcome::Hit(range) => return Some(range),
        }
    }
    None
}

fn num(caps: &Captures, i: usize) -> u32 {
    // Captures are all \d groups; 0 on the impossible parse failure maps to
    // an invalid date downstream.
    caps[i].parse().unwrap_or(0)
}

fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

// ex: 2025/12/17 06:00 (UTC+8), full-width parens tolerated. The clock is
// not a KST stamp, so only the date survives; no timezone shift is applied.
static SLASH_DT_UTC8: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})\s+(\d{1,2}):(\d{2})\s*[\(（]?\s*UTC\+8\s*[\)）]?").unwrap()
});

fn slash_datetime_utc8(text: &str, _today: NaiveDate) -> MatchOutcome<Stamp> {
    match SLASH_DT_UTC8.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => match ymd(caps[1].parse().unwrap_or(0), num(&caps, 2), num(&caps, 3)) {
            Some(d) => MatchOutcome::Hit(Stamp::Day(d)),
            None => MatchOutcome::Invalid,
        },
    }
}

// ex: 2025/12/17 06:00 (server time, no offset marker)
static SLASH_DT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})\s+(\d{1,2}):(\d{2})").unwrap());

fn slash_datetime(text: &str, _today: NaiveDate) -> MatchOutcome<Stamp> {
    match SLASH_DT.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => match ymd(caps[1].parse().unwrap_or(0), num(&caps, 2), num(&caps, 3)) {
            Some(d) => MatchOutcome::Hit(Stamp::Day(d)),
            None => MatchOutcome::Invalid,
        },
    }
}

// ex: 8월 22일 20:30(KST), 9월 5일 20시(KST) — minutes are optional,
// full-width colon and parens both appear in the wild
static MD_TIME_KST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{1,2})\s*월\s*(\d{1,2})\s*일\s*(\d{1,2})(?:[:：]\s*(\d{2}))?\s*시?\s*[\(（]?\s*KST\s*[\)）]?",
    )
    .unwrap()
});

fn month_day_time_kst(text: &str, today: NaiveDate) -> MatchOutcome<Stamp> {
    match MD_TIME_KST.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => {
            let minute = caps
                .get(4)
                .map_or(0, |m| m.as_str().parse().unwrap_or(0));
            let date = ymd(today.year(), num(&caps, 1), num(&caps, 2));
            let time = NaiveTime::from_hms_opt(num(&caps, 3), minute, 0);
            match (date, time) {
                (Some(d), Some(t)) => MatchOutcome::Hit(Stamp::Moment(d, t)),
                _ => MatchOutcome::Invalid,
            }
        }
    }
}

// ex: 8월 22일 (no time)
static MD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\s*월\s*(\d{1,2})\s*일").unwrap());

fn month_day(text: &str, today: NaiveDate) -> MatchOutcome<Stamp> {
    match MD.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => match ymd(today.year(), num(&caps, 1), num(&caps, 2)) {
            Some(d) => MatchOutcome::Hit(Stamp::Day(d)),
            None => MatchOutcome::Invalid,
        },
    }
}

// ex: "X.X 버전 업데이트 후 ~ 2025/12/16 15:00" — only the end boundary is
// stated; the start comes from the matching update announcement.
static AFTER_UPDATE_UNTIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"업데이트\s*(?:후|이후).*?[~\-–—]\s*(\d{4})/(\d{1,2})/(\d{1,2})\s+\d{1,2}:\d{2}")
        .unwrap()
});

fn after_update_until(text: &str, _today: NaiveDate) -> MatchOutcome<DateRange> {
    match AFTER_UPDATE_UNTIL.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => match ymd(caps[1].parse().unwrap_or(0), num(&caps, 2), num(&caps, 3)) {
            Some(end) => MatchOutcome::Hit(DateRange { start: None, end }),
            None => MatchOutcome::Invalid,
        },
    }
}

// ex: 2025/11/26 12:00 ~ 2025/12/16 15:00
static SLASH_DT_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{4})/(\d{1,2})/(\d{1,2})\s+\d{1,2}:\d{2}\s*[~\-–—]\s*(\d{4})/(\d{1,2})/(\d{1,2})\s+\d{1,2}:\d{2}",
    )
    .unwrap()
});

fn slash_datetime_pair(text: &str, _today: NaiveDate) -> MatchOutcome<DateRange> {
    match SLASH_DT_PAIR.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => {
            let start = ymd(caps[1].parse().unwrap_or(0), num(&caps, 2), num(&caps, 3));
            let end = ymd(caps[4].parse().unwrap_or(0), num(&caps, 5), num(&caps, 6));
            match (start, end) {
                (Some(s), Some(e)) => MatchOutcome::Hit(DateRange { start: Some(s), end: e }),
                _ => MatchOutcome::Invalid,
            }
        }
    }
}

// ex: 2025년 9월 24일 11:00 ~ 2025년 10월 15일 03:59
static YMD_TIME_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일\s*\d{1,2}:\d{2}\s*[~\-–—]\s*(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일\s*\d{1,2}:\d{2}",
    )
    .unwrap()
});

fn year_month_day_time_pair(text: &str, _today: NaiveDate) -> MatchOutcome<DateRange> {
    match YMD_TIME_PAIR.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => {
            let start = ymd(caps[1].parse().unwrap_or(0), num(&caps, 2), num(&caps, 3));
            let end = ymd(caps[4].parse().unwrap_or(0), num(&caps, 5), num(&caps, 6));
            match (start, end) {
                (Some(s), Some(e)) => MatchOutcome::Hit(DateRange { start: Some(s), end: e }),
                _ => MatchOutcome::Invalid,
            }
        }
    }
}

// ex: 2025년 9월 24일 ~ 2025년 10월 15일
static YMD_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일\s*[~\-–—]\s*(\d{4})년\s*(\d{1,2})월\s*(\d{1,2})일",
    )
    .unwrap()
});

fn year_month_day_pair(text: &str, _today: NaiveDate) -> MatchOutcome<DateRange> {
    match YMD_PAIR.captures(text) {
        None => MatchOutcome::Miss,
        Some(caps) => {
            let start = ymd(caps[1].parse().unwrap_or(0), num(&caps, 2), num(&caps, 3));
            let end = ymd(caps[4].parse().unwrap_or(0), num(&caps, 5), num(&caps, 6));
            match (start, end) {
                (Some(s), Some(e)) => MatchOutcome::Hit(DateRange { start: Some(s), end: e }),
                _ => MatchOutcome::Invalid,
            }
        }
    }
}

// ex: "9월 24일부터 10월 15일까지" or "9월 24일 ~ 10월 15일" — no year stated.
// The start takes the reference year; an end month numerically below the
// start month means the range crosses New Year and the end year is bumped.
static MD_FROM_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s*월\s*(\d{1,2})\s*일\s*부터.*?(\d{1,2})\s*월\s*(\d{1,2})\s*일\s*까지")
        .unwrap()
});
static MD_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s*월\s*(\d{1,2})\s*일\s*[~\-–—]\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일")
        .unwrap()
});

fn month_day_pair(text: &str, today: NaiveDate) -> MatchOutcome<DateRange> {
    let caps = match MD_FROM_TO.captures(text).or_else(|| MD_PAIR.captures(text)) {
        None => return MatchOutcome::Miss,
        Some(caps) => caps,
    };
    let (m1, d1, m2, d2) = (num(&caps, 1), num(&caps, 2), num(&caps, 3), num(&caps, 4));
    let start_year = today.year();
    let end_year = if m2 < m1 { start_year + 1 } else { start_year };
    match (ymd(start_year, m1, d1), ymd(end_year, m2, d2)) {
        (Some(s), Some(e)) => MatchOutcome::Hit(DateRange { start: Some(s), end: e }),
        _ => MatchOutcome::Invalid,
    }
}
