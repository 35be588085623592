//! Free-text time expressions to absolute local timestamps.
//!
//! The resolver scans an utterance for up to three independent pieces and
//! combines them:
//!
//! | Piece | Examples |
//! |-------|----------|
//! | relative offset | `in 20 minutes`, `in an hour`, `in half an hour`, `in 2 days` |
//! | day anchor | `today`, `tomorrow`, `day after tomorrow`, `next week`, `on friday`, `2025-06-01`, `6/1/2025` |
//! | clock | `6pm`, `6:30 pm`, `6 a.m.`, `18:30`, `noon`, `midnight`, `at 7` |
//! | part of day | `morning` 09:00, `afternoon` 15:00, `evening` 19:00, `tonight` 20:00 |
//!
//! An utterance that is entirely an ISO-8601 timestamp is taken literally.
//!
//! With `prefer_future`, a result that is not after `now` is pushed to the
//! next occurrence: a clock time with no day moves to tomorrow and a weekday
//! moves a week ahead.  Explicit days (`today`, dates) are never moved.
//!
//! Nothing here fails: text without a recognisable expression resolves to
//! `None`.

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Weekday};
use ethos_store::timestamp;
use regex::{Captures, Regex};

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static RE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bin\s+(an?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fifteen|twenty|thirty|forty-five|forty|fifty|sixty|\d{1,4})\s+(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?)\b",
    )
    .unwrap()
});

static RE_HALF_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin\s+half\s+an?\s+hour\b").unwrap());

static RE_DAY_AFTER_TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:the\s+)?day\s+after\s+tomorrow\b").unwrap());

static RE_TOMORROW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\btomorrow\b").unwrap());

static RE_TODAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\btoday\b").unwrap());

static RE_NEXT_WEEK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnext\s+week\b").unwrap());

static RE_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(on|this|next)\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    )
    .unwrap()
});

static RE_ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:on\s+)?(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static RE_US_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:on\s+)?(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());

static RE_CLOCK_MERIDIEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\b\.?").unwrap()
});

static RE_CLOCK_24H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?([01]?\d|2[0-3]):([0-5]\d)\b").unwrap());

static RE_NOON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?(?:noon|midday)\b").unwrap());

static RE_MIDNIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at\s+)?midnight\b").unwrap());

static RE_BARE_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bat\s+(\d{1,2})(?:\s*o'?clock)?\b").unwrap());

static RE_PART_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(?:this|in\s+the|at)\s+)?(morning|afternoon|evening|tonight|night)\b")
        .unwrap()
});

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A resolved time expression and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeMatch {
    /// The absolute local timestamp.
    pub when: DateTime<Local>,
    /// The source text covering every recognised piece, e.g.
    /// `"tomorrow at noon"`.
    pub phrase: String,
    /// Byte ranges of the recognised pieces, sorted and non-overlapping.
    pub spans: Vec<Range<usize>>,
}

/// Resolves free-text time expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeResolver {
    prefer_future: bool,
}

impl Default for TimeResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Resolve `text` relative to the current local time.
pub fn resolve(text: &str, prefer_future: bool) -> Option<DateTime<Local>> {
    TimeResolver::new(prefer_future).resolve(text)
}

// ---------------------------------------------------------------------------
// Internal pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayAnchor {
    /// Whole days from today; keeps the current time of day.
    Offset(i64),
    Weekday { day: Weekday, next: bool },
    /// An explicit calendar date; defaults to midnight.
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clock {
    Exact(NaiveTime),
    /// `at 7`: either 07:00 or 19:00.
    BareHour(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl PartOfDay {
    fn hour(self) -> u32 {
        match self {
            Self::Morning => 9,
            Self::Afternoon => 15,
            Self::Evening => 19,
            Self::Night => 20,
        }
    }

    fn is_after_noon(self) -> bool {
        !matches!(self, Self::Morning)
    }
}

impl TimeResolver {
    /// Create a resolver.
    pub fn new(prefer_future: bool) -> Self {
        Self { prefer_future }
    }

    /// Resolve `text` relative to the current local time.
    pub fn resolve(&self, text: &str) -> Option<DateTime<Local>> {
        self.resolve_at(text, Local::now())
    }

    /// Resolve `text` relative to `now`.
    pub fn resolve_at(&self, text: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
        self.extract_at(text, now).map(|m| m.when)
    }

    /// Find and resolve the time expression in `text`, relative to `now`.
    pub fn extract_at(&self, text: &str, now: DateTime<Local>) -> Option<TimeMatch> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(when) = timestamp::parse(trimmed) {
            let start = text.len() - text.trim_start().len();
            return Some(TimeMatch {
                when,
                phrase: trimmed.to_owned(),
                spans: vec![start..start + trimmed.len()],
            });
        }

        let mut spans: Vec<Range<usize>> = Vec::new();

        // Sub-day offsets are absolute and ignore everything else.
        if let Some(m) = RE_HALF_HOUR.find(text) {
            return Some(single(text, now + Duration::minutes(30), m.range()));
        }

        let mut anchor = None;
        if let Some((offset, span)) = find_free(&RE_RELATIVE, text, &spans, parse_relative) {
            match offset {
                Offset::Exact(delta) => return Some(single(text, now + delta, span)),
                Offset::Days(days) => {
                    anchor = Some(DayAnchor::Offset(days));
                    spans.push(span);
                }
            }
        }

        if anchor.is_none()
            && let Some((found, span)) = find_anchor(text, &spans)
        {
            anchor = Some(found);
            spans.push(span);
        }

        let clock = find_clock(text, &spans).map(|(clock, span)| {
            spans.push(span);
            clock
        });

        let part = find_free(&RE_PART_OF_DAY, text, &spans, parse_part_of_day).map(|(part, span)| {
            spans.push(span);
            part
        });

        if anchor.is_none() && clock.is_none() && part.is_none() {
            return None;
        }

        let today = now.date_naive();
        let date = match anchor {
            None => today,
            Some(DayAnchor::Offset(days)) => today + Duration::days(days),
            Some(DayAnchor::Weekday { day, next }) => {
                let ahead = days_until(today.weekday(), day);
                today + Duration::days(if next && ahead == 0 { 7 } else { ahead })
            }
            Some(DayAnchor::Date(date)) => date,
        };

        let time = match (clock, part) {
            (Some(Clock::Exact(t)), _) => t,
            (Some(Clock::BareHour(h)), part) => self.pick_bare_hour(h, part, date, now)?,
            (None, Some(part)) => NaiveTime::from_hms_opt(part.hour(), 0, 0)?,
            (None, None) => match anchor {
                Some(DayAnchor::Date(_)) => NaiveTime::MIN,
                _ => now.time(),
            },
        };

        let mut when = local(date, time)?;
        if self.prefer_future && when <= now {
            match anchor {
                None => when = local(date + Duration::days(1), time)?,
                Some(DayAnchor::Weekday { .. }) => when = local(date + Duration::days(7), time)?,
                _ => {}
            }
        }

        spans.sort_by_key(|s| s.start);
        Some(TimeMatch {
            when,
            phrase: covering_phrase(text, &spans),
            spans,
        })
    }

    /// Choose between `h:00` and `(h+12):00` for a clock with no meridiem.
    fn pick_bare_hour(
        &self,
        hour: u32,
        part: Option<PartOfDay>,
        date: NaiveDate,
        now: DateTime<Local>,
    ) -> Option<NaiveTime> {
        let at = |h: u32| NaiveTime::from_hms_opt(h, 0, 0);
        match hour {
            0 | 12..=23 => at(hour),
            1..=11 if part.is_some_and(PartOfDay::is_after_noon) => at(hour + 12),
            1..=11 if self.prefer_future => {
                // Earliest upcoming of the two readings on the anchor day.
                let upcoming = [hour, hour + 12]
                    .into_iter()
                    .filter_map(at)
                    .find(|t| local(date, *t).is_some_and(|dt| dt > now));
                upcoming.or_else(|| at(hour))
            }
            1..=11 => at(hour),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

enum Offset {
    Exact(Duration),
    Days(i64),
}

fn single(text: &str, when: DateTime<Local>, span: Range<usize>) -> TimeMatch {
    TimeMatch {
        when,
        phrase: text[span.clone()].trim().to_owned(),
        spans: vec![span],
    }
}

fn local(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Local>> {
    let naive = date.and_time(time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        // Inside a DST gap: take the first valid instant after it.
        .or_else(|| Local.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

fn days_until(from: Weekday, to: Weekday) -> i64 {
    let from = i64::from(from.num_days_from_monday());
    let to = i64::from(to.num_days_from_monday());
    (to - from).rem_euclid(7)
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// First match of `re` that does not overlap `taken` and that `parse`
/// accepts.
fn find_free<T>(
    re: &Regex,
    text: &str,
    taken: &[Range<usize>],
    parse: impl Fn(&Captures<'_>) -> Option<T>,
) -> Option<(T, Range<usize>)> {
    re.captures_iter(text).find_map(|caps| {
        let span = caps.get(0)?.range();
        if taken.iter().any(|t| overlaps(t, &span)) {
            return None;
        }
        parse(&caps).map(|value| (value, span))
    })
}

fn covering_phrase(text: &str, spans: &[Range<usize>]) -> String {
    match (spans.iter().map(|s| s.start).min(), spans.iter().map(|s| s.end).max()) {
        (Some(start), Some(end)) => text[start..end].trim().to_owned(),
        _ => String::new(),
    }
}

fn number_word(word: &str) -> Option<i64> {
    let n = match word.to_ascii_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "fifteen" => 15,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "forty-five" => 45,
        "fifty" => 50,
        "sixty" => 60,
        digits => return digits.parse().ok(),
    };
    Some(n)
}

fn parse_relative(caps: &Captures<'_>) -> Option<Offset> {
    let n = number_word(caps.get(1)?.as_str())?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let offset = if unit.starts_with("sec") {
        Offset::Exact(Duration::seconds(n))
    } else if unit.starts_with("min") {
        Offset::Exact(Duration::minutes(n))
    } else if unit.starts_with('h') {
        Offset::Exact(Duration::hours(n))
    } else if unit.starts_with('d') {
        Offset::Days(n)
    } else {
        Offset::Days(n * 7)
    };
    Some(offset)
}

fn find_anchor(text: &str, taken: &[Range<usize>]) -> Option<(DayAnchor, Range<usize>)> {
    find_free(&RE_DAY_AFTER_TOMORROW, text, taken, |_| Some(DayAnchor::Offset(2)))
        .or_else(|| find_free(&RE_TOMORROW, text, taken, |_| Some(DayAnchor::Offset(1))))
        .or_else(|| find_free(&RE_TODAY, text, taken, |_| Some(DayAnchor::Offset(0))))
        .or_else(|| find_free(&RE_NEXT_WEEK, text, taken, |_| Some(DayAnchor::Offset(7))))
        .or_else(|| find_free(&RE_WEEKDAY, text, taken, parse_weekday))
        .or_else(|| {
            find_free(&RE_ISO_DATE, text, taken, |c| {
                date_from(c.get(1)?.as_str(), c.get(2)?.as_str(), c.get(3)?.as_str())
            })
        })
        .or_else(|| {
            find_free(&RE_US_DATE, text, taken, |c| {
                date_from(c.get(3)?.as_str(), c.get(1)?.as_str(), c.get(2)?.as_str())
            })
        })
}

fn date_from(year: &str, month: &str, day: &str) -> Option<DayAnchor> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
        .map(DayAnchor::Date)
}

fn parse_weekday(caps: &Captures<'_>) -> Option<DayAnchor> {
    let next = caps
        .get(1)
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("next"));
    let day = caps.get(2)?.as_str().parse::<Weekday>().ok()?;
    Some(DayAnchor::Weekday { day, next })
}

fn find_clock(text: &str, taken: &[Range<usize>]) -> Option<(Clock, Range<usize>)> {
    find_free(&RE_CLOCK_MERIDIEM, text, taken, parse_meridiem)
        .or_else(|| {
            find_free(&RE_CLOCK_24H, text, taken, |c| {
                let t = NaiveTime::from_hms_opt(c[1].parse().ok()?, c[2].parse().ok()?, 0)?;
                Some(Clock::Exact(t))
            })
        })
        .or_else(|| find_free(&RE_NOON, text, taken, |_| Some(Clock::Exact(NaiveTime::from_hms_opt(12, 0, 0)?))))
        .or_else(|| find_free(&RE_MIDNIGHT, text, taken, |_| Some(Clock::Exact(NaiveTime::MIN))))
        .or_else(|| {
            find_free(&RE_BARE_HOUR, text, taken, |c| {
                let hour: u32 = c[1].parse().ok()?;
                (hour < 24).then_some(Clock::BareHour(hour))
            })
        })
}

fn parse_meridiem(caps: &Captures<'_>) -> Option<Clock> {
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if !(1..=12).contains(&hour) {
        return None;
    }
    let pm = caps[3].eq_ignore_ascii_case("p");
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    NaiveTime::from_hms_opt(hour, minute, 0).map(Clock::Exact)
}

fn parse_part_of_day(caps: &Captures<'_>) -> Option<PartOfDay> {
    let part = match caps[1].to_ascii_lowercase().as_str() {
        "morning" => PartOfDay::Morning,
        "afternoon" => PartOfDay::Afternoon,
        "evening" => PartOfDay::Evening,
        _ => PartOfDay::Night,
    };
    Some(part)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
