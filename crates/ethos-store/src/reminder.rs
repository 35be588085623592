//! The reminder record and its on-disk encoding.
//!
//! A reminder is persisted as a JSON object:
//!
//! ```json
//! {
//!   "task": "call Sam",
//!   "time": "2025-06-01T18:00:00+02:00",
//!   "tag": "general",
//!   "triggered": false,
//!   "created": "2025-06-01T09:12:44.120+02:00"
//! }
//! ```
//!
//! Older files may carry naive timestamps, a `null` tag, or omit
//! `triggered`/`created`; all of these still load.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Tag assigned to reminders created without one.
pub const DEFAULT_TAG: &str = "general";

fn default_tag() -> String {
    DEFAULT_TAG.to_owned()
}

fn tag_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(default_tag))
}

/// A scheduled task with an absolute target time and trigger state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Free-text description of what to be reminded about.
    pub task: String,

    /// When the reminder is due.  Never changes after creation.
    #[serde(with = "timestamp")]
    pub time: DateTime<Local>,

    /// Classification label.
    #[serde(default = "default_tag", deserialize_with = "tag_or_default")]
    pub tag: String,

    /// Set once the trigger loop has fired this reminder.
    #[serde(default)]
    pub triggered: bool,

    /// When the record was created (informational).
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Local>>,
}

impl Reminder {
    /// Build a new, untriggered reminder.  A blank `tag` becomes
    /// [`DEFAULT_TAG`].
    pub fn new(
        task: impl Into<String>,
        time: DateTime<Local>,
        tag: Option<&str>,
        created: DateTime<Local>,
    ) -> Self {
        let tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or_else(default_tag, str::to_owned);
        Self {
            task: task.into(),
            time,
            tag,
            triggered: false,
            created: Some(created),
        }
    }

    /// Whether the reminder is untriggered and its time has come.
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        !self.triggered && self.time <= now
    }

    /// Whether the reminder falls on the given local calendar day.
    pub fn is_on(&self, date: NaiveDate) -> bool {
        self.time.date_naive() == date
    }
}

/// Which reminders a list view shows.
///
/// The same view must be used to display a numbered list and to resolve an
/// index from that list back to a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReminderView {
    /// Only reminders that have not fired yet.
    #[default]
    Pending,
    /// Every stored reminder, fired or not.
    All,
}

impl ReminderView {
    /// Map the `include_triggered` flag onto a view.
    pub fn from_include_triggered(include_triggered: bool) -> Self {
        if include_triggered { Self::All } else { Self::Pending }
    }

    /// Whether `reminder` is visible in this view.
    pub fn includes(self, reminder: &Reminder) -> bool {
        match self {
            Self::Pending => !reminder.triggered,
            Self::All => true,
        }
    }
}

/// Serde codec for reminder timestamps.
///
/// Writes RFC 3339 with the local offset.  Reads RFC 3339, or a naive
/// ISO-8601 date-time interpreted in local time.
pub mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

    /// Parse a stored timestamp string.
    pub fn parse(raw: &str) -> Option<DateTime<Local>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Local));
        }
        NAIVE_FORMATS.iter().find_map(|fmt| {
            let naive = NaiveDateTime::parse_from_str(raw, fmt).ok()?;
            Local.from_local_datetime(&naive).earliest()
        })
    }

    pub fn serialize<S>(value: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
    }

    /// The same codec for optional fields.
    pub mod optional {
        use chrono::{DateTime, Local};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Local>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| super::parse(&raw)))
        }
    }
}
