use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Day of the week a class meets on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// ICS BYDAY code
    pub fn ics_code(self) -> &'static str {
        match self {
            Weekday::Monday => "MO",
            Weekday::Tuesday => "TU",
            Weekday::Wednesday => "WE",
            Weekday::Thursday => "TH",
            Weekday::Friday => "FR",
            Weekday::Saturday => "SA",
            Weekday::Sunday => "SU",
        }
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }

    /// Parse a day name, accepting full names and three-letter abbreviations
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Some(Weekday::Monday),
            "tuesday" | "tue" => Some(Weekday::Tuesday),
            "wednesday" | "wed" => Some(Weekday::Wednesday),
            "thursday" | "thu" => Some(Weekday::Thursday),
            "friday" | "fri" => Some(Weekday::Friday),
            "saturday" | "sat" => Some(Weekday::Saturday),
            "sunday" | "sun" => Some(Weekday::Sunday),
            _ => None,
        }
    }

    /// First date on or after `from` that falls on this weekday
    pub fn first_on_or_after(self, from: NaiveDate) -> NaiveDate {
        let target = self.to_chrono().num_days_from_monday();
        let current = from.weekday().num_days_from_monday();
        let ahead = (target + 7 - current) % 7;
        from + chrono::Duration::days(i64::from(ahead))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}

/// A recurring weekly meeting interval of a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Days of the week this block meets on
    pub days: Vec<Weekday>,
    /// Local start time (single institution, single timezone)
    pub start: NaiveTime,
    /// Local end time
    pub end: NaiveTime,
    /// Building + room, if published
    pub room: Option<String>,
}

impl TimeBlock {
    /// Whether two blocks share a weekday with overlapping time ranges.
    ///
    /// Ranges are end-exclusive: a block ending at 10:00 does not overlap
    /// one starting at 10:00.
    pub fn overlaps(&self, other: &TimeBlock) -> bool {
        if self.start >= other.end || other.start >= self.end {
            return false;
        }
        self.days.iter().any(|day| other.days.contains(day))
    }
}

/// One specific offering of a course: time, instructor, seats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Course reference number, the unique registration identifier
    pub crn: String,
    /// Owning course code, e.g. "ITSC 320"
    pub course: String,
    /// Section letter/sequence, e.g. "A"
    pub section: String,
    pub instructor: Option<String>,
    /// Seats still open
    pub seats_available: i64,
    /// Section capacity
    pub maximum_enrollment: i64,
    /// Weekly meeting blocks
    pub blocks: Vec<TimeBlock>,
}

impl Section {
    /// Whether any meeting block of this section overlaps any block of `other`
    pub fn conflicts_with(&self, other: &Section) -> bool {
        self.blocks
            .iter()
            .any(|a| other.blocks.iter().any(|b| a.overlaps(b)))
    }

    /// Human-readable label for logs and reports
    pub fn label(&self) -> String {
        format!("{} - Section {} (CRN: {})", self.course, self.section, self.crn)
    }
}

/// A course with the sections currently offered for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Subject + number, e.g. "ITSC 320"
    pub code: String,
    pub title: Option<String>,
    pub sections: Vec<Section>,
}

/// Fetched or imported course data for one term.
///
/// This is also the on-disk JSON format written by `fetch` and read by the
/// static file import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCatalog {
    /// Term code the catalog was fetched for, e.g. "202530"
    pub term: Option<String>,
    pub courses: Vec<Course>,
}

/// A registration term as served by Banner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub code: String,
    pub description: String,
}

/// Subject/course autocomplete entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectCourse {
    pub code: String,
    pub description: String,
}

/// Constraints and preferences for schedule enumeration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulePreferences {
    /// CRNs that must appear in every candidate
    #[serde(default)]
    pub mandatory_sections: std::collections::BTreeSet<String>,
    /// Weekdays the student would prefer to keep free of classes
    #[serde(default)]
    pub preferred_free_days: std::collections::BTreeSet<Weekday>,
}

/// One complete, conflict-free selection of sections, one per course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCandidate {
    /// Chosen sections, in catalog course order
    pub sections: Vec<Section>,
    /// How many preferred free weekdays are left fully empty
    pub free_preferred_days: u32,
    /// Total minutes of gap between classes across the week
    pub idle_minutes: i64,
}

impl ScheduleCandidate {
    /// Course code -> chosen CRN mapping
    pub fn selection(&self) -> BTreeMap<&str, &str> {
        self.sections
            .iter()
            .map(|s| (s.course.as_str(), s.crn.as_str()))
            .collect()
    }

    pub fn crns(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.crn.clone()).collect()
    }
}

/// Session context captured from the user's browser.
///
/// Scoped to one user interaction and passed explicitly into every Banner
/// call; nothing here is stored process-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerSession {
    /// Base URL of the Banner self-service host
    pub base_url: String,
    /// Session cookies by name (JSESSIONID, NLB, NSC_ESNS, ...)
    pub cookies: BTreeMap<String, String>,
    /// CSRF synchronizer token
    pub sync_token: String,
    /// Session id Banner echoes through search requests
    pub unique_session_id: Option<String>,
}

impl BannerSession {
    /// Serialize the cookie jar into a Cookie header value
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Session id to tag search requests with, generating one if the
    /// captured headers did not carry one
    pub fn session_id(&self) -> String {
        self.unique_session_id
            .clone()
            .unwrap_or_else(|| format!("sched{}", chrono::Utc::now().timestamp_millis()))
    }
}

/// A currently-registered section as reported by Banner.
///
/// Only the fields this system reads are modeled; everything else passes
/// through untouched so drop submissions can echo the full record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEvent {
    pub term: Option<String>,
    pub course_reference_number: Option<String>,
    pub subject: Option<String>,
    pub course_number: Option<String>,
    pub sequence_number: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// ICS generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IcsOptions {
    pub calendar_name: Option<String>,
    /// Timezone label written as X-WR-TIMEZONE; event times stay floating local
    pub timezone: Option<String>,
    pub include_instructor: bool,
    pub reminder_minutes: Option<u32>,
}

impl Default for IcsOptions {
    fn default() -> Self {
        Self {
            calendar_name: Some("SAIT Class Schedule".to_string()),
            timezone: Some("America/Edmonton".to_string()),
            include_instructor: true,
            reminder_minutes: Some(15),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_weekday_name_parses_back() {
        for day in Weekday::ALL {
            assert_eq!(Weekday::parse(&day.to_string()), Some(day));
            assert_eq!(Weekday::parse(&day.to_string()[..3]), Some(day));
        }
    }
}
