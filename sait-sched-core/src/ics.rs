use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{IcsOptions, Result, Section, TimeBlock, Weekday};

#[cfg(test)]
mod tests;

/// Semester span the weekly events repeat over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Calendar file generator for a chosen set of sections
pub struct IcsExporter {
    options: IcsOptions,
}

impl IcsExporter {
    pub fn new(options: IcsOptions) -> Self {
        Self { options }
    }

    /// Render the sections as an RFC 5545 calendar.
    ///
    /// One weekly event per (meeting block, weekday), anchored at the first
    /// occurrence of that weekday inside the range. Blocks that never occur
    /// inside the range, or whose end does not lie after their start, are
    /// skipped.
    pub fn generate(&self, sections: &[Section], range: DateRange) -> Result<String> {
        if range.end < range.start {
            return Err(crate::Error::IcsGeneration(format!(
                "date range ends ({}) before it starts ({})",
                range.end, range.start
            )));
        }

        let mut ics = String::new();
        ics.push_str("BEGIN:VCALENDAR\r\n");
        ics.push_str("VERSION:2.0\r\n");
        ics.push_str("PRODID:-//SAIT Schedule Builder//Class Schedule//EN\r\n");
        ics.push_str("CALSCALE:GREGORIAN\r\n");
        ics.push_str("METHOD:PUBLISH\r\n");

        if let Some(ref name) = self.options.calendar_name {
            ics.push_str(&format!("X-WR-CALNAME:{}\r\n", escape_text(name)));
        }
        if let Some(ref timezone) = self.options.timezone {
            ics.push_str(&format!("X-WR-TIMEZONE:{}\r\n", timezone));
        }

        for section in sections {
            for block in &section.blocks {
                for day in &block.days {
                    self.add_event(&mut ics, section, block, *day, range);
                }
            }
        }

        ics.push_str("END:VCALENDAR\r\n");
        Ok(ics)
    }

    fn add_event(
        &self,
        ics: &mut String,
        section: &Section,
        block: &TimeBlock,
        day: Weekday,
        range: DateRange,
    ) {
        if block.end <= block.start {
            tracing::warn!(
                "skipping block with non-positive duration on {}",
                section.label()
            );
            return;
        }

        let first = day.first_on_or_after(range.start);
        if first > range.end {
            return;
        }

        let dtstamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        // floating local times: single institution, single timezone
        let date = first.format("%Y%m%d");
        let dtstart = format!("{}T{}", date, block.start.format("%H%M%S"));
        let dtend = format!("{}T{}", date, block.end.format("%H%M%S"));

        ics.push_str("BEGIN:VEVENT\r\n");
        ics.push_str(&format!("UID:{}\r\n", Uuid::new_v4()));
        ics.push_str(&format!("DTSTAMP:{}\r\n", dtstamp));
        ics.push_str(&format!("DTSTART:{}\r\n", dtstart));
        ics.push_str(&format!("DTEND:{}\r\n", dtend));
        ics.push_str(&format!(
            "SUMMARY:{}\r\n",
            escape_text(&format!("{} - Section {}", section.course, section.section))
        ));
        ics.push_str(&format!(
            "LOCATION:{}\r\n",
            escape_text(block.room.as_deref().unwrap_or("TBA"))
        ));

        if self.options.include_instructor
            && let Some(ref instructor) = section.instructor
        {
            ics.push_str(&format!(
                "DESCRIPTION:{}\r\n",
                escape_text(&format!("Instructor: {}", instructor))
            ));
        }

        ics.push_str(&format!(
            "RRULE:FREQ=WEEKLY;UNTIL={}T235959;BYDAY={}\r\n",
            range.end.format("%Y%m%d"),
            day.ics_code()
        ));

        if let Some(minutes) = self.options.reminder_minutes {
            ics.push_str("BEGIN:VALARM\r\n");
            ics.push_str("ACTION:DISPLAY\r\n");
            ics.push_str("DESCRIPTION:Class reminder\r\n");
            ics.push_str(&format!("TRIGGER:-PT{}M\r\n", minutes));
            ics.push_str("END:VALARM\r\n");
        }

        ics.push_str("END:VEVENT\r\n");
    }
}

impl Default for IcsExporter {
    fn default() -> Self {
        Self::new(IcsOptions::default())
    }
}

fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace(',', "\\,")
        .replace(';', "\\;")
}
