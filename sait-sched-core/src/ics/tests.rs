use super::*;
use crate::{IcsOptions, Section, TimeBlock, Weekday};
use chrono::{NaiveDate, NaiveTime};

fn winter_range() -> DateRange {
    DateRange {
        // 2026-01-05 is a Monday
        start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        end: NaiveDate::from_ymd_opt(2026, 4, 24).unwrap(),
    }
}

fn section_mon_wed() -> Section {
    Section {
        crn: "12345".to_string(),
        course: "ITSC 320".to_string(),
        section: "B".to_string(),
        instructor: Some("Doe, Jane".to_string()),
        seats_available: 5,
        maximum_enrollment: 40,
        blocks: vec![TimeBlock {
            days: vec![Weekday::Monday, Weekday::Wednesday],
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(10, 50, 0).unwrap(),
            room: Some("NN701".to_string()),
        }],
    }
}

#[test]
fn anchors_each_weekday_at_first_occurrence() {
    let exporter = IcsExporter::default();
    let ics = exporter.generate(&[section_mon_wed()], winter_range()).unwrap();

    // Monday anchors on the range start, Wednesday two days later
    assert!(ics.contains("DTSTART:20260105T090000"));
    assert!(ics.contains("DTEND:20260105T105000"));
    assert!(ics.contains("DTSTART:20260107T090000"));
    assert!(ics.contains("RRULE:FREQ=WEEKLY;UNTIL=20260424T235959;BYDAY=MO"));
    assert!(ics.contains("RRULE:FREQ=WEEKLY;UNTIL=20260424T235959;BYDAY=WE"));
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
}

#[test]
fn carries_summary_location_and_instructor() {
    let exporter = IcsExporter::default();
    let ics = exporter.generate(&[section_mon_wed()], winter_range()).unwrap();

    assert!(ics.contains("SUMMARY:ITSC 320 - Section B"));
    assert!(ics.contains("LOCATION:NN701"));
    assert!(ics.contains("DESCRIPTION:Instructor: Doe\\, Jane"));
    assert!(ics.contains("X-WR-TIMEZONE:America/Edmonton"));
}

#[test]
fn reminder_renders_as_valarm() {
    let options = IcsOptions {
        reminder_minutes: Some(30),
        ..Default::default()
    };
    let ics = IcsExporter::new(options)
        .generate(&[section_mon_wed()], winter_range())
        .unwrap();

    assert!(ics.contains("BEGIN:VALARM"));
    assert!(ics.contains("TRIGGER:-PT30M"));

    let options = IcsOptions {
        reminder_minutes: None,
        ..Default::default()
    };
    let ics = IcsExporter::new(options)
        .generate(&[section_mon_wed()], winter_range())
        .unwrap();
    assert!(!ics.contains("BEGIN:VALARM"));
}

#[test]
fn instructor_can_be_left_out() {
    let options = IcsOptions {
        include_instructor: false,
        ..Default::default()
    };
    let ics = IcsExporter::new(options)
        .generate(&[section_mon_wed()], winter_range())
        .unwrap();
    assert!(!ics.contains("DESCRIPTION:Instructor"));
}

#[test]
fn day_outside_range_is_skipped() {
    let mut section = section_mon_wed();
    section.blocks[0].days = vec![Weekday::Friday];

    // Monday through Thursday only
    let range = DateRange {
        start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        end: NaiveDate::from_ymd_opt(2026, 1, 8).unwrap(),
    };

    let ics = IcsExporter::default().generate(&[section], range).unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 0);
    assert!(ics.contains("END:VCALENDAR"));
}

#[test]
fn invalid_block_duration_is_skipped() {
    let mut section = section_mon_wed();
    section.blocks[0].end = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    let ics = IcsExporter::default()
        .generate(&[section], winter_range())
        .unwrap();
    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 0);
}

#[test]
fn inverted_range_is_an_error() {
    let range = DateRange {
        start: NaiveDate::from_ymd_opt(2026, 4, 24).unwrap(),
        end: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
    };
    let err = IcsExporter::default()
        .generate(&[section_mon_wed()], range)
        .unwrap_err();
    assert!(matches!(err, crate::Error::IcsGeneration(_)));
}

#[test]
fn missing_room_renders_as_tba() {
    let mut section = section_mon_wed();
    section.blocks[0].room = None;

    let ics = IcsExporter::default()
        .generate(&[section], winter_range())
        .unwrap();
    assert!(ics.contains("LOCATION:TBA"));
}
