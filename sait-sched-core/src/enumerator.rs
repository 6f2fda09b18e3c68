use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveTime;

use crate::{Course, Error, Result, ScheduleCandidate, SchedulePreferences, Section, Weekday};


/// Produce every conflict-free selection of one section per course, ranked
/// best-first.
///
/// The search is a depth-first walk of the Cartesian product over each
/// course's section list, abandoning a partial assignment as soon as the
/// newly added section overlaps an already chosen one. Courses containing a
/// mandatory CRN contribute only that section, which prunes instead of
/// filtering after the fact.
///
/// Errors:
/// - `Error::Config` if a course offers no sections, a mandatory CRN is not
///   found in any course, or two mandatory CRNs belong to the same course.
/// - `Error::NoValidSchedule` if the product is non-empty but every
///   combination conflicts.
pub fn enumerate(
    courses: &[Course],
    preferences: &SchedulePreferences,
) -> Result<Vec<ScheduleCandidate>> {
    validate_input(courses, preferences)?;

    let mut candidates = Vec::new();
    let mut chosen: Vec<&Section> = Vec::with_capacity(courses.len());
    assign(courses, preferences, &mut chosen, &mut candidates);

    if candidates.is_empty() {
        return Err(Error::NoValidSchedule);
    }

    rank(&mut candidates);
    Ok(candidates)
}

fn validate_input(courses: &[Course], preferences: &SchedulePreferences) -> Result<()> {
    for course in courses {
        if course.sections.is_empty() {
            return Err(Error::Config(format!(
                "course {} offers no sections",
                course.code
            )));
        }
    }

    let mut mandatory_course: BTreeMap<&str, &str> = BTreeMap::new();
    for crn in &preferences.mandatory_sections {
        let owner = courses
            .iter()
            .find(|c| c.sections.iter().any(|s| &s.crn == crn))
            .ok_or_else(|| {
                Error::Config(format!("mandatory section {} not found in any course", crn))
            })?;

        if let Some(previous) = mandatory_course.insert(owner.code.as_str(), crn.as_str()) {
            return Err(Error::Config(format!(
                "mandatory sections {} and {} both belong to course {}",
                previous, crn, owner.code
            )));
        }
    }

    Ok(())
}

fn assign<'a>(
    courses: &'a [Course],
    preferences: &SchedulePreferences,
    chosen: &mut Vec<&'a Section>,
    candidates: &mut Vec<ScheduleCandidate>,
) {
    let Some(course) = courses.get(chosen.len()) else {
        candidates.push(build_candidate(chosen, preferences));
        return;
    };

    let pinned = course
        .sections
        .iter()
        .any(|s| preferences.mandatory_sections.contains(&s.crn));

    for section in &course.sections {
        if pinned && !preferences.mandatory_sections.contains(&section.crn) {
            continue;
        }
        if chosen.iter().any(|picked| picked.conflicts_with(section)) {
            continue;
        }
        chosen.push(section);
        assign(courses, preferences, chosen, candidates);
        chosen.pop();
    }
}

fn build_candidate(chosen: &[&Section], preferences: &SchedulePreferences) -> ScheduleCandidate {
    let sections: Vec<Section> = chosen.iter().map(|s| (*s).clone()).collect();
    let occupied = occupied_days(&sections);
    let free_preferred_days = preferences
        .preferred_free_days
        .iter()
        .filter(|day| !occupied.contains(day))
        .count() as u32;

    ScheduleCandidate {
        idle_minutes: idle_minutes(&sections),
        free_preferred_days,
        sections,
    }
}

fn occupied_days(sections: &[Section]) -> BTreeSet<Weekday> {
    sections
        .iter()
        .flat_map(|s| s.blocks.iter())
        .flat_map(|b| b.days.iter().copied())
        .collect()
}

/// Total minutes of gap between consecutive classes, summed over all days.
///
/// Used as the deterministic tie-break: a tighter schedule ranks ahead of
/// one with the same number of preferred free days honored.
fn idle_minutes(sections: &[Section]) -> i64 {
    let mut per_day: BTreeMap<Weekday, Vec<(NaiveTime, NaiveTime)>> = BTreeMap::new();
    for section in sections {
        for block in &section.blocks {
            for day in &block.days {
                per_day.entry(*day).or_default().push((block.start, block.end));
            }
        }
    }

    let mut total = 0;
    for intervals in per_day.values_mut() {
        intervals.sort();
        for pair in intervals.windows(2) {
            let gap = (pair[1].0 - pair[0].1).num_minutes();
            if gap > 0 {
                total += gap;
            }
        }
    }
    total
}

/// Stable sort: preferred free days honored descending, then idle time
/// ascending. Enumeration order is deterministic, so ties keep a stable,
/// reproducible order.
fn rank(candidates: &mut [ScheduleCandidate]) {
    candidates.sort_by(|a, b| {
        b.free_preferred_days
            .cmp(&a.free_preferred_days)
            .then(a.idle_minutes.cmp(&b.idle_minutes))
    });
}
