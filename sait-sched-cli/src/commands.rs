use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use sait_sched_core::{
    enumerator::enumerate,
    headers::parse_session,
    ics::{DateRange, IcsExporter},
    sources::{BannerClient, CourseSource, FileSource},
    types::{
        BannerSession, IcsOptions, ScheduleCandidate, SchedulePreferences, TimeBlock, Weekday,
    },
};

/// Read a pasted header file and turn it into a Banner session
async fn load_session(path: &str) -> Result<BannerSession> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read session file {}", path))?;
    Ok(parse_session(&text)?)
}

pub async fn session_command(file: String) -> Result<()> {
    let session = load_session(&file).await?;

    println!("✓ Session captured");
    println!("  Host:       {}", session.base_url);
    println!("  Cookies:    {}", session.cookies.len());
    println!("  CSRF token: {}", session.sync_token);
    match &session.unique_session_id {
        Some(id) => println!("  Session id: {}", id),
        None => println!("  Session id: (none in paste, one will be generated)"),
    }

    Ok(())
}

pub async fn terms_command(session_file: String) -> Result<()> {
    let session = load_session(&session_file).await?;
    let client = BannerClient::new(session)?;

    let terms = client.terms().await?;
    println!("Available terms:");
    for term in terms {
        println!("  {}  {}", term.code, term.description);
    }

    Ok(())
}

pub async fn search_command(session_file: String, term: String, query: String) -> Result<()> {
    let session = load_session(&session_file).await?;
    let client = BannerClient::new(session)?;

    let matches = client.search_subjects(&query, &term).await?;
    if matches.is_empty() {
        println!("No courses match '{}'", query);
        return Ok(());
    }

    println!("Courses matching '{}':", query);
    for entry in matches {
        println!("  {}  {}", entry.code, entry.description);
    }

    Ok(())
}

pub struct FetchParams {
    pub session_file: String,
    pub term: String,
    pub codes: Vec<String>,
    pub open_only: bool,
    pub output: Option<String>,
}

pub async fn fetch_command(params: FetchParams) -> Result<()> {
    if params.codes.is_empty() {
        bail!("at least one course code is required (e.g. --codes ITSC320,CPSY300)");
    }

    let session = load_session(&params.session_file).await?;
    let client = BannerClient::new(session)?;

    println!(
        "Fetching {} course(s) for term {}...",
        params.codes.len(),
        params.term
    );
    let catalog = client
        .fetch_courses(&params.term, &params.codes, params.open_only)
        .await?;

    for course in &catalog.courses {
        println!("  {}: {} section(s)", course.code, course.sections.len());
    }

    let output = params
        .output
        .unwrap_or_else(|| format!("catalog-{}.json", params.term));
    let json = serde_json::to_string_pretty(&catalog)?;
    tokio::fs::write(&output, json)
        .await
        .with_context(|| format!("failed to write catalog to {}", output))?;

    println!("✓ Catalog written to {}", output);
    Ok(())
}

pub struct PlanParams {
    pub input: String,
    pub mandatory: Vec<String>,
    pub free_days: Vec<String>,
    pub limit: usize,
    pub ics_output: Option<String>,
    pub pick: usize,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn plan_command(params: PlanParams) -> Result<()> {
    let catalog = FileSource::new(&params.input).load().await?;

    let mut preferences = SchedulePreferences {
        mandatory_sections: params.mandatory.iter().cloned().collect(),
        ..Default::default()
    };
    for day in &params.free_days {
        let Some(parsed) = Weekday::parse(day) else {
            bail!(
                "'{}' is not a weekday name (expected one of: {})",
                day,
                Weekday::ALL.map(|d| d.to_string()).join(", ")
            );
        };
        preferences.preferred_free_days.insert(parsed);
    }

    let candidates = enumerate(&catalog.courses, &preferences)?;
    println!(
        "Found {} conflict-free schedule(s), showing up to {}:",
        candidates.len(),
        params.limit
    );

    for (index, candidate) in candidates.iter().take(params.limit).enumerate() {
        print_candidate(index + 1, candidate, &preferences);
    }

    if let Some(ics_path) = params.ics_output {
        let (Some(start), Some(end)) = (&params.start_date, &params.end_date) else {
            bail!("--ics requires both --start-date and --end-date");
        };
        let range = DateRange {
            start: parse_date(start)?,
            end: parse_date(end)?,
        };

        if params.pick == 0 {
            bail!("--pick is 1-based, use 1 for the best schedule");
        }
        let Some(chosen) = candidates.get(params.pick - 1) else {
            bail!(
                "--pick {} is out of range, only {} schedule(s) found",
                params.pick,
                candidates.len()
            );
        };

        let exporter = IcsExporter::new(IcsOptions::default());
        let ics = exporter.generate(&chosen.sections, range)?;
        tokio::fs::write(&ics_path, ics)
            .await
            .with_context(|| format!("failed to write calendar to {}", ics_path))?;
        println!("✓ Schedule #{} written to {}", params.pick, ics_path);
    }

    Ok(())
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("'{}' is not a YYYY-MM-DD date", text))
}

fn print_candidate(rank: usize, candidate: &ScheduleCandidate, preferences: &SchedulePreferences) {
    if preferences.preferred_free_days.is_empty() {
        println!("#{}  idle time: {} min", rank, candidate.idle_minutes);
    } else {
        println!(
            "#{}  free preferred days: {}/{}, idle time: {} min",
            rank,
            candidate.free_preferred_days,
            preferences.preferred_free_days.len(),
            candidate.idle_minutes
        );
    }
    for section in &candidate.sections {
        let times = section
            .blocks
            .iter()
            .map(format_block)
            .collect::<Vec<_>>()
            .join(", ");
        println!("    {}  {}", section.label(), times);
    }
}

fn format_block(block: &TimeBlock) -> String {
    let days = block
        .days
        .iter()
        .map(|d| d.to_string()[..3].to_string())
        .collect::<Vec<_>>()
        .join("/");
    let mut formatted = format!(
        "{} {}-{}",
        days,
        block.start.format("%H:%M"),
        block.end.format("%H:%M")
    );
    if let Some(room) = &block.room {
        formatted.push_str(&format!(" ({})", room));
    }
    formatted
}

pub async fn registrations_command(session_file: String, term: String) -> Result<()> {
    let session = load_session(&session_file).await?;
    let client = BannerClient::new(session)?;

    let events = client.current_registrations(&term).await?;
    if events.is_empty() {
        println!("No current registrations for term {}", term);
        return Ok(());
    }

    println!("Current registrations:");
    for event in events {
        println!(
            "  CRN {}  {} {} section {}",
            event.course_reference_number.as_deref().unwrap_or("?"),
            event.subject.as_deref().unwrap_or("?"),
            event.course_number.as_deref().unwrap_or("?"),
            event.sequence_number.as_deref().unwrap_or("?"),
        );
    }

    Ok(())
}

pub async fn register_command(session_file: String, term: String, crns: Vec<String>) -> Result<()> {
    if crns.is_empty() {
        bail!("at least one CRN is required (e.g. --crns 12345,23456)");
    }

    let session = load_session(&session_file).await?;
    let client = BannerClient::new(session)?;

    let mut failures = 0usize;
    for crn in &crns {
        match client.register_crn(&term, crn).await {
            Ok(()) => println!("✓ Registered CRN {}", crn),
            Err(e) => {
                println!("✗ CRN {}: {}", crn, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} registration(s) failed", failures, crns.len());
    }
    Ok(())
}

pub async fn drop_command(session_file: String, crns: Vec<String>) -> Result<()> {
    if crns.is_empty() {
        bail!("at least one CRN is required (e.g. --crns 12345,23456)");
    }

    let session = load_session(&session_file).await?;
    let client = BannerClient::new(session)?;

    let report = client.drop_sections(&crns).await?;
    for crn in &report.dropped {
        println!("✓ Dropped CRN {}", crn);
    }
    for failure in &report.failed_drops {
        println!("✗ CRN {}: {}", failure.crn, failure.reason);
    }

    if !report.fully_applied() {
        bail!(
            "{} of {} drop(s) failed",
            report.failed_drops.len(),
            crns.len()
        );
    }
    Ok(())
}
