use async_trait::async_trait;
use chrono::NaiveTime;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{
    BannerSession, Course, CourseCatalog, Result, Section, SubjectCourse, Term, TimeBlock, Weekday,
    sources::{BaseClient, BaseClientBuilder, CourseSource, SourceInfo},
};

const SSB_PATH: &str = "/StudentRegistrationSsb/ssb";

/// Client for the institution's Banner student registration self-service.
///
/// Every request replays the cookies and synchronizer token captured from
/// the user's browser session; there is no credential storage and no token
/// refresh, so an expired session surfaces as an authentication error.
pub struct BannerClient {
    base: BaseClient,
    session: BannerSession,
}

impl BannerClient {
    pub fn new(session: BannerSession) -> Result<Self> {
        let builder = BaseClientBuilder::new(SourceInfo {
            name: "banner".to_string(),
            description: "SAIT Banner student registration self-service".to_string(),
        });

        Ok(Self {
            base: builder.build()?,
            session,
        })
    }

    pub fn session(&self) -> &BannerSession {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.session.base_url, SSB_PATH, path)
    }

    fn referer(&self) -> String {
        self.url("/classRegistration/classRegistration")
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.base
            .client
            .get(self.url(path))
            .header("Cookie", self.session.cookie_header())
            .header("X-Synchronizer-Token", &self.session.sync_token)
            .header("Referer", self.referer())
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.base
            .client
            .post(self.url(path))
            .header("Cookie", self.session.cookie_header())
            .header("X-Synchronizer-Token", &self.session.sync_token)
            .header("Referer", self.referer())
    }

    pub(crate) fn base(&self) -> &BaseClient {
        &self.base
    }

    /// Send a request and decode a JSON body, mapping session expiry onto
    /// the authentication error
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::INTERNAL_SERVER_ERROR
        {
            // Banner answers 500 to stale sessions rather than 401
            return Err(crate::Error::Authentication(format!(
                "Banner rejected the session (HTTP {}), re-capture your browser headers",
                status
            )));
        }
        if !status.is_success() {
            return Err(self.base.upstream_error(format!("HTTP {} error", status)));
        }

        response
            .json()
            .await
            .map_err(|e| self.base.upstream_error(format!("Failed to parse response: {}", e)))
    }

    /// List the registration terms Banner currently offers
    pub async fn terms(&self) -> Result<Vec<Term>> {
        let request = self.get("/classRegistration/getTerms").query(&[
            ("searchTerm", ""),
            ("offset", "1"),
            ("max", "10"),
            ("_", &chrono::Utc::now().timestamp_millis().to_string()),
        ]);
        self.send_json(request).await
    }

    /// Subject/course autocomplete, e.g. "itsc" -> every ITSC course code
    pub async fn search_subjects(&self, query: &str, term: &str) -> Result<Vec<SubjectCourse>> {
        let request = self.get("/classSearch/get_subjectcoursecombo").query(&[
            ("searchTerm", query),
            ("term", term),
            ("offset", "1"),
            ("max", "500"),
        ]);
        self.send_json(request).await
    }

    /// Reset Banner's server-side search state. Required between course
    /// queries or the search endpoint keeps answering for the previous one.
    pub async fn reset_search(&self, term: &str) -> Result<()> {
        let response = self
            .post("/classSearch/resetDataForm")
            .form(&[("term", term)])
            .send()
            .await
            .map_err(|e| self.base.handle_error_req(e))?;

        if !response.status().is_success() {
            return Err(self
                .base
                .upstream_error(format!("search reset failed: HTTP {}", response.status())));
        }
        Ok(())
    }

    /// Fetch the sections offered for one course code, converted into the
    /// typed model at this boundary
    pub async fn search_sections(
        &self,
        term: &str,
        course_code: &str,
        open_only: bool,
    ) -> Result<Vec<Section>> {
        // Step 1: resolve the typed-in code to Banner's canonical code
        let matches = self.search_subjects(course_code, term).await?;
        let Some(resolved) = matches.first() else {
            return Err(self
                .base
                .upstream_error(format!("no course found matching {}", course_code)));
        };

        // Step 2: query the sections for the resolved code
        let session_id = self.session.session_id();
        let mut params = vec![
            ("txt_subjectcoursecombo", resolved.code.clone()),
            ("txt_term", term.to_string()),
            ("startDatepicker", String::new()),
            ("endDatepicker", String::new()),
            ("uniqueSessionId", session_id),
            ("pageOffset", "0".to_string()),
            ("pageMaxSize", "50".to_string()),
            ("sortColumn", "subjectDescription".to_string()),
            ("sortDirection", "asc".to_string()),
        ];
        if open_only {
            params.push(("chk_open_only", "true".to_string()));
        }

        let request = self.get("/searchResults/searchResults").query(&params);
        let response: SearchResultsResponse = self.send_json(request).await?;

        if !response.success {
            return Err(self.base.upstream_error(format!(
                "search returned an error: {}",
                response.message.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        let sections = response
            .data
            .unwrap_or_default()
            .into_iter()
            .filter(|raw| !open_only || raw.seats_available.unwrap_or(0) > 0)
            .filter_map(convert_section)
            .collect();

        Ok(sections)
    }
}

#[async_trait]
impl CourseSource for BannerClient {
    fn name(&self) -> &str {
        &self.base.info.name
    }

    fn description(&self) -> &str {
        &self.base.info.description
    }

    async fn fetch_courses(
        &self,
        term: &str,
        course_codes: &[String],
        open_only: bool,
    ) -> Result<CourseCatalog> {
        let mut courses = Vec::with_capacity(course_codes.len());

        for code in course_codes {
            if let Err(e) = self.reset_search(term).await {
                tracing::warn!("search reset before {} failed: {}", code, e);
            }

            let sections = self.search_sections(term, code, open_only).await?;
            tracing::info!("found {} section(s) for {}", sections.len(), code);

            // Prefer the canonical "SUBJ 123" spelling from the results
            let canonical = sections
                .first()
                .map(|s| s.course.clone())
                .unwrap_or_else(|| code.clone());

            courses.push(Course {
                code: canonical,
                title: None,
                sections,
            });
        }

        Ok(CourseCatalog {
            term: Some(term.to_string()),
            courses,
        })
    }
}

/// Banner search results envelope
#[derive(Debug, Deserialize)]
struct SearchResultsResponse {
    success: bool,
    #[serde(default)]
    data: Option<Vec<RawSection>>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSection {
    course_reference_number: String,
    subject: String,
    course_number: String,
    #[serde(default)]
    sequence_number: Option<String>,
    #[serde(default)]
    seats_available: Option<i64>,
    #[serde(default)]
    maximum_enrollment: Option<i64>,
    #[serde(default)]
    faculty: Vec<RawFaculty>,
    #[serde(default)]
    meetings_faculty: Vec<RawMeeting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFaculty {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeeting {
    #[serde(default)]
    meeting_time: Option<RawMeetingTime>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawMeetingTime {
    begin_time: Option<String>,
    end_time: Option<String>,
    building: Option<String>,
    room: Option<String>,
    monday: bool,
    tuesday: bool,
    wednesday: bool,
    thursday: bool,
    friday: bool,
    saturday: bool,
    sunday: bool,
}

impl RawMeetingTime {
    fn days(&self) -> Vec<Weekday> {
        [
            (self.monday, Weekday::Monday),
            (self.tuesday, Weekday::Tuesday),
            (self.wednesday, Weekday::Wednesday),
            (self.thursday, Weekday::Thursday),
            (self.friday, Weekday::Friday),
            (self.saturday, Weekday::Saturday),
            (self.sunday, Weekday::Sunday),
        ]
        .into_iter()
        .filter_map(|(meets, day)| meets.then_some(day))
        .collect()
    }

    fn location(&self) -> Option<String> {
        let building = self.building.as_deref().unwrap_or("");
        let room = self.room.as_deref().unwrap_or("");
        if building.is_empty() && room.is_empty() {
            None
        } else {
            Some(format!("{}{}", building, room))
        }
    }
}

/// Military "HHMM" time as served by Banner
fn parse_military_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H%M").ok()
}

/// Convert one raw Banner record into a typed [`Section`].
///
/// Sections without any usable meeting time are dropped; they cannot take
/// part in conflict checks or calendars.
fn convert_section(raw: RawSection) -> Option<Section> {
    let mut blocks = Vec::new();
    for meeting in &raw.meetings_faculty {
        let Some(time) = meeting.meeting_time.as_ref() else {
            continue;
        };
        let (Some(begin), Some(end)) = (time.begin_time.as_deref(), time.end_time.as_deref())
        else {
            continue;
        };
        let (Some(start), Some(end)) = (parse_military_time(begin), parse_military_time(end))
        else {
            tracing::warn!(
                "skipping meeting with unparseable time {}-{} on CRN {}",
                begin,
                end,
                raw.course_reference_number
            );
            continue;
        };
        let days = time.days();
        if days.is_empty() {
            continue;
        }
        blocks.push(TimeBlock {
            days,
            start,
            end,
            room: time.location(),
        });
    }

    if blocks.is_empty() {
        return None;
    }

    let instructor = raw
        .faculty
        .first()
        .and_then(|f| f.display_name.clone())
        .filter(|name| !name.is_empty());

    Some(Section {
        crn: raw.course_reference_number,
        course: format!("{} {}", raw.subject, raw.course_number),
        section: raw.sequence_number.unwrap_or_else(|| "A".to_string()),
        instructor,
        seats_available: raw.seats_available.unwrap_or(0),
        maximum_enrollment: raw.maximum_enrollment.unwrap_or(0),
        blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_section(value: serde_json::Value) -> RawSection {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn converts_meeting_times_and_days() {
        let raw = raw_section(json!({
            "courseReferenceNumber": "12345",
            "subject": "ITSC",
            "courseNumber": "320",
            "sequenceNumber": "B",
            "seatsAvailable": 5,
            "maximumEnrollment": 40,
            "faculty": [{"displayName": "Doe, Jane"}],
            "meetingsFaculty": [{
                "meetingTime": {
                    "beginTime": "0800",
                    "endTime": "0950",
                    "building": "NN",
                    "room": "701",
                    "monday": true,
                    "wednesday": true
                }
            }]
        }));

        let section = convert_section(raw).unwrap();
        assert_eq!(section.crn, "12345");
        assert_eq!(section.course, "ITSC 320");
        assert_eq!(section.section, "B");
        assert_eq!(section.instructor.as_deref(), Some("Doe, Jane"));
        assert_eq!(section.blocks.len(), 1);

        let block = &section.blocks[0];
        assert_eq!(block.days, vec![Weekday::Monday, Weekday::Wednesday]);
        assert_eq!(block.start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(block.end, NaiveTime::from_hms_opt(9, 50, 0).unwrap());
        assert_eq!(block.room.as_deref(), Some("NN701"));
    }

    #[test]
    fn section_without_meeting_times_is_dropped() {
        let raw = raw_section(json!({
            "courseReferenceNumber": "12345",
            "subject": "ITSC",
            "courseNumber": "320",
            "meetingsFaculty": [{"meetingTime": {"monday": true}}]
        }));

        assert!(convert_section(raw).is_none());
    }

    #[test]
    fn missing_room_becomes_none() {
        let raw = raw_section(json!({
            "courseReferenceNumber": "12345",
            "subject": "CPSY",
            "courseNumber": "300",
            "meetingsFaculty": [{
                "meetingTime": {"beginTime": "1300", "endTime": "1450", "friday": true}
            }]
        }));

        let section = convert_section(raw).unwrap();
        assert!(section.blocks[0].room.is_none());
        // defaults applied when Banner omits the counters
        assert_eq!(section.seats_available, 0);
        assert_eq!(section.section, "A");
        assert!(section.instructor.is_none());
    }

    #[test]
    fn search_envelope_tolerates_missing_data() {
        let response: SearchResultsResponse =
            serde_json::from_value(json!({"success": true})).unwrap();
        assert!(response.success);
        assert!(response.data.is_none());
    }
}
