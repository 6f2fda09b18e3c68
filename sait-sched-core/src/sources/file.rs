use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    Course, CourseCatalog, Error, Result,
    sources::CourseSource,
};

/// Static catalog import from a [`CourseCatalog`] JSON file.
///
/// The offline counterpart to the Banner source: the same file `fetch`
/// writes can be re-planned without a live session.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub async fn load(&self) -> Result<CourseCatalog> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Config(format!(
                "failed to read catalog file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "catalog file {} is not valid: {}",
                self.path.display(),
                e
            ))
        })
    }
}

/// Course codes compare ignoring case and separators, so "itsc320" finds
/// "ITSC 320"
fn normalize_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

#[async_trait]
impl CourseSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn description(&self) -> &str {
        "Static course catalog import from a JSON file"
    }

    async fn fetch_courses(
        &self,
        term: &str,
        course_codes: &[String],
        open_only: bool,
    ) -> Result<CourseCatalog> {
        let catalog = self.load().await?;

        if let Some(file_term) = catalog.term.as_deref()
            && !term.is_empty()
            && file_term != term
        {
            tracing::warn!(
                "catalog file was fetched for term {}, requested term is {}",
                file_term,
                term
            );
        }

        let mut courses: Vec<Course> = if course_codes.is_empty() {
            catalog.courses
        } else {
            course_codes
                .iter()
                .map(|code| {
                    catalog
                        .courses
                        .iter()
                        .find(|c| normalize_code(&c.code) == normalize_code(code))
                        .cloned()
                        .ok_or_else(|| {
                            Error::Config(format!("course {} not present in import file", code))
                        })
                })
                .collect::<Result<_>>()?
        };

        if open_only {
            for course in &mut courses {
                course.sections.retain(|s| s.seats_available > 0);
            }
        }

        Ok(CourseCatalog {
            term: Some(term.to_string()).filter(|t| !t.is_empty()).or(catalog.term),
            courses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Section, TimeBlock, Weekday};
    use chrono::NaiveTime;

    fn sample_catalog() -> CourseCatalog {
        let block = TimeBlock {
            days: vec![Weekday::Monday],
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            room: Some("NN701".to_string()),
        };
        CourseCatalog {
            term: Some("202530".to_string()),
            courses: vec![Course {
                code: "ITSC 320".to_string(),
                title: None,
                sections: vec![
                    Section {
                        crn: "10001".to_string(),
                        course: "ITSC 320".to_string(),
                        section: "A".to_string(),
                        instructor: None,
                        seats_available: 3,
                        maximum_enrollment: 40,
                        blocks: vec![block.clone()],
                    },
                    Section {
                        crn: "10002".to_string(),
                        course: "ITSC 320".to_string(),
                        section: "B".to_string(),
                        instructor: None,
                        seats_available: 0,
                        maximum_enrollment: 40,
                        blocks: vec![block],
                    },
                ],
            }],
        }
    }

    async fn write_sample(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("sait-sched-test-{}.json", name));
        let json = serde_json::to_string_pretty(&sample_catalog()).unwrap();
        tokio::fs::write(&path, json).await.unwrap();
        path
    }

    #[tokio::test]
    async fn loads_and_filters_by_code() {
        let path = write_sample("filter").await;
        let source = FileSource::new(&path);

        let catalog = source
            .fetch_courses("202530", &["itsc320".to_string()], false)
            .await
            .unwrap();
        assert_eq!(catalog.courses.len(), 1);
        assert_eq!(catalog.courses[0].sections.len(), 2);

        tokio::fs::remove_file(path).await.unwrap();
    }

    #[tokio::test]
    async fn open_only_drops_full_sections() {
        let path = write_sample("open-only").await;
        let source = FileSource::new(&path);

        let catalog = source.fetch_courses("202530", &[], true).await.unwrap();
        assert_eq!(catalog.courses[0].sections.len(), 1);
        assert_eq!(catalog.courses[0].sections[0].crn, "10001");

        tokio::fs::remove_file(path).await.unwrap();
    }

    #[tokio::test]
    async fn missing_course_is_a_configuration_error() {
        let path = write_sample("missing").await;
        let source = FileSource::new(&path);

        let err = source
            .fetch_courses("202530", &["MATH 237".to_string()], false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        tokio::fs::remove_file(path).await.unwrap();
    }
}
