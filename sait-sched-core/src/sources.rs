pub mod banner;
pub mod base;
pub mod file;

use async_trait::async_trait;

use crate::{CourseCatalog, Result};

pub use banner::BannerClient;
pub use base::*;
pub use file::FileSource;

/// A supplier of course/section/time-block records for one term.
///
/// Implementations deliver records already converted into the typed model;
/// dynamic upstream shapes never cross this boundary.
#[async_trait]
pub trait CourseSource: Send + Sync {
    /// Source name
    fn name(&self) -> &str;

    /// Source description
    fn description(&self) -> &str;

    /// Fetch the sections offered for each requested course code.
    ///
    /// `open_only` limits results to sections with seats still available.
    /// Requested course order is preserved in the returned catalog.
    async fn fetch_courses(
        &self,
        term: &str,
        course_codes: &[String],
        open_only: bool,
    ) -> Result<CourseCatalog>;
}
