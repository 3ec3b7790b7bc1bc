//! Minimal Google Classroom REST client.
//!
//! Covers exactly the two read-only listings the bot commands need.

use serde::Deserialize;

use crate::auth::Authorizer;
use crate::error::{Error, Result};

/// Page size bound for course and coursework listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

const BASE_URL: &str = "https://classroom.googleapis.com";

#[derive(Clone)]
pub struct ClassroomClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for ClassroomClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassroomClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Lists the first `page_size` courses the user has access to.
    ///
    /// An absent or empty course list in the response is zero items, not an
    /// error.
    pub async fn list_courses(
        &self,
        auth: &mut Authorizer,
        page_size: u32,
    ) -> Result<Vec<Course>> {
        let token = auth.bearer_token(&self.http).await?;
        let url = format!("{}/v1/courses", self.base_url);
        let payload: ListCoursesResponse = self
            .get(&url, &token, page_size, "course list")
            .await?;
        Ok(payload.courses)
    }

    /// Lists the first `page_size` coursework items for one course.
    pub async fn list_course_work(
        &self,
        auth: &mut Authorizer,
        course_id: &str,
        page_size: u32,
    ) -> Result<Vec<CourseWork>> {
        let token = auth.bearer_token(&self.http).await?;
        let url = format!("{}/v1/courses/{}/courseWork", self.base_url, course_id);
        let payload: ListCourseWorkResponse = self
            .get(&url, &token, page_size, "coursework list")
            .await?;
        Ok(payload.course_work)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        page_size: u32,
        what: &str,
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .query(&[("pageSize", page_size.to_string())])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| Error::Downstream(format!("failed to send {what} request: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Downstream(format!(
                "{what} failed (HTTP {status}): {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| Error::Downstream(format!("failed to decode {what} response: {err}")))
    }
}

/// One course, as returned by `courses.list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
}

/// One coursework item, as returned by `courses.courseWork.list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseWork {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCoursesResponse {
    #[serde(default)]
    courses: Vec<Course>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCourseWorkResponse {
    #[serde(default)]
    course_work: Vec<CourseWork>,
}

#[cfg(test)]
mod tests {
    use super::{ListCourseWorkResponse, ListCoursesResponse};

    #[test]
    fn decodes_course_listing() {
        let payload: ListCoursesResponse = serde_json::from_str(
            r#"{
                "courses": [
                    {"id": "616373616787", "name": "Math", "section": "A"},
                    {"id": "2", "name": "History"}
                ],
                "nextPageToken": "ignored"
            }"#,
        )
        .unwrap();

        assert_eq!(payload.courses.len(), 2);
        assert_eq!(payload.courses[0].id, "616373616787");
        assert_eq!(payload.courses[0].section.as_deref(), Some("A"));
        assert_eq!(payload.courses[1].name, "History");
    }

    #[test]
    fn missing_courses_key_is_zero_items() {
        let payload: ListCoursesResponse = serde_json::from_str("{}").unwrap();
        assert!(payload.courses.is_empty());
    }

    #[test]
    fn decodes_coursework_listing() {
        let payload: ListCourseWorkResponse = serde_json::from_str(
            r#"{"courseWork": [{"id": "w1", "title": "Homework 1"}]}"#,
        )
        .unwrap();

        assert_eq!(payload.course_work.len(), 1);
        assert_eq!(payload.course_work[0].title, "Homework 1");
    }
}
