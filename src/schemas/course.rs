use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::types::Semester;
use crate::repositories::enrollments::EnrolledStudent;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: String,
    #[validate(length(min = 1, max = 32, message = "code must be 1-32 characters"))]
    pub(crate) code: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[validate(range(min = 2000, max = 2100, message = "year must be between 2000 and 2100"))]
    pub(crate) year: i32,
    pub(crate) semester: Semester,
    /// Required when an admin creates the course; ignored for professors.
    #[serde(default)]
    pub(crate) instructor_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct CourseUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub(crate) name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 32, message = "code must be 1-32 characters"))]
    pub(crate) code: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 2000, max = 2100, message = "year must be between 2000 and 2100"))]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    pub(crate) semester: Option<Semester>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstructorAssign {
    pub(crate) instructor_id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseListQuery {
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
    #[serde(default)]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    pub(crate) semester: Option<Semester>,
    #[serde(default)]
    pub(crate) instructor_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: Option<String>,
    pub(crate) instructor_id: Option<i64>,
    pub(crate) year: i32,
    pub(crate) semester: Semester,
    pub(crate) created_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: crate::db::models::Course) -> Self {
        Self {
            id: course.id,
            name: course.name,
            code: course.code,
            description: course.description,
            instructor_id: course.instructor_id,
            year: course.year,
            semester: course.semester,
            created_at: format_primitive(course.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrolledStudentResponse {
    pub(crate) student_id: i64,
    pub(crate) username: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) enrollment_date: String,
}

impl EnrolledStudentResponse {
    pub(crate) fn from_db(row: EnrolledStudent) -> Self {
        Self {
            student_id: row.student_id,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            enrollment_date: format_primitive(row.enrollment_date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_create_rejects_out_of_range_year() {
        let payload: CourseCreate = serde_json::from_str(
            r#"{"name":"Databases","code":"CS340","year":1999,"semester":"fall"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn course_create_accepts_minimal_payload() {
        let payload: CourseCreate = serde_json::from_str(
            r#"{"name":"Databases","code":"CS340","year":2025,"semester":"spring"}"#,
        )
        .unwrap();
        assert!(payload.validate().is_ok());
        assert_eq!(payload.semester, Semester::Spring);
        assert!(payload.instructor_id.is_none());
    }

    #[test]
    fn unknown_semester_fails_to_deserialize() {
        let result = serde_json::from_str::<CourseCreate>(
            r#"{"name":"Databases","code":"CS340","year":2025,"semester":"monsoon"}"#,
        );
        assert!(result.is_err());
    }
}
