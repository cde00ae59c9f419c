use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::core::time::{format_primitive, serde_flexible};
use crate::db::models::Assignment;
use crate::db::types::AssignmentStatus;

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct AssignmentUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, deserialize_with = "serde_flexible::deserialize_option")]
    pub(crate) due_date: Option<PrimitiveDateTime>,
    #[serde(default)]
    pub(crate) status: Option<AssignmentStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignmentResponse {
    pub(crate) id: i64,
    pub(crate) course_id: i64,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: String,
    pub(crate) status: AssignmentStatus,
    pub(crate) has_file: bool,
    pub(crate) original_filename: Option<String>,
    pub(crate) created_by: i64,
    pub(crate) created_at: String,
}

impl AssignmentResponse {
    pub(crate) fn from_db(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            course_id: assignment.course_id,
            title: assignment.title,
            description: assignment.description,
            due_date: format_primitive(assignment.due_date),
            status: assignment.status,
            has_file: assignment.file_path.is_some(),
            original_filename: assignment.original_filename,
            created_by: assignment.created_by,
            created_at: format_primitive(assignment.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_accepts_datetime_local_due_date() {
        let payload: AssignmentUpdate =
            serde_json::from_str(r#"{"due_date":"2025-05-01T23:59","status":"closed"}"#).unwrap();
        let due = payload.due_date.expect("due date");
        assert_eq!(format_primitive(due), "2025-05-01T23:59:00Z");
        assert_eq!(payload.status, Some(AssignmentStatus::Closed));
        assert!(payload.title.is_none());
    }

    #[test]
    fn update_rejects_garbage_due_date() {
        let result = serde_json::from_str::<AssignmentUpdate>(r#"{"due_date":"next friday"}"#);
        assert!(result.is_err());
    }
}
