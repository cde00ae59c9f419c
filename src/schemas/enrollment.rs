use serde::{Deserialize, Serialize};

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::models::EnrollmentRequest;
use crate::db::types::RequestStatus;
use crate::repositories::enrollment_requests::RequestView;

#[derive(Debug, Deserialize)]
pub(crate) struct RequestListQuery {
    #[serde(default)]
    pub(crate) status: Option<RequestStatus>,
    #[serde(default)]
    pub(crate) course_id: Option<i64>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentRequestResponse {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) course_id: i64,
    pub(crate) request_date: String,
    pub(crate) status: RequestStatus,
    pub(crate) processed_date: Option<String>,
    pub(crate) processed_by: Option<i64>,
}

impl EnrollmentRequestResponse {
    pub(crate) fn from_db(request: EnrollmentRequest) -> Self {
        Self {
            id: request.id,
            student_id: request.student_id,
            course_id: request.course_id,
            request_date: format_primitive(request.request_date),
            status: request.status,
            processed_date: request.processed_date.map(format_primitive),
            processed_by: request.processed_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollmentRequestView {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) student_username: String,
    pub(crate) student_name: String,
    pub(crate) course_id: i64,
    pub(crate) course_code: String,
    pub(crate) course_name: String,
    pub(crate) request_date: String,
    pub(crate) status: RequestStatus,
    pub(crate) processed_date: Option<String>,
    pub(crate) processed_by: Option<i64>,
}

impl EnrollmentRequestView {
    pub(crate) fn from_db(row: RequestView) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            student_username: row.student_username,
            student_name: format!("{} {}", row.student_first_name, row.student_last_name),
            course_id: row.course_id,
            course_code: row.course_code,
            course_name: row.course_name,
            request_date: format_primitive(row.request_date),
            status: row.status,
            processed_date: row.processed_date.map(format_primitive),
            processed_by: row.processed_by,
        }
    }
}
