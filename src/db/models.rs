use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AssignmentStatus, EnrollmentStatus, RequestStatus, Semester, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) role: UserRole,
    pub(crate) active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) last_login: Option<PrimitiveDateTime>,
}

impl User {
    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub(crate) fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: i64,
    pub(crate) name: String,
    pub(crate) code: String,
    pub(crate) description: Option<String>,
    pub(crate) instructor_id: Option<i64>,
    pub(crate) year: i32,
    pub(crate) semester: Semester,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: i64,
    pub(crate) course_id: i64,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) due_date: PrimitiveDateTime,
    pub(crate) file_path: Option<String>,
    pub(crate) original_filename: Option<String>,
    pub(crate) created_by: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) status: AssignmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: i64,
    pub(crate) assignment_id: i64,
    pub(crate) student_id: i64,
    pub(crate) submission_path: String,
    pub(crate) original_filename: String,
    pub(crate) file_size: i64,
    pub(crate) file_hash: String,
    pub(crate) submission_date: PrimitiveDateTime,
    pub(crate) grade: Option<f64>,
    pub(crate) feedback: Option<String>,
    pub(crate) graded_date: Option<PrimitiveDateTime>,
}

impl Submission {
    pub(crate) fn is_graded(&self) -> bool {
        self.graded_date.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) student_id: i64,
    pub(crate) course_id: i64,
    pub(crate) enrollment_date: PrimitiveDateTime,
    pub(crate) status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct EnrollmentRequest {
    pub(crate) id: i64,
    pub(crate) student_id: i64,
    pub(crate) course_id: i64,
    pub(crate) request_date: PrimitiveDateTime,
    pub(crate) status: RequestStatus,
    pub(crate) processed_date: Option<PrimitiveDateTime>,
    pub(crate) processed_by: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CourseMaterial {
    pub(crate) id: i64,
    pub(crate) course_id: i64,
    pub(crate) file_path: String,
    pub(crate) original_filename: String,
    pub(crate) description: Option<String>,
    pub(crate) uploaded_by: i64,
    pub(crate) upload_date: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Notification {
    pub(crate) id: i64,
    pub(crate) user_id: i64,
    pub(crate) message: String,
    pub(crate) is_read: bool,
    pub(crate) created_at: PrimitiveDateTime,
}
