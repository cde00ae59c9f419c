use serde::Serialize;

use crate::core::time::format_primitive;
use crate::repositories::assignments::UpcomingAssignment;
use crate::schemas::course::CourseResponse;
use crate::schemas::enrollment::EnrollmentRequestView;
use crate::schemas::submission::StudentSubmissionResponse;

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub(crate) enum DashboardResponse {
    Admin(AdminDashboard),
    Professor(ProfessorDashboard),
    Student(StudentDashboard),
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminDashboard {
    pub(crate) admins: i64,
    pub(crate) professors: i64,
    pub(crate) students: i64,
    pub(crate) courses: i64,
    pub(crate) pending_requests: i64,
    pub(crate) recent_requests: Vec<EnrollmentRequestView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfessorCourseSummary {
    pub(crate) course: CourseResponse,
    pub(crate) students: i64,
    pub(crate) assignments: i64,
    pub(crate) ungraded_submissions: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfessorDashboard {
    pub(crate) courses: Vec<ProfessorCourseSummary>,
    pub(crate) pending_requests: Vec<EnrollmentRequestView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpcomingAssignmentResponse {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) due_date: String,
    pub(crate) course_id: i64,
    pub(crate) course_code: String,
    pub(crate) course_name: String,
}

impl UpcomingAssignmentResponse {
    pub(crate) fn from_db(row: UpcomingAssignment) -> Self {
        Self {
            id: row.id,
            title: row.title,
            due_date: format_primitive(row.due_date),
            course_id: row.course_id,
            course_code: row.course_code,
            course_name: row.course_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentDashboard {
    pub(crate) courses: Vec<CourseResponse>,
    pub(crate) upcoming_assignments: Vec<UpcomingAssignmentResponse>,
    pub(crate) recent_grades: Vec<StudentSubmissionResponse>,
    pub(crate) unread_notifications: i64,
}
