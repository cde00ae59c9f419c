mod commands;
mod queries;
mod types;

pub(crate) use commands::{grade, store};
pub(crate) use queries::{
    count_ungraded_for_course, find_by_id, find_view, list_for_assignment, list_for_student,
    recent_graded_for_student,
};
pub(crate) use types::{StoreOutcome, StoreSubmission, StudentSubmissionView, SubmissionView};
