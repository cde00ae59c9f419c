pub(crate) mod assignments;
pub(crate) mod courses;
pub(crate) mod enrollment_requests;
pub(crate) mod enrollments;
pub(crate) mod materials;
pub(crate) mod notifications;
pub(crate) mod revoked_tokens;
pub(crate) mod submissions;
pub(crate) mod users;
