pub(crate) mod assignments;
pub(crate) mod auth;
pub(crate) mod courses;
pub(crate) mod dashboard;
pub(crate) mod enrollments;
pub(crate) mod errors;
pub(crate) mod extract;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod materials;
pub(crate) mod notifications;
pub(crate) mod pagination;
pub(crate) mod router;
pub(crate) mod submissions;
pub(crate) mod uploads;
pub(crate) mod users;
pub(crate) mod validation;
