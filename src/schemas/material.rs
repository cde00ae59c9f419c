use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::CourseMaterial;

#[derive(Debug, Serialize)]
pub(crate) struct MaterialResponse {
    pub(crate) id: i64,
    pub(crate) course_id: i64,
    pub(crate) original_filename: String,
    pub(crate) description: Option<String>,
    pub(crate) uploaded_by: i64,
    pub(crate) upload_date: String,
}

impl MaterialResponse {
    pub(crate) fn from_db(material: CourseMaterial) -> Self {
        Self {
            id: material.id,
            course_id: material.course_id,
            original_filename: material.original_filename,
            description: material.description,
            uploaded_by: material.uploaded_by,
            upload_date: format_primitive(material.upload_date),
        }
    }
}
