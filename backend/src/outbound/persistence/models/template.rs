//! Template and template revision rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::{PersistenceFailure, Template, TemplateRevision};
use crate::outbound::persistence::entity::Entity;
use crate::outbound::persistence::schema::{template_revisions, templates};

use super::{column_text, from_column_text, instant, millis, opt_instant, opt_millis};

/// Row of the `templates` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = templates, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TemplateRow {
    pub guid: String,
    pub app_id: String,
    pub template_type: String,
    pub name: String,
    pub description: Option<String>,
    pub published_created_on: Option<i64>,
    pub deleted: bool,
    pub created_on: i64,
    pub modified_on: i64,
    pub version: i64,
}

stored_row! {
    TemplateRow => templates,
    key: String = [guid],
    versioned: true,
    soft_delete: true,
}

impl Entity for Template {
    type Row = TemplateRow;

    fn key(&self) -> String {
        self.guid.clone()
    }

    fn to_row(&self) -> Result<TemplateRow, PersistenceFailure> {
        Ok(TemplateRow {
            guid: self.guid.clone(),
            app_id: self.app_id.clone(),
            template_type: column_text(&self.template_type),
            name: self.name.clone(),
            description: self.description.clone(),
            published_created_on: opt_millis(self.published_created_on.as_ref()),
            deleted: self.deleted,
            created_on: millis(&self.created_on),
            modified_on: millis(&self.modified_on),
            version: self.version,
        })
    }

    fn from_row(row: TemplateRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            guid: row.guid,
            app_id: row.app_id,
            template_type: from_column_text(row.template_type)?,
            name: row.name,
            description: row.description,
            published_created_on: opt_instant(row.published_created_on)?,
            deleted: row.deleted,
            created_on: instant(row.created_on)?,
            modified_on: instant(row.modified_on)?,
            version: row.version,
        })
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

/// Row of the `template_revisions` table.
#[derive(
    Debug, Clone, PartialEq, Queryable, QueryableByName, Selectable, Insertable, AsChangeset,
)]
#[diesel(table_name = template_revisions, check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TemplateRevisionRow {
    pub template_guid: String,
    pub created_on: i64,
    pub created_by: String,
    pub storage_path: String,
    pub subject: Option<String>,
    pub document_content: Option<String>,
    pub mime_type: String,
}

stored_row! {
    TemplateRevisionRow => template_revisions,
    key: (String, i64) = [template_guid, created_on],
    versioned: false,
    soft_delete: false,
}

impl Entity for TemplateRevision {
    type Row = TemplateRevisionRow;

    fn key(&self) -> (String, i64) {
        (self.template_guid.clone(), millis(&self.created_on))
    }

    fn to_row(&self) -> Result<TemplateRevisionRow, PersistenceFailure> {
        Ok(TemplateRevisionRow {
            template_guid: self.template_guid.clone(),
            created_on: millis(&self.created_on),
            created_by: self.created_by.clone(),
            storage_path: self.storage_path.clone(),
            subject: self.subject.clone(),
            document_content: self.document_content.clone(),
            mime_type: column_text(&self.mime_type),
        })
    }

    fn from_row(row: TemplateRevisionRow) -> Result<Self, PersistenceFailure> {
        Ok(Self {
            template_guid: row.template_guid,
            created_on: instant(row.created_on)?,
            created_by: row.created_by,
            storage_path: row.storage_path,
            subject: row.subject,
            document_content: row.document_content,
            mime_type: from_column_text(row.mime_type)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MimeType;
    use rstest::rstest;

    #[rstest]
    fn enum_columns_use_their_text_form() {
        let revision = TemplateRevision {
            template_guid: "t1".into(),
            mime_type: MimeType::Pdf,
            ..TemplateRevision::default()
        };
        let row = revision.to_row().expect("row builds");
        assert_eq!(row.mime_type, "application/pdf");
        assert_eq!(row.created_on, 0);
        assert_eq!(revision.key(), ("t1".to_owned(), 0));
        assert_eq!(TemplateRevision::from_row(row).expect("maps"), revision);
    }

    #[rstest]
    fn unknown_mime_types_fail_the_load() {
        let mut row = TemplateRevision::default().to_row().expect("row builds");
        row.mime_type = "application/x-unknown".into();
        let failure = TemplateRevision::from_row(row).expect_err("unknown mime type");
        assert_eq!(failure.kind(), crate::domain::FailureKind::MalformedData);
    }
}
