use podium_core::resources::Localised;
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use std::fmt::Display;
use time::OffsetDateTime;

/// A content table written by the executor.
///
/// `columns` lists the columns a mapping function must fill, in order. The
/// `id` column is always assigned by the database.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl Table {
    pub const TAXONOMIES: Table = Table {
        name: "taxonomies",
        columns: &["conference_id", "correlation_ref", "title", "icon"],
    };

    pub const LABELS: Table = Table {
        name: "labels",
        columns: &[
            "conference_id",
            "correlation_ref",
            "taxonomy_id",
            "title",
            "icon",
        ],
    };

    pub const PEOPLE: Table = Table {
        name: "people",
        columns: &[
            "conference_id",
            "correlation_ref",
            "name",
            "subtitle",
            "bio",
            "avatar",
        ],
    };

    pub const SESSIONS: Table = Table {
        name: "sessions",
        columns: &[
            "conference_id",
            "correlation_ref",
            "kind",
            "slug",
            "title",
            "details",
            "start_date",
            "end_date",
            "location",
        ],
    };

    pub const SESSION_LINKS: Table = Table {
        name: "session_links",
        columns: &[
            "conference_id",
            "correlation_ref",
            "session_id",
            "kind",
            "url",
            "title",
        ],
    };

    pub const SESSION_LABELS: Table = Table {
        name: "session_labels",
        columns: &["session_id", "label_id"],
    };

    pub const SESSION_PEOPLE: Table = Table {
        name: "session_people",
        columns: &["session_id", "person_id"],
    };
}

/// A single column value produced by a mapping function.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
    Json(Localised),
    Timestamp(OffsetDateTime),
    Null,
}

impl SqlValue {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    pub fn optional_text(value: Option<&String>) -> Self {
        value.map_or(Self::Null, |v| Self::Text(v.clone()))
    }

    pub fn optional_timestamp(value: Option<OffsetDateTime>) -> Self {
        value.map_or(Self::Null, Self::Timestamp)
    }

    pub fn json(value: &Localised) -> Self {
        Self::Json(value.clone())
    }

    pub(crate) fn push_separated<Sep: Display>(
        self,
        builder: &mut Separated<'_, '_, Sqlite, Sep>,
    ) {
        match self {
            Self::Integer(v) => builder.push_bind(v),
            Self::Text(v) => builder.push_bind(v),
            Self::Json(v) => builder.push_bind(Json(v)),
            Self::Timestamp(v) => builder.push_bind(v),
            Self::Null => builder.push_bind(None::<i64>),
        };
    }

    pub(crate) fn push_to(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Self::Integer(v) => builder.push_bind(v),
            Self::Text(v) => builder.push_bind(v),
            Self::Json(v) => builder.push_bind(Json(v)),
            Self::Timestamp(v) => builder.push_bind(v),
            Self::Null => builder.push_bind(None::<i64>),
        };
    }
}

/// Column values for one row, aligned with [`Table::columns`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowValues(pub Vec<SqlValue>);

impl RowValues {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<SqlValue>> for RowValues {
    fn from(values: Vec<SqlValue>) -> Self {
        Self(values)
    }
}
