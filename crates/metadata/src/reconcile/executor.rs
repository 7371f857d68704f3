use super::{Lookup, ReconcileError, RowValues, Table};
use podium_core::ResourceKind;
use podium_core::diff::{Differential, Identified, Staged};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

/// Maximum rows bound into a single INSERT or DELETE statement.
pub const MAX_BATCH_ROWS: usize = 500;

/// Phases of [`perform_diff`] to run. All enabled by default.
#[derive(Debug, Clone, Copy)]
pub struct Phases {
    pub delete: bool,
    pub insert: bool,
    pub update: bool,
}

impl Default for Phases {
    fn default() -> Self {
        Self {
            delete: true,
            insert: true,
            update: true,
        }
    }
}

impl Phases {
    /// Join rows are only kept, added or deleted.
    pub fn for_kind(kind: ResourceKind) -> Self {
        Self {
            update: !kind.is_relationship(),
            ..Self::default()
        }
    }
}

/// Result of applying one differential.
#[derive(Debug)]
pub struct Applied<R> {
    /// Client id -> real id for every inserted or updated row.
    pub lookup: Lookup,
    /// Inserted rows followed by updated rows.
    pub records: Vec<R>,
}

/// Apply a differential to `table` on the caller's connection.
///
/// Phases run as delete, insert, update. `map` turns a staged value into the
/// row's column values and is where foreign keys get resolved; its error
/// aborts the call. An update whose target row is gone fails with
/// [`ReconcileError::MissingTarget`]. Nothing here commits or rolls back:
/// the caller owns the transaction.
pub async fn perform_diff<S, R, F>(
    conn: &mut SqliteConnection,
    table: &Table,
    diff: &Differential<S>,
    mut map: F,
    phases: Phases,
) -> Result<Applied<R>, ReconcileError>
where
    S: Staged + Sync,
    R: for<'r> FromRow<'r, SqliteRow> + Identified + Send + Unpin,
    F: FnMut(&S) -> Result<RowValues, ReconcileError> + Send,
{
    let mut applied = Applied {
        lookup: Lookup::default(),
        records: Vec::with_capacity(diff.additions.len() + diff.modifications.len()),
    };

    if phases.delete && !diff.deletions.is_empty() {
        let mut deleted = 0;
        for ids in diff.deletions.chunks(MAX_BATCH_ROWS) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "DELETE FROM {} WHERE id IN (",
                table.name
            ));
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
            builder.push(")");
            deleted += builder.build().execute(&mut *conn).await?.rows_affected();
        }
        debug!(table = table.name, deleted, "deleted rows");
    }

    if phases.insert && !diff.additions.is_empty() {
        for chunk in diff.additions.chunks(MAX_BATCH_ROWS) {
            let rows = chunk.iter().map(&mut map).collect::<Result<Vec<_>, _>>()?;
            debug_assert!(rows.iter().all(|row| row.len() == table.columns.len()));

            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {} ({}) ",
                table.name,
                table.columns.join(", ")
            ));
            builder.push_values(rows, |mut separated, row| {
                for value in row.0 {
                    value.push_separated(&mut separated);
                }
            });
            builder.push(" RETURNING *");

            let mut inserted: Vec<R> = builder.build_query_as().fetch_all(&mut *conn).await?;
            if inserted.len() != chunk.len() {
                return Err(ReconcileError::RowCountMismatch {
                    table: table.name,
                    expected: chunk.len(),
                    returned: inserted.len(),
                });
            }

            // RETURNING order is unspecified; ids are assigned in VALUES order.
            inserted.sort_by_key(Identified::id);
            for (staged, row) in chunk.iter().zip(inserted) {
                applied.lookup.insert(staged.client_id(), row.id());
                applied.records.push(row);
            }
        }
        debug!(
            table = table.name,
            inserted = diff.additions.len(),
            "inserted rows"
        );
    }

    if phases.update && !diff.modifications.is_empty() {
        for modification in &diff.modifications {
            let values = map(&modification.value)?;
            debug_assert_eq!(values.len(), table.columns.len());

            let mut builder = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", table.name));
            for (position, (column, value)) in table.columns.iter().zip(values.0).enumerate() {
                if position > 0 {
                    builder.push(", ");
                }
                builder.push(*column).push(" = ");
                value.push_to(&mut builder);
            }
            builder
                .push(" WHERE id = ")
                .push_bind(modification.target)
                .push(" RETURNING *");

            let row: R = builder
                .build_query_as()
                .fetch_optional(&mut *conn)
                .await?
                .ok_or(ReconcileError::MissingTarget {
                    table: table.name,
                    id: modification.target,
                })?;

            applied
                .lookup
                .insert(modification.value.client_id(), row.id());
            applied.records.push(row);
        }
        debug!(
            table = table.name,
            updated = diff.modifications.len(),
            "updated rows"
        );
    }

    Ok(applied)
}
