use crate::models::{
    ContentState, LabelRow, PersonRow, SessionLabelRow, SessionLinkRow, SessionPersonRow,
    SessionRow, TaxonomyRow,
};
use sqlx::SqliteConnection;

/// Read every content row of a conference on the given connection.
///
/// Inside a reconciliation this runs on the transaction, so the plan is
/// computed against the same state it is applied to.
pub async fn load_content_state(
    conn: &mut SqliteConnection,
    conference_id: i64,
) -> Result<ContentState, sqlx::Error> {
    let taxonomies = sqlx::query_as::<_, TaxonomyRow>(
        "SELECT * FROM taxonomies WHERE conference_id = ? ORDER BY id",
    )
    .bind(conference_id)
    .fetch_all(&mut *conn)
    .await?;

    let labels =
        sqlx::query_as::<_, LabelRow>("SELECT * FROM labels WHERE conference_id = ? ORDER BY id")
            .bind(conference_id)
            .fetch_all(&mut *conn)
            .await?;

    let people =
        sqlx::query_as::<_, PersonRow>("SELECT * FROM people WHERE conference_id = ? ORDER BY id")
            .bind(conference_id)
            .fetch_all(&mut *conn)
            .await?;

    let sessions = sqlx::query_as::<_, SessionRow>(
        "SELECT * FROM sessions WHERE conference_id = ? ORDER BY id",
    )
    .bind(conference_id)
    .fetch_all(&mut *conn)
    .await?;

    let session_links = sqlx::query_as::<_, SessionLinkRow>(
        "SELECT * FROM session_links WHERE conference_id = ? ORDER BY id",
    )
    .bind(conference_id)
    .fetch_all(&mut *conn)
    .await?;

    let session_labels = sqlx::query_as::<_, SessionLabelRow>(
        r#"
        SELECT sl.id, sl.session_id, sl.label_id
        FROM session_labels sl
        JOIN sessions s ON s.id = sl.session_id
        WHERE s.conference_id = ?
        ORDER BY sl.id
        "#,
    )
    .bind(conference_id)
    .fetch_all(&mut *conn)
    .await?;

    let session_people = sqlx::query_as::<_, SessionPersonRow>(
        r#"
        SELECT sp.id, sp.session_id, sp.person_id
        FROM session_people sp
        JOIN sessions s ON s.id = sp.session_id
        WHERE s.conference_id = ?
        ORDER BY sp.id
        "#,
    )
    .bind(conference_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ContentState {
        taxonomies,
        labels,
        people,
        sessions,
        session_links,
        session_labels,
        session_people,
    })
}
