use super::{
    Applied, Lookup, LookupContext, Phases, ReconcileError, ReconcileOptions, ReconcilePlan,
    RowValues, SqlValue, Table, load_content_state, perform_diff, plan,
};
use crate::models::{
    ContentState, LabelRow, PersonRow, SessionLabelRow, SessionLinkRow, SessionPersonRow,
    SessionRow, TaxonomyRow,
};
use podium_core::diff::{Differential, Identified, Staged, Tracked};
use podium_core::resources::{
    ConferenceSnapshot, ResourceKind, StagedLabel, StagedPerson, StagedSession,
    StagedSessionLabel, StagedSessionLink, StagedSessionPerson, StagedTaxonomy,
};
use podium_core::summary::{DiffCounts, DiffSummary};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqliteConnection};
use time::OffsetDateTime;
use tracing::info;

/// Load, plan and apply a snapshot on a connection the caller holds a
/// transaction on. The caller commits on `Ok` and rolls back on `Err`.
pub async fn reconcile_in_transaction(
    conn: &mut SqliteConnection,
    conference_id: i64,
    snapshot: &ConferenceSnapshot,
    options: ReconcileOptions,
) -> Result<DiffSummary, ReconcileError> {
    let state = load_content_state(conn, conference_id).await?;
    let plan = plan(snapshot, &state, options)?;
    let summary = plan.summary();

    if summary.is_empty() {
        info!(conference_id, "snapshot matches stored content");
        return Ok(summary);
    }

    apply_plan(conn, conference_id, &plan, &state).await?;

    sqlx::query("UPDATE conferences SET updated_at = ? WHERE id = ?")
        .bind(OffsetDateTime::now_utc())
        .bind(conference_id)
        .execute(&mut *conn)
        .await?;

    Ok(summary)
}

/// Write `plan` in dependency order.
///
/// Every step extends the lookup context with the ids it wrote. A collection
/// the plan does not manage contributes the refs of its stored rows instead,
/// so children can still point at it. A step that runs before a kind it
/// references fails with [`ReconcileError::OutOfOrder`].
pub async fn apply_plan(
    conn: &mut SqliteConnection,
    conference_id: i64,
    plan: &ReconcilePlan,
    state: &ContentState,
) -> Result<LookupContext, ReconcileError> {
    let context = LookupContext::new();

    let context = entity_step::<_, TaxonomyRow, _>(
        conn,
        ResourceKind::Taxonomies,
        &Table::TAXONOMIES,
        plan.taxonomies.as_ref(),
        &state.taxonomies,
        context,
        |taxonomy: &StagedTaxonomy, _| Ok(taxonomy_values(conference_id, taxonomy)),
    )
    .await?;

    let context = entity_step::<_, LabelRow, _>(
        conn,
        ResourceKind::Labels,
        &Table::LABELS,
        plan.labels.as_ref(),
        &state.labels,
        context,
        |label: &StagedLabel, context| label_values(conference_id, label, context),
    )
    .await?;

    let context = entity_step::<_, PersonRow, _>(
        conn,
        ResourceKind::People,
        &Table::PEOPLE,
        plan.people.as_ref(),
        &state.people,
        context,
        |person: &StagedPerson, _| Ok(person_values(conference_id, person)),
    )
    .await?;

    let context = entity_step::<_, SessionRow, _>(
        conn,
        ResourceKind::Sessions,
        &Table::SESSIONS,
        plan.sessions.as_ref(),
        &state.sessions,
        context,
        |session: &StagedSession, _| Ok(session_values(conference_id, session)),
    )
    .await?;

    let context = entity_step::<_, SessionLinkRow, _>(
        conn,
        ResourceKind::SessionLinks,
        &Table::SESSION_LINKS,
        plan.session_links.as_ref(),
        &state.session_links,
        context,
        |link: &StagedSessionLink, context| link_values(conference_id, link, context),
    )
    .await?;

    let context = join_step::<_, SessionLabelRow, _>(
        conn,
        ResourceKind::SessionLabels,
        &Table::SESSION_LABELS,
        plan.session_labels.as_ref(),
        context,
        |join: &StagedSessionLabel, context| {
            join_values(
                ResourceKind::SessionLabels,
                context,
                &join.session_id,
                (ResourceKind::Labels, join.label_id.as_str()),
            )
        },
    )
    .await?;

    join_step::<_, SessionPersonRow, _>(
        conn,
        ResourceKind::SessionPeople,
        &Table::SESSION_PEOPLE,
        plan.session_people.as_ref(),
        context,
        |join: &StagedSessionPerson, context| {
            join_values(
                ResourceKind::SessionPeople,
                context,
                &join.session_id,
                (ResourceKind::People, join.person_id.as_str()),
            )
        },
    )
    .await
}

async fn entity_step<S, R, F>(
    conn: &mut SqliteConnection,
    kind: ResourceKind,
    table: &Table,
    diff: Option<&Differential<S>>,
    stored: &[R],
    context: LookupContext,
    map: F,
) -> Result<LookupContext, ReconcileError>
where
    S: Staged + Sync,
    R: for<'r> FromRow<'r, SqliteRow> + Tracked + Send + Unpin,
    F: Fn(&S, &LookupContext) -> Result<RowValues, ReconcileError> + Send + Sync,
{
    context.require_dependencies(kind)?;
    let Some(diff) = diff else {
        return Ok(context.with(kind, Lookup::from_tracked(stored)));
    };

    let applied: Applied<R> = perform_diff(
        conn,
        table,
        diff,
        |staged| map(staged, &context),
        Phases::for_kind(kind),
    )
    .await?;
    log_step(kind, diff, applied.records.len());

    Ok(context.with(kind, applied.lookup))
}

async fn join_step<S, R, F>(
    conn: &mut SqliteConnection,
    kind: ResourceKind,
    table: &Table,
    diff: Option<&Differential<S>>,
    context: LookupContext,
    map: F,
) -> Result<LookupContext, ReconcileError>
where
    S: Staged + Sync,
    R: for<'r> FromRow<'r, SqliteRow> + Identified + Send + Unpin,
    F: Fn(&S, &LookupContext) -> Result<RowValues, ReconcileError> + Send + Sync,
{
    context.require_dependencies(kind)?;
    let Some(diff) = diff else {
        return Ok(context);
    };

    let applied: Applied<R> = perform_diff(
        conn,
        table,
        diff,
        |staged| map(staged, &context),
        Phases::for_kind(kind),
    )
    .await?;
    log_step(kind, diff, applied.records.len());

    Ok(context.with(kind, applied.lookup))
}

fn log_step<S>(kind: ResourceKind, diff: &Differential<S>, written: usize) {
    let counts = DiffCounts::of(diff);
    info!(
        resource = kind.as_str(),
        additions = counts.additions,
        modifications = counts.modifications,
        deletions = counts.deletions,
        written,
        "reconciled resource"
    );
}

fn taxonomy_values(conference_id: i64, taxonomy: &StagedTaxonomy) -> RowValues {
    vec![
        SqlValue::Integer(conference_id),
        SqlValue::text(&taxonomy.id),
        SqlValue::json(&taxonomy.title),
        SqlValue::optional_text(taxonomy.icon.as_ref()),
    ]
    .into()
}

fn label_values(
    conference_id: i64,
    label: &StagedLabel,
    context: &LookupContext,
) -> Result<RowValues, ReconcileError> {
    let taxonomy_id = context.related(
        ResourceKind::Labels,
        ResourceKind::Taxonomies,
        &label.taxonomy_id,
    )?;
    Ok(vec![
        SqlValue::Integer(conference_id),
        SqlValue::text(&label.id),
        SqlValue::Integer(taxonomy_id),
        SqlValue::json(&label.title),
        SqlValue::optional_text(label.icon.as_ref()),
    ]
    .into())
}

fn person_values(conference_id: i64, person: &StagedPerson) -> RowValues {
    vec![
        SqlValue::Integer(conference_id),
        SqlValue::text(&person.id),
        SqlValue::text(&person.name),
        SqlValue::json(&person.subtitle),
        SqlValue::json(&person.bio),
        SqlValue::optional_text(person.avatar.as_ref()),
    ]
    .into()
}

fn session_values(conference_id: i64, session: &StagedSession) -> RowValues {
    vec![
        SqlValue::Integer(conference_id),
        SqlValue::text(&session.id),
        SqlValue::text(&session.kind),
        SqlValue::optional_text(session.slug.as_ref()),
        SqlValue::json(&session.title),
        SqlValue::json(&session.details),
        SqlValue::optional_timestamp(session.start_date),
        SqlValue::optional_timestamp(session.end_date),
        SqlValue::optional_text(session.location.as_ref()),
    ]
    .into()
}

fn link_values(
    conference_id: i64,
    link: &StagedSessionLink,
    context: &LookupContext,
) -> Result<RowValues, ReconcileError> {
    let session_id = context.related(
        ResourceKind::SessionLinks,
        ResourceKind::Sessions,
        &link.session_id,
    )?;
    Ok(vec![
        SqlValue::Integer(conference_id),
        SqlValue::text(&link.id),
        SqlValue::Integer(session_id),
        SqlValue::text(&link.kind),
        SqlValue::text(&link.url),
        SqlValue::json(&link.title),
    ]
    .into())
}

fn join_values(
    kind: ResourceKind,
    context: &LookupContext,
    session_id: &str,
    (other_kind, other_id): (ResourceKind, &str),
) -> Result<RowValues, ReconcileError> {
    let session_id = context.related(kind, ResourceKind::Sessions, session_id)?;
    let other_id = context.related(kind, other_kind, other_id)?;
    Ok(vec![SqlValue::Integer(session_id), SqlValue::Integer(other_id)].into())
}
