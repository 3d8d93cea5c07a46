use chrono::{DateTime, Datelike, FixedOffset, Local, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use vigia_common::folio::{report_folio, report_prefix};
use vigia_common::status::{CatalogKind, ReportKind, ReportStatus};
use vigia_common::types::{
    EditHistoryEntry, FolioResponse, RegisterReportRequest, Report, ReportDetail,
    UpdateReportRequest,
};

use crate::entities::edit_history;
use crate::entities::report::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::catalog::resolve;
use crate::store::folio::next_sequence_value;
use crate::store::follow_up::commitment_follow_ups_for;
use crate::store::{
    now, parse_column, parse_optional_date, present, required, text_or_empty, Store,
};

pub(crate) fn to_report(m: report::Model) -> Result<Report> {
    Ok(Report {
        status: parse_column("preventive_action_reports.status", &m.status)?,
        id: m.id,
        folio: m.folio,
        author_id: m.author_id,
        regional_office_id: m.regional_office_id,
        report_type_id: m.report_type_id,
        federal_entity_id: m.federal_entity_id,
        municipality_id: m.municipality_id,
        internal_actor_id: m.internal_actor_id,
        attention_type_id: m.attention_type_id,
        issue_type_id: m.issue_type_id,
        classification_grade_id: m.classification_grade_id,
        current_status_id: m.current_status_id,
        report_year: m.report_year,
        report_date: m.report_date,
        request_date: m.request_date,
        commitment_date: m.commitment_date,
        requester: m.requester,
        cause: m.cause,
        event_description: m.event_description,
        demands: m.demands,
        impact_if_unattended: m.impact_if_unattended,
        planned_actions: m.planned_actions,
        commitments: m.commitments,
        stakeholder_group: m.stakeholder_group,
        external_actors: m.external_actors,
        observations: m.observations,
        progress_percentage: m.progress_percentage,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn to_edit_entry(m: edit_history::Model) -> EditHistoryEntry {
    EditHistoryEntry {
        id: m.id,
        report_id: m.report_id,
        field: m.field,
        old_value: m.old_value,
        new_value: m.new_value,
        editor_id: m.editor_id,
        edited_at: m.edited_at.with_timezone(&Utc),
    }
}

/// Catalog references a registered report must carry, in validation order.
const REQUIRED_FIELDS: [&str; 7] = [
    "report_type",
    "regional_office",
    "federal_entity",
    "municipality",
    "request_date",
    "internal_actor",
    "attention_type",
];

async fn resolve_optional<C: ConnectionTrait>(
    conn: &C,
    kind: CatalogKind,
    name: Option<&str>,
) -> Result<Option<i32>> {
    match present(name) {
        Some(name) => Ok(Some(resolve(conn, kind, name, None).await?.id)),
        None => Ok(None),
    }
}

fn field_value<'a>(req: &'a RegisterReportRequest, field: &str) -> Option<&'a str> {
    match field {
        "report_type" => req.report_type.as_deref(),
        "regional_office" => req.regional_office.as_deref(),
        "federal_entity" => req.federal_entity.as_deref(),
        "municipality" => req.municipality.as_deref(),
        "request_date" => req.request_date.as_deref(),
        "internal_actor" => req.internal_actor.as_deref(),
        "attention_type" => req.attention_type.as_deref(),
        _ => None,
    }
}

/// Takes the write lock by touching the report row, then reads it back.
/// Opening with the write keeps SQLite from failing the later upgrade when
/// another writer commits in between.
pub(crate) async fn claim_report<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    ts: DateTime<FixedOffset>,
) -> Result<report::Model> {
    let touched = Entity::update_many()
        .col_expr(Column::UpdatedAt, Expr::value(ts))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(StorageError::not_found("report", id));
    }
    Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| StorageError::not_found("report", id))
}

impl Store {
    /// Validates, resolves catalog names, numbers and stores a report.
    ///
    /// The folio counter and the report row are written in one transaction
    /// that opens with the counter upsert, so concurrent registrations for the
    /// same office and type queue on the write lock and receive distinct
    /// consecutive numbers.
    pub async fn register_report(
        &self,
        author_id: i32,
        req: &RegisterReportRequest,
    ) -> Result<FolioResponse> {
        let draft = req.save_as_draft;
        let required_fields: &[&str] = if draft {
            &REQUIRED_FIELDS[..2]
        } else {
            &REQUIRED_FIELDS
        };
        for field in required_fields {
            if present(field_value(req, field)).is_none() {
                return Err(StorageError::Validation(format!("{field} is required")));
            }
        }
        let type_name = required("report_type", req.report_type.as_deref())?;
        let office_name = required("regional_office", req.regional_office.as_deref())?;

        let request_date = parse_optional_date("request_date", req.request_date.as_deref())?;
        let commitment_date =
            parse_optional_date("commitment_date", req.commitment_date.as_deref())?;

        let db = self.db();
        let report_type = resolve(db, CatalogKind::ReportType, type_name, None).await?;
        let kind = ReportKind::from_type_name(&report_type.name).ok_or_else(|| {
            StorageError::Validation(format!("report type '{type_name}' has no folio abbreviation"))
        })?;
        let office = resolve(db, CatalogKind::RegionalOffice, office_name, None).await?;
        let office_abbreviation = office
            .abbreviation
            .as_deref()
            .and_then(|a| present(Some(a)))
            .ok_or_else(|| {
                StorageError::Validation(format!(
                    "regional office '{office_name}' has no abbreviation"
                ))
            })?
            .to_owned();

        let federal_entity = match present(req.federal_entity.as_deref()) {
            Some(name) => Some(resolve(db, CatalogKind::FederalEntity, name, None).await?),
            None => None,
        };
        let municipality = match (present(req.municipality.as_deref()), &federal_entity) {
            (Some(name), Some(entity)) => {
                Some(resolve(db, CatalogKind::Municipality, name, Some(entity.id)).await?)
            }
            (Some(_), None) => {
                return Err(StorageError::Validation(
                    "federal_entity is required to resolve municipality".to_string(),
                ));
            }
            (None, _) => None,
        };
        let internal_actor_id =
            resolve_optional(db, CatalogKind::InternalActor, req.internal_actor.as_deref()).await?;
        let attention_type_id =
            resolve_optional(db, CatalogKind::AttentionType, req.attention_type.as_deref()).await?;
        let issue_type_id =
            resolve_optional(db, CatalogKind::IssueType, req.issue_type.as_deref()).await?;
        let classification_grade_id = resolve_optional(
            db,
            CatalogKind::ClassificationGrade,
            req.classification_grade.as_deref(),
        )
        .await?;

        let prefix = report_prefix(&office_abbreviation, kind);
        let txn = db.begin().await?;
        let sequence = next_sequence_value(&txn, &prefix).await?;
        let folio = report_folio(&prefix, sequence);

        let status = if draft {
            ReportStatus::Draft
        } else {
            ReportStatus::Registered
        };
        let today = Local::now().date_naive();
        let ts = now();
        let am = report::ActiveModel {
            folio: Set(folio.clone()),
            author_id: Set(author_id),
            regional_office_id: Set(office.id),
            report_type_id: Set(report_type.id),
            federal_entity_id: Set(federal_entity.map(|e| e.id)),
            municipality_id: Set(municipality.map(|m| m.id)),
            internal_actor_id: Set(internal_actor_id),
            attention_type_id: Set(attention_type_id),
            issue_type_id: Set(issue_type_id),
            classification_grade_id: Set(classification_grade_id),
            current_status_id: Set(None),
            report_year: Set(today.year()),
            report_date: Set(today),
            request_date: Set(request_date),
            commitment_date: Set(commitment_date),
            requester: Set(text_or_empty(req.requester.as_deref())),
            cause: Set(text_or_empty(req.cause.as_deref())),
            event_description: Set(text_or_empty(req.event_description.as_deref())),
            demands: Set(text_or_empty(req.demands.as_deref())),
            impact_if_unattended: Set(text_or_empty(req.impact_if_unattended.as_deref())),
            planned_actions: Set(text_or_empty(req.planned_actions.as_deref())),
            commitments: Set(text_or_empty(req.commitments.as_deref())),
            stakeholder_group: Set(text_or_empty(req.stakeholder_group.as_deref())),
            external_actors: Set(text_or_empty(req.external_actors.as_deref())),
            observations: Set(text_or_empty(req.observations.as_deref())),
            status: Set(status.as_str().to_owned()),
            progress_percentage: Set(0),
            created_at: Set(ts),
            updated_at: Set(ts),
            ..Default::default()
        };
        let model = am.insert(&txn).await?;
        txn.commit().await?;

        tracing::info!(folio = %folio, id = model.id, status = %status, "Report registered");
        Ok(FolioResponse {
            id: model.id,
            folio,
        })
    }

    pub async fn get_report(&self, id: i32) -> Result<Option<Report>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_report).transpose()
    }

    /// Report plus follow-ups. A missing folio is [`StorageError::NotFound`].
    pub async fn find_report_by_folio(&self, folio: &str) -> Result<ReportDetail> {
        let model = Entity::find()
            .filter(Column::Folio.eq(folio))
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("report", folio))?;
        let follow_ups = commitment_follow_ups_for(self.db(), model.id).await?;
        Ok(ReportDetail {
            report: to_report(model)?,
            follow_ups,
        })
    }

    /// Newest first.
    pub async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Report>> {
        let mut q = Entity::find();
        if let Some(s) = status {
            q = q.filter(Column::Status.eq(s.as_str()));
        }
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .order_by(Column::Id, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(to_report).collect()
    }

    pub async fn count_reports(&self, status: Option<ReportStatus>) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(s) = status {
            q = q.filter(Column::Status.eq(s.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }

    /// Applies narrative edits and appends one history row per changed field,
    /// all in one transaction. An edit that changes nothing writes nothing.
    pub async fn update_report(
        &self,
        id: i32,
        editor_id: i32,
        req: &UpdateReportRequest,
    ) -> Result<Report> {
        let commitment_date = parse_optional_date("commitment_date", req.commitment_date.as_deref())?;

        let ts = now();
        let txn = self.db().begin().await?;
        let model = claim_report(&txn, id, ts).await?;

        let mut am: report::ActiveModel = model.clone().into();
        let mut changes: Vec<(&'static str, Option<String>, Option<String>)> = Vec::new();

        macro_rules! text_field {
            ($field:ident) => {
                if let Some(value) = req.$field.as_deref() {
                    let value = value.trim().to_owned();
                    if value != model.$field {
                        changes.push((stringify!($field), Some(model.$field.clone()), Some(value.clone())));
                        am.$field = Set(value);
                    }
                }
            };
        }
        text_field!(requester);
        text_field!(cause);
        text_field!(event_description);
        text_field!(demands);
        text_field!(impact_if_unattended);
        text_field!(planned_actions);
        text_field!(commitments);
        text_field!(stakeholder_group);
        text_field!(external_actors);
        text_field!(observations);

        if req.commitment_date.is_some() && commitment_date != model.commitment_date {
            changes.push((
                "commitment_date",
                model.commitment_date.map(|d| d.to_string()),
                commitment_date.map(|d| d.to_string()),
            ));
            am.commitment_date = Set(commitment_date);
        }

        if changes.is_empty() {
            txn.rollback().await?;
            return self
                .get_report(id)
                .await?
                .ok_or_else(|| StorageError::not_found("report", id));
        }

        am.updated_at = Set(ts);
        let updated = am.update(&txn).await?;

        for (field, old_value, new_value) in &changes {
            edit_history::ActiveModel {
                report_id: Set(id),
                field: Set((*field).to_owned()),
                old_value: Set(old_value.clone()),
                new_value: Set(new_value.clone()),
                editor_id: Set(editor_id),
                edited_at: Set(ts),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        tracing::info!(report_id = id, editor_id, changed = changes.len(), "Report edited");
        to_report(updated)
    }

    /// Field-level edits of a report, oldest first.
    pub async fn list_edit_history(&self, report_id: i32) -> Result<Vec<EditHistoryEntry>> {
        if Entity::find_by_id(report_id).one(self.db()).await?.is_none() {
            return Err(StorageError::not_found("report", report_id));
        }
        let rows = edit_history::Entity::find()
            .filter(edit_history::Column::ReportId.eq(report_id))
            .order_by(edit_history::Column::EditedAt, Order::Asc)
            .order_by(edit_history::Column::Id, Order::Asc)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_edit_entry).collect())
    }
}
