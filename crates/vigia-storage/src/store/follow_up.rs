use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order,
    QueryFilter, QueryOrder, TransactionTrait,
};
use vigia_common::status::{ActionStatus, ReportStatus};
use vigia_common::types::{
    ActionFollowUp, ActionFollowUpForm, CommitmentFollowUp, CommitmentFollowUpRequest,
};

use crate::entities::{action_follow_up, commitment_follow_up, preventive_action, report};
use crate::error::{Result, StorageError};
use crate::store::action::claim_action;
use crate::store::catalog::find_general_status;
use crate::store::report::claim_report;
use crate::store::{check_percentage, now, parse_column, parse_date, present, text_or_empty, Store};

/// Compliance status name written alongside a report status.
fn compliance_name(status: ReportStatus) -> Option<&'static str> {
    match status {
        ReportStatus::Completed => Some("Cumplido"),
        ReportStatus::InProgress => Some("En proceso"),
        _ => None,
    }
}

fn to_commitment_follow_up(m: commitment_follow_up::Model) -> Result<CommitmentFollowUp> {
    Ok(CommitmentFollowUp {
        previous_status: parse_column("commitment_follow_ups.previous_status", &m.previous_status)?,
        new_status: parse_column("commitment_follow_ups.new_status", &m.new_status)?,
        id: m.id,
        report_id: m.report_id,
        progress_percentage: m.progress_percentage,
        evidence: m.evidence,
        observations: m.observations,
        author_id: m.author_id,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

fn to_action_follow_up(m: action_follow_up::Model) -> Result<ActionFollowUp> {
    Ok(ActionFollowUp {
        previous_status: parse_column("action_follow_ups.previous_status", &m.previous_status)?,
        new_status: parse_column("action_follow_ups.new_status", &m.new_status)?,
        id: m.id,
        action_id: m.action_id,
        follow_up_date: m.follow_up_date,
        progress_percentage: m.progress_percentage,
        observations: m.observations,
        responsible: m.responsible,
        evidence_document: m.evidence_document,
        author_id: m.author_id,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

pub(crate) async fn commitment_follow_ups_for<C: ConnectionTrait>(
    conn: &C,
    report_id: i32,
) -> Result<Vec<CommitmentFollowUp>> {
    let rows = commitment_follow_up::Entity::find()
        .filter(commitment_follow_up::Column::ReportId.eq(report_id))
        .order_by(commitment_follow_up::Column::CreatedAt, Order::Asc)
        .order_by(commitment_follow_up::Column::Id, Order::Asc)
        .all(conn)
        .await?;
    rows.into_iter().map(to_commitment_follow_up).collect()
}

pub(crate) async fn action_follow_ups_for<C: ConnectionTrait>(
    conn: &C,
    action_id: i32,
) -> Result<Vec<ActionFollowUp>> {
    let rows = action_follow_up::Entity::find()
        .filter(action_follow_up::Column::ActionId.eq(action_id))
        .order_by(action_follow_up::Column::FollowUpDate, Order::Asc)
        .order_by(action_follow_up::Column::Id, Order::Asc)
        .all(conn)
        .await?;
    rows.into_iter().map(to_action_follow_up).collect()
}

impl Store {
    /// Records progress against a report's commitments.
    ///
    /// 100% completes the report, 1-99% puts it in progress and 0% leaves
    /// the status as is. The follow-up row and the report update commit
    /// together.
    pub async fn record_commitment_follow_up(
        &self,
        author_id: i32,
        req: &CommitmentFollowUpRequest,
    ) -> Result<CommitmentFollowUp> {
        let percentage = check_percentage(req.progress_percentage)?;

        let ts = now();
        let txn = self.db().begin().await?;
        let model = claim_report(&txn, req.report_id, ts).await?;

        let previous: ReportStatus = parse_column("preventive_action_reports.status", &model.status)?;
        let next = previous.after_progress(percentage);

        let current_status_id = match compliance_name(next) {
            Some(name) => find_general_status(&txn, "compliance", name)
                .await?
                .map(|s| s.id)
                .or(model.current_status_id),
            None => model.current_status_id,
        };

        let mut am: report::ActiveModel = model.into();
        am.status = Set(next.as_str().to_owned());
        am.progress_percentage = Set(percentage);
        am.current_status_id = Set(current_status_id);
        am.updated_at = Set(ts);
        am.update(&txn).await?;

        let row = commitment_follow_up::ActiveModel {
            report_id: Set(req.report_id),
            progress_percentage: Set(percentage),
            previous_status: Set(previous.as_str().to_owned()),
            new_status: Set(next.as_str().to_owned()),
            evidence: Set(text_or_empty(req.evidence.as_deref())),
            observations: Set(text_or_empty(req.observations.as_deref())),
            author_id: Set(author_id),
            created_at: Set(ts),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!(
            report_id = req.report_id,
            percentage,
            from = %previous,
            to = %next,
            "Commitment follow-up recorded"
        );
        to_commitment_follow_up(row)
    }

    pub async fn list_commitment_follow_ups(&self, report_id: i32) -> Result<Vec<CommitmentFollowUp>> {
        commitment_follow_ups_for(self.db(), report_id).await
    }

    /// Records a follow-up on a preventive action and moves its status.
    ///
    /// An explicit `new_status` wins; otherwise the status follows the
    /// percentage. Moves the lifecycle forbids fail with
    /// [`StorageError::InvalidTransition`] and write nothing.
    pub async fn record_action_follow_up(
        &self,
        author_id: i32,
        form: &ActionFollowUpForm,
    ) -> Result<ActionFollowUp> {
        let percentage = check_percentage(form.progress_percentage)?;
        let follow_up_date = parse_date("follow_up_date", &form.follow_up_date)?;
        let requested = present(form.new_status.as_deref())
            .map(|s| {
                s.parse::<ActionStatus>()
                    .map_err(|_| StorageError::Validation(format!("unknown action status: {s}")))
            })
            .transpose()?;

        let ts = now();
        let txn = self.db().begin().await?;
        let model = claim_action(&txn, form.action_id, ts).await?;

        let previous: ActionStatus = parse_column("preventive_actions.status", &model.status)?;
        let next = requested.unwrap_or_else(|| previous.after_progress(percentage));
        if !previous.can_transition_to(next) {
            return Err(StorageError::InvalidTransition {
                entity: "preventive action",
                from: previous.to_string(),
                to: next.to_string(),
            });
        }

        let mut am: preventive_action::ActiveModel = model.into();
        am.status = Set(next.as_str().to_owned());
        am.progress_percentage = Set(percentage);
        am.last_update_date = Set(Some(follow_up_date));
        am.updated_at = Set(ts);
        am.update(&txn).await?;

        let row = action_follow_up::ActiveModel {
            action_id: Set(form.action_id),
            follow_up_date: Set(follow_up_date),
            previous_status: Set(previous.as_str().to_owned()),
            new_status: Set(next.as_str().to_owned()),
            progress_percentage: Set(percentage),
            observations: Set(text_or_empty(form.observations.as_deref())),
            responsible: Set(text_or_empty(form.responsible.as_deref())),
            evidence_document: Set(present(form.evidence_document.as_deref()).map(str::to_owned)),
            author_id: Set(author_id),
            created_at: Set(ts),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!(
            action_id = form.action_id,
            percentage,
            from = %previous,
            to = %next,
            "Action follow-up recorded"
        );
        to_action_follow_up(row)
    }
}
