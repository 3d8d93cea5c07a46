use chrono::{DateTime, FixedOffset, Local, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use vigia_common::folio::action_folio;
use vigia_common::status::ActionStatus;
use vigia_common::types::{ActionDetail, ActionForm, FolioResponse, PreventiveAction};

use crate::entities::preventive_action::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::folio::{action_folio_exists, unique_action_folio};
use crate::store::follow_up::action_follow_ups_for;
use crate::store::{
    now, parse_column, parse_date, parse_optional_date, present, required, text_or_empty, Store,
};

pub(crate) fn to_action(m: preventive_action::Model) -> Result<PreventiveAction> {
    Ok(PreventiveAction {
        status: parse_column("preventive_actions.status", &m.status)?,
        id: m.id,
        folio: m.folio,
        registration_date: m.registration_date,
        region: m.region,
        asset: m.asset,
        facility: m.facility,
        state: m.state,
        municipality: m.municipality,
        locality: m.locality,
        coordinate_x: m.coordinate_x,
        coordinate_y: m.coordinate_y,
        issue_type: m.issue_type,
        issue_description: m.issue_description,
        social_actor: m.social_actor,
        impact_level: m.impact_level,
        preventive_action: m.preventive_action,
        start_date: m.start_date,
        end_date: m.end_date,
        budget: m.budget,
        responsible: m.responsible,
        responsible_area: m.responsible_area,
        observations: m.observations,
        progress_percentage: m.progress_percentage,
        last_update_date: m.last_update_date,
        author_id: m.author_id,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    })
}

fn parse_number(field: &'static str, value: Option<&str>) -> Result<Option<f64>> {
    present(value)
        .map(|v| {
            v.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| StorageError::Validation(format!("{field} must be a number")))
        })
        .transpose()
}

/// Takes the write lock by touching the action row, then reads it back.
pub(crate) async fn claim_action<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    ts: DateTime<FixedOffset>,
) -> Result<preventive_action::Model> {
    let touched = Entity::update_many()
        .col_expr(Column::UpdatedAt, Expr::value(ts))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(StorageError::not_found("preventive action", id));
    }
    Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| StorageError::not_found("preventive action", id))
}

impl Store {
    /// Registers a complete preventive action with status `registered`.
    ///
    /// A caller-supplied folio must be unused; otherwise a timestamp folio
    /// is generated.
    pub async fn create_action(&self, author_id: i32, form: &ActionForm) -> Result<FolioResponse> {
        let registration_date = parse_date(
            "registration_date",
            required("registration_date", form.registration_date.as_deref())?,
        )?;
        let region = required("region", form.region.as_deref())?;
        let asset = required("asset", form.asset.as_deref())?;
        let facility = required("facility", form.facility.as_deref())?;
        let state = required("state", form.state.as_deref())?;
        let municipality = required("municipality", form.municipality.as_deref())?;
        let locality = required("locality", form.locality.as_deref())?;
        let issue_type = required("issue_type", form.issue_type.as_deref())?;
        let issue_description = required("issue_description", form.issue_description.as_deref())?;
        let social_actor = required("social_actor", form.social_actor.as_deref())?;
        let impact_level = required("impact_level", form.impact_level.as_deref())?;
        let action_text = required("preventive_action", form.preventive_action.as_deref())?;
        let start_date = parse_date("start_date", required("start_date", form.start_date.as_deref())?)?;
        let end_date = parse_date("end_date", required("end_date", form.end_date.as_deref())?)?;
        let responsible = required("responsible", form.responsible.as_deref())?;
        let responsible_area = required("responsible_area", form.responsible_area.as_deref())?;

        if end_date < start_date {
            return Err(StorageError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }

        let coordinate_x = parse_number("coordinate_x", form.coordinate_x.as_deref())?;
        let coordinate_y = parse_number("coordinate_y", form.coordinate_y.as_deref())?;
        let budget = parse_number("budget", form.budget.as_deref())?;

        let txn = self.db().begin().await?;
        let folio = match present(form.folio.as_deref()) {
            Some(folio) => {
                if action_folio_exists(&txn, folio).await? {
                    return Err(StorageError::Conflict(format!(
                        "folio '{folio}' already exists"
                    )));
                }
                folio.to_owned()
            }
            None => unique_action_folio(&txn, &action_folio(Local::now().naive_local(), false)).await?,
        };

        let ts = now();
        let model = preventive_action::ActiveModel {
            folio: Set(folio.clone()),
            registration_date: Set(registration_date),
            region: Set(region.to_owned()),
            asset: Set(asset.to_owned()),
            facility: Set(facility.to_owned()),
            state: Set(state.to_owned()),
            municipality: Set(municipality.to_owned()),
            locality: Set(locality.to_owned()),
            coordinate_x: Set(coordinate_x),
            coordinate_y: Set(coordinate_y),
            issue_type: Set(issue_type.to_owned()),
            issue_description: Set(issue_description.to_owned()),
            social_actor: Set(social_actor.to_owned()),
            impact_level: Set(impact_level.to_owned()),
            preventive_action: Set(action_text.to_owned()),
            start_date: Set(Some(start_date)),
            end_date: Set(Some(end_date)),
            budget: Set(budget),
            responsible: Set(responsible.to_owned()),
            responsible_area: Set(responsible_area.to_owned()),
            observations: Set(text_or_empty(form.observations.as_deref())),
            status: Set(ActionStatus::Registered.as_str().to_owned()),
            progress_percentage: Set(0),
            last_update_date: Set(None),
            author_id: Set(author_id),
            created_at: Set(ts),
            updated_at: Set(ts),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!(folio = %folio, id = model.id, "Preventive action registered");
        Ok(FolioResponse {
            id: model.id,
            folio,
        })
    }

    /// Saves a partially filled action with status `draft`. Blank text is
    /// stored as empty; the registration date defaults to today.
    pub async fn create_action_draft(&self, author_id: i32, form: &ActionForm) -> Result<FolioResponse> {
        let registration_date = parse_optional_date("registration_date", form.registration_date.as_deref())?
            .unwrap_or_else(|| Local::now().date_naive());
        let start_date = parse_optional_date("start_date", form.start_date.as_deref())?;
        let end_date = parse_optional_date("end_date", form.end_date.as_deref())?;
        let coordinate_x = parse_number("coordinate_x", form.coordinate_x.as_deref())?;
        let coordinate_y = parse_number("coordinate_y", form.coordinate_y.as_deref())?;
        let budget = parse_number("budget", form.budget.as_deref())?;

        let txn = self.db().begin().await?;
        let folio = match present(form.folio.as_deref()) {
            Some(folio) => {
                if action_folio_exists(&txn, folio).await? {
                    return Err(StorageError::Conflict(format!(
                        "folio '{folio}' already exists"
                    )));
                }
                folio.to_owned()
            }
            None => unique_action_folio(&txn, &action_folio(Local::now().naive_local(), true)).await?,
        };

        let ts = now();
        let model = preventive_action::ActiveModel {
            folio: Set(folio.clone()),
            registration_date: Set(registration_date),
            region: Set(text_or_empty(form.region.as_deref())),
            asset: Set(text_or_empty(form.asset.as_deref())),
            facility: Set(text_or_empty(form.facility.as_deref())),
            state: Set(text_or_empty(form.state.as_deref())),
            municipality: Set(text_or_empty(form.municipality.as_deref())),
            locality: Set(text_or_empty(form.locality.as_deref())),
            coordinate_x: Set(coordinate_x),
            coordinate_y: Set(coordinate_y),
            issue_type: Set(text_or_empty(form.issue_type.as_deref())),
            issue_description: Set(text_or_empty(form.issue_description.as_deref())),
            social_actor: Set(text_or_empty(form.social_actor.as_deref())),
            impact_level: Set(text_or_empty(form.impact_level.as_deref())),
            preventive_action: Set(text_or_empty(form.preventive_action.as_deref())),
            start_date: Set(start_date),
            end_date: Set(end_date),
            budget: Set(budget),
            responsible: Set(text_or_empty(form.responsible.as_deref())),
            responsible_area: Set(text_or_empty(form.responsible_area.as_deref())),
            observations: Set(text_or_empty(form.observations.as_deref())),
            status: Set(ActionStatus::Draft.as_str().to_owned()),
            progress_percentage: Set(0),
            last_update_date: Set(None),
            author_id: Set(author_id),
            created_at: Set(ts),
            updated_at: Set(ts),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!(folio = %folio, id = model.id, "Preventive action draft saved");
        Ok(FolioResponse {
            id: model.id,
            folio,
        })
    }

    pub async fn get_action(&self, id: i32) -> Result<Option<PreventiveAction>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        model.map(to_action).transpose()
    }

    pub async fn get_action_detail(&self, id: i32) -> Result<ActionDetail> {
        let model = Entity::find_by_id(id)
            .one(self.db())
            .await?
            .ok_or_else(|| StorageError::not_found("preventive action", id))?;
        let follow_ups = action_follow_ups_for(self.db(), id).await?;
        Ok(ActionDetail {
            action: to_action(model)?,
            follow_ups,
        })
    }

    /// Newest first.
    pub async fn list_actions(
        &self,
        status: Option<ActionStatus>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PreventiveAction>> {
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
        rows.into_iter().map(to_action).collect()
    }

    pub async fn count_actions(&self, status: Option<ActionStatus>) -> Result<u64> {
        let mut q = Entity::find();
        if let Some(s) = status {
            q = q.filter(Column::Status.eq(s.as_str()));
        }
        Ok(q.count(self.db()).await?)
    }
}
