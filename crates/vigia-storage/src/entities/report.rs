use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "preventive_action_reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub folio: String,
    pub author_id: i32,
    pub regional_office_id: i32,
    pub report_type_id: i32,
    pub federal_entity_id: Option<i32>,
    pub municipality_id: Option<i32>,
    pub internal_actor_id: Option<i32>,
    pub attention_type_id: Option<i32>,
    pub issue_type_id: Option<i32>,
    pub classification_grade_id: Option<i32>,
    pub current_status_id: Option<i32>,
    pub report_year: i32,
    pub report_date: Date,
    pub request_date: Option<Date>,
    pub commitment_date: Option<Date>,
    pub requester: String,
    pub cause: String,
    pub event_description: String,
    pub demands: String,
    pub impact_if_unattended: String,
    pub planned_actions: String,
    pub commitments: String,
    pub stakeholder_group: String,
    pub external_actors: String,
    pub observations: String,
    pub status: String,
    pub progress_percentage: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
