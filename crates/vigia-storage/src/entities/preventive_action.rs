use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "preventive_actions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub folio: String,
    pub registration_date: Date,
    pub region: String,
    pub asset: String,
    pub facility: String,
    pub state: String,
    pub municipality: String,
    pub locality: String,
    pub coordinate_x: Option<f64>,
    pub coordinate_y: Option<f64>,
    pub issue_type: String,
    pub issue_description: String,
    pub social_actor: String,
    pub impact_level: String,
    pub preventive_action: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub budget: Option<f64>,
    pub responsible: String,
    pub responsible_area: String,
    pub observations: String,
    pub status: String,
    pub progress_percentage: i32,
    pub last_update_date: Option<Date>,
    pub author_id: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
