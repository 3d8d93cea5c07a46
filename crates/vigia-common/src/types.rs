use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{ActionStatus, CatalogKind, ReportStatus, Role};

// ---- Users ----

/// Account record.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub paternal_surname: String,
    pub maternal_surname: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub role: Role,
    /// Deactivated accounts keep their row but cannot log in
    pub active: bool,
    /// bcrypt hash
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Bumped on logout and password change to revoke issued tokens
    #[serde(skip_serializing)]
    pub token_version: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First name plus surnames, separated by single spaces.
    pub fn display_name(&self) -> String {
        let mut name = format!("{} {}", self.first_name, self.paternal_surname);
        if let Some(maternal) = self.maternal_surname.as_deref().filter(|m| !m.is_empty()) {
            name.push(' ');
            name.push_str(maternal);
        }
        name
    }
}

/// Login form. Accepted both url-encoded and as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT access token
    pub access_token: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub role: Role,
    pub display_name: String,
    /// Landing page for the role
    pub redirect: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub paternal_surname: String,
    #[serde(default)]
    pub maternal_surname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    /// Defaults to `clerk`
    #[serde(default)]
    pub role: Option<Role>,
}

/// Partial update; absent fields are left unchanged. Accounts are
/// deactivated through `DELETE`, not here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub paternal_surname: Option<String>,
    #[serde(default)]
    pub maternal_surname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Minimal user entry for selection lists.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActiveUserSummary {
    pub id: i32,
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

// ---- Catalogs ----

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CatalogItem {
    pub id: i32,
    pub kind: CatalogKind,
    pub name: String,
    pub abbreviation: Option<String>,
    /// Federal entity → regional office, municipality → federal entity
    pub parent_id: Option<i32>,
    /// General-status group: `report`, `compliance` or `probability`
    pub group_key: Option<String>,
    pub sort_order: i32,
    pub active: bool,
}

/// Catalog entry to be synced or imported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSeedItem {
    pub kind: CatalogKind,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
    /// Parent looked up by name within the parent kind
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub group_key: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

// ---- Reports ----

/// Body of `POST /api/registro_reporte`.
///
/// Catalog references are given by name. Required fields are checked in
/// declaration order so the first missing one is reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterReportRequest {
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub regional_office: Option<String>,
    #[serde(default)]
    pub federal_entity: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub request_date: Option<String>,
    #[serde(default)]
    pub internal_actor: Option<String>,
    #[serde(default)]
    pub attention_type: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub classification_grade: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub commitment_date: Option<String>,
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
    #[serde(default)]
    pub demands: Option<String>,
    #[serde(default)]
    pub impact_if_unattended: Option<String>,
    #[serde(default)]
    pub planned_actions: Option<String>,
    #[serde(default)]
    pub commitments: Option<String>,
    #[serde(default)]
    pub stakeholder_group: Option<String>,
    #[serde(default)]
    pub external_actors: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    /// Only report type and office are required for drafts
    #[serde(default)]
    pub save_as_draft: bool,
}

/// Narrative fields editable after registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateReportRequest {
    #[serde(default)]
    pub requester: Option<String>,
    #[serde(default)]
    pub cause: Option<String>,
    #[serde(default)]
    pub event_description: Option<String>,
    #[serde(default)]
    pub demands: Option<String>,
    #[serde(default)]
    pub impact_if_unattended: Option<String>,
    #[serde(default)]
    pub planned_actions: Option<String>,
    #[serde(default)]
    pub commitments: Option<String>,
    #[serde(default)]
    pub stakeholder_group: Option<String>,
    #[serde(default)]
    pub external_actors: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub commitment_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Report {
    pub id: i32,
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
    pub report_date: NaiveDate,
    pub request_date: Option<NaiveDate>,
    pub commitment_date: Option<NaiveDate>,
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
    pub status: ReportStatus,
    pub progress_percentage: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CommitmentFollowUp {
    pub id: i32,
    pub report_id: i32,
    pub progress_percentage: i32,
    pub previous_status: ReportStatus,
    pub new_status: ReportStatus,
    pub evidence: String,
    pub observations: String,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
}

/// Report together with its follow-up history, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: Report,
    pub follow_ups: Vec<CommitmentFollowUp>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EditHistoryEntry {
    pub id: i32,
    pub report_id: i32,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub editor_id: i32,
    pub edited_at: DateTime<Utc>,
}

/// Body of `POST /api/seguimiento_compromiso`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CommitmentFollowUpRequest {
    pub report_id: i32,
    /// 0 to 100
    pub progress_percentage: i32,
    #[serde(default)]
    pub evidence: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

// ---- Preventive actions ----

/// Url-encoded body of `POST /api/acciones` and `/api/acciones/borrador`.
///
/// Every field arrives as text; numeric fields are parsed on write so a bad
/// value can be reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ActionForm {
    #[serde(default)]
    pub folio: Option<String>,
    #[serde(default)]
    pub registration_date: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub coordinate_x: Option<String>,
    #[serde(default)]
    pub coordinate_y: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub issue_description: Option<String>,
    #[serde(default)]
    pub social_actor: Option<String>,
    #[serde(default)]
    pub impact_level: Option<String>,
    #[serde(default)]
    pub preventive_action: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub responsible_area: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PreventiveAction {
    pub id: i32,
    pub folio: String,
    pub registration_date: NaiveDate,
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
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub responsible: String,
    pub responsible_area: String,
    pub observations: String,
    pub status: ActionStatus,
    pub progress_percentage: i32,
    pub last_update_date: Option<NaiveDate>,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActionFollowUp {
    pub id: i32,
    pub action_id: i32,
    pub follow_up_date: NaiveDate,
    pub previous_status: ActionStatus,
    pub new_status: ActionStatus,
    pub progress_percentage: i32,
    pub observations: String,
    pub responsible: String,
    pub evidence_document: Option<String>,
    pub author_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActionDetail {
    #[serde(flatten)]
    pub action: PreventiveAction,
    pub follow_ups: Vec<ActionFollowUp>,
}

/// Url-encoded body of `POST /api/seguimiento_accion`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ActionFollowUpForm {
    pub action_id: i32,
    /// `YYYY-MM-DD`
    pub follow_up_date: String,
    /// Derived from the percentage when absent or blank
    #[serde(default)]
    pub new_status: Option<String>,
    /// 0 to 100
    pub progress_percentage: i32,
    #[serde(default)]
    pub observations: Option<String>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub evidence_document: Option<String>,
}

/// Identity of a newly written report or action.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FolioResponse {
    pub id: i32,
    pub folio: String,
}

// ---- Dashboards ----

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReportStats {
    pub total: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub this_month: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ActionStats {
    pub total: u64,
    pub completed: u64,
    pub in_process: u64,
    pub registered: u64,
    pub this_month: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardSummary {
    pub reports: ReportStats,
    pub actions: ActionStats,
    pub recent_reports: Vec<Report>,
    pub recent_actions: Vec<PreventiveAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AdminDashboard {
    pub total: u64,
    pub completed: u64,
    pub in_process: u64,
    /// Registered but not started
    pub pending: u64,
    /// Past end date and still open
    pub overdue: u64,
    pub recent_actions: Vec<PreventiveAction>,
    /// Trailing six months, oldest first
    pub monthly: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AdminStats {
    pub active_users: u64,
    pub reports_this_month: u64,
    pub pending_commitments: u64,
}
