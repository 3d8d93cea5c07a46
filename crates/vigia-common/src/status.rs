use serde::{Deserialize, Serialize};

/// Account role. Administrators reach the admin dashboard and user management.
///
/// # Examples
///
/// ```
/// use vigia_common::status::Role;
///
/// let role: Role = "Capturista".parse().unwrap();
/// assert_eq!(role, Role::Clerk);
/// assert_eq!(role.as_str(), "clerk");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Clerk,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Clerk => "clerk",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrador",
            Role::Clerk => "Capturista",
        }
    }

    /// Landing page a client should open after login.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Administrator => "/admin/dashboard",
            Role::Clerk => "/dashboard",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "administrator" | "administrador" | "admin" => Ok(Role::Administrator),
            "clerk" | "capturista" => Ok(Role::Clerk),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// Report type with the abbreviation used inside folios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    PreventiveAction,
    SocialIssue,
    Conflict,
}

impl ReportKind {
    /// Maps a report-type catalog name to its kind. `Contingencia` is an
    /// older name for the conflict type and is still accepted.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim() {
            "Acción Preventiva" => Some(ReportKind::PreventiveAction),
            "Problemática Social" => Some(ReportKind::SocialIssue),
            "Conflicto" | "Contingencia" => Some(ReportKind::Conflict),
            _ => None,
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            ReportKind::PreventiveAction => "AP",
            ReportKind::SocialIssue => "PS",
            ReportKind::Conflict => "CON",
        }
    }
}

/// Lifecycle of a preventive-action report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Registered,
    InProgress,
    Completed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Registered => "registered",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Completed => "completed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "Borrador",
            ReportStatus::Registered => "Registrado",
            ReportStatus::InProgress => "En Progreso",
            ReportStatus::Completed => "Completado",
        }
    }

    /// Status a report takes after a commitment follow-up at `percentage`.
    /// A zero-percent follow-up leaves the status untouched.
    ///
    /// ```
    /// use vigia_common::status::ReportStatus;
    ///
    /// assert_eq!(ReportStatus::Registered.after_progress(100), ReportStatus::Completed);
    /// assert_eq!(ReportStatus::Registered.after_progress(45), ReportStatus::InProgress);
    /// assert_eq!(ReportStatus::Registered.after_progress(0), ReportStatus::Registered);
    /// ```
    pub fn after_progress(self, percentage: i32) -> Self {
        match percentage {
            100 => ReportStatus::Completed,
            1..=99 => ReportStatus::InProgress,
            _ => self,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" | "borrador" => Ok(ReportStatus::Draft),
            "registered" | "registrado" => Ok(ReportStatus::Registered),
            "in_progress" | "en progreso" => Ok(ReportStatus::InProgress),
            "completed" | "completado" => Ok(ReportStatus::Completed),
            _ => Err(format!("unknown report status: {s}")),
        }
    }
}

/// Lifecycle of a preventive action.
///
/// Moves forward through `draft → registered → in_process → completed`;
/// steps may be skipped. `cancelled` is reachable from any open state.
/// `completed` and `cancelled` are terminal.
///
/// ```
/// use vigia_common::status::ActionStatus;
///
/// assert!(ActionStatus::Registered.can_transition_to(ActionStatus::Completed));
/// assert!(ActionStatus::InProcess.can_transition_to(ActionStatus::InProcess));
/// assert!(!ActionStatus::Completed.can_transition_to(ActionStatus::Registered));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Draft,
    Registered,
    InProcess,
    Completed,
    Cancelled,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Draft => "draft",
            ActionStatus::Registered => "registered",
            ActionStatus::InProcess => "in_process",
            ActionStatus::Completed => "completed",
            ActionStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActionStatus::Draft => "Borrador",
            ActionStatus::Registered => "Registrado",
            ActionStatus::InProcess => "En Proceso",
            ActionStatus::Completed => "Completado",
            ActionStatus::Cancelled => "Cancelado",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Cancelled)
    }

    fn rank(&self) -> u8 {
        match self {
            ActionStatus::Draft => 0,
            ActionStatus::Registered => 1,
            ActionStatus::InProcess => 2,
            ActionStatus::Completed => 3,
            ActionStatus::Cancelled => 4,
        }
    }

    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == ActionStatus::Cancelled || next == *self || next.rank() > self.rank()
    }

    /// Status implied by a progress percentage when none is given explicitly.
    pub fn after_progress(self, percentage: i32) -> Self {
        match percentage {
            100 => ActionStatus::Completed,
            1..=99 => ActionStatus::InProcess,
            _ => self,
        }
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" | "borrador" => Ok(ActionStatus::Draft),
            "registered" | "registrado" => Ok(ActionStatus::Registered),
            "in_process" | "en proceso" => Ok(ActionStatus::InProcess),
            "completed" | "completado" => Ok(ActionStatus::Completed),
            "cancelled" | "cancelado" => Ok(ActionStatus::Cancelled),
            _ => Err(format!("unknown action status: {s}")),
        }
    }
}

/// Static lookup tables held in `catalog_items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    RegionalOffice,
    ReportType,
    FederalEntity,
    Municipality,
    InternalActor,
    AttentionType,
    IssueType,
    ClassificationGrade,
    GeneralStatus,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 9] = [
        CatalogKind::RegionalOffice,
        CatalogKind::ReportType,
        CatalogKind::FederalEntity,
        CatalogKind::Municipality,
        CatalogKind::InternalActor,
        CatalogKind::AttentionType,
        CatalogKind::IssueType,
        CatalogKind::ClassificationGrade,
        CatalogKind::GeneralStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::RegionalOffice => "regional_office",
            CatalogKind::ReportType => "report_type",
            CatalogKind::FederalEntity => "federal_entity",
            CatalogKind::Municipality => "municipality",
            CatalogKind::InternalActor => "internal_actor",
            CatalogKind::AttentionType => "attention_type",
            CatalogKind::IssueType => "issue_type",
            CatalogKind::ClassificationGrade => "classification_grade",
            CatalogKind::GeneralStatus => "general_status",
        }
    }

    /// Kind of the row `parent_id` points at, if this kind is nested.
    pub fn parent_kind(&self) -> Option<CatalogKind> {
        match self {
            CatalogKind::FederalEntity => Some(CatalogKind::RegionalOffice),
            CatalogKind::Municipality => Some(CatalogKind::FederalEntity),
            _ => None,
        }
    }

    /// Human label used in lookup-miss messages.
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::RegionalOffice => "regional office",
            CatalogKind::ReportType => "report type",
            CatalogKind::FederalEntity => "federal entity",
            CatalogKind::Municipality => "municipality",
            CatalogKind::InternalActor => "internal actor",
            CatalogKind::AttentionType => "attention type",
            CatalogKind::IssueType => "issue type",
            CatalogKind::ClassificationGrade => "classification grade",
            CatalogKind::GeneralStatus => "general status",
        }
    }
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CatalogKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown catalog kind: {s}"))
    }
}
