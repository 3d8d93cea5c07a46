use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_initial_schema"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parents before children so foreign keys resolve.
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    paternal_surname TEXT NOT NULL,
    maternal_surname TEXT,
    phone TEXT,
    position TEXT,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'clerk',
    active INTEGER NOT NULL DEFAULT 1,
    token_version INTEGER NOT NULL DEFAULT 0,
    last_login_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_active ON users(active);

CREATE TABLE IF NOT EXISTS catalog_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    abbreviation TEXT,
    parent_id INTEGER REFERENCES catalog_items(id),
    group_key TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_catalog_items_identity
    ON catalog_items(kind, name, IFNULL(parent_id, 0), IFNULL(group_key, ''));
CREATE INDEX IF NOT EXISTS idx_catalog_items_kind ON catalog_items(kind, active);
CREATE INDEX IF NOT EXISTS idx_catalog_items_parent ON catalog_items(parent_id);

CREATE TABLE IF NOT EXISTS folio_sequences (
    prefix TEXT PRIMARY KEY NOT NULL,
    last_value INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS preventive_action_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folio TEXT NOT NULL UNIQUE,
    author_id INTEGER NOT NULL REFERENCES users(id),
    regional_office_id INTEGER NOT NULL REFERENCES catalog_items(id),
    report_type_id INTEGER NOT NULL REFERENCES catalog_items(id),
    federal_entity_id INTEGER REFERENCES catalog_items(id),
    municipality_id INTEGER REFERENCES catalog_items(id),
    internal_actor_id INTEGER REFERENCES catalog_items(id),
    attention_type_id INTEGER REFERENCES catalog_items(id),
    issue_type_id INTEGER REFERENCES catalog_items(id),
    classification_grade_id INTEGER REFERENCES catalog_items(id),
    current_status_id INTEGER REFERENCES catalog_items(id),
    report_year INTEGER NOT NULL,
    report_date TEXT NOT NULL,
    request_date TEXT,
    commitment_date TEXT,
    requester TEXT NOT NULL DEFAULT '',
    cause TEXT NOT NULL DEFAULT '',
    event_description TEXT NOT NULL DEFAULT '',
    demands TEXT NOT NULL DEFAULT '',
    impact_if_unattended TEXT NOT NULL DEFAULT '',
    planned_actions TEXT NOT NULL DEFAULT '',
    commitments TEXT NOT NULL DEFAULT '',
    stakeholder_group TEXT NOT NULL DEFAULT '',
    external_actors TEXT NOT NULL DEFAULT '',
    observations TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    progress_percentage INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_reports_status ON preventive_action_reports(status);
CREATE INDEX IF NOT EXISTS idx_reports_created_at ON preventive_action_reports(created_at DESC);

CREATE TABLE IF NOT EXISTS commitment_follow_ups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id INTEGER NOT NULL REFERENCES preventive_action_reports(id),
    progress_percentage INTEGER NOT NULL,
    previous_status TEXT NOT NULL,
    new_status TEXT NOT NULL,
    evidence TEXT NOT NULL DEFAULT '',
    observations TEXT NOT NULL DEFAULT '',
    author_id INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_commitment_follow_ups_report ON commitment_follow_ups(report_id);

CREATE TABLE IF NOT EXISTS edit_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id INTEGER NOT NULL REFERENCES preventive_action_reports(id),
    field TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    editor_id INTEGER NOT NULL REFERENCES users(id),
    edited_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_edit_history_report ON edit_history(report_id);

CREATE TABLE IF NOT EXISTS preventive_actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    folio TEXT NOT NULL UNIQUE,
    registration_date TEXT NOT NULL,
    region TEXT NOT NULL DEFAULT '',
    asset TEXT NOT NULL DEFAULT '',
    facility TEXT NOT NULL DEFAULT '',
    state TEXT NOT NULL DEFAULT '',
    municipality TEXT NOT NULL DEFAULT '',
    locality TEXT NOT NULL DEFAULT '',
    coordinate_x REAL,
    coordinate_y REAL,
    issue_type TEXT NOT NULL DEFAULT '',
    issue_description TEXT NOT NULL DEFAULT '',
    social_actor TEXT NOT NULL DEFAULT '',
    impact_level TEXT NOT NULL DEFAULT '',
    preventive_action TEXT NOT NULL DEFAULT '',
    start_date TEXT,
    end_date TEXT,
    budget REAL,
    responsible TEXT NOT NULL DEFAULT '',
    responsible_area TEXT NOT NULL DEFAULT '',
    observations TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    progress_percentage INTEGER NOT NULL DEFAULT 0,
    last_update_date TEXT,
    author_id INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_actions_status ON preventive_actions(status);
CREATE INDEX IF NOT EXISTS idx_actions_created_at ON preventive_actions(created_at DESC);

CREATE TABLE IF NOT EXISTS action_follow_ups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action_id INTEGER NOT NULL REFERENCES preventive_actions(id),
    follow_up_date TEXT NOT NULL,
    previous_status TEXT NOT NULL,
    new_status TEXT NOT NULL,
    progress_percentage INTEGER NOT NULL,
    observations TEXT NOT NULL DEFAULT '',
    responsible TEXT NOT NULL DEFAULT '',
    evidence_document TEXT,
    author_id INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_action_follow_ups_action ON action_follow_ups(action_id);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS action_follow_ups;
DROP TABLE IF EXISTS preventive_actions;
DROP TABLE IF EXISTS edit_history;
DROP TABLE IF EXISTS commitment_follow_ups;
DROP TABLE IF EXISTS preventive_action_reports;
DROP TABLE IF EXISTS folio_sequences;
DROP TABLE IF EXISTS catalog_items;
DROP TABLE IF EXISTS users;
";
