use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use wesmirror_types::{
    Scheme, Service, SupportedWesVersion, Token, TypeKey, Workflow, WorkflowDraft, WorkflowEngine,
    WorkflowType, new_token,
};

use crate::mutation::{Mutation, PlanSummary};
use crate::storage::{MirrorStorage, NewService, Visibility};
use crate::{Result, StoreError};

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

const SERVICE_COLUMNS: &str = "token, name, server_scheme, server_host, server_token, \
     auth_instructions_url, contact_info_url, deleted, created_at, updated_at";

const TYPE_COLUMNS: &str = "token, type, version, deleted, created_at, updated_at";

const WORKFLOW_SELECT: &str = "SELECT w.token, w.service_token, w.name, w.version, w.location, \
     w.content, w.parameters_template_location, w.parameters_template, w.deleted, \
     w.created_at, w.updated_at, \
     t.token, t.type, t.version, t.deleted, t.created_at, t.updated_at \
     FROM workflow w JOIN workflow_type t ON t.token = w.workflow_type_token";

/// SQLite repository for mirrored WES metadata.
///
/// Thread-safe via an internal non-poisoning `Mutex<Connection>`.
pub struct SqliteMirrorStore {
    conn: Mutex<Connection>,
}

impl SqliteMirrorStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        tracing::debug!(path = %path.display(), "Opened mirror store");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&mut self) -> Result<()> {
        let conn = self.conn.get_mut();
        embedded::migrations::runner()
            .run(conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

impl MirrorStorage for SqliteMirrorStore {
    // ── Services ────────────────────────────────────────────────────

    fn create_service(&self, service: &NewService, seed: &[Mutation]) -> Result<Service> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if find_service_by_name(&tx, &service.name)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "service name '{}' is already registered",
                service.name
            )));
        }

        let token = new_token();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        tx.execute(
            "INSERT INTO service (token, name, server_scheme, server_host, server_token,
                 auth_instructions_url, contact_info_url, deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
            params![
                token,
                service.name,
                service.server_scheme.as_str(),
                service.server_host,
                service.server_token,
                service.auth_instructions_url,
                service.contact_info_url,
                now_str
            ],
        )
        .map_err(|e| map_conflict(e, &service.name))?;

        for mutation in seed {
            apply_one(&tx, &token, mutation, &now_str)?;
        }
        tx.commit()?;

        Ok(Service {
            token,
            name: service.name.clone(),
            server_scheme: service.server_scheme,
            server_host: service.server_host.clone(),
            server_token: service.server_token.clone(),
            auth_instructions_url: service.auth_instructions_url.clone(),
            contact_info_url: service.contact_info_url.clone(),
            deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_service(&self, token: &str) -> Result<Service> {
        self.conn()
            .query_row(
                &format!("SELECT {SERVICE_COLUMNS} FROM service WHERE token = ?1"),
                params![token],
                row_to_service,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("service", token))
    }

    fn find_service_by_name(&self, name: &str) -> Result<Option<Service>> {
        find_service_by_name(&self.conn(), name)
    }

    fn list_services(&self, visibility: Visibility) -> Result<Vec<Service>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM service WHERE (?1 OR deleted = 0) ORDER BY name"
        ))?;
        let iter = stmt.query_map(params![visibility.includes_deleted()], row_to_service)?;
        let mut rows = Vec::new();
        for r in iter {
            rows.push(r?);
        }
        Ok(rows)
    }

    fn soft_delete_service(&self, token: &str) -> Result<()> {
        let now_str = Utc::now().to_rfc3339();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE service SET deleted = 1, updated_at = ?1 WHERE token = ?2",
            params![now_str, token],
        )?;
        if updated == 0 {
            return Err(StoreError::not_found("service", token));
        }

        for table in ["workflow_engine", "supported_wes_version", "workflow"] {
            tx.execute(
                &format!("UPDATE {table} SET deleted = 1, updated_at = ?1 WHERE service_token = ?2"),
                params![now_str, token],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn purge_service(&self, token: &str) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM service WHERE token = ?1", params![token])?;
        if deleted == 0 {
            return Err(StoreError::not_found("service", token));
        }
        Ok(())
    }

    // ── Children ────────────────────────────────────────────────────

    fn list_engines(&self, service_token: &str) -> Result<Vec<WorkflowEngine>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT token, service_token, name, version, deleted, created_at, updated_at
             FROM workflow_engine WHERE service_token = ?1 ORDER BY rowid",
        )?;
        let iter = stmt.query_map(params![service_token], |row| {
            Ok(WorkflowEngine {
                token: row.get(0)?,
                service_token: row.get(1)?,
                name: row.get(2)?,
                version: row.get(3)?,
                workflow_types: Vec::new(),
                deleted: row.get::<_, i32>(4)? != 0,
                created_at: parse_dt(&row.get::<_, String>(5)?),
                updated_at: parse_dt(&row.get::<_, String>(6)?),
            })
        })?;

        let mut engines = Vec::new();
        for e in iter {
            let mut engine = e?;
            engine.workflow_types = engine_types(&conn, &engine.token)?;
            engines.push(engine);
        }
        Ok(engines)
    }

    fn list_supported_versions(&self, service_token: &str) -> Result<Vec<SupportedWesVersion>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT token, service_token, wes_version, deleted, created_at, updated_at
             FROM supported_wes_version WHERE service_token = ?1 ORDER BY rowid",
        )?;
        let iter = stmt.query_map(params![service_token], |row| {
            Ok(SupportedWesVersion {
                token: row.get(0)?,
                service_token: row.get(1)?,
                wes_version: row.get(2)?,
                deleted: row.get::<_, i32>(3)? != 0,
                created_at: parse_dt(&row.get::<_, String>(4)?),
                updated_at: parse_dt(&row.get::<_, String>(5)?),
            })
        })?;

        let mut rows = Vec::new();
        for r in iter {
            rows.push(r?);
        }
        Ok(rows)
    }

    fn list_workflows(
        &self,
        service_token: Option<&str>,
        visibility: Visibility,
    ) -> Result<Vec<Workflow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{WORKFLOW_SELECT}
             WHERE (?1 IS NULL OR w.service_token = ?1) AND (?2 OR w.deleted = 0)
             ORDER BY w.rowid"
        ))?;
        let iter = stmt.query_map(
            params![service_token, visibility.includes_deleted()],
            row_to_workflow,
        )?;

        let mut rows = Vec::new();
        for r in iter {
            rows.push(r?);
        }
        Ok(rows)
    }

    fn get_workflow(&self, token: &str) -> Result<Workflow> {
        self.conn()
            .query_row(
                &format!("{WORKFLOW_SELECT} WHERE w.token = ?1"),
                params![token],
                row_to_workflow,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("workflow", token))
    }

    // ── Workflow types ──────────────────────────────────────────────

    fn upsert_workflow_type(&self, key: &TypeKey) -> Result<WorkflowType> {
        let now_str = Utc::now().to_rfc3339();
        Ok(upsert_type(&self.conn(), key, &now_str)?)
    }

    fn list_workflow_types(&self) -> Result<Vec<WorkflowType>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TYPE_COLUMNS} FROM workflow_type ORDER BY type, version"
        ))?;
        let iter = stmt.query_map([], |row| row_to_type(row, 0))?;
        let mut rows = Vec::new();
        for r in iter {
            rows.push(r?);
        }
        Ok(rows)
    }

    // ── Reconciliation ──────────────────────────────────────────────

    fn apply(&self, service_token: &Token, mutations: &[Mutation]) -> Result<PlanSummary> {
        let now_str = Utc::now().to_rfc3339();
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM service WHERE token = ?1",
                params![service_token],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::not_found("service", service_token.as_str()));
        }

        for mutation in mutations {
            apply_one(&tx, service_token, mutation, &now_str)?;
        }
        tx.commit()?;

        let summary = PlanSummary::of(mutations);
        tracing::debug!(service = %service_token, %summary, "Applied mirror plan");
        Ok(summary)
    }
}

// ── Mutation application ────────────────────────────────────────────

fn apply_one(conn: &Connection, service_token: &str, mutation: &Mutation, now: &str) -> Result<()> {
    match mutation {
        Mutation::UpdateServiceInfo {
            auth_instructions_url,
            contact_info_url,
        } => {
            conn.execute(
                "UPDATE service SET auth_instructions_url = ?1, contact_info_url = ?2, updated_at = ?3
                 WHERE token = ?4",
                params![auth_instructions_url, contact_info_url, now, service_token],
            )?;
        }
        Mutation::DeleteEngine { token } => {
            let n = conn.execute(
                "DELETE FROM workflow_engine WHERE token = ?1 AND service_token = ?2",
                params![token, service_token],
            )?;
            expect_row(n, "workflow engine", token)?;
        }
        Mutation::UpdateEngine {
            token,
            version,
            workflow_types,
        } => {
            let n = conn.execute(
                "UPDATE workflow_engine SET version = ?1, updated_at = ?2
                 WHERE token = ?3 AND service_token = ?4",
                params![version, now, token, service_token],
            )?;
            expect_row(n, "workflow engine", token)?;
            link_types(conn, token, workflow_types, now)?;
        }
        Mutation::RelinkEngineTypes {
            token,
            workflow_types,
        } => {
            let n = conn.execute(
                "UPDATE workflow_engine SET updated_at = ?1 WHERE token = ?2 AND service_token = ?3",
                params![now, token, service_token],
            )?;
            expect_row(n, "workflow engine", token)?;
            link_types(conn, token, workflow_types, now)?;
        }
        Mutation::CreateEngine {
            name,
            version,
            workflow_types,
        } => {
            let token = new_token();
            conn.execute(
                "INSERT INTO workflow_engine (token, service_token, name, version, deleted, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
                params![token, service_token, name, version, now],
            )?;
            link_types(conn, &token, workflow_types, now)?;
        }
        Mutation::DeleteWesVersion { token } => {
            let n = conn.execute(
                "DELETE FROM supported_wes_version WHERE token = ?1 AND service_token = ?2",
                params![token, service_token],
            )?;
            expect_row(n, "supported wes version", token)?;
        }
        Mutation::CreateWesVersion { wes_version } => {
            conn.execute(
                "INSERT INTO supported_wes_version (token, service_token, wes_version, deleted, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![new_token(), service_token, wes_version, now],
            )?;
        }
        Mutation::CreateWorkflow { draft } => {
            let wf_type = upsert_type(conn, &draft.workflow_type, now)?;
            insert_workflow(conn, service_token, draft, &wf_type.token, now)?;
        }
        Mutation::UpdateWorkflow {
            token,
            draft,
            revive,
        } => {
            let wf_type = upsert_type(conn, &draft.workflow_type, now)?;
            let n = conn.execute(
                "UPDATE workflow SET name = ?1, version = ?2, workflow_type_token = ?3,
                     location = ?4, content = ?5, parameters_template_location = ?6,
                     parameters_template = ?7,
                     deleted = CASE WHEN ?8 THEN 0 ELSE deleted END,
                     updated_at = ?9
                 WHERE token = ?10 AND service_token = ?11",
                params![
                    draft.name,
                    draft.version,
                    wf_type.token,
                    draft.location,
                    draft.content,
                    draft.parameters_template_location,
                    draft.parameters_template,
                    revive,
                    now,
                    token,
                    service_token
                ],
            )?;
            expect_row(n, "workflow", token)?;
        }
        Mutation::SoftDeleteWorkflow { token } => {
            let n = conn.execute(
                "UPDATE workflow SET deleted = 1, updated_at = ?1 WHERE token = ?2 AND service_token = ?3",
                params![now, token, service_token],
            )?;
            expect_row(n, "workflow", token)?;
        }
    }
    Ok(())
}

fn insert_workflow(
    conn: &Connection,
    service_token: &str,
    draft: &WorkflowDraft,
    type_token: &str,
    now: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO workflow (token, service_token, name, version, workflow_type_token, location,
             content, parameters_template_location, parameters_template, deleted, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?10)",
        params![
            new_token(),
            service_token,
            draft.name,
            draft.version,
            type_token,
            draft.location,
            draft.content,
            draft.parameters_template_location,
            draft.parameters_template,
            now
        ],
    )?;
    Ok(())
}

/// Get or create the type row for `key`. Concurrent first inserts resolve to
/// the same row through the `(type, version)` unique constraint.
fn upsert_type(conn: &Connection, key: &TypeKey, now: &str) -> rusqlite::Result<WorkflowType> {
    conn.execute(
        "INSERT INTO workflow_type (token, type, version, deleted, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?4)
         ON CONFLICT(type, version) DO NOTHING",
        params![new_token(), key.language_type, key.language_version, now],
    )?;
    conn.query_row(
        &format!("SELECT {TYPE_COLUMNS} FROM workflow_type WHERE type = ?1 AND version = ?2"),
        params![key.language_type, key.language_version],
        |row| row_to_type(row, 0),
    )
}

/// Replace the type links of an engine with `keys`, keeping their order.
fn link_types(conn: &Connection, engine_token: &str, keys: &[TypeKey], now: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM workflow_engine_workflow_types WHERE engine_token = ?1",
        params![engine_token],
    )?;
    for (position, key) in keys.iter().enumerate() {
        let wf_type = upsert_type(conn, key, now)?;
        conn.execute(
            "INSERT OR IGNORE INTO workflow_engine_workflow_types (engine_token, workflow_type_token, position)
             VALUES (?1, ?2, ?3)",
            params![engine_token, wf_type.token, position as i64],
        )?;
    }
    Ok(())
}

fn engine_types(conn: &Connection, engine_token: &str) -> Result<Vec<WorkflowType>> {
    let mut stmt = conn.prepare(
        "SELECT t.token, t.type, t.version, t.deleted, t.created_at, t.updated_at
         FROM workflow_engine_workflow_types j
         JOIN workflow_type t ON t.token = j.workflow_type_token
         WHERE j.engine_token = ?1 ORDER BY j.position",
    )?;
    let iter = stmt.query_map(params![engine_token], |row| row_to_type(row, 0))?;
    let mut types = Vec::new();
    for t in iter {
        types.push(t?);
    }
    Ok(types)
}

fn find_service_by_name(conn: &Connection, name: &str) -> Result<Option<Service>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SERVICE_COLUMNS} FROM service WHERE name = ?1"),
            params![name],
            row_to_service,
        )
        .optional()?)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn expect_row(changed: usize, entity: &'static str, token: &str) -> Result<()> {
    if changed == 0 {
        return Err(StoreError::not_found(entity, token));
    }
    Ok(())
}

fn map_conflict(err: rusqlite::Error, name: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(format!("service name '{name}' is already registered"))
        }
        _ => StoreError::Database(err),
    }
}

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_service(row: &rusqlite::Row<'_>) -> rusqlite::Result<Service> {
    let scheme: String = row.get(2)?;
    let server_scheme = scheme.parse::<Scheme>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Service {
        token: row.get(0)?,
        name: row.get(1)?,
        server_scheme,
        server_host: row.get(3)?,
        server_token: row.get(4)?,
        auth_instructions_url: row.get(5)?,
        contact_info_url: row.get(6)?,
        deleted: row.get::<_, i32>(7)? != 0,
        created_at: parse_dt(&row.get::<_, String>(8)?),
        updated_at: parse_dt(&row.get::<_, String>(9)?),
    })
}

/// Read a workflow type from six columns starting at `offset`.
fn row_to_type(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<WorkflowType> {
    Ok(WorkflowType {
        token: row.get(offset)?,
        language_type: row.get(offset + 1)?,
        version: row.get(offset + 2)?,
        deleted: row.get::<_, i32>(offset + 3)? != 0,
        created_at: parse_dt(&row.get::<_, String>(offset + 4)?),
        updated_at: parse_dt(&row.get::<_, String>(offset + 5)?),
    })
}

fn row_to_workflow(row: &rusqlite::Row<'_>) -> rusqlite::Result<Workflow> {
    Ok(Workflow {
        token: row.get(0)?,
        service_token: row.get(1)?,
        name: row.get(2)?,
        version: row.get(3)?,
        location: row.get(4)?,
        content: row.get(5)?,
        parameters_template_location: row.get(6)?,
        parameters_template: row.get(7)?,
        deleted: row.get::<_, i32>(8)? != 0,
        created_at: parse_dt(&row.get::<_, String>(9)?),
        updated_at: parse_dt(&row.get::<_, String>(10)?),
        workflow_type: row_to_type(row, 11)?,
    })
}
