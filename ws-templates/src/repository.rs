//! SQLite persistence for templates and their versions.
//!
//! Every multi-row write runs in a single transaction. The single-latest
//! invariant is also enforced by a partial unique index, so an interleaving
//! the transaction does not serialize fails instead of committing two
//! latest rows.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

use crate::error::{Result, TemplateError};
use crate::models::{Labels, PaginationRequest, WorkflowTemplateRef, WorkspaceTemplate};

const SELECT_TEMPLATE_VERSIONS: &str = r#"
    SELECT wt.id, wt.uid, wt.name, wt.namespace, wt.description, wt.is_archived,
           wt.workflow_template_id, wt.workflow_template_uid,
           wtv.id AS version_id, wtv.version, wtv.is_latest, wtv.manifest, wtv.labels,
           wtv.created_at
    FROM workspace_templates wt
    JOIN workspace_template_versions wtv ON wtv.workspace_template_id = wt.id
"#;

/// Everything needed to persist a freshly registered template.
#[derive(Debug, Clone)]
pub struct NewTemplate<'a> {
    pub uid: &'a str,
    pub name: &'a str,
    pub namespace: &'a str,
    pub description: &'a str,
    pub manifest: &'a str,
    pub labels: &'a Labels,
    pub workflow_template: &'a WorkflowTemplateRef,
}

/// Repository value over one connection pool. Constructed once and shared
/// by reference; it holds no other state.
#[derive(Clone)]
pub struct TemplateRepository {
    pool: SqlitePool,
}

impl TemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Latest version of a template matching either the name or the uid,
    /// archived or not. Active templates are returned first.
    #[instrument(skip(self))]
    pub async fn find_by_name(
        &self,
        namespace: &str,
        name: &str,
        uid: &str,
    ) -> Result<Option<WorkspaceTemplate>> {
        let query = format!(
            "{} WHERE wt.namespace = ? AND (wt.name = ? OR wt.uid = ?) AND wtv.is_latest = 1
             ORDER BY wt.is_archived ASC LIMIT 1",
            SELECT_TEMPLATE_VERSIONS
        );

        let row = sqlx::query_as::<_, TemplateVersionRow>(&query)
            .bind(namespace)
            .bind(name)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(WorkspaceTemplate::try_from).transpose()
    }

    /// Inserts the template row and its first version in one transaction.
    #[instrument(skip(self, new), fields(namespace = new.namespace, uid = new.uid))]
    pub async fn insert(&self, new: NewTemplate<'_>) -> Result<WorkspaceTemplate> {
        let now = Utc::now().timestamp();
        let labels = serde_json::to_string(new.labels)?;

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO workspace_templates
                (uid, name, namespace, description, labels, workflow_template_id, workflow_template_uid, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(new.uid)
        .bind(new.name)
        .bind(new.namespace)
        .bind(new.description)
        .bind(&labels)
        .bind(&new.workflow_template.id)
        .bind(&new.workflow_template.uid)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let version = insert_latest_version(&mut *tx, id, new.manifest, &labels, now).await?;

        tx.commit().await?;
        info!(version, "workspace template created");

        self.require(new.namespace, new.uid, version).await
    }

    /// Outdates every prior version, inserts the next one as latest and
    /// refreshes the template's mutable metadata, atomically.
    #[instrument(skip(self, template, manifest, labels), fields(namespace = %template.namespace, uid = %template.uid))]
    pub async fn append_version(
        &self,
        template: &WorkspaceTemplate,
        manifest: &str,
        description: &str,
        labels: &Labels,
    ) -> Result<WorkspaceTemplate> {
        let now = Utc::now().timestamp();
        let labels = serde_json::to_string(labels)?;

        let mut tx = self.pool.begin().await?;

        let version = insert_latest_version(&mut *tx, template.id, manifest, &labels, now).await?;

        sqlx::query(
            "UPDATE workspace_templates SET labels = ?, description = ?, modified_at = ? WHERE id = ?",
        )
        .bind(&labels)
        .bind(description)
        .bind(now)
        .bind(template.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version, "workspace template version appended");

        self.require(&template.namespace, &template.uid, version).await
    }

    /// A non-archived template at `version`, or at its latest version when
    /// `version` is 0.
    #[instrument(skip(self))]
    pub async fn get(
        &self,
        namespace: &str,
        uid: &str,
        version: i64,
    ) -> Result<Option<WorkspaceTemplate>> {
        let mut query = format!(
            "{} WHERE wt.namespace = ? AND wt.uid = ? AND wt.is_archived = 0",
            SELECT_TEMPLATE_VERSIONS
        );
        if version == 0 {
            query.push_str(" AND wtv.is_latest = 1");
        } else {
            query.push_str(" AND wtv.version = ?");
        }
        query.push_str(" LIMIT 1");

        let mut q = sqlx::query_as::<_, TemplateVersionRow>(&query)
            .bind(namespace)
            .bind(uid);
        if version != 0 {
            q = q.bind(version);
        }

        let row = q.fetch_optional(&self.pool).await?;
        row.map(WorkspaceTemplate::try_from).transpose()
    }

    /// Latest version regardless of archival.
    #[instrument(skip(self))]
    pub async fn get_including_archived(
        &self,
        namespace: &str,
        uid: &str,
    ) -> Result<Option<WorkspaceTemplate>> {
        let query = format!(
            "{} WHERE wt.namespace = ? AND wt.uid = ? AND wtv.is_latest = 1 LIMIT 1",
            SELECT_TEMPLATE_VERSIONS
        );

        let row = sqlx::query_as::<_, TemplateVersionRow>(&query)
            .bind(namespace)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(WorkspaceTemplate::try_from).transpose()
    }

    /// One entry per version, newest first.
    #[instrument(skip(self))]
    pub async fn list_versions(&self, namespace: &str, uid: &str) -> Result<Vec<WorkspaceTemplate>> {
        let query = format!(
            "{} WHERE wt.namespace = ? AND wt.uid = ? AND wt.is_archived = 0
             ORDER BY wtv.version DESC",
            SELECT_TEMPLATE_VERSIONS
        );

        let rows = sqlx::query_as::<_, TemplateVersionRow>(&query)
            .bind(namespace)
            .bind(uid)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(WorkspaceTemplate::try_from).collect()
    }

    /// Non-archived templates at their latest version, most recently created
    /// first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        namespace: &str,
        page: PaginationRequest,
    ) -> Result<Vec<WorkspaceTemplate>> {
        let query = format!(
            "{} WHERE wt.namespace = ? AND wt.is_archived = 0 AND wtv.is_latest = 1
             ORDER BY wt.created_at DESC, wt.id DESC
             LIMIT ? OFFSET ?",
            SELECT_TEMPLATE_VERSIONS
        );

        let rows = sqlx::query_as::<_, TemplateVersionRow>(&query)
            .bind(namespace)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(WorkspaceTemplate::try_from).collect()
    }

    #[instrument(skip(self))]
    pub async fn count(&self, namespace: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM workspace_templates WHERE namespace = ? AND is_archived = 0",
        )
        .bind(namespace)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks an active template archived. Returns `false` when there was no
    /// active row to update.
    #[instrument(skip(self))]
    pub async fn archive(&self, namespace: &str, uid: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE workspace_templates SET is_archived = 1, modified_at = ?
             WHERE namespace = ? AND uid = ? AND is_archived = 0",
        )
        .bind(Utc::now().timestamp())
        .bind(namespace)
        .bind(uid)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn require(&self, namespace: &str, uid: &str, version: i64) -> Result<WorkspaceTemplate> {
        self.get(namespace, uid, version)
            .await?
            .ok_or_else(|| TemplateError::not_found("Workspace template not found."))
    }
}

/// Appends the next version of a template as the only latest one.
///
/// The outdate runs first so the transaction holds the write lock before
/// the next version number is read.
async fn insert_latest_version(
    conn: &mut SqliteConnection,
    template_id: i64,
    manifest: &str,
    labels: &str,
    now: i64,
) -> Result<i64> {
    sqlx::query(
        "UPDATE workspace_template_versions SET is_latest = 0
         WHERE workspace_template_id = ? AND is_latest = 1",
    )
    .bind(template_id)
    .execute(&mut *conn)
    .await?;

    let version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version), 0) + 1 FROM workspace_template_versions
         WHERE workspace_template_id = ?",
    )
    .bind(template_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO workspace_template_versions
            (workspace_template_id, version, is_latest, manifest, labels, created_at)
        VALUES (?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(template_id)
    .bind(version)
    .bind(manifest)
    .bind(labels)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(template_id, version, "inserted latest template version");
    Ok(version)
}

// Internal row type for sqlx
#[derive(sqlx::FromRow)]
struct TemplateVersionRow {
    id: i64,
    uid: String,
    name: String,
    namespace: String,
    description: String,
    is_archived: bool,
    workflow_template_id: String,
    workflow_template_uid: String,
    version_id: i64,
    version: i64,
    is_latest: bool,
    manifest: String,
    labels: String,
    created_at: i64,
}

impl TryFrom<TemplateVersionRow> for WorkspaceTemplate {
    type Error = TemplateError;

    fn try_from(row: TemplateVersionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            uid: row.uid,
            name: row.name,
            namespace: row.namespace,
            description: row.description,
            labels: serde_json::from_str(&row.labels)?,
            manifest: row.manifest,
            version: row.version,
            version_id: row.version_id,
            is_latest: row.is_latest,
            is_archived: row.is_archived,
            workflow_template: WorkflowTemplateRef {
                id: row.workflow_template_id,
                uid: row.workflow_template_uid,
            },
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
        })
    }
}
