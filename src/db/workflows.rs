use crate::model::workflow::{Workflow, WorkflowStatus};

use super::{Store, StoreError, bounded};

const WORKFLOW_SELECT: &str = r#"
    SELECT id, `type`, status, employee_id, department_id, details, created, updated
    FROM workflows
"#;

impl Store {
    pub async fn list_workflows(&self, employee_id: Option<u64>) -> Result<Vec<Workflow>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(Vec::new());
        };

        let rows = match employee_id {
            Some(employee_id) => {
                let sql = format!("{WORKFLOW_SELECT} WHERE employee_id = ? ORDER BY id DESC");
                bounded(
                    db.timeout,
                    sqlx::query_as::<_, Workflow>(&sql)
                        .bind(employee_id)
                        .fetch_all(&db.pool),
                )
                .await?
            }
            None => {
                let sql = format!("{WORKFLOW_SELECT} ORDER BY id DESC");
                bounded(
                    db.timeout,
                    sqlx::query_as::<_, Workflow>(&sql).fetch_all(&db.pool),
                )
                .await?
            }
        };

        Ok(rows)
    }

    pub async fn find_workflow(&self, id: u64) -> Result<Option<Workflow>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(None);
        };

        let sql = format!("{WORKFLOW_SELECT} WHERE id = ?");
        bounded(
            db.timeout,
            sqlx::query_as::<_, Workflow>(&sql)
                .bind(id)
                .fetch_optional(&db.pool),
        )
        .await
    }

    /// Moves a pending workflow to `status`. Audit fields are never touched.
    pub async fn decide_workflow(&self, id: u64, status: WorkflowStatus) -> Result<bool, StoreError> {
        let Some(db) = self.live() else {
            return Ok(false);
        };

        let result = bounded(
            db.timeout,
            sqlx::query(
                r#"
                UPDATE workflows
                SET status = ?, updated = NOW()
                WHERE id = ?
                AND status = 'Pending'
                "#,
            )
            .bind(status.as_ref())
            .bind(id)
            .execute(&db.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
