use crate::{
    model::department::{DepartmentRemoval, DepartmentSummary},
    utils::db_utils::{SqlValue, build_update_sql, execute_update},
};

use super::{Store, StoreError, bounded};

const SUMMARY_SELECT: &str = r#"
    SELECT d.id, d.name, d.description, d.created, d.updated,
           COUNT(e.id) AS employee_count
    FROM departments d
    LEFT JOIN employees e ON e.department_id = d.id
"#;

impl Store {
    pub async fn list_departments(&self) -> Result<Vec<DepartmentSummary>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(Vec::new());
        };

        let sql = format!("{SUMMARY_SELECT} GROUP BY d.id ORDER BY d.name");
        bounded(
            db.timeout,
            sqlx::query_as::<_, DepartmentSummary>(&sql).fetch_all(&db.pool),
        )
        .await
    }

    pub async fn find_department(&self, id: u64) -> Result<Option<DepartmentSummary>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(None);
        };

        let sql = format!("{SUMMARY_SELECT} WHERE d.id = ? GROUP BY d.id");
        bounded(
            db.timeout,
            sqlx::query_as::<_, DepartmentSummary>(&sql)
                .bind(id)
                .fetch_optional(&db.pool),
        )
        .await
    }

    pub async fn insert_department(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<u64, StoreError> {
        let Some(db) = self.live() else {
            return Ok(0);
        };

        let result = bounded(
            db.timeout,
            sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
                .bind(name)
                .bind(description)
                .execute(&db.pool),
        )
        .await?;

        Ok(result.last_insert_id())
    }

    pub async fn update_department(
        &self,
        id: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool, StoreError> {
        let Some(db) = self.live() else {
            return Ok(false);
        };

        let mut columns = Vec::new();
        if let Some(name) = name {
            columns.push(("name", SqlValue::String(name.to_string())));
        }
        if let Some(description) = description {
            // An empty description clears it
            let value = match description.trim() {
                "" => SqlValue::Null,
                text => SqlValue::String(text.to_string()),
            };
            columns.push(("description", value));
        }

        let Some(update) = build_update_sql("departments", columns, &["updated = NOW()"], "id", id)
        else {
            return Ok(false);
        };

        let affected = bounded(db.timeout, execute_update(&db.pool, update)).await?;
        Ok(affected > 0)
    }

    /// Deletes a department unless employees still belong to it.
    pub async fn delete_department(&self, id: u64) -> Result<DepartmentRemoval, StoreError> {
        let Some(db) = self.live() else {
            return Ok(DepartmentRemoval::NotFound);
        };

        let mut tx = bounded(db.timeout, db.pool.begin()).await?;

        let members = bounded(
            db.timeout,
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM employees WHERE department_id = ? FOR UPDATE",
            )
            .bind(id)
            .fetch_one(&mut *tx),
        )
        .await?;

        if members > 0 {
            return Ok(DepartmentRemoval::HasEmployees(members));
        }

        let result = bounded(
            db.timeout,
            sqlx::query("DELETE FROM departments WHERE id = ?")
                .bind(id)
                .execute(&mut *tx),
        )
        .await;

        let affected = match result {
            Ok(done) => done.rows_affected(),
            // An employee slipped in between the count and the delete
            Err(StoreError::Referenced) => return Ok(DepartmentRemoval::HasEmployees(1)),
            Err(e) => return Err(e),
        };

        bounded(db.timeout, tx.commit()).await?;

        Ok(if affected == 0 {
            DepartmentRemoval::NotFound
        } else {
            DepartmentRemoval::Deleted
        })
    }
}
