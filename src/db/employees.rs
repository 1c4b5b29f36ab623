use crate::{
    model::employee::{EmployeeChanges, EmployeeDetail, EmployeeRow, EmployeeStatus},
    utils::db_utils::{build_update_sql, execute_update},
};

use super::{Store, StoreError, bounded};

pub(super) const EMPLOYEE_COLUMNS: &str = r#"
    e.id, e.employee_code, e.account_id, e.department_id, e.position,
    e.hire_date, e.status, e.version, e.created, e.updated
"#;

pub(super) const DETAIL_SELECT: &str = r#"
    SELECT e.id, e.employee_code, e.account_id, e.department_id, e.position,
           e.hire_date, e.status, e.version, e.created, e.updated,
           a.email AS account_email,
           a.title AS account_title,
           a.first_name AS account_first_name,
           a.last_name AS account_last_name,
           a.role AS account_role,
           a.is_active AS account_is_active,
           d.name AS department_name,
           d.description AS department_description,
           d.created AS department_created,
           d.updated AS department_updated
    FROM employees e
    JOIN accounts a ON a.id = e.account_id
    JOIN departments d ON d.id = e.department_id
"#;

#[derive(Debug, Default)]
pub struct EmployeeFilter {
    pub department_id: Option<u64>,
    pub status: Option<EmployeeStatus>,
}

impl Store {
    pub async fn list_employees(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<Vec<EmployeeDetail>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(Vec::new());
        };

        let mut sql = format!("{DETAIL_SELECT} WHERE 1=1");
        if filter.department_id.is_some() {
            sql.push_str(" AND e.department_id = ?");
        }
        if filter.status.is_some() {
            sql.push_str(" AND e.status = ?");
        }
        sql.push_str(" ORDER BY e.id DESC");

        let mut query = sqlx::query_as::<_, EmployeeRow>(&sql);
        if let Some(department_id) = filter.department_id {
            query = query.bind(department_id);
        }
        if let Some(status) = filter.status {
            query = query.bind(status.to_string());
        }

        let rows = bounded(db.timeout, query.fetch_all(&db.pool)).await?;
        Ok(rows.into_iter().map(EmployeeDetail::from).collect())
    }

    pub async fn find_employee(&self, id: u64) -> Result<Option<EmployeeDetail>, StoreError> {
        let Some(db) = self.live() else {
            return Ok(None);
        };

        let sql = format!("{DETAIL_SELECT} WHERE e.id = ?");
        let row = bounded(
            db.timeout,
            sqlx::query_as::<_, EmployeeRow>(&sql)
                .bind(id)
                .fetch_optional(&db.pool),
        )
        .await?;

        Ok(row.map(EmployeeDetail::from))
    }

    /// Applies a partial update. Returns false when nothing matched.
    pub async fn update_employee(
        &self,
        id: u64,
        changes: &EmployeeChanges,
    ) -> Result<bool, StoreError> {
        let Some(db) = self.live() else {
            return Ok(false);
        };

        let Some(update) = build_update_sql(
            "employees",
            changes.columns(),
            &["version = version + 1", "updated = NOW()"],
            "id",
            id,
        ) else {
            return Ok(false);
        };

        let affected = bounded(db.timeout, execute_update(&db.pool, update)).await?;
        Ok(affected > 0)
    }

    /// Deletes an employee. Its requests go with it; its workflows stay,
    /// detached from the employee.
    pub async fn delete_employee(&self, id: u64) -> Result<bool, StoreError> {
        let Some(db) = self.live() else {
            return Ok(false);
        };

        let result = bounded(
            db.timeout,
            sqlx::query("DELETE FROM employees WHERE id = ?")
                .bind(id)
                .execute(&db.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
