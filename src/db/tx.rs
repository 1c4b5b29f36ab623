use std::time::Duration;

use async_trait::async_trait;
use sqlx::{MySql, Transaction};

use crate::{
    model::{
        account::Account,
        department::Department,
        employee::{Employee, EmployeeDetail, EmployeeRow, NewEmployee},
        workflow::NewWorkflow,
    },
    workflow::store::{WorkflowStore, WorkflowTx},
};

use super::{
    MySqlStore, Store, StoreError, bounded,
    employees::{DETAIL_SELECT, EMPLOYEE_COLUMNS},
};

/// Locking read: sees rows committed after this transaction's read view was
/// taken, which a plain `SELECT` under REPEATABLE READ would not.
const COUNT_IN_DEPARTMENT: &str =
    "SELECT COUNT(*) FROM employees WHERE department_id = ? LOCK IN SHARE MODE";

/// A MySQL transaction whose statements each run under the store deadline.
pub struct MySqlTx {
    tx: Transaction<'static, MySql>,
    timeout: Duration,
}

pub enum StoreTx {
    Live(MySqlTx),
    /// Transaction of the inert store: reads are empty, writes are no-ops.
    Inert,
}

impl MySqlStore {
    pub async fn begin(&self) -> Result<MySqlTx, StoreError> {
        let tx = bounded(self.timeout, self.pool.begin()).await?;
        Ok(MySqlTx {
            tx,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl WorkflowStore for Store {
    type Tx = StoreTx;

    async fn begin(&self) -> Result<StoreTx, StoreError> {
        match self {
            Store::Live(db) => Ok(StoreTx::Live(db.begin().await?)),
            Store::Unavailable => Ok(StoreTx::Inert),
        }
    }
}

impl MySqlTx {
    async fn find_department(&mut self, id: u64) -> Result<Option<Department>, StoreError> {
        bounded(
            self.timeout,
            sqlx::query_as::<_, Department>(
                "SELECT id, name, description, created, updated FROM departments WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&mut *self.tx),
        )
        .await
    }

    async fn find_account(&mut self, id: u64) -> Result<Option<Account>, StoreError> {
        bounded(
            self.timeout,
            sqlx::query_as::<_, Account>(
                r#"
                SELECT id, email, password_hash, title, first_name, last_name, role,
                       verification_token, verified, is_active, created, updated
                FROM accounts
                WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *self.tx),
        )
        .await
    }

    async fn count_where(&mut self, sql: &str, value: impl ToString) -> Result<i64, StoreError> {
        bounded(
            self.timeout,
            sqlx::query_scalar::<_, i64>(sql)
                .bind(value.to_string())
                .fetch_one(&mut *self.tx),
        )
        .await
    }

    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees e WHERE e.id = ? FOR UPDATE");
        bounded(
            self.timeout,
            sqlx::query_as::<_, Employee>(&sql)
                .bind(id)
                .fetch_optional(&mut *self.tx),
        )
        .await
    }

    async fn insert_employee(&mut self, employee: &NewEmployee) -> Result<u64, StoreError> {
        let result = bounded(
            self.timeout,
            sqlx::query(
                r#"
                INSERT INTO employees
                    (employee_code, account_id, department_id, position, hire_date, status)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&employee.employee_code)
            .bind(employee.account_id)
            .bind(employee.department_id)
            .bind(&employee.position)
            .bind(employee.hire_date)
            .bind(employee.status.as_ref())
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.last_insert_id())
    }

    async fn reassign_department(
        &mut self,
        employee_id: u64,
        department_id: u64,
        expected_version: u32,
    ) -> Result<bool, StoreError> {
        let result = bounded(
            self.timeout,
            sqlx::query(
                r#"
                UPDATE employees
                SET department_id = ?, version = version + 1, updated = NOW()
                WHERE id = ?
                AND version = ?
                "#,
            )
            .bind(department_id)
            .bind(employee_id)
            .bind(expected_version)
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_workflow(&mut self, workflow: &NewWorkflow) -> Result<u64, StoreError> {
        let result = bounded(
            self.timeout,
            sqlx::query(
                r#"
                INSERT INTO workflows (`type`, status, employee_id, department_id, details)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(workflow.kind.as_ref())
            .bind(workflow.status.as_ref())
            .bind(workflow.employee_id)
            .bind(workflow.department_id)
            .bind(sqlx::types::Json(&workflow.details))
            .execute(&mut *self.tx),
        )
        .await?;

        Ok(result.last_insert_id())
    }

    async fn employee_detail(&mut self, id: u64) -> Result<Option<EmployeeDetail>, StoreError> {
        let sql = format!("{DETAIL_SELECT} WHERE e.id = ?");
        let row = bounded(
            self.timeout,
            sqlx::query_as::<_, EmployeeRow>(&sql)
                .bind(id)
                .fetch_optional(&mut *self.tx),
        )
        .await?;

        Ok(row.map(EmployeeDetail::from))
    }

    async fn commit(self) -> Result<(), StoreError> {
        bounded(self.timeout, self.tx.commit()).await
    }
}

#[async_trait]
impl WorkflowTx for StoreTx {
    async fn find_department(&mut self, id: u64) -> Result<Option<Department>, StoreError> {
        match self {
            StoreTx::Live(tx) => tx.find_department(id).await,
            StoreTx::Inert => Ok(None),
        }
    }

    async fn find_account(&mut self, id: u64) -> Result<Option<Account>, StoreError> {
        match self {
            StoreTx::Live(tx) => tx.find_account(id).await,
            StoreTx::Inert => Ok(None),
        }
    }

    async fn account_has_employee(&mut self, account_id: u64) -> Result<bool, StoreError> {
        match self {
            StoreTx::Live(tx) => {
                let sql = "SELECT COUNT(*) FROM employees WHERE account_id = ?";
                Ok(tx.count_where(sql, account_id).await? > 0)
            }
            StoreTx::Inert => Ok(false),
        }
    }

    async fn employee_code_taken(&mut self, code: &str) -> Result<bool, StoreError> {
        match self {
            StoreTx::Live(tx) => {
                let sql = "SELECT COUNT(*) FROM employees WHERE employee_code = ?";
                Ok(tx.count_where(sql, code).await? > 0)
            }
            StoreTx::Inert => Ok(false),
        }
    }

    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError> {
        match self {
            StoreTx::Live(tx) => tx.lock_employee(id).await,
            StoreTx::Inert => Ok(None),
        }
    }

    async fn insert_employee(&mut self, employee: &NewEmployee) -> Result<u64, StoreError> {
        match self {
            StoreTx::Live(tx) => tx.insert_employee(employee).await,
            StoreTx::Inert => Ok(0),
        }
    }

    async fn reassign_department(
        &mut self,
        employee_id: u64,
        department_id: u64,
        expected_version: u32,
    ) -> Result<bool, StoreError> {
        match self {
            StoreTx::Live(tx) => {
                tx.reassign_department(employee_id, department_id, expected_version)
                    .await
            }
            StoreTx::Inert => Ok(true),
        }
    }

    async fn insert_workflow(&mut self, workflow: &NewWorkflow) -> Result<u64, StoreError> {
        match self {
            StoreTx::Live(tx) => tx.insert_workflow(workflow).await,
            StoreTx::Inert => Ok(0),
        }
    }

    async fn count_in_department(&mut self, department_id: u64) -> Result<i64, StoreError> {
        match self {
            StoreTx::Live(tx) => tx.count_where(COUNT_IN_DEPARTMENT, department_id).await,
            StoreTx::Inert => Ok(0),
        }
    }

    async fn employee_detail(&mut self, id: u64) -> Result<Option<EmployeeDetail>, StoreError> {
        match self {
            StoreTx::Live(tx) => tx.employee_detail(id).await,
            StoreTx::Inert => Ok(None),
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        match self {
            StoreTx::Live(tx) => tx.commit().await,
            StoreTx::Inert => Ok(()),
        }
    }
}
