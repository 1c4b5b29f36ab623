//! In-memory store for exercising the engine without MySQL.
//!
//! A transaction holds the table mutex for its whole lifetime and works on a
//! staged copy; commit writes the copy back, drop throws it away.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::types::Json;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    db::StoreError,
    model::{
        account::Account,
        department::Department,
        employee::{Employee, EmployeeDetail, EmployeeStatus, NewEmployee},
        role::Role,
        workflow::{NewWorkflow, Workflow},
    },
};

use super::store::{WorkflowStore, WorkflowTx};

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub accounts: BTreeMap<u64, Account>,
    pub departments: BTreeMap<u64, Department>,
    pub employees: BTreeMap<u64, Employee>,
    pub workflows: BTreeMap<u64, Workflow>,
    last_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn count_in(&self, department_id: u64) -> i64 {
        self.employees
            .values()
            .filter(|e| e.department_id == department_id)
            .count() as i64
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_workflow_insert: Arc<AtomicBool>,
    update_after_lock: Arc<AtomicBool>,
}

impl MemoryStore {
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    /// Makes every later workflow insert fail with a timeout.
    pub fn fail_workflow_inserts(&self) {
        self.fail_workflow_insert.store(true, Ordering::SeqCst);
    }

    /// Bumps the employee's version right after every later row lock, as a
    /// writer that slipped past the lock would.
    pub fn update_after_lock(&self) {
        self.update_after_lock.store(true, Ordering::SeqCst);
    }

    pub async fn add_department(&self, name: &str) -> u64 {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.departments.insert(
            id,
            Department {
                id,
                name: name.to_string(),
                description: None,
                created: Utc::now(),
                updated: None,
            },
        );
        id
    }

    pub async fn add_account(&self, first_name: &str, last_name: &str, active: bool) -> u64 {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.accounts.insert(
            id,
            Account {
                id,
                email: format!("{}.{id}@example.com", first_name.to_lowercase()),
                password_hash: String::new(),
                title: None,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                role: Role::User,
                verification_token: None,
                verified: active.then(Utc::now),
                is_active: active,
                created: Utc::now(),
                updated: None,
            },
        );
        id
    }

    pub async fn add_employee(&self, account_id: u64, department_id: u64) -> u64 {
        let mut tables = self.tables.lock().await;
        let id = tables.next_id();
        tables.employees.insert(
            id,
            Employee {
                id,
                employee_code: format!("EMP-{id:03}"),
                account_id,
                department_id,
                position: "Staff".into(),
                hire_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                status: EmployeeStatus::Active,
                version: 0,
                created: Utc::now(),
                updated: None,
            },
        );
        id
    }
}

pub struct MemoryTx {
    committed: OwnedMutexGuard<Tables>,
    staged: Tables,
    fail_workflow_insert: bool,
    update_after_lock: bool,
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, StoreError> {
        let committed = self.tables.clone().lock_owned().await;
        let staged = committed.clone();
        Ok(MemoryTx {
            committed,
            staged,
            fail_workflow_insert: self.fail_workflow_insert.load(Ordering::SeqCst),
            update_after_lock: self.update_after_lock.load(Ordering::SeqCst),
        })
    }
}

#[async_trait]
impl WorkflowTx for MemoryTx {
    async fn find_department(&mut self, id: u64) -> Result<Option<Department>, StoreError> {
        Ok(self.staged.departments.get(&id).cloned())
    }

    async fn find_account(&mut self, id: u64) -> Result<Option<Account>, StoreError> {
        Ok(self.staged.accounts.get(&id).cloned())
    }

    async fn account_has_employee(&mut self, account_id: u64) -> Result<bool, StoreError> {
        Ok(self
            .staged
            .employees
            .values()
            .any(|e| e.account_id == account_id))
    }

    async fn employee_code_taken(&mut self, code: &str) -> Result<bool, StoreError> {
        Ok(self
            .staged
            .employees
            .values()
            .any(|e| e.employee_code == code))
    }

    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError> {
        // Give a concurrently polled transfer the chance to run.
        tokio::task::yield_now().await;
        let employee = self.staged.employees.get(&id).cloned();
        if self.update_after_lock {
            if let Some(row) = self.staged.employees.get_mut(&id) {
                row.version += 1;
            }
        }
        Ok(employee)
    }

    async fn insert_employee(&mut self, employee: &NewEmployee) -> Result<u64, StoreError> {
        let id = self.staged.next_id();
        self.staged.employees.insert(
            id,
            Employee {
                id,
                employee_code: employee.employee_code.clone(),
                account_id: employee.account_id,
                department_id: employee.department_id,
                position: employee.position.clone(),
                hire_date: employee.hire_date,
                status: employee.status,
                version: 0,
                created: Utc::now(),
                updated: None,
            },
        );
        Ok(id)
    }

    async fn reassign_department(
        &mut self,
        employee_id: u64,
        department_id: u64,
        expected_version: u32,
    ) -> Result<bool, StoreError> {
        match self.staged.employees.get_mut(&employee_id) {
            Some(e) if e.version == expected_version => {
                e.department_id = department_id;
                e.version += 1;
                e.updated = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_workflow(&mut self, workflow: &NewWorkflow) -> Result<u64, StoreError> {
        if self.fail_workflow_insert {
            return Err(StoreError::Timeout(Duration::from_millis(10)));
        }
        let id = self.staged.next_id();
        self.staged.workflows.insert(
            id,
            Workflow {
                id,
                kind: workflow.kind,
                status: workflow.status,
                employee_id: Some(workflow.employee_id),
                department_id: workflow.department_id,
                details: Json(workflow.details.clone()),
                created: Utc::now(),
                updated: None,
            },
        );
        Ok(id)
    }

    async fn count_in_department(&mut self, department_id: u64) -> Result<i64, StoreError> {
        Ok(self.staged.count_in(department_id))
    }

    async fn employee_detail(&mut self, id: u64) -> Result<Option<EmployeeDetail>, StoreError> {
        let tables = &self.staged;
        let detail = tables.employees.get(&id).and_then(|employee| {
            let account = tables.accounts.get(&employee.account_id)?;
            let department = tables.departments.get(&employee.department_id)?;
            Some(EmployeeDetail {
                employee: employee.clone(),
                account: account.summary(),
                department: department.clone(),
            })
        });
        Ok(detail)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTx {
            mut committed,
            staged,
            ..
        } = self;
        *committed = staged;
        Ok(())
    }
}
