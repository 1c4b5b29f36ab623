//! Employee workflow engine.
//!
//! Onboarding and transfer each touch several rows (employee, workflow audit
//! record, department head counts). Every step of one operation runs inside a
//! single store transaction, so either all of it becomes visible or none of
//! it does. Transfers of the same employee are additionally serialized: a
//! second transfer arriving while one is in flight is refused with a conflict,
//! and the department update itself is guarded by the employee's version.

pub mod lock;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::{
    db::{Store, StoreError},
    model::{
        employee::{EmployeeDetail, EmployeeStatus, NewEmployee},
        workflow::{NewWorkflow, WorkflowStatus, WorkflowType},
    },
};

use lock::TransferLocks;
use store::{WorkflowStore, WorkflowTx};

pub type Engine = WorkflowEngine<Store>;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Department must be selected")]
    DepartmentNotSelected,

    #[error("Department not found")]
    DepartmentNotFound,

    #[error("Account must be assigned")]
    AccountNotAssigned,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Only active accounts can be assigned to employees")]
    AccountInactive,

    #[error("Account is already assigned to an employee")]
    AccountAlreadyAssigned,

    #[error("Employee ID already exists")]
    DuplicateEmployeeId,

    #[error("Employee not found")]
    EmployeeNotFound,

    #[error("Employee is already in this department")]
    AlreadyInDepartment,

    #[error("Target department not found")]
    TargetDepartmentNotFound,

    #[error("Employee is being transferred by another request, retry")]
    TransferConflict,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct OnboardCommand {
    pub employee_code: String,
    pub account_id: Option<u64>,
    pub department_id: Option<u64>,
    pub position: String,
    pub hire_date: NaiveDate,
    pub status: EmployeeStatus,
}

#[derive(Debug, Clone, Copy)]
pub struct TransferCommand {
    pub employee_id: u64,
    pub department_id: u64,
    /// Account id of the caller, if known
    pub requested_by: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub employee_id: u64,
    pub employee_name: String,
    pub new_department_name: String,
    pub workflow_id: u64,
    pub workflow_type: WorkflowType,
    pub workflow_status: WorkflowStatus,
    /// Head count per department after the transfer, old and new
    pub department_counts: BTreeMap<u64, i64>,
}

pub struct WorkflowEngine<S> {
    store: S,
    locks: TransferLocks,
}

impl<S: WorkflowStore> WorkflowEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: TransferLocks::default(),
        }
    }

    /// Hires an employee and records the onboarding workflow.
    pub async fn onboard(&self, cmd: OnboardCommand) -> Result<EmployeeDetail, WorkflowError> {
        let department_id = cmd
            .department_id
            .ok_or(WorkflowError::DepartmentNotSelected)?;

        let mut tx = self.store.begin().await?;

        tx.find_department(department_id)
            .await?
            .ok_or(WorkflowError::DepartmentNotFound)?;

        let account_id = cmd.account_id.ok_or(WorkflowError::AccountNotAssigned)?;
        let account = tx
            .find_account(account_id)
            .await?
            .ok_or(WorkflowError::AccountNotFound)?;

        if !account.is_active {
            return Err(WorkflowError::AccountInactive);
        }
        if tx.account_has_employee(account_id).await? {
            return Err(WorkflowError::AccountAlreadyAssigned);
        }
        if tx.employee_code_taken(&cmd.employee_code).await? {
            return Err(WorkflowError::DuplicateEmployeeId);
        }

        let employee_id = tx
            .insert_employee(&NewEmployee {
                employee_code: cmd.employee_code.clone(),
                account_id,
                department_id,
                position: cmd.position.clone(),
                hire_date: cmd.hire_date,
                status: cmd.status,
            })
            .await?;

        let workflow_id = tx
            .insert_workflow(&NewWorkflow {
                kind: WorkflowType::Onboarding,
                status: WorkflowStatus::Pending,
                employee_id,
                department_id,
                details: json!({
                    "position": cmd.position,
                    "hireDate": cmd.hire_date,
                    "status": "New Hire",
                }),
            })
            .await?;

        let created = tx
            .employee_detail(employee_id)
            .await?
            .ok_or(WorkflowError::EmployeeNotFound)?;

        tx.commit().await?;

        info!(
            employee_id,
            workflow_id,
            department_id,
            account_id,
            "Employee onboarded"
        );
        Ok(created)
    }

    /// Moves an employee to another department and records the transfer.
    pub async fn transfer(&self, cmd: TransferCommand) -> Result<TransferOutcome, WorkflowError> {
        let _guard = self.locks.try_acquire(cmd.employee_id).ok_or_else(|| {
            debug!(employee_id = cmd.employee_id, "Transfer already in flight");
            WorkflowError::TransferConflict
        })?;

        let mut tx = self.store.begin().await?;

        let employee = tx
            .lock_employee(cmd.employee_id)
            .await?
            .ok_or(WorkflowError::EmployeeNotFound)?;

        let old_department_id = employee.department_id;
        let new_department_id = cmd.department_id;

        if old_department_id == new_department_id {
            return Err(WorkflowError::AlreadyInDepartment);
        }

        let new_department = tx
            .find_department(new_department_id)
            .await?
            .ok_or(WorkflowError::TargetDepartmentNotFound)?;

        let old_department_name = tx
            .find_department(old_department_id)
            .await?
            .map(|d| d.name)
            .unwrap_or_else(|| "Unknown".to_string());

        let employee_name = tx
            .find_account(employee.account_id)
            .await?
            .map(|a| a.summary().full_name())
            .unwrap_or_default();

        if !tx
            .reassign_department(employee.id, new_department_id, employee.version)
            .await?
        {
            return Err(WorkflowError::TransferConflict);
        }

        let workflow = NewWorkflow {
            kind: WorkflowType::Transfer,
            status: WorkflowStatus::Pending,
            employee_id: employee.id,
            department_id: new_department_id,
            details: json!({
                "oldDepartmentId": old_department_id,
                "oldDepartmentName": old_department_name,
                "newDepartmentId": new_department_id,
                "newDepartmentName": new_department.name,
                "transferDate": Utc::now(),
                "requestedBy": cmd.requested_by,
            }),
        };
        let workflow_id = tx.insert_workflow(&workflow).await?;

        // Counted inside the transaction, after the update above.
        let old_count = tx.count_in_department(old_department_id).await?;
        let new_count = tx.count_in_department(new_department_id).await?;

        tx.commit().await?;

        info!(
            employee_id = employee.id,
            from = old_department_id,
            to = new_department_id,
            workflow_id,
            "Employee transferred"
        );

        Ok(TransferOutcome {
            employee_id: employee.id,
            employee_name,
            new_department_name: new_department.name,
            workflow_id,
            workflow_type: workflow.kind,
            workflow_status: workflow.status,
            department_counts: BTreeMap::from([
                (old_department_id, old_count),
                (new_department_id, new_count),
            ]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::memory::MemoryStore;

    fn hire(account_id: Option<u64>, department_id: Option<u64>) -> OnboardCommand {
        OnboardCommand {
            employee_code: "EMP-100".into(),
            account_id,
            department_id,
            position: "Analyst".into(),
            hire_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: EmployeeStatus::Active,
        }
    }

    fn move_to(employee_id: u64, department_id: u64) -> TransferCommand {
        TransferCommand {
            employee_id,
            department_id,
            requested_by: Some(1),
        }
    }

    #[actix_web::test]
    async fn onboarding_creates_employee_and_one_pending_workflow() {
        let store = MemoryStore::default();
        let dept = store.add_department("Engineering").await;
        let account = store.add_account("Ada", "Lovelace", true).await;
        let engine = WorkflowEngine::new(store.clone());

        let created = engine.onboard(hire(Some(account), Some(dept))).await.unwrap();

        assert_eq!(created.employee.department_id, dept);
        assert_eq!(created.account.id, account);
        assert_eq!(created.department.name, "Engineering");

        let tables = store.snapshot().await;
        assert_eq!(tables.employees.len(), 1);
        let workflows: Vec<_> = tables.workflows.values().collect();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].kind, WorkflowType::Onboarding);
        assert_eq!(workflows[0].status, WorkflowStatus::Pending);
        assert_eq!(workflows[0].employee_id, Some(created.employee.id));
        assert_eq!(workflows[0].details.0["status"], "New Hire");
        assert_eq!(workflows[0].details.0["hireDate"], "2024-03-01");
    }

    #[actix_web::test]
    async fn onboarding_rejections_name_the_precondition_and_write_nothing() {
        let store = MemoryStore::default();
        let dept = store.add_department("Engineering").await;
        let inactive = store.add_account("Ina", "Active", false).await;
        let engine = WorkflowEngine::new(store.clone());

        let cases = [
            (hire(Some(inactive), None), "Department must be selected"),
            (hire(Some(inactive), Some(999)), "Department not found"),
            (hire(None, Some(dept)), "Account must be assigned"),
            (hire(Some(999), Some(dept)), "Account not found"),
            (
                hire(Some(inactive), Some(dept)),
                "Only active accounts can be assigned to employees",
            ),
        ];

        for (cmd, expected) in cases {
            let err = engine.onboard(cmd).await.unwrap_err();
            assert_eq!(err.to_string(), expected);
        }

        let tables = store.snapshot().await;
        assert!(tables.employees.is_empty());
        assert!(tables.workflows.is_empty());
    }

    #[actix_web::test]
    async fn onboarding_refuses_an_account_that_already_has_an_employee() {
        let store = MemoryStore::default();
        let dept = store.add_department("Sales").await;
        let account = store.add_account("Sam", "Seller", true).await;
        store.add_employee(account, dept).await;
        let engine = WorkflowEngine::new(store.clone());

        let err = engine.onboard(hire(Some(account), Some(dept))).await.unwrap_err();

        assert!(matches!(err, WorkflowError::AccountAlreadyAssigned));
        assert_eq!(store.snapshot().await.employees.len(), 1);
    }

    #[actix_web::test]
    async fn onboarding_rolls_back_when_the_workflow_write_fails() {
        let store = MemoryStore::default();
        let dept = store.add_department("Engineering").await;
        let account = store.add_account("Ada", "Lovelace", true).await;
        store.fail_workflow_inserts();
        let engine = WorkflowEngine::new(store.clone());

        let err = engine.onboard(hire(Some(account), Some(dept))).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Store(StoreError::Timeout(_))));
        let tables = store.snapshot().await;
        assert!(tables.employees.is_empty());
        assert!(tables.workflows.is_empty());
    }

    #[actix_web::test]
    async fn transfer_updates_department_counts_and_audit_trail() {
        let store = MemoryStore::default();
        let d1 = store.add_department("Operations").await;
        let d2 = store.add_department("Finance").await;
        let mut d1_members = Vec::new();
        for name in ["Eve", "Bob", "Carol"] {
            let account = store.add_account(name, "Smith", true).await;
            d1_members.push(store.add_employee(account, d1).await);
        }
        let other = store.add_account("Dan", "Jones", true).await;
        store.add_employee(other, d2).await;
        let engine = WorkflowEngine::new(store.clone());

        let employee = d1_members[0];
        let outcome = engine.transfer(move_to(employee, d2)).await.unwrap();

        assert_eq!(outcome.employee_name, "Eve Smith");
        assert_eq!(outcome.new_department_name, "Finance");
        assert_eq!(outcome.department_counts, BTreeMap::from([(d1, 2), (d2, 2)]));
        assert_eq!(outcome.workflow_type, WorkflowType::Transfer);
        assert_eq!(outcome.workflow_status, WorkflowStatus::Pending);

        let tables = store.snapshot().await;
        assert_eq!(tables.employees[&employee].department_id, d2);
        let workflows: Vec<_> = tables.workflows.values().collect();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].id, outcome.workflow_id);
        assert_eq!(workflows[0].department_id, d2);
        let details = &workflows[0].details.0;
        assert_eq!(details["oldDepartmentId"], d1);
        assert_eq!(details["oldDepartmentName"], "Operations");
        assert_eq!(details["newDepartmentId"], d2);
        assert_eq!(details["requestedBy"], 1);
    }

    #[actix_web::test]
    async fn transfer_there_and_back_restores_counts() {
        let store = MemoryStore::default();
        let a = store.add_department("A").await;
        let b = store.add_department("B").await;
        let first = store.add_account("One", "A", true).await;
        let second = store.add_account("Two", "A", true).await;
        let employee = store.add_employee(first, a).await;
        store.add_employee(second, a).await;
        let engine = WorkflowEngine::new(store.clone());

        let before = store.snapshot().await.count_in(a);
        engine.transfer(move_to(employee, b)).await.unwrap();
        let back = engine.transfer(move_to(employee, a)).await.unwrap();

        assert_eq!(back.department_counts[&a], before);
        assert_eq!(back.department_counts[&b], 0);
        assert_eq!(store.snapshot().await.workflows.len(), 2);
    }

    #[actix_web::test]
    async fn transfer_to_current_department_is_rejected_without_audit() {
        let store = MemoryStore::default();
        let dept = store.add_department("Legal").await;
        let account = store.add_account("Lee", "Gal", true).await;
        let employee = store.add_employee(account, dept).await;
        let engine = WorkflowEngine::new(store.clone());

        let err = engine.transfer(move_to(employee, dept)).await.unwrap_err();

        assert_eq!(err.to_string(), "Employee is already in this department");
        assert!(store.snapshot().await.workflows.is_empty());
    }

    #[actix_web::test]
    async fn transfer_rejects_unknown_employee_and_target() {
        let store = MemoryStore::default();
        let dept = store.add_department("Legal").await;
        let account = store.add_account("Lee", "Gal", true).await;
        let employee = store.add_employee(account, dept).await;
        let engine = WorkflowEngine::new(store.clone());

        let missing = engine.transfer(move_to(999, dept)).await.unwrap_err();
        assert!(matches!(missing, WorkflowError::EmployeeNotFound));

        let target = engine.transfer(move_to(employee, 999)).await.unwrap_err();
        assert_eq!(target.to_string(), "Target department not found");

        let tables = store.snapshot().await;
        assert_eq!(tables.employees[&employee].department_id, dept);
        assert!(tables.workflows.is_empty());
    }

    #[actix_web::test]
    async fn racing_transfers_of_one_employee_let_exactly_one_win() {
        let store = MemoryStore::default();
        let home = store.add_department("Home").await;
        let left = store.add_department("Left").await;
        let right = store.add_department("Right").await;
        let account = store.add_account("Rae", "Cing", true).await;
        let employee = store.add_employee(account, home).await;
        let engine = WorkflowEngine::new(store.clone());

        let (first, second) = futures::join!(
            engine.transfer(move_to(employee, left)),
            engine.transfer(move_to(employee, right)),
        );

        let winner = first.expect("first transfer claims the employee");
        assert!(matches!(second, Err(WorkflowError::TransferConflict)));
        assert_eq!(winner.new_department_name, "Left");

        let tables = store.snapshot().await;
        assert_eq!(tables.employees[&employee].department_id, left);
        assert_eq!(tables.workflows.len(), 1);
        assert_eq!(tables.count_in(home) + tables.count_in(left) + tables.count_in(right), 1);
    }

    // MemoryStore runs whole transactions one after another, so this covers
    // the lock registry only. Under MySQL the recount is a locking read (see
    // `db::tx`) and so sees the other transfer once it has committed.
    #[actix_web::test]
    async fn transfers_of_different_employees_both_complete() {
        let store = MemoryStore::default();
        let a = store.add_department("A").await;
        let b = store.add_department("B").await;
        let x = store.add_account("X", "Ray", true).await;
        let y = store.add_account("Y", "Ray", true).await;
        let ex = store.add_employee(x, a).await;
        let ey = store.add_employee(y, a).await;
        let engine = WorkflowEngine::new(store.clone());

        let (first, second) = futures::join!(
            engine.transfer(move_to(ex, b)),
            engine.transfer(move_to(ey, b)),
        );

        assert_eq!(first.unwrap().department_counts[&b], 1);
        assert_eq!(second.unwrap().department_counts[&b], 2);
        assert_eq!(store.snapshot().await.count_in(a), 0);
    }

    #[actix_web::test]
    async fn transfer_losing_the_version_race_is_a_conflict() {
        let store = MemoryStore::default();
        let a = store.add_department("A").await;
        let b = store.add_department("B").await;
        let account = store.add_account("Vic", "Tim", true).await;
        let employee = store.add_employee(account, a).await;
        store.update_after_lock();
        let engine = WorkflowEngine::new(store.clone());

        let err = engine.transfer(move_to(employee, b)).await.unwrap_err();

        assert!(matches!(err, WorkflowError::TransferConflict));
        let tables = store.snapshot().await;
        assert_eq!(tables.employees[&employee].department_id, a);
        assert_eq!(tables.employees[&employee].version, 0);
        assert!(tables.workflows.is_empty());
    }

    #[actix_web::test]
    async fn transfer_rolls_back_when_the_workflow_write_fails() {
        let store = MemoryStore::default();
        let a = store.add_department("A").await;
        let b = store.add_department("B").await;
        let account = store.add_account("Rob", "Ack", true).await;
        let employee = store.add_employee(account, a).await;
        store.fail_workflow_inserts();
        let engine = WorkflowEngine::new(store.clone());

        let err = engine.transfer(move_to(employee, b)).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Store(StoreError::Timeout(_))));
        let tables = store.snapshot().await;
        assert_eq!(tables.employees[&employee].department_id, a);
        assert_eq!(tables.count_in(b), 0);
        assert!(tables.workflows.is_empty());

        // The in-flight claim is released with the failed transfer.
        assert!(engine.locks.try_acquire(employee).is_some());
    }

    #[actix_web::test]
    async fn stale_version_does_not_move_the_employee() {
        let store = MemoryStore::default();
        let a = store.add_department("A").await;
        let b = store.add_department("B").await;
        let account = store.add_account("Vee", "Ersion", true).await;
        let employee = store.add_employee(account, a).await;

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.reassign_department(employee, b, 41).await.unwrap());
        assert!(tx.reassign_department(employee, b, 0).await.unwrap());
        tx.commit().await.unwrap();

        let tables = store.snapshot().await;
        assert_eq!(tables.employees[&employee].department_id, b);
        assert_eq!(tables.employees[&employee].version, 1);
    }

    #[actix_web::test]
    async fn inert_store_rejects_instead_of_crashing() {
        let engine = WorkflowEngine::new(Store::Unavailable);

        let onboard = engine.onboard(hire(Some(1), Some(1))).await.unwrap_err();
        assert!(matches!(onboard, WorkflowError::DepartmentNotFound));

        let transfer = engine.transfer(move_to(1, 2)).await.unwrap_err();
        assert!(matches!(transfer, WorkflowError::EmployeeNotFound));
    }
}
