use async_trait::async_trait;

use crate::{
    db::StoreError,
    model::{
        account::Account,
        department::Department,
        employee::{Employee, EmployeeDetail, NewEmployee},
        workflow::NewWorkflow,
    },
};

/// A store able to open transactions for the workflow engine.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    type Tx: WorkflowTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One unit of work. Dropping it without [`WorkflowTx::commit`] discards
/// every write made through it.
#[async_trait]
pub trait WorkflowTx: Send {
    async fn find_department(&mut self, id: u64) -> Result<Option<Department>, StoreError>;

    async fn find_account(&mut self, id: u64) -> Result<Option<Account>, StoreError>;

    async fn account_has_employee(&mut self, account_id: u64) -> Result<bool, StoreError>;

    async fn employee_code_taken(&mut self, code: &str) -> Result<bool, StoreError>;

    /// Reads the employee and holds its row lock until the transaction ends.
    async fn lock_employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError>;

    async fn insert_employee(&mut self, employee: &NewEmployee) -> Result<u64, StoreError>;

    /// Moves the employee if its version still equals `expected_version`.
    /// Returns false when the version moved on.
    async fn reassign_department(
        &mut self,
        employee_id: u64,
        department_id: u64,
        expected_version: u32,
    ) -> Result<bool, StoreError>;

    async fn insert_workflow(&mut self, workflow: &NewWorkflow) -> Result<u64, StoreError>;

    /// Current head count, including rows other transactions committed since
    /// this one started.
    async fn count_in_department(&mut self, department_id: u64) -> Result<i64, StoreError>;

    async fn employee_detail(&mut self, id: u64) -> Result<Option<EmployeeDetail>, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;
}
