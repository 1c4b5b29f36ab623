use dashmap::DashSet;

/// Employees that currently have a transfer in flight in this process.
#[derive(Default)]
pub struct TransferLocks {
    in_flight: DashSet<u64>,
}

impl TransferLocks {
    /// Claims the employee, or returns `None` if another transfer holds it.
    pub fn try_acquire(&self, employee_id: u64) -> Option<TransferGuard<'_>> {
        self.in_flight.insert(employee_id).then(|| TransferGuard {
            locks: self,
            employee_id,
        })
    }
}

pub struct TransferGuard<'a> {
    locks: &'a TransferLocks,
    employee_id: u64,
}

impl Drop for TransferGuard<'_> {
    fn drop(&mut self) {
        self.locks.in_flight.remove(&self.employee_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_waits_for_release() {
        let locks = TransferLocks::default();

        let guard = locks.try_acquire(7).unwrap();
        assert!(locks.try_acquire(7).is_none());
        assert!(locks.try_acquire(8).is_some());

        drop(guard);
        assert!(locks.try_acquire(7).is_some());
    }
}
