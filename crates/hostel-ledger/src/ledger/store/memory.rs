use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ChangeSet, HostelRepository, RecordKey, RepositoryError, Versioned};
use crate::ledger::fees::Fee;
use crate::ledger::ids::{FeeId, RoomChangeId, RoomId, StudentId};
use crate::ledger::room_change::RoomChangeRequest;
use crate::ledger::rooms::Room;
use crate::ledger::students::Student;
use crate::ledger::wallet::Wallet;

#[derive(Debug, Default)]
struct Tables {
    rooms: BTreeMap<RoomId, Versioned<Room>>,
    students: BTreeMap<StudentId, Versioned<Student>>,
    fees: BTreeMap<FeeId, Versioned<Fee>>,
    room_changes: BTreeMap<RoomChangeId, Versioned<RoomChangeRequest>>,
    wallets: BTreeMap<StudentId, Versioned<Wallet>>,
    transactions: HashMap<String, FeeId>,
}

impl Tables {
    fn version(&self, key: &RecordKey) -> u64 {
        match key {
            RecordKey::Room(id) => self.rooms.get(id).map_or(0, |entry| entry.version),
            RecordKey::Student(id) => self.students.get(id).map_or(0, |entry| entry.version),
            RecordKey::Fee(id) => self.fees.get(id).map_or(0, |entry| entry.version),
            RecordKey::RoomChange(id) => {
                self.room_changes.get(id).map_or(0, |entry| entry.version)
            }
            RecordKey::Wallet(id) => self.wallets.get(id).map_or(0, |entry| entry.version),
        }
    }

    fn index_transactions(&mut self, fee: &Fee) {
        for receipt in &fee.payments {
            self.transactions
                .insert(receipt.transaction_id.clone(), fee.id.clone());
        }
    }

    /// Unique indexes a relational backend would enforce on write.
    fn check_constraints(&self, changes: &ChangeSet) -> Result<(), RepositoryError> {
        for room in &changes.rooms {
            let identity = room.identity.normalized();
            let clash = self.rooms.values().any(|entry| {
                entry.record.id != room.id && entry.record.identity.normalized() == identity
            });
            if clash {
                return Err(RepositoryError::Conflict(format!(
                    "room identity {}",
                    room.label()
                )));
            }
        }

        let staged_fees = changes.fees.iter().chain(
            changes
                .room_changes
                .iter()
                .filter_map(|request| request.upgrade_obligation.as_ref()),
        );
        for fee in staged_fees {
            for receipt in &fee.payments {
                if let Some(owner) = self.transactions.get(&receipt.transaction_id) {
                    if owner != &fee.id {
                        return Err(RepositoryError::Conflict(format!(
                            "transaction {}",
                            receipt.transaction_id
                        )));
                    }
                }
            }
        }

        for request in changes.room_changes.iter().filter(|request| request.is_open()) {
            let clash = self.room_changes.values().any(|entry| {
                entry.record.id != request.id
                    && entry.record.student == request.student
                    && entry.record.is_open()
            });
            if clash {
                return Err(RepositoryError::Conflict(format!(
                    "open room change for {}",
                    request.student
                )));
            }
        }
        Ok(())
    }
}

/// Reference repository keeping every table behind one mutex.
#[derive(Debug, Default, Clone)]
pub struct MemoryHostelRepository {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryHostelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

fn bump<K: Ord, T>(table: &mut BTreeMap<K, Versioned<T>>, id: K, record: T) {
    let version = table.get(&id).map_or(0, |entry| entry.version) + 1;
    table.insert(id, Versioned::new(version, record));
}

impl HostelRepository for MemoryHostelRepository {
    fn room(&self, id: &RoomId) -> Result<Option<Versioned<Room>>, RepositoryError> {
        Ok(self.lock()?.rooms.get(id).cloned())
    }

    fn rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        Ok(self
            .lock()?
            .rooms
            .values()
            .map(|entry| entry.record.clone())
            .collect())
    }

    fn student(&self, id: &StudentId) -> Result<Option<Versioned<Student>>, RepositoryError> {
        Ok(self.lock()?.students.get(id).cloned())
    }

    fn fee(&self, id: &FeeId) -> Result<Option<Versioned<Fee>>, RepositoryError> {
        Ok(self.lock()?.fees.get(id).cloned())
    }

    fn fees_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Versioned<Fee>>, RepositoryError> {
        Ok(self
            .lock()?
            .fees
            .values()
            .filter(|entry| &entry.record.student == student)
            .cloned()
            .collect())
    }

    fn open_fee_ids(&self) -> Result<Vec<FeeId>, RepositoryError> {
        Ok(self
            .lock()?
            .fees
            .values()
            .filter(|entry| entry.record.is_open())
            .map(|entry| entry.record.id.clone())
            .collect())
    }

    fn fee_by_transaction(&self, transaction_id: &str) -> Result<Option<FeeId>, RepositoryError> {
        Ok(self.lock()?.transactions.get(transaction_id).cloned())
    }

    fn room_change(
        &self,
        id: &RoomChangeId,
    ) -> Result<Option<Versioned<RoomChangeRequest>>, RepositoryError> {
        Ok(self.lock()?.room_changes.get(id).cloned())
    }

    fn open_room_change_for(
        &self,
        student: &StudentId,
    ) -> Result<Option<RoomChangeId>, RepositoryError> {
        Ok(self
            .lock()?
            .room_changes
            .values()
            .find(|entry| &entry.record.student == student && entry.record.is_open())
            .map(|entry| entry.record.id.clone()))
    }

    fn wallet(&self, student: &StudentId) -> Result<Option<Versioned<Wallet>>, RepositoryError> {
        Ok(self.lock()?.wallets.get(student).cloned())
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;

        for (key, expected) in &changes.expected {
            if tables.version(key) != *expected {
                return Err(RepositoryError::Conflict(key.to_string()));
            }
        }
        tables.check_constraints(&changes)?;

        let ChangeSet {
            rooms,
            students,
            fees,
            room_changes,
            wallets,
            ..
        } = changes;

        for room in rooms {
            bump(&mut tables.rooms, room.id.clone(), room);
        }
        for student in students {
            bump(&mut tables.students, student.id.clone(), student);
        }
        for fee in fees {
            tables.index_transactions(&fee);
            bump(&mut tables.fees, fee.id.clone(), fee);
        }
        for request in room_changes {
            if let Some(obligation) = &request.upgrade_obligation {
                tables.index_transactions(obligation);
            }
            bump(&mut tables.room_changes, request.id.clone(), request);
        }
        for wallet in wallets {
            bump(&mut tables.wallets, wallet.student.clone(), wallet);
        }
        Ok(())
    }
}
