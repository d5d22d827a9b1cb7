use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::{ChangeSet, HostelRepository, RecordKey, RepositoryError, Versioned};
use crate::ledger::error::{LedgerError, RecordKind};
use crate::ledger::fees::Fee;
use crate::ledger::ids::{FeeId, RoomChangeId, RoomId, StudentId};
use crate::ledger::room_change::RoomChangeRequest;
use crate::ledger::rooms::Room;
use crate::ledger::students::Student;
use crate::ledger::wallet::Wallet;

pub const DEFAULT_COMMIT_ATTEMPTS: u32 = 3;

/// Staging area for one multi-record mutation.
///
/// Reads are cached with the version they were observed at, writes stay local
/// until [`UnitOfWork::commit`]. Dropping the unit discards everything staged.
pub struct UnitOfWork<'r, R: ?Sized> {
    repository: &'r R,
    expected: BTreeMap<RecordKey, u64>,
    dirty: BTreeSet<RecordKey>,
    rooms: BTreeMap<RoomId, Room>,
    students: BTreeMap<StudentId, Student>,
    fees: BTreeMap<FeeId, Fee>,
    room_changes: BTreeMap<RoomChangeId, RoomChangeRequest>,
    wallets: BTreeMap<StudentId, Wallet>,
}

impl<'r, R> UnitOfWork<'r, R>
where
    R: HostelRepository + ?Sized,
{
    pub fn new(repository: &'r R) -> Self {
        Self {
            repository,
            expected: BTreeMap::new(),
            dirty: BTreeSet::new(),
            rooms: BTreeMap::new(),
            students: BTreeMap::new(),
            fees: BTreeMap::new(),
            room_changes: BTreeMap::new(),
            wallets: BTreeMap::new(),
        }
    }

    pub fn repository(&self) -> &'r R {
        self.repository
    }

    pub fn find_room(&mut self, id: &RoomId) -> Result<Option<Room>, LedgerError> {
        let repository = self.repository;
        Ok(cached(
            &mut self.rooms,
            &mut self.expected,
            id,
            RecordKey::Room(id.clone()),
            || repository.room(id),
        )?)
    }

    pub fn room(&mut self, id: &RoomId) -> Result<Room, LedgerError> {
        self.find_room(id)?
            .ok_or_else(|| LedgerError::not_found(RecordKind::Room, id))
    }

    pub fn put_room(&mut self, room: Room) {
        let key = RecordKey::Room(room.id.clone());
        self.stage(key);
        self.rooms.insert(room.id.clone(), room);
    }

    pub fn student(&mut self, id: &StudentId) -> Result<Student, LedgerError> {
        let repository = self.repository;
        cached(
            &mut self.students,
            &mut self.expected,
            id,
            RecordKey::Student(id.clone()),
            || repository.student(id),
        )?
        .ok_or_else(|| LedgerError::not_found(RecordKind::Student, id))
    }

    pub fn put_student(&mut self, student: Student) {
        self.stage(RecordKey::Student(student.id.clone()));
        self.students.insert(student.id.clone(), student);
    }

    pub fn fee(&mut self, id: &FeeId) -> Result<Fee, LedgerError> {
        let repository = self.repository;
        cached(
            &mut self.fees,
            &mut self.expected,
            id,
            RecordKey::Fee(id.clone()),
            || repository.fee(id),
        )?
        .ok_or_else(|| LedgerError::not_found(RecordKind::Fee, id))
    }

    pub fn put_fee(&mut self, fee: Fee) {
        self.stage(RecordKey::Fee(fee.id.clone()));
        self.fees.insert(fee.id.clone(), fee);
    }

    /// Every fee of `student`, staged versions taking precedence over stored ones.
    pub fn fees_for_student(&mut self, student: &StudentId) -> Result<Vec<Fee>, LedgerError> {
        for Versioned { version, record } in self.repository.fees_for_student(student)? {
            let key = RecordKey::Fee(record.id.clone());
            if !self.fees.contains_key(&record.id) {
                self.expected.entry(key).or_insert(version);
                self.fees.insert(record.id.clone(), record);
            }
        }
        Ok(self
            .fees
            .values()
            .filter(|fee| &fee.student == student)
            .cloned()
            .collect())
    }

    /// Fee that already carries `transaction_id`, staged or stored.
    pub fn fee_by_transaction(&self, transaction_id: &str) -> Result<Option<FeeId>, LedgerError> {
        if let Some(fee) = self
            .fees
            .values()
            .find(|fee| fee.has_transaction(transaction_id))
        {
            return Ok(Some(fee.id.clone()));
        }
        Ok(self.repository.fee_by_transaction(transaction_id)?)
    }

    /// Transaction ids are unique across the ledger; reuse on another fee is a duplicate callback.
    pub fn ensure_transaction_unused(
        &self,
        owner: &FeeId,
        transaction_id: &str,
    ) -> Result<(), LedgerError> {
        match self.fee_by_transaction(transaction_id.trim())? {
            Some(fee) if &fee != owner => Err(LedgerError::AlreadySettled {
                fee,
                transaction_id: Some(transaction_id.trim().to_string()),
            }),
            _ => Ok(()),
        }
    }

    pub fn room_change(&mut self, id: &RoomChangeId) -> Result<RoomChangeRequest, LedgerError> {
        let repository = self.repository;
        cached(
            &mut self.room_changes,
            &mut self.expected,
            id,
            RecordKey::RoomChange(id.clone()),
            || repository.room_change(id),
        )?
        .ok_or_else(|| LedgerError::not_found(RecordKind::RoomChange, id))
    }

    pub fn put_room_change(&mut self, request: RoomChangeRequest) {
        self.stage(RecordKey::RoomChange(request.id.clone()));
        self.room_changes.insert(request.id.clone(), request);
    }

    /// Wallets are created lazily with a zero balance.
    pub fn wallet(&mut self, student: &StudentId) -> Result<Wallet, LedgerError> {
        let repository = self.repository;
        let existing = cached(
            &mut self.wallets,
            &mut self.expected,
            student,
            RecordKey::Wallet(student.clone()),
            || repository.wallet(student),
        )?;
        Ok(existing.unwrap_or_else(|| Wallet::new(student.clone())))
    }

    pub fn put_wallet(&mut self, wallet: Wallet) {
        self.stage(RecordKey::Wallet(wallet.student.clone()));
        self.wallets.insert(wallet.student.clone(), wallet);
    }

    pub fn into_change_set(self) -> ChangeSet {
        let mut changes = ChangeSet {
            expected: self.expected.into_iter().collect(),
            ..ChangeSet::default()
        };
        for key in &self.dirty {
            match key {
                RecordKey::Room(id) => changes.rooms.extend(self.rooms.get(id).cloned()),
                RecordKey::Student(id) => {
                    changes.students.extend(self.students.get(id).cloned())
                }
                RecordKey::Fee(id) => changes.fees.extend(self.fees.get(id).cloned()),
                RecordKey::RoomChange(id) => changes
                    .room_changes
                    .extend(self.room_changes.get(id).cloned()),
                RecordKey::Wallet(id) => changes.wallets.extend(self.wallets.get(id).cloned()),
            }
        }
        changes
    }

    pub fn commit(self) -> Result<(), RepositoryError> {
        let repository = self.repository;
        let changes = self.into_change_set();
        if changes.is_empty() {
            return Ok(());
        }
        let writes = changes.write_count();
        repository.commit(changes)?;
        debug!(writes, "unit of work committed");
        Ok(())
    }

    fn stage(&mut self, key: RecordKey) {
        // Writing a record that was never read asserts it does not exist yet.
        self.expected.entry(key.clone()).or_insert(0);
        self.dirty.insert(key);
    }
}

fn cached<K, T>(
    cache: &mut BTreeMap<K, T>,
    expected: &mut BTreeMap<RecordKey, u64>,
    id: &K,
    key: RecordKey,
    fetch: impl FnOnce() -> Result<Option<Versioned<T>>, RepositoryError>,
) -> Result<Option<T>, RepositoryError>
where
    K: Ord + Clone,
    T: Clone,
{
    if let Some(record) = cache.get(id) {
        return Ok(Some(record.clone()));
    }
    if expected.contains_key(&key) {
        return Ok(None);
    }
    match fetch()? {
        Some(Versioned { version, record }) => {
            expected.insert(key, version);
            cache.insert(id.clone(), record.clone());
            Ok(Some(record))
        }
        None => {
            expected.insert(key, 0);
            Ok(None)
        }
    }
}

/// Run `work` in a fresh unit of work, retrying on version conflicts.
///
/// Errors returned by `work` abort immediately and nothing is committed.
pub fn run_in_transaction<R, T, F>(
    repository: &R,
    attempts: u32,
    mut work: F,
) -> Result<T, LedgerError>
where
    R: HostelRepository + ?Sized,
    F: FnMut(&mut UnitOfWork<'_, R>) -> Result<T, LedgerError>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let mut unit = UnitOfWork::new(repository);
        let value = work(&mut unit)?;
        match unit.commit() {
            Ok(()) => return Ok(value),
            Err(RepositoryError::Conflict(record)) if attempt < attempts => {
                warn!(attempt, %record, "unit of work conflicted; retrying");
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
