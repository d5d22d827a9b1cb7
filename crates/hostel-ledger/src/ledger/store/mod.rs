//! Versioned persistence seam and the optimistic unit of work built on it.

mod memory;
mod unit_of_work;

pub use memory::MemoryHostelRepository;
pub use unit_of_work::{run_in_transaction, UnitOfWork, DEFAULT_COMMIT_ATTEMPTS};

use std::fmt;

use super::fees::Fee;
use super::ids::{FeeId, RoomChangeId, RoomId, StudentId};
use super::room_change::RoomChangeRequest;
use super::rooms::Room;
use super::students::Student;
use super::wallet::Wallet;

/// A record together with the version it was read at. Version 0 means "absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, record: T) -> Self {
        Self { version, record }
    }
}

/// Address of one stored record, used to track read and write versions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    Room(RoomId),
    Student(StudentId),
    Fee(FeeId),
    RoomChange(RoomChangeId),
    Wallet(StudentId),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Room(id) => write!(f, "room {id}"),
            Self::Student(id) => write!(f, "student {id}"),
            Self::Fee(id) => write!(f, "fee {id}"),
            Self::RoomChange(id) => write!(f, "room change {id}"),
            Self::Wallet(id) => write!(f, "wallet {id}"),
        }
    }
}

/// Everything one unit of work read and wants to write.
///
/// `expected` carries the version observed for every touched record; the
/// repository refuses the whole set when any of them has moved on.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub expected: Vec<(RecordKey, u64)>,
    pub rooms: Vec<Room>,
    pub students: Vec<Student>,
    pub fees: Vec<Fee>,
    pub room_changes: Vec<RoomChangeRequest>,
    pub wallets: Vec<Wallet>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
            && self.students.is_empty()
            && self.fees.is_empty()
            && self.room_changes.is_empty()
            && self.wallets.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.rooms.len()
            + self.students.len()
            + self.fees.len()
            + self.room_changes.len()
            + self.wallets.len()
    }
}

/// Storage abstraction so the ledgers can run against any backend.
pub trait HostelRepository: Send + Sync {
    fn room(&self, id: &RoomId) -> Result<Option<Versioned<Room>>, RepositoryError>;
    fn rooms(&self) -> Result<Vec<Room>, RepositoryError>;
    fn student(&self, id: &StudentId) -> Result<Option<Versioned<Student>>, RepositoryError>;
    fn fee(&self, id: &FeeId) -> Result<Option<Versioned<Fee>>, RepositoryError>;
    fn fees_for_student(&self, student: &StudentId)
        -> Result<Vec<Versioned<Fee>>, RepositoryError>;
    /// Ids of every fee whose status is still open.
    fn open_fee_ids(&self) -> Result<Vec<FeeId>, RepositoryError>;
    fn fee_by_transaction(&self, transaction_id: &str) -> Result<Option<FeeId>, RepositoryError>;
    fn room_change(
        &self,
        id: &RoomChangeId,
    ) -> Result<Option<Versioned<RoomChangeRequest>>, RepositoryError>;
    fn open_room_change_for(
        &self,
        student: &StudentId,
    ) -> Result<Option<RoomChangeId>, RepositoryError>;
    fn wallet(&self, student: &StudentId) -> Result<Option<Versioned<Wallet>>, RepositoryError>;
    /// Apply every write atomically or none of them.
    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("concurrent update on {0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
