use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::ledger::fees::{Fee, PaymentInput, PaymentMethod};
use crate::ledger::ids::{FeeId, RoomChangeId, RoomId, StudentId};
use crate::ledger::notify::{Notice, Notifier, NotifyError};
use crate::ledger::pricing::{Amenities, RoomType};
use crate::ledger::room_change::RoomChangeRequest;
use crate::ledger::rooms::{Gender, Room, RoomDraft, RoomIdentity};
use crate::ledger::service::{HostelService, LedgerSettings};
use crate::ledger::store::{
    ChangeSet, HostelRepository, MemoryHostelRepository, RepositoryError, Versioned,
};
use crate::ledger::students::{Student, StudentDraft};
use crate::ledger::wallet::Wallet;
use crate::ledger::{ledger_router, LedgerError};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn term_start() -> NaiveDate {
    date(2024, 1, 1)
}

pub(super) fn ac_and_wifi() -> Amenities {
    Amenities {
        ac: true,
        wifi: true,
        ..Amenities::default()
    }
}

pub(super) fn room_draft(number: &str, room_type: RoomType, capacity: u8, amenities: Amenities) -> RoomDraft {
    RoomDraft {
        identity: RoomIdentity {
            room_number: number.to_string(),
            block: "A".to_string(),
            gender: Gender::Boys,
        },
        floor: 1,
        room_type,
        capacity,
        amenities,
        allow_room_changes: true,
    }
}

pub(super) fn student_draft(name: &str) -> StudentDraft {
    StudentDraft {
        name: name.to_string(),
        gender: Gender::Boys,
    }
}

pub(super) fn payment(amount: u64, transaction_id: &str) -> PaymentInput {
    PaymentInput {
        amount,
        method: PaymentMethod::Upi,
        transaction_id: transaction_id.to_string(),
        paid_on: date(2024, 1, 5),
    }
}

pub(super) type TestService = HostelService<ScriptedRepository, MemoryNotifier>;

pub(super) fn build_service() -> (TestService, Arc<ScriptedRepository>, Arc<MemoryNotifier>) {
    let repository = Arc::new(ScriptedRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = HostelService::new(
        repository.clone(),
        notifier.clone(),
        LedgerSettings::default(),
    );
    (service, repository, notifier)
}

/// Creates a room and a student allocated to it with rent due at term start.
pub(super) fn seat_student(
    service: &TestService,
    name: &str,
    room: &RoomId,
) -> (Student, Fee) {
    let student = service
        .register_student(student_draft(name))
        .expect("student registered");
    let allocation = service
        .allocate_room(&student.id, room, term_start())
        .expect("room allocated");
    (allocation.student, allocation.fee)
}

pub(super) fn create_room(service: &TestService, draft: RoomDraft) -> Room {
    service.create_room(draft).expect("room created")
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl MemoryNotifier {
    pub(super) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn templates(&self) -> Vec<String> {
        self.notices()
            .into_iter()
            .map(|notice| notice.template)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _notice: Notice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay down".to_string()))
    }
}

/// Memory repository with hooks to fail commits or hold the first two commits at a barrier.
#[derive(Default)]
pub(super) struct ScriptedRepository {
    pub(super) inner: MemoryHostelRepository,
    fail_commits: AtomicBool,
    gate: Mutex<Option<Arc<Barrier>>>,
    gated_commits: AtomicUsize,
}

impl ScriptedRepository {
    pub(super) fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// The next two commits wait for each other before either is applied.
    pub(super) fn arm_gate(&self) {
        self.gated_commits.store(0, Ordering::SeqCst);
        *self.gate.lock().expect("gate mutex poisoned") = Some(Arc::new(Barrier::new(2)));
    }
}

impl HostelRepository for ScriptedRepository {
    fn room(&self, id: &RoomId) -> Result<Option<Versioned<Room>>, RepositoryError> {
        self.inner.room(id)
    }

    fn rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        self.inner.rooms()
    }

    fn student(&self, id: &StudentId) -> Result<Option<Versioned<Student>>, RepositoryError> {
        self.inner.student(id)
    }

    fn fee(&self, id: &FeeId) -> Result<Option<Versioned<Fee>>, RepositoryError> {
        self.inner.fee(id)
    }

    fn fees_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Versioned<Fee>>, RepositoryError> {
        self.inner.fees_for_student(student)
    }

    fn open_fee_ids(&self) -> Result<Vec<FeeId>, RepositoryError> {
        self.inner.open_fee_ids()
    }

    fn fee_by_transaction(&self, transaction_id: &str) -> Result<Option<FeeId>, RepositoryError> {
        self.inner.fee_by_transaction(transaction_id)
    }

    fn room_change(
        &self,
        id: &RoomChangeId,
    ) -> Result<Option<Versioned<RoomChangeRequest>>, RepositoryError> {
        self.inner.room_change(id)
    }

    fn open_room_change_for(
        &self,
        student: &StudentId,
    ) -> Result<Option<RoomChangeId>, RepositoryError> {
        self.inner.open_room_change_for(student)
    }

    fn wallet(&self, student: &StudentId) -> Result<Option<Versioned<Wallet>>, RepositoryError> {
        self.inner.wallet(student)
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), RepositoryError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        let barrier = self.gate.lock().expect("gate mutex poisoned").clone();
        if let Some(barrier) = barrier {
            if self.gated_commits.fetch_add(1, Ordering::SeqCst) < 2 {
                barrier.wait();
            }
        }
        self.inner.commit(changes)
    }
}

pub(super) struct UnavailableRepository;

impl UnavailableRepository {
    fn offline<T>() -> Result<T, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

impl HostelRepository for UnavailableRepository {
    fn room(&self, _id: &RoomId) -> Result<Option<Versioned<Room>>, RepositoryError> {
        Self::offline()
    }

    fn rooms(&self) -> Result<Vec<Room>, RepositoryError> {
        Self::offline()
    }

    fn student(&self, _id: &StudentId) -> Result<Option<Versioned<Student>>, RepositoryError> {
        Self::offline()
    }

    fn fee(&self, _id: &FeeId) -> Result<Option<Versioned<Fee>>, RepositoryError> {
        Self::offline()
    }

    fn fees_for_student(
        &self,
        _student: &StudentId,
    ) -> Result<Vec<Versioned<Fee>>, RepositoryError> {
        Self::offline()
    }

    fn open_fee_ids(&self) -> Result<Vec<FeeId>, RepositoryError> {
        Self::offline()
    }

    fn fee_by_transaction(&self, _transaction_id: &str) -> Result<Option<FeeId>, RepositoryError> {
        Self::offline()
    }

    fn room_change(
        &self,
        _id: &RoomChangeId,
    ) -> Result<Option<Versioned<RoomChangeRequest>>, RepositoryError> {
        Self::offline()
    }

    fn open_room_change_for(
        &self,
        _student: &StudentId,
    ) -> Result<Option<RoomChangeId>, RepositoryError> {
        Self::offline()
    }

    fn wallet(&self, _student: &StudentId) -> Result<Option<Versioned<Wallet>>, RepositoryError> {
        Self::offline()
    }

    fn commit(&self, _changes: ChangeSet) -> Result<(), RepositoryError> {
        Self::offline()
    }
}

pub(super) fn router_with_service(service: TestService) -> axum::Router {
    ledger_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_not_found(result: Result<impl std::fmt::Debug, LedgerError>) {
    match result {
        Err(LedgerError::NotFound { .. }) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}
