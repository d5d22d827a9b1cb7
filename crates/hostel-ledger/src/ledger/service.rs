use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{LedgerError, RecordKind};
use super::fees::{
    derive_status, Fee, FeeLedger, FeeType, LateFeeCharge, LateFeePolicy, PaymentInput, PaymentMethod,
    PaymentReceipt,
};
use super::ids::{FeeId, RoomId, StudentId};
use super::notify::{dispatch, Notice, Notifier};
use super::pricing::{Amenities, AmenityLine, PriceCalculator, PricingTable, RoomType};
use super::room_change::RoomChangeSettlement;
use super::rooms::{allocate, release, MaintenanceStatus, Room, RoomDraft};
use super::store::{
    run_in_transaction, HostelRepository, UnitOfWork, DEFAULT_COMMIT_ATTEMPTS,
};
use super::students::{RoomAllocationStatus, Student, StudentDraft};
use super::wallet::{Wallet, WalletReason, WalletReference};

/// Injected pricing and fee policy plus the retry budget for optimistic commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSettings {
    pub pricing: PricingTable,
    pub late_fees: LateFeePolicy,
    pub commit_attempts: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            pricing: PricingTable::default(),
            late_fees: LateFeePolicy::default(),
            commit_attempts: DEFAULT_COMMIT_ATTEMPTS,
        }
    }
}

/// Price quote for a prospective room configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomQuote {
    pub room_type: RoomType,
    pub base_price: u64,
    pub amenities_price: u64,
    pub total_price: u64,
    pub amenities: Vec<AmenityLine>,
}

/// Room after an amenity edit together with the rent fees corrected to match.
#[derive(Debug, Clone, Serialize)]
pub struct AmenityUpdate {
    pub room: Room,
    pub corrected_fees: Vec<FeeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub student: Student,
    pub room: Room,
    pub fee: Fee,
}

/// Admin request to bill a student. Rent without an amount is priced from the student's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAssignment {
    pub student: StudentId,
    pub fee_type: FeeType,
    #[serde(default)]
    pub amount: Option<u64>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCredit {
    pub amount: u64,
    pub reason: WalletReason,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletApplication {
    pub wallet: Wallet,
    pub receipt: PaymentReceipt,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub fee: FeeId,
    pub error: String,
}

/// Outcome of one daily late-fee run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LateFeeSweepReport {
    pub processed: usize,
    pub skipped: usize,
    pub charged_total: u64,
    pub charges: Vec<LateFeeCharge>,
    pub failures: Vec<SweepFailure>,
}

/// Facade composing pricing, the ledgers, and room-change settlement over one repository.
pub struct HostelService<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    pricing: Arc<PriceCalculator>,
    fees: FeeLedger,
    room_changes: RoomChangeSettlement<R, N>,
    attempts: u32,
}

impl<R, N> HostelService<R, N>
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, settings: LedgerSettings) -> Self {
        let fees = FeeLedger::new(settings.late_fees);
        let attempts = settings.commit_attempts.max(1);
        let room_changes = RoomChangeSettlement::new(
            Arc::clone(&repository),
            Arc::clone(&notifier),
            fees.clone(),
            attempts,
        );

        Self {
            repository,
            notifier,
            pricing: Arc::new(PriceCalculator::new(settings.pricing)),
            fees,
            room_changes,
            attempts,
        }
    }

    pub fn pricing(&self) -> &PriceCalculator {
        &self.pricing
    }

    pub fn room_changes(&self) -> &RoomChangeSettlement<R, N> {
        &self.room_changes
    }

    pub fn quote(&self, room_type: RoomType, amenities: &Amenities) -> RoomQuote {
        let price = self.pricing.compute_price(room_type, amenities);
        RoomQuote {
            room_type,
            base_price: price.base_price,
            amenities_price: price.amenities_price,
            total_price: price.total_price,
            amenities: self.pricing.amenity_lines(amenities),
        }
    }

    pub fn create_room(&self, draft: RoomDraft) -> Result<Room, LedgerError> {
        let room = Room::from_draft(RoomId::next(), draft, &self.pricing)?;
        let identity = room.identity.normalized();
        if let Some(existing) = self
            .repository
            .rooms()?
            .into_iter()
            .find(|candidate| candidate.identity.normalized() == identity)
        {
            return Err(LedgerError::Conflict(format!(
                "room {} for {} already exists as {}",
                room.label(),
                identity.gender.label(),
                existing.id
            )));
        }

        run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            unit.put_room(room.clone());
            Ok(())
        })?;
        info!(room = %room.id, label = %room.label(), total_price = room.total_price, "room created");
        Ok(room)
    }

    pub fn get_room(&self, id: &RoomId) -> Result<Room, LedgerError> {
        self.repository
            .room(id)?
            .map(|versioned| versioned.record)
            .ok_or_else(|| LedgerError::not_found(RecordKind::Room, id))
    }

    /// Reprice a room and pull open rent fees of its occupants onto the new price.
    pub fn update_amenities(
        &self,
        id: &RoomId,
        amenities: Amenities,
    ) -> Result<AmenityUpdate, LedgerError> {
        let update = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut room = unit.room(id)?;
            let previous_price = room.total_price;
            room.reprice(amenities, &self.pricing)?;

            let mut corrected_fees = Vec::new();
            for occupant in room.occupants.clone() {
                let mut student = unit.student(&occupant)?;
                student.amount_to_pay = room.total_price;

                for mut fee in unit.fees_for_student(&occupant)? {
                    let is_room_rent = fee.fee_type == FeeType::Rent
                        && fee.is_open()
                        && fee.room.as_ref() == Some(&room.id);
                    if is_room_rent
                        && self.fees.apply_price_change(
                            &mut fee,
                            previous_price,
                            room.total_price,
                        )?
                    {
                        if fee.is_settled() {
                            student.confirm_payment();
                        }
                        corrected_fees.push(fee.id.clone());
                        unit.put_fee(fee);
                    }
                }
                unit.put_student(student);
            }

            unit.put_room(room.clone());
            Ok(AmenityUpdate {
                room,
                corrected_fees,
            })
        })?;

        info!(
            room = %update.room.id,
            total_price = update.room.total_price,
            corrected = update.corrected_fees.len(),
            "room amenities updated"
        );
        Ok(update)
    }

    pub fn set_maintenance(
        &self,
        id: &RoomId,
        maintenance: MaintenanceStatus,
    ) -> Result<Room, LedgerError> {
        let room = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut room = unit.room(id)?;
            room.set_maintenance(maintenance);
            unit.put_room(room.clone());
            Ok(room)
        })?;
        info!(
            room = %room.id,
            maintenance = room.maintenance_status.label(),
            status = room.status.label(),
            "room maintenance updated"
        );
        Ok(room)
    }

    pub fn register_student(&self, draft: StudentDraft) -> Result<Student, LedgerError> {
        let student = Student::enroll(StudentId::next(), draft)?;
        run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            unit.put_student(student.clone());
            Ok(())
        })?;
        info!(student = %student.id, "student registered");
        Ok(student)
    }

    pub fn get_student(&self, id: &StudentId) -> Result<Student, LedgerError> {
        self.repository
            .student(id)?
            .map(|versioned| versioned.record)
            .ok_or_else(|| LedgerError::not_found(RecordKind::Student, id))
    }

    /// Take a bed and bill the full room price as rent due on `due_date`.
    pub fn allocate_room(
        &self,
        student_id: &StudentId,
        room_id: &RoomId,
        due_date: NaiveDate,
    ) -> Result<Allocation, LedgerError> {
        let allocation = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut student = unit.student(student_id)?;
            if let Some(current) = &student.room {
                return Err(LedgerError::Conflict(format!(
                    "student {} already occupies room {current}",
                    student.id
                )));
            }

            let mut room = unit.room(room_id)?;
            if room.identity.gender != student.gender {
                return Err(LedgerError::validation(format!(
                    "room {} is reserved for {}",
                    room.label(),
                    room.identity.gender.label()
                )));
            }
            allocate(&mut room, &student.id)?;

            let fee = self.fees.assign(&student.id, &room, FeeType::Rent, due_date);
            student.assign_room(room.id.clone(), room.total_price);

            unit.put_room(room.clone());
            unit.put_student(student.clone());
            unit.put_fee(fee.clone());
            Ok(Allocation { student, room, fee })
        })?;

        info!(
            student = %allocation.student.id,
            room = %allocation.room.id,
            occupancy = allocation.room.current_occupancy,
            "room allocated"
        );
        self.notify_fee_assigned(&allocation.fee);
        Ok(allocation)
    }

    pub fn vacate_room(&self, student_id: &StudentId) -> Result<Student, LedgerError> {
        let student = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut student = unit.student(student_id)?;
            let room_id = student
                .room
                .clone()
                .ok_or_else(|| LedgerError::validation("student has no allocated room"))?;
            if let Some(open) = unit.repository().open_room_change_for(&student.id)? {
                return Err(LedgerError::Conflict(format!(
                    "room change request {open} must be resolved before vacating"
                )));
            }

            let mut room = unit.room(&room_id)?;
            release(&mut room, &student.id)?;
            student.vacate();

            unit.put_room(room);
            unit.put_student(student.clone());
            Ok(student)
        })?;
        info!(student = %student.id, "room vacated");
        Ok(student)
    }

    pub fn assign_fee(&self, assignment: FeeAssignment) -> Result<Fee, LedgerError> {
        let fee = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let student = unit.student(&assignment.student)?;
            let fee = match (assignment.fee_type, assignment.amount) {
                (FeeType::Rent, None) => {
                    let room_id = student.room.clone().ok_or_else(|| {
                        LedgerError::validation("rent needs an allocated room or an explicit amount")
                    })?;
                    let room = unit.room(&room_id)?;
                    let mut fee =
                        self.fees
                            .assign(&student.id, &room, FeeType::Rent, assignment.due_date);
                    if let Some(description) = assignment.description.clone() {
                        fee.description = description;
                    }
                    fee
                }
                (fee_type, Some(amount)) => self.fees.assign_charge(
                    &student.id,
                    fee_type,
                    amount,
                    assignment.due_date,
                    assignment.description.clone(),
                )?,
                (fee_type, None) => {
                    return Err(LedgerError::validation(format!(
                        "an amount is required for {} fees",
                        fee_type.label()
                    )))
                }
            };
            unit.put_fee(fee.clone());
            Ok(fee)
        })?;

        info!(fee = %fee.id, student = %fee.student, amount = fee.amount, "fee assigned");
        self.notify_fee_assigned(&fee);
        Ok(fee)
    }

    pub fn fee(&self, id: &FeeId) -> Result<Fee, LedgerError> {
        self.repository
            .fee(id)?
            .map(|versioned| versioned.record)
            .ok_or_else(|| LedgerError::not_found(RecordKind::Fee, id))
    }

    /// Fee with its status as observed on `today`; unswept past-due fees read overdue.
    pub fn fee_as_of(&self, id: &FeeId, today: NaiveDate) -> Result<Fee, LedgerError> {
        let mut fee = self.fee(id)?;
        fee.status = derive_status(&fee, today);
        Ok(fee)
    }

    pub fn fees_for_student_as_of(
        &self,
        student: &StudentId,
        today: NaiveDate,
    ) -> Result<Vec<Fee>, LedgerError> {
        let mut fees = self.fees_for_student(student)?;
        for fee in &mut fees {
            fee.status = derive_status(fee, today);
        }
        Ok(fees)
    }

    pub fn fees_for_student(&self, student: &StudentId) -> Result<Vec<Fee>, LedgerError> {
        self.get_student(student)?;
        let mut fees: Vec<Fee> = self
            .repository
            .fees_for_student(student)?
            .into_iter()
            .map(|versioned| versioned.record)
            .collect();
        fees.sort_by(|left, right| {
            left.due_date
                .cmp(&right.due_date)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(fees)
    }

    /// Gateway callback entry point; replays of a transaction id are refused.
    pub fn apply_payment(
        &self,
        fee_id: &FeeId,
        payment: PaymentInput,
    ) -> Result<PaymentReceipt, LedgerError> {
        let (fee, receipt, carried) =
            run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
                let mut fee = unit.fee(fee_id)?;
                unit.ensure_transaction_unused(&fee.id, &payment.transaction_id)?;
                let receipt = self.fees.apply_payment(&mut fee, payment.clone())?;
                let carried = self.fees.carry_late_fee(&mut fee, payment.paid_on);
                confirm_allocation(unit, &fee)?;
                unit.put_fee(fee.clone());
                if let Some(carried) = carried.as_ref() {
                    unit.put_fee(carried.clone());
                }
                Ok((fee, receipt, carried))
            })?;

        dispatch(
            self.notifier.as_ref(),
            Notice::new("payment_received", &fee.student)
                .detail("fee", &fee.id)
                .detail("amount", receipt.amount)
                .detail("status", fee.status.label()),
        );
        if let Some(carried) = carried.as_ref() {
            self.notify_fee_assigned(carried);
        }
        Ok(receipt)
    }

    /// Daily sweep over open fees. Each fee commits on its own; failures are logged and skipped.
    pub fn accrue_late_fees(&self, today: NaiveDate) -> Result<LateFeeSweepReport, LedgerError> {
        let mut report = LateFeeSweepReport::default();

        for fee_id in self.repository.open_fee_ids()? {
            report.processed += 1;
            let outcome = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
                let mut fee = unit.fee(&fee_id)?;
                let charge = self.fees.accrue_late_fee(&mut fee, today)?;
                if charge.is_some() {
                    unit.put_fee(fee);
                }
                Ok(charge)
            });

            match outcome {
                Ok(Some(charge)) => {
                    report.charged_total = report.charged_total.saturating_add(charge.amount);
                    dispatch(
                        self.notifier.as_ref(),
                        Notice::new("late_fee_applied", &charge.student)
                            .detail("fee", &charge.fee)
                            .detail("late_fee", charge.late_fee_total)
                            .detail("days_overdue", charge.days_overdue),
                    );
                    report.charges.push(charge);
                }
                Ok(None) => report.skipped += 1,
                Err(err) => {
                    warn!(fee = %fee_id, error = %err, "late fee accrual failed");
                    report.failures.push(SweepFailure {
                        fee: fee_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.processed,
            charged = report.charges.len(),
            charged_total = report.charged_total,
            failures = report.failures.len(),
            "late fee sweep finished"
        );
        Ok(report)
    }

    pub fn wallet(&self, student: &StudentId) -> Result<Wallet, LedgerError> {
        self.get_student(student)?;
        Ok(self
            .repository
            .wallet(student)?
            .map(|versioned| versioned.record)
            .unwrap_or_else(|| Wallet::new(student.clone())))
    }

    /// Manual refund or adjustment credited by an admin.
    pub fn credit_wallet(
        &self,
        student_id: &StudentId,
        credit: WalletCredit,
        today: NaiveDate,
    ) -> Result<Wallet, LedgerError> {
        run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let student = unit.student(student_id)?;
            let mut wallet = unit.wallet(&student.id)?;
            let description = credit
                .description
                .clone()
                .unwrap_or_else(|| "manual wallet credit".to_string());
            wallet.credit(
                credit.amount,
                credit.reason,
                description,
                WalletReference::default(),
                today,
            )?;
            unit.put_wallet(wallet.clone());
            Ok(wallet)
        })
    }

    /// Pay a fee from wallet credit. Without an amount the largest coverable sum is used.
    pub fn apply_wallet_to_fee(
        &self,
        student_id: &StudentId,
        fee_id: &FeeId,
        amount: Option<u64>,
        today: NaiveDate,
    ) -> Result<WalletApplication, LedgerError> {
        let (fee, application, carried) =
            run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
                let mut fee = unit.fee(fee_id)?;
                if &fee.student != student_id {
                    return Err(LedgerError::validation(format!(
                        "fee {} does not belong to student {student_id}",
                        fee.id
                    )));
                }

                let mut wallet = unit.wallet(student_id)?;
                let amount = amount.unwrap_or_else(|| wallet.balance.min(fee.outstanding()));
                let reason = match fee.fee_type {
                    FeeType::MessFee => WalletReason::MessFee,
                    _ => WalletReason::HostelFee,
                };
                wallet.debit(
                    amount,
                    reason,
                    format!("applied to {}", fee.description),
                    WalletReference {
                        room_change: None,
                        fee: Some(fee.id.clone()),
                    },
                    today,
                )?;

                let transaction_id = format!("wallet-{}-{}", fee.id, fee.payments.len() + 1);
                let receipt = self.fees.apply_payment(
                    &mut fee,
                    PaymentInput {
                        amount,
                        method: PaymentMethod::Wallet,
                        transaction_id,
                        paid_on: today,
                    },
                )?;
                let carried = self.fees.carry_late_fee(&mut fee, today);
                confirm_allocation(unit, &fee)?;

                unit.put_wallet(wallet.clone());
                unit.put_fee(fee.clone());
                if let Some(carried) = carried.as_ref() {
                    unit.put_fee(carried.clone());
                }
                Ok((fee, WalletApplication { wallet, receipt }, carried))
            })?;

        dispatch(
            self.notifier.as_ref(),
            Notice::new("payment_received", &fee.student)
                .detail("fee", &fee.id)
                .detail("amount", application.receipt.amount)
                .detail("method", PaymentMethod::Wallet.label()),
        );
        if let Some(carried) = carried.as_ref() {
            self.notify_fee_assigned(carried);
        }
        Ok(application)
    }

    fn notify_fee_assigned(&self, fee: &Fee) {
        dispatch(
            self.notifier.as_ref(),
            Notice::new("fee_assigned", &fee.student)
                .detail("fee", &fee.id)
                .detail("amount", fee.amount)
                .detail("due_date", fee.due_date),
        );
    }
}

/// Settling the rent of the student's current room confirms the allocation.
fn confirm_allocation<R>(unit: &mut UnitOfWork<'_, R>, fee: &Fee) -> Result<(), LedgerError>
where
    R: HostelRepository + ?Sized,
{
    if fee.fee_type != FeeType::Rent || !fee.is_settled() || fee.room.is_none() {
        return Ok(());
    }
    let mut student = unit.student(&fee.student)?;
    if student.room == fee.room
        && student.room_allocation_status != RoomAllocationStatus::Confirmed
    {
        student.confirm_payment();
        unit.put_student(student);
    }
    Ok(())
}
