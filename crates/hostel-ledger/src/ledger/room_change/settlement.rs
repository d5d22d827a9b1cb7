use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::domain::{
    RoomChangeAction, RoomChangeRequest, RoomChangeStatus, RoomChangeSubmission,
    UpgradePaymentStatus,
};
use super::quote::{already_paid_surplus, RoomChangeQuote};
use crate::ledger::error::{LedgerError, RecordKind};
use crate::ledger::fees::{FeeLedger, FeeType, PaymentInput, PaymentReceipt};
use crate::ledger::ids::{RoomChangeId, StudentId};
use crate::ledger::notify::{dispatch, Notice, Notifier};
use crate::ledger::rooms::{availability_error, transfer};
use crate::ledger::store::{run_in_transaction, HostelRepository};
use crate::ledger::wallet::{WalletReason, WalletReference};

/// Orchestrates the room-change state machine over the repository.
pub struct RoomChangeSettlement<R, N> {
    repository: Arc<R>,
    notifier: Arc<N>,
    fees: FeeLedger,
    attempts: u32,
}

impl<R, N> RoomChangeSettlement<R, N>
where
    R: HostelRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(repository: Arc<R>, notifier: Arc<N>, fees: FeeLedger, attempts: u32) -> Self {
        Self {
            repository,
            notifier,
            fees,
            attempts,
        }
    }

    pub fn submit(
        &self,
        submission: RoomChangeSubmission,
        today: NaiveDate,
    ) -> Result<RoomChangeRequest, LedgerError> {
        let reason = submission.reason.trim().to_string();
        if reason.is_empty() {
            return Err(LedgerError::validation("a reason for the room change is required"));
        }

        let request = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let student = unit.student(&submission.student)?;
            let current_id = student
                .room
                .clone()
                .ok_or_else(|| LedgerError::validation("student has no allocated room"))?;
            if current_id == submission.requested_room {
                return Err(LedgerError::validation(
                    "requested room is the room the student already occupies",
                ));
            }

            let requested = unit.room(&submission.requested_room)?;
            if !requested.allow_room_changes {
                return Err(LedgerError::unavailable(
                    &requested.id,
                    "room does not accept room changes",
                ));
            }
            if requested.identity.gender != student.gender {
                return Err(LedgerError::validation(format!(
                    "room {} is reserved for {}",
                    requested.label(),
                    requested.identity.gender.label()
                )));
            }
            if let Some(err) = availability_error(&requested) {
                return Err(err);
            }
            if let Some(open) = unit.repository().open_room_change_for(&student.id)? {
                return Err(LedgerError::Conflict(format!(
                    "student {} already has open room change request {open}",
                    student.id
                )));
            }

            let current = unit.room(&current_id)?;
            let fees = unit.fees_for_student(&student.id)?;
            let quote =
                RoomChangeQuote::between(&current, &requested, already_paid_surplus(&current, &fees));

            let upgrade_obligation = if quote.upgrade_payment_required > 0 {
                let mut obligation = self.fees.assign_charge(
                    &student.id,
                    FeeType::Other,
                    quote.upgrade_payment_required,
                    today,
                    Some(format!(
                        "room upgrade from {} to {}",
                        current.label(),
                        requested.label()
                    )),
                )?;
                obligation.room = Some(requested.id.clone());
                Some(obligation)
            } else {
                None
            };

            let request = RoomChangeRequest {
                id: RoomChangeId::next(),
                student: student.id.clone(),
                current_room: current.id.clone(),
                requested_room: requested.id.clone(),
                reason: reason.clone(),
                current_room_price: quote.current_room_price,
                requested_room_price: quote.requested_room_price,
                price_difference: quote.price_difference,
                already_paid_surplus: quote.already_paid_surplus,
                upgrade_payment_required: quote.upgrade_payment_required,
                downgrade_wallet_credit: quote.downgrade_wallet_credit,
                payment_status: if quote.upgrade_payment_required > 0 {
                    UpgradePaymentStatus::Pending
                } else {
                    UpgradePaymentStatus::NotRequired
                },
                upgrade_obligation,
                status: RoomChangeStatus::initial(quote.upgrade_payment_required),
                rejection_reason: None,
                admin_notes: None,
                submitted_on: today,
                reviewed_on: None,
                completed_on: None,
                old_room_occupancy_before: None,
                new_room_occupancy_before: None,
            };
            unit.put_room_change(request.clone());
            Ok(request)
        })?;

        info!(
            request = %request.id,
            student = %request.student,
            price_difference = request.price_difference,
            status = request.status.label(),
            "room change submitted"
        );
        dispatch(
            self.notifier.as_ref(),
            Notice::new("room_change_submitted", &request.student)
                .detail("request", &request.id)
                .detail("status", request.status.label()),
        );
        Ok(request)
    }

    /// Apply a gateway payment to the upgrade obligation of a request.
    pub fn pay(
        &self,
        id: &RoomChangeId,
        payment: PaymentInput,
    ) -> Result<(RoomChangeRequest, PaymentReceipt), LedgerError> {
        let (request, receipt) =
            run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
                let mut request = unit.room_change(id)?;
                if !request.is_open() {
                    return Err(LedgerError::InvalidTransition {
                        entity: "room change request",
                        from: request.status.label(),
                        action: "pay for",
                    });
                }
                let mut obligation = request.upgrade_obligation.clone().ok_or_else(|| {
                    LedgerError::validation(format!(
                        "room change request {id} has no upgrade payment to settle"
                    ))
                })?;

                unit.ensure_transaction_unused(&obligation.id, &payment.transaction_id)?;
                let receipt = self.fees.apply_payment(&mut obligation, payment.clone())?;
                let settled = obligation.is_settled();
                request.upgrade_obligation = Some(obligation);
                if settled {
                    request.payment_status = UpgradePaymentStatus::Paid;
                    request.advance(RoomChangeAction::PaymentSettled)?;
                }
                unit.put_room_change(request.clone());
                Ok((request, receipt))
            })?;

        info!(
            request = %request.id,
            amount = receipt.amount,
            payment_status = request.payment_status.label(),
            "upgrade payment applied"
        );
        dispatch(
            self.notifier.as_ref(),
            Notice::new("upgrade_payment_received", &request.student)
                .detail("request", &request.id)
                .detail("amount", receipt.amount)
                .detail("outstanding", request.upgrade_outstanding()),
        );
        Ok((request, receipt))
    }

    pub fn begin_review(
        &self,
        id: &RoomChangeId,
        admin_notes: Option<String>,
        today: NaiveDate,
    ) -> Result<RoomChangeRequest, LedgerError> {
        let request = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut request = unit.room_change(id)?;
            request.advance(RoomChangeAction::BeginReview)?;
            request.reviewed_on = Some(today);
            if admin_notes.is_some() {
                request.admin_notes = admin_notes.clone();
            }
            unit.put_room_change(request.clone());
            Ok(request)
        })?;
        info!(request = %request.id, "room change under review");
        Ok(request)
    }

    /// Move the student, re-link their open rent and settle the price delta in one commit.
    pub fn approve(
        &self,
        id: &RoomChangeId,
        admin_notes: Option<String>,
        today: NaiveDate,
    ) -> Result<RoomChangeRequest, LedgerError> {
        let request = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut request = unit.room_change(id)?;
            request.advance(RoomChangeAction::Approve)?;

            let mut student = unit.student(&request.student)?;
            if student.room.as_ref() != Some(&request.current_room) {
                return Err(LedgerError::Conflict(format!(
                    "student {} no longer occupies room {}",
                    student.id, request.current_room
                )));
            }

            let mut from = unit.room(&request.current_room)?;
            let mut to = unit.room(&request.requested_room)?;
            request.old_room_occupancy_before = Some(from.current_occupancy);
            request.new_room_occupancy_before = Some(to.current_occupancy);
            transfer(&mut from, &mut to, &student.id)?;

            student.room = Some(to.id.clone());
            student.amount_to_pay = to.total_price;

            for mut fee in unit.fees_for_student(&student.id)? {
                if fee.fee_type == FeeType::Rent
                    && fee.is_open()
                    && fee.room.as_ref() == Some(&from.id)
                {
                    fee.room = Some(to.id.clone());
                    unit.put_fee(fee);
                }
            }

            if let Some(obligation) = request.upgrade_obligation.as_ref() {
                if obligation.paid_amount > 0 {
                    unit.put_fee(obligation.clone());
                }
            }

            if request.downgrade_wallet_credit > 0 {
                let mut wallet = unit.wallet(&student.id)?;
                wallet.credit(
                    request.downgrade_wallet_credit,
                    WalletReason::RoomDowngrade,
                    format!("room downgrade from {} to {}", from.label(), to.label()),
                    WalletReference {
                        room_change: Some(request.id.clone()),
                        fee: None,
                    },
                    today,
                )?;
                unit.put_wallet(wallet);
            }

            request.advance(RoomChangeAction::Complete)?;
            request.reviewed_on.get_or_insert(today);
            request.completed_on = Some(today);
            if admin_notes.is_some() {
                request.admin_notes = admin_notes.clone();
            }

            unit.put_room(from);
            unit.put_room(to);
            unit.put_student(student);
            unit.put_room_change(request.clone());
            Ok(request)
        })?;

        info!(
            request = %request.id,
            student = %request.student,
            from = %request.current_room,
            to = %request.requested_room,
            wallet_credit = request.downgrade_wallet_credit,
            "room change completed"
        );
        dispatch(
            self.notifier.as_ref(),
            Notice::new("room_change_approved", &request.student)
                .detail("request", &request.id)
                .detail("room", &request.requested_room)
                .detail("wallet_credit", request.downgrade_wallet_credit),
        );
        Ok(request)
    }

    pub fn reject(
        &self,
        id: &RoomChangeId,
        reason: &str,
        today: NaiveDate,
    ) -> Result<RoomChangeRequest, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::validation("a rejection reason is required"));
        }

        let request = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut request = unit.room_change(id)?;
            request.advance(RoomChangeAction::Reject)?;
            request.rejection_reason = Some(reason.to_string());
            request.reviewed_on = Some(today);
            unit.put_room_change(request.clone());
            Ok(request)
        })?;

        info!(request = %request.id, "room change rejected");
        dispatch(
            self.notifier.as_ref(),
            Notice::new("room_change_rejected", &request.student)
                .detail("request", &request.id)
                .detail("reason", reason),
        );
        Ok(request)
    }

    /// Student withdrawal; refused once any upgrade money has been collected.
    pub fn cancel(
        &self,
        id: &RoomChangeId,
        student: Option<&StudentId>,
    ) -> Result<RoomChangeRequest, LedgerError> {
        let request = run_in_transaction(self.repository.as_ref(), self.attempts, |unit| {
            let mut request = unit.room_change(id)?;
            if let Some(student) = student {
                if student != &request.student {
                    return Err(LedgerError::not_found(RecordKind::RoomChange, id));
                }
            }
            if request.upgrade_paid() > 0 {
                return Err(LedgerError::Conflict(format!(
                    "room change request {id} has {} in upgrade payments and cannot be cancelled",
                    request.upgrade_paid()
                )));
            }
            request.advance(RoomChangeAction::Cancel)?;
            unit.put_room_change(request.clone());
            Ok(request)
        })?;
        info!(request = %request.id, "room change cancelled");
        Ok(request)
    }

    pub fn get(&self, id: &RoomChangeId) -> Result<RoomChangeRequest, LedgerError> {
        self.repository
            .room_change(id)?
            .map(|versioned| versioned.record)
            .ok_or_else(|| LedgerError::not_found(RecordKind::RoomChange, id))
    }
}
