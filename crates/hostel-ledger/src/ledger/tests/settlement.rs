use std::thread;

use super::common::*;

use crate::ledger::fees::{FeeStatus, FeeType};
use crate::ledger::ids::RoomId;
use crate::ledger::pricing::{Amenities, RoomType};
use crate::ledger::room_change::{
    RoomChangeAction, RoomChangeRequest, RoomChangeStatus, RoomChangeSubmission,
    UpgradePaymentStatus,
};
use crate::ledger::rooms::MaintenanceStatus;
use crate::ledger::students::Student;
use crate::ledger::wallet::WalletReason;
use crate::ledger::{LedgerError, RepositoryError};

fn submission(student: &Student, target: &RoomId) -> RoomChangeSubmission {
    RoomChangeSubmission {
        student: student.id.clone(),
        requested_room: target.clone(),
        reason: "closer to the library".to_string(),
    }
}

fn review_day() -> chrono::NaiveDate {
    date(2024, 2, 1)
}

/// Student in a plain double (24000) asking for a double with a geyser (29000).
fn upgrade_fixture(
    service: &TestService,
    suffix: &str,
) -> (Student, RoomId, RoomId, RoomChangeRequest) {
    let current = create_room(
        service,
        room_draft(&format!("U{suffix}"), RoomType::Double, 2, Amenities::default()),
    );
    let target = create_room(
        service,
        room_draft(
            &format!("UG{suffix}"),
            RoomType::Double,
            2,
            Amenities {
                geyser: true,
                ..Amenities::default()
            },
        ),
    );
    let (student, _) = seat_student(service, "Rohan", &current.id);
    let request = service
        .room_changes()
        .submit(submission(&student, &target.id), review_day())
        .expect("request submitted");
    (student, current.id, target.id, request)
}

#[test]
fn upgrade_needs_payment_before_approval() {
    let (service, _, _) = build_service();
    let (_, current, target, request) = upgrade_fixture(&service, "1");

    assert_eq!(request.price_difference, 5_000);
    assert_eq!(request.upgrade_payment_required, 5_000);
    assert_eq!(request.payment_status, UpgradePaymentStatus::Pending);
    assert_eq!(request.status, RoomChangeStatus::PendingPayment);

    match service
        .room_changes()
        .approve(&request.id, None, review_day())
    {
        Err(LedgerError::PaymentRequired { outstanding, .. }) => assert_eq!(outstanding, 5_000),
        other => panic!("expected payment required, got {other:?}"),
    }

    assert_eq!(service.get_room(&current).expect("room").current_occupancy, 1);
    assert_eq!(service.get_room(&target).expect("room").current_occupancy, 0);
    assert_eq!(
        service
            .room_changes()
            .get(&request.id)
            .expect("request")
            .status,
        RoomChangeStatus::PendingPayment
    );
}

#[test]
fn paid_upgrade_moves_the_student_and_records_the_payment() {
    let (service, _, notifier) = build_service();
    let (student, current, target, request) = upgrade_fixture(&service, "2");

    let (partial, _) = service
        .room_changes()
        .pay(&request.id, payment(2_000, "gw-up-1"))
        .expect("partial upgrade payment");
    assert_eq!(partial.payment_status, UpgradePaymentStatus::Pending);
    assert_eq!(partial.upgrade_outstanding(), 3_000);

    let (settled, receipt) = service
        .room_changes()
        .pay(&request.id, payment(3_000, "gw-up-2"))
        .expect("upgrade settled");
    assert_eq!(receipt.status_after, FeeStatus::Paid);
    assert_eq!(settled.payment_status, UpgradePaymentStatus::Paid);
    assert_eq!(settled.status, RoomChangeStatus::Pending);

    let completed = service
        .room_changes()
        .approve(&request.id, Some("approved at front desk".to_string()), review_day())
        .expect("approved");
    assert_eq!(completed.status, RoomChangeStatus::Completed);
    assert_eq!(completed.old_room_occupancy_before, Some(1));
    assert_eq!(completed.new_room_occupancy_before, Some(0));
    assert_eq!(completed.completed_on, Some(review_day()));

    assert_eq!(service.get_room(&current).expect("room").current_occupancy, 0);
    let moved_to = service.get_room(&target).expect("room");
    assert_eq!(moved_to.occupants, vec![student.id.clone()]);

    let student = service.get_student(&student.id).expect("student");
    assert_eq!(student.room, Some(target.clone()));
    assert_eq!(student.amount_to_pay, 29_000);

    let fees = service.fees_for_student(&student.id).expect("fees");
    let rent = fees
        .iter()
        .find(|fee| fee.fee_type == FeeType::Rent)
        .expect("rent fee");
    assert_eq!(rent.room, Some(target.clone()));
    assert_eq!(rent.amount, 24_000);
    let upgrade = fees
        .iter()
        .find(|fee| fee.fee_type == FeeType::Other)
        .expect("upgrade fee recorded");
    assert_eq!(upgrade.amount, 5_000);
    assert_eq!(upgrade.status, FeeStatus::Paid);
    assert_eq!(upgrade.payments.len(), 2);

    assert!(notifier
        .templates()
        .contains(&"room_change_approved".to_string()));
}

#[test]
fn upgrade_transaction_ids_share_the_ledger_wide_index() {
    let (service, _, _) = build_service();
    let (student, _, _, request) = upgrade_fixture(&service, "3");
    let rent = service
        .fees_for_student(&student.id)
        .expect("fees")
        .remove(0);
    service
        .apply_payment(&rent.id, payment(1_000, "gw-shared"))
        .expect("rent payment");

    assert!(matches!(
        service
            .room_changes()
            .pay(&request.id, payment(1_000, "gw-shared")),
        Err(LedgerError::AlreadySettled { .. })
    ));
}

#[test]
fn downgrade_credits_the_wallet_on_approval() {
    let (service, _, _) = build_service();
    let current = create_room(
        &service,
        room_draft("D1", RoomType::Double, 2, ac_and_wifi()),
    );
    let target = create_room(
        &service,
        room_draft("D2", RoomType::Double, 2, Amenities::default()),
    );
    let (student, _) = seat_student(&service, "Aditya", &current.id);

    let request = service
        .room_changes()
        .submit(submission(&student, &target.id), review_day())
        .expect("submitted");
    assert_eq!(request.price_difference, -15_000);
    assert_eq!(request.downgrade_wallet_credit, 15_000);
    assert_eq!(request.payment_status, UpgradePaymentStatus::NotRequired);
    assert_eq!(request.status, RoomChangeStatus::Pending);
    assert!(request.upgrade_obligation.is_none());

    service
        .room_changes()
        .begin_review(&request.id, None, review_day())
        .expect("under review");
    service
        .room_changes()
        .approve(&request.id, None, review_day())
        .expect("approved");

    let wallet = service.wallet(&student.id).expect("wallet");
    assert_eq!(wallet.balance, 15_000);
    assert_eq!(wallet.transactions.len(), 1);
    assert_eq!(wallet.transactions[0].reason, WalletReason::RoomDowngrade);
    assert_eq!(wallet.transactions[0].room_change, Some(request.id.clone()));

    assert_eq!(service.get_room(&current.id).expect("room").current_occupancy, 0);
    assert_eq!(service.get_room(&target.id).expect("room").current_occupancy, 1);
}

#[test]
fn surplus_paid_before_a_price_drop_offsets_the_upgrade() {
    let (service, _, _) = build_service();
    let current = create_room(
        &service,
        room_draft("S1", RoomType::Double, 2, ac_and_wifi()),
    );
    let target = create_room(
        &service,
        room_draft(
            "S2",
            RoomType::Double,
            2,
            Amenities {
                ac: true,
                ..Amenities::default()
            },
        ),
    );
    let (student, rent) = seat_student(&service, "Parth", &current.id);
    service
        .apply_payment(&rent.id, payment(39_000, "gw-s1"))
        .expect("rent settled");
    service
        .update_amenities(
            &current.id,
            Amenities {
                wifi: true,
                ..Amenities::default()
            },
        )
        .expect("ac removed");

    let request = service
        .room_changes()
        .submit(submission(&student, &target.id), review_day())
        .expect("submitted");
    assert_eq!(request.current_room_price, 27_000);
    assert_eq!(request.price_difference, 9_000);
    assert_eq!(request.already_paid_surplus, 12_000);
    assert_eq!(request.upgrade_payment_required, 0);
    assert_eq!(request.status, RoomChangeStatus::Pending);
}

#[test]
fn concurrent_approvals_for_the_last_bed_serialize() {
    let (service, repository, _) = build_service();
    let target = create_room(
        &service,
        room_draft("L1", RoomType::Quad, 1, Amenities::default()),
    );
    let first_room = create_room(
        &service,
        room_draft("L2", RoomType::Double, 2, Amenities::default()),
    );
    let second_room = create_room(
        &service,
        room_draft("L3", RoomType::Double, 2, Amenities::default()),
    );
    let (first, _) = seat_student(&service, "Dhruv", &first_room.id);
    let (second, _) = seat_student(&service, "Kiaan", &second_room.id);
    let first_request = service
        .room_changes()
        .submit(submission(&first, &target.id), review_day())
        .expect("first submitted");
    let second_request = service
        .room_changes()
        .submit(submission(&second, &target.id), review_day())
        .expect("second submitted");

    repository.arm_gate();
    let (left, right) = thread::scope(|scope| {
        let left = scope.spawn(|| {
            service
                .room_changes()
                .approve(&first_request.id, None, review_day())
        });
        let right = scope.spawn(|| {
            service
                .room_changes()
                .approve(&second_request.id, None, review_day())
        });
        (
            left.join().expect("left thread"),
            right.join().expect("right thread"),
        )
    });

    let outcomes = [left, right];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(LedgerError::RoomFull { .. }))));

    let target = service.get_room(&target.id).expect("room");
    assert_eq!(target.current_occupancy, 1);
    assert_eq!(target.occupants.len(), 1);
    let (winner, loser) = if target.occupants[0] == first.id {
        (&first_request, &second_request)
    } else {
        (&second_request, &first_request)
    };
    assert_eq!(
        service.room_changes().get(&winner.id).expect("winner").status,
        RoomChangeStatus::Completed
    );
    let loser = service.room_changes().get(&loser.id).expect("loser");
    assert_eq!(loser.status, RoomChangeStatus::Pending);
    assert_eq!(
        service.get_student(&loser.student).expect("student").room,
        Some(loser.current_room.clone())
    );

    let total_credit: u64 = [&first, &second]
        .iter()
        .map(|student| service.wallet(&student.id).expect("wallet").balance)
        .sum();
    assert_eq!(total_credit, 9_000);
}

#[test]
fn target_closed_for_maintenance_blocks_approval_without_partial_writes() {
    let (service, _, _) = build_service();
    let current = create_room(
        &service,
        room_draft("M1", RoomType::Double, 2, ac_and_wifi()),
    );
    let target = create_room(
        &service,
        room_draft("M2", RoomType::Double, 2, Amenities::default()),
    );
    let (student, _) = seat_student(&service, "Laksh", &current.id);
    let request = service
        .room_changes()
        .submit(submission(&student, &target.id), review_day())
        .expect("submitted");
    service
        .set_maintenance(&target.id, MaintenanceStatus::UnderMaintenance)
        .expect("closed");

    assert!(matches!(
        service
            .room_changes()
            .approve(&request.id, None, review_day()),
        Err(LedgerError::RoomUnavailable { .. })
    ));
    assert_eq!(
        service
            .room_changes()
            .get(&request.id)
            .expect("request")
            .status,
        RoomChangeStatus::Pending
    );
    assert_eq!(service.get_room(&current.id).expect("room").current_occupancy, 1);
    assert_eq!(service.wallet(&student.id).expect("wallet").balance, 0);
}

#[test]
fn failed_commit_leaves_every_record_untouched() {
    let (service, repository, _) = build_service();
    let current = create_room(
        &service,
        room_draft("F1", RoomType::Double, 2, ac_and_wifi()),
    );
    let target = create_room(
        &service,
        room_draft("F2", RoomType::Double, 2, Amenities::default()),
    );
    let (student, _) = seat_student(&service, "Vivaan", &current.id);
    let request = service
        .room_changes()
        .submit(submission(&student, &target.id), review_day())
        .expect("submitted");

    repository.fail_commits(true);
    let err = service
        .room_changes()
        .approve(&request.id, None, review_day())
        .expect_err("storage down");
    assert!(matches!(
        err,
        LedgerError::Repository(RepositoryError::Unavailable(_))
    ));
    repository.fail_commits(false);

    assert_eq!(service.get_room(&current.id).expect("room").current_occupancy, 1);
    assert_eq!(service.get_room(&target.id).expect("room").current_occupancy, 0);
    assert_eq!(
        service.get_student(&student.id).expect("student").room,
        Some(current.id.clone())
    );
    assert_eq!(service.wallet(&student.id).expect("wallet").balance, 0);
}

#[test]
fn rejection_requires_a_reason_and_is_terminal() {
    let (service, _, notifier) = build_service();
    let (_, _, _, request) = upgrade_fixture(&service, "4");

    assert!(matches!(
        service
            .room_changes()
            .reject(&request.id, "   ", review_day()),
        Err(LedgerError::Validation(_))
    ));

    let rejected = service
        .room_changes()
        .reject(&request.id, "no beds on that floor next term", review_day())
        .expect("rejected");
    assert_eq!(rejected.status, RoomChangeStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("no beds on that floor next term")
    );

    assert!(matches!(
        service
            .room_changes()
            .approve(&request.id, None, review_day()),
        Err(LedgerError::InvalidTransition { .. })
    ));
    assert!(notifier
        .templates()
        .contains(&"room_change_rejected".to_string()));
}

#[test]
fn cancellation_is_refused_once_upgrade_money_was_paid() {
    let (service, _, _) = build_service();
    let (student, _, target, request) = upgrade_fixture(&service, "5");

    service
        .room_changes()
        .pay(&request.id, payment(1_000, "gw-cancel-1"))
        .expect("partial");
    assert!(matches!(
        service.room_changes().cancel(&request.id, None),
        Err(LedgerError::Conflict(_))
    ));

    let (other, _, other_target, fresh) = upgrade_fixture(&service, "6");
    let cancelled = service
        .room_changes()
        .cancel(&fresh.id, Some(&other.id))
        .expect("cancelled");
    assert_eq!(cancelled.status, RoomChangeStatus::Cancelled);
    service
        .room_changes()
        .submit(submission(&other, &other_target), review_day())
        .expect("a new request is allowed after cancelling");

    assert!(matches!(
        service
            .room_changes()
            .submit(submission(&student, &target), review_day()),
        Err(LedgerError::Conflict(_))
    ));
}

#[test]
fn submission_rules_are_checked_before_anything_is_stored() {
    let (service, _, _) = build_service();
    let current = create_room(
        &service,
        room_draft("V1", RoomType::Double, 2, Amenities::default()),
    );
    let mut closed_draft = room_draft("V2", RoomType::Double, 2, Amenities::default());
    closed_draft.allow_room_changes = false;
    let closed = create_room(&service, closed_draft);
    let (student, _) = seat_student(&service, "Shaurya", &current.id);

    assert!(matches!(
        service
            .room_changes()
            .submit(submission(&student, &current.id), review_day()),
        Err(LedgerError::Validation(_))
    ));
    assert!(matches!(
        service
            .room_changes()
            .submit(submission(&student, &closed.id), review_day()),
        Err(LedgerError::RoomUnavailable { .. })
    ));

    let unhoused = service
        .register_student(student_draft("Ritvik"))
        .expect("student");
    assert!(matches!(
        service
            .room_changes()
            .submit(submission(&unhoused, &current.id), review_day()),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn terminal_requests_refuse_every_action() {
    let (service, _, _) = build_service();
    let (_, _, _, request) = upgrade_fixture(&service, "7");
    let mut rejected = service
        .room_changes()
        .reject(&request.id, "duplicate request", review_day())
        .expect("rejected");

    for action in [
        RoomChangeAction::PaymentSettled,
        RoomChangeAction::BeginReview,
        RoomChangeAction::Approve,
        RoomChangeAction::Complete,
        RoomChangeAction::Reject,
        RoomChangeAction::Cancel,
    ] {
        assert!(matches!(
            rejected.advance(action),
            Err(LedgerError::InvalidTransition {
                from: "rejected",
                ..
            })
        ));
    }
}

#[test]
fn amenity_edit_after_an_upgrade_never_bills_the_difference_twice() {
    let (service, _, _) = build_service();
    let (student, _, target, request) = upgrade_fixture(&service, "21");
    service
        .room_changes()
        .pay(&request.id, payment(5_000, "gw-up-21"))
        .expect("upgrade paid");
    service
        .room_changes()
        .approve(&request.id, None, review_day())
        .expect("approved");

    let unchanged = service
        .update_amenities(
            &target,
            Amenities {
                geyser: true,
                ..Amenities::default()
            },
        )
        .expect("same amenities saved");
    assert_eq!(unchanged.room.total_price, 29_000);
    assert!(unchanged.corrected_fees.is_empty());

    let owed = |service: &TestService| -> u64 {
        service
            .fees_for_student(&student.id)
            .expect("fees")
            .iter()
            .map(|fee| fee.amount)
            .sum()
    };
    assert_eq!(owed(&service), 29_000);

    let with_wifi = service
        .update_amenities(
            &target,
            Amenities {
                geyser: true,
                wifi: true,
                ..Amenities::default()
            },
        )
        .expect("wifi added");
    assert_eq!(with_wifi.room.total_price, 32_000);
    assert_eq!(owed(&service), 32_000);

    let rent = service
        .fees_for_student(&student.id)
        .expect("fees")
        .into_iter()
        .find(|fee| fee.fee_type == FeeType::Rent)
        .expect("rent fee");
    assert_eq!(rent.amount, 27_000);
    assert_eq!(rent.room, Some(target));
}

#[test]
fn amenity_edit_after_a_downgrade_keeps_the_wallet_credit_as_the_only_refund() {
    let (service, _, _) = build_service();
    let premium = create_room(
        &service,
        room_draft("D31", RoomType::Double, 2, ac_and_wifi()),
    );
    let plain = create_room(
        &service,
        room_draft("D32", RoomType::Double, 2, Amenities::default()),
    );
    let (student, rent) = seat_student(&service, "Vivaan", &premium.id);
    assert_eq!(rent.amount, 39_000);

    let request = service
        .room_changes()
        .submit(submission(&student, &plain.id), review_day())
        .expect("downgrade submitted");
    service
        .room_changes()
        .approve(&request.id, None, review_day())
        .expect("downgrade approved");
    assert_eq!(service.wallet(&student.id).expect("wallet").balance, 15_000);

    service
        .update_amenities(&plain.id, Amenities::default())
        .expect("same amenities saved");
    let moved = service.fee(&rent.id).expect("rent");
    assert_eq!(moved.amount, 39_000);
    assert_eq!(moved.room, Some(plain.id.clone()));

    service
        .update_amenities(
            &plain.id,
            Amenities {
                fan_count: 1,
                ..Amenities::default()
            },
        )
        .expect("fan added");
    assert_eq!(service.fee(&rent.id).expect("rent").amount, 41_000);
}
