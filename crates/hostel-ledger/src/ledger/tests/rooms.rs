use super::common::*;

use crate::ledger::fees::FeeStatus;
use crate::ledger::pricing::{Amenities, RoomType};
use crate::ledger::rooms::{Gender, MaintenanceStatus, RoomStatus};
use crate::ledger::students::{RoomAllocationStatus, StudentDraft};
use crate::ledger::LedgerError;

#[test]
fn double_room_with_ac_and_wifi_bills_each_occupant_the_full_price() {
    let (service, _, _) = build_service();
    let room = create_room(
        &service,
        room_draft("201", RoomType::Double, 2, ac_and_wifi()),
    );
    assert_eq!(room.base_price, 24_000);
    assert_eq!(room.amenities_price, 15_000);
    assert_eq!(room.total_price, 39_000);

    let (first, first_fee) = seat_student(&service, "Aarav", &room.id);
    let (second, second_fee) = seat_student(&service, "Vihaan", &room.id);

    assert_eq!(first.amount_to_pay, 39_000);
    assert_eq!(second.amount_to_pay, 39_000);
    assert_eq!(first_fee.amount, 39_000);
    assert_eq!(second_fee.amount, 39_000);

    let stored = service.get_room(&room.id).expect("room");
    assert_eq!(stored.current_occupancy, 2);
    assert_eq!(stored.occupants, vec![first.id, second.id]);
    assert_eq!(stored.status, RoomStatus::Occupied);
}

#[test]
fn full_room_refuses_another_allocation() {
    let (service, _, _) = build_service();
    let room = create_room(
        &service,
        room_draft("202", RoomType::Single, 1, Amenities::default()),
    );
    seat_student(&service, "Reyansh", &room.id);

    let late = service
        .register_student(student_draft("Ayaan"))
        .expect("student");
    let err = service
        .allocate_room(&late.id, &room.id, term_start())
        .expect_err("room is full");
    assert!(matches!(err, LedgerError::RoomFull { capacity: 1, .. }));

    let stored = service.get_room(&room.id).expect("room");
    assert_eq!(stored.current_occupancy, 1);
    let student = service.get_student(&late.id).expect("student");
    assert_eq!(student.room, None);
    assert!(service
        .fees_for_student(&late.id)
        .expect("fees")
        .is_empty());
}

#[test]
fn amenity_edit_reprices_room_and_open_rent_fees() {
    let (service, _, _) = build_service();
    let room = create_room(
        &service,
        room_draft("203", RoomType::Double, 2, Amenities::default()),
    );
    let (student, rent) = seat_student(&service, "Sai", &room.id);
    service
        .apply_payment(&rent.id, payment(10_000, "gw-203"))
        .expect("partial payment");

    let update = service
        .update_amenities(&room.id, ac_and_wifi())
        .expect("amenities updated");
    assert_eq!(update.room.total_price, 39_000);
    assert_eq!(
        update.room.total_price,
        update.room.base_price + update.room.amenities_price
    );
    assert_eq!(update.corrected_fees, vec![rent.id.clone()]);

    let corrected = service.fee(&rent.id).expect("fee");
    assert_eq!(corrected.amount, 39_000);
    assert_eq!(corrected.paid_amount, 10_000);
    assert_eq!(corrected.status, FeeStatus::Partial);
    assert_eq!(
        service.get_student(&student.id).expect("student").amount_to_pay,
        39_000
    );
}

#[test]
fn price_drop_never_corrects_a_fee_below_what_was_paid() {
    let (service, _, _) = build_service();
    let room = create_room(
        &service,
        room_draft("204", RoomType::Double, 2, ac_and_wifi()),
    );
    let (student, rent) = seat_student(&service, "Krishna", &room.id);
    service
        .apply_payment(&rent.id, payment(30_000, "gw-204"))
        .expect("partial payment");

    service
        .update_amenities(&room.id, Amenities::default())
        .expect("amenities removed");

    let corrected = service.fee(&rent.id).expect("fee");
    assert_eq!(corrected.amount, 30_000);
    assert_eq!(corrected.status, FeeStatus::Paid);
    let student = service.get_student(&student.id).expect("student");
    assert_eq!(student.amount_to_pay, 24_000);
    assert_eq!(
        student.room_allocation_status,
        RoomAllocationStatus::Confirmed
    );
}

#[test]
fn maintenance_blocks_allocation_and_restores_status() {
    let (service, _, _) = build_service();
    let room = create_room(
        &service,
        room_draft("205", RoomType::Triple, 3, Amenities::default()),
    );
    seat_student(&service, "Atharv", &room.id);

    let closed = service
        .set_maintenance(&room.id, MaintenanceStatus::UnderMaintenance)
        .expect("maintenance set");
    assert_eq!(closed.status, RoomStatus::Maintenance);

    let student = service
        .register_student(student_draft("Arnav"))
        .expect("student");
    assert!(matches!(
        service.allocate_room(&student.id, &room.id, term_start()),
        Err(LedgerError::RoomUnavailable { .. })
    ));

    let reopened = service
        .set_maintenance(&room.id, MaintenanceStatus::None)
        .expect("maintenance cleared");
    assert_eq!(reopened.status, RoomStatus::Occupied);
}

#[test]
fn duplicate_room_identity_is_a_conflict() {
    let (service, _, _) = build_service();
    create_room(
        &service,
        room_draft("206", RoomType::Double, 2, Amenities::default()),
    );
    let mut duplicate = room_draft("206", RoomType::Single, 1, Amenities::default());
    duplicate.identity.block = "  A ".to_string();

    assert!(matches!(
        service.create_room(duplicate),
        Err(LedgerError::Conflict(_))
    ));

    let mut other_wing = room_draft("206", RoomType::Single, 1, Amenities::default());
    other_wing.identity.gender = Gender::Girls;
    service
        .create_room(other_wing)
        .expect("same number for girls is a different room");
}

#[test]
fn gender_restriction_is_enforced_on_allocation() {
    let (service, _, _) = build_service();
    let room = create_room(
        &service,
        room_draft("207", RoomType::Double, 2, Amenities::default()),
    );
    let student = service
        .register_student(StudentDraft {
            name: "Ananya".to_string(),
            gender: Gender::Girls,
        })
        .expect("student");

    assert!(matches!(
        service.allocate_room(&student.id, &room.id, term_start()),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn vacating_frees_the_bed_and_resets_the_student() {
    let (service, _, _) = build_service();
    let room = create_room(
        &service,
        room_draft("208", RoomType::Single, 1, Amenities::default()),
    );
    let (student, _) = seat_student(&service, "Yash", &room.id);

    let vacated = service.vacate_room(&student.id).expect("vacated");
    assert_eq!(vacated.room, None);
    assert_eq!(vacated.room_allocation_status, RoomAllocationStatus::None);

    let stored = service.get_room(&room.id).expect("room");
    assert_eq!(stored.current_occupancy, 0);
    assert_eq!(stored.status, RoomStatus::Available);

    assert!(matches!(
        service.vacate_room(&student.id),
        Err(LedgerError::Validation(_))
    ));
}

#[test]
fn unknown_records_are_not_found() {
    let (service, _, _) = build_service();
    assert_not_found(service.get_room(&"room-missing".into()));
    assert_not_found(service.get_student(&"stu-missing".into()));
    assert_not_found(service.fee(&"fee-missing".into()));
}

#[test]
fn quote_lists_each_priced_amenity() {
    let (service, _, _) = build_service();
    let quote = service.quote(
        RoomType::Single,
        &Amenities {
            geyser: true,
            fan_count: 2,
            ..Amenities::default()
        },
    );
    assert_eq!(quote.total_price, 30_000 + 5_000 + 4_000);
    let names: Vec<&str> = quote.amenities.iter().map(|line| line.name.as_str()).collect();
    assert_eq!(names, vec!["Geyser", "Fan (2x)"]);
}
