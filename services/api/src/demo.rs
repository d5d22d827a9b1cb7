use crate::infra::{parse_date, parse_fan_count, parse_room_type, TracingNotifier};
use chrono::{Local, NaiveDate};
use clap::Args;
use hostel_ledger::config::AppConfig;
use hostel_ledger::error::AppError;
use hostel_ledger::ledger::{
    Amenities, Fee, Gender, HostelService, LedgerSettings, MemoryHostelRepository, PaymentInput,
    PaymentMethod, PriceCalculator, Room, RoomChangeRequest, RoomChangeSubmission, RoomDraft,
    RoomIdentity, RoomType, StudentDraft,
};
use std::sync::Arc;

type DemoService = HostelService<MemoryHostelRepository, TracingNotifier>;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Room type: single, double, triple, or quad
    #[arg(long, value_parser = parse_room_type)]
    pub(crate) room_type: RoomType,
    #[arg(long)]
    pub(crate) ac: bool,
    #[arg(long)]
    pub(crate) attached_bathroom: bool,
    #[arg(long)]
    pub(crate) geyser: bool,
    #[arg(long)]
    pub(crate) wifi: bool,
    #[arg(long)]
    pub(crate) extra_furniture: bool,
    /// Number of ceiling fans
    #[arg(long, default_value_t = 0, value_parser = parse_fan_count)]
    pub(crate) fans: u8,
}

impl QuoteArgs {
    pub(crate) fn amenities(&self) -> Amenities {
        Amenities {
            ac: self.ac,
            attached_bathroom: self.attached_bathroom,
            geyser: self.geyser,
            wifi: self.wifi,
            extra_furniture: self.extra_furniture,
            fan_count: self.fans,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Term start and rent due date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) term_start: Option<NaiveDate>,
    /// Skip the room-change portion of the walkthrough.
    #[arg(long)]
    pub(crate) skip_room_changes: bool,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let calculator = PriceCalculator::new(config.ledger.pricing);
    let amenities = args.amenities();
    let breakdown = calculator.compute_price(args.room_type, &amenities);

    println!("Quote for a {} room", args.room_type.label());
    println!("- base price: {}", breakdown.base_price);
    for line in calculator.amenity_lines(&amenities) {
        println!("- {}: {}", line.name, line.price);
    }
    println!("- amenities total: {}", breakdown.amenities_price);
    println!("Total per term: {}", breakdown.total_price);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        term_start,
        skip_room_changes,
    } = args;
    let term_start = term_start.unwrap_or_else(|| Local::now().date_naive());

    let service: DemoService = HostelService::new(
        Arc::new(MemoryHostelRepository::new()),
        Arc::new(TracingNotifier),
        LedgerSettings::default(),
    );

    println!("Hostel ledger demo (term starting {term_start})");
    let standard = service.create_room(demo_room("101", RoomType::Double, Amenities::default()))?;
    let deluxe = service.create_room(demo_room(
        "102",
        RoomType::Double,
        Amenities {
            ac: true,
            wifi: true,
            ..Amenities::default()
        },
    ))?;
    let economy = service.create_room(demo_room("103", RoomType::Quad, Amenities::default()))?;
    println!("\nRooms");
    for room in [&standard, &deluxe, &economy] {
        render_room(room);
    }

    let aarav = service.register_student(demo_student("Aarav"))?;
    let kabir = service.register_student(demo_student("Kabir"))?;
    let aarav_rent = service.allocate_room(&aarav.id, &standard.id, term_start)?.fee;
    let kabir_rent = service.allocate_room(&kabir.id, &deluxe.id, term_start)?.fee;

    println!("\nAllocations");
    println!("- {} -> {} (owes {})", aarav.name, standard.label(), aarav_rent.amount);
    println!("- {} -> {} (owes {})", kabir.name, deluxe.label(), kabir_rent.amount);

    let receipt = service.apply_payment(
        &aarav_rent.id,
        PaymentInput {
            amount: aarav_rent.amount,
            method: PaymentMethod::Upi,
            transaction_id: "demo-upi-0001".to_string(),
            paid_on: term_start,
        },
    )?;
    println!(
        "- {} paid {} by {} ({})",
        aarav.name,
        receipt.amount,
        receipt.method.label(),
        receipt.status_after.label()
    );

    let sweep_day = term_start + chrono::Duration::days(15);
    let report = service.accrue_late_fees(sweep_day)?;
    println!("\nLate fee sweep on {sweep_day}");
    println!(
        "- {} open fees processed | {} charged | {} skipped | {} total",
        report.processed,
        report.charges.len(),
        report.skipped,
        report.charged_total
    );
    render_fee(&service.fee(&kabir_rent.id)?);

    if skip_room_changes {
        return Ok(());
    }

    let settlements = service.room_changes();
    let upgrade = settlements.submit(
        RoomChangeSubmission {
            student: aarav.id.clone(),
            requested_room: deluxe.id.clone(),
            reason: "wants air conditioning".to_string(),
        },
        sweep_day,
    )?;
    println!("\nRoom change: upgrade");
    render_request(&upgrade);
    let (upgrade, receipt) = settlements.pay(
        &upgrade.id,
        PaymentInput {
            amount: upgrade.upgrade_outstanding(),
            method: PaymentMethod::Card,
            transaction_id: "demo-card-0002".to_string(),
            paid_on: sweep_day,
        },
    )?;
    println!("- upgrade payment {} received", receipt.amount);
    let upgrade = settlements.approve(&upgrade.id, None, sweep_day)?;
    render_request(&upgrade);

    let downgrade = settlements.submit(
        RoomChangeSubmission {
            student: kabir.id.clone(),
            requested_room: economy.id.clone(),
            reason: "cutting costs".to_string(),
        },
        sweep_day,
    )?;
    println!("\nRoom change: downgrade");
    render_request(&downgrade);
    let downgrade = settlements.approve(
        &downgrade.id,
        Some("approved by warden".to_string()),
        sweep_day,
    )?;
    render_request(&downgrade);

    let application = service.apply_wallet_to_fee(&kabir.id, &kabir_rent.id, None, sweep_day)?;
    println!(
        "- wallet paid {} toward rent, {} left in wallet",
        application.receipt.amount, application.wallet.balance
    );
    render_fee(&service.fee(&kabir_rent.id)?);

    println!("\nOccupancy");
    for room in [&standard, &deluxe, &economy] {
        render_room(&service.get_room(&room.id)?);
    }
    Ok(())
}

fn demo_room(number: &str, room_type: RoomType, amenities: Amenities) -> RoomDraft {
    let capacity = match room_type {
        RoomType::Single => 1,
        RoomType::Double => 2,
        RoomType::Triple => 3,
        RoomType::Quad => 4,
    };
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

fn demo_student(name: &str) -> StudentDraft {
    StudentDraft {
        name: name.to_string(),
        gender: Gender::Boys,
    }
}

fn render_room(room: &Room) {
    println!(
        "- {} [{}] {} | {}/{} occupied | {}",
        room.label(),
        room.room_type.label(),
        room.total_price,
        room.current_occupancy,
        room.capacity,
        room.status.label()
    );
}

fn render_fee(fee: &Fee) {
    println!(
        "- fee {}: amount {} + late fee {} | paid {} | {}",
        fee.id,
        fee.amount,
        fee.late_fee,
        fee.paid_amount,
        fee.status.label()
    );
}

fn render_request(request: &RoomChangeRequest) {
    println!(
        "- {} {} -> {} | difference {} | upgrade due {} | wallet credit {} | {}",
        request.id,
        request.current_room,
        request.requested_room,
        request.price_difference,
        request.upgrade_outstanding(),
        request.downgrade_wallet_credit,
        request.status.label()
    );
}
