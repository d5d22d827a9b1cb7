use serde::Serialize;

use crate::ledger::fees::{Fee, FeeType};
use crate::ledger::rooms::Room;

/// Price comparison between the room a student holds and the one requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomChangeQuote {
    pub current_room_price: u64,
    pub requested_room_price: u64,
    pub price_difference: i64,
    pub already_paid_surplus: u64,
    pub upgrade_payment_required: u64,
    pub downgrade_wallet_credit: u64,
}

impl RoomChangeQuote {
    pub fn between(current: &Room, requested: &Room, already_paid_surplus: u64) -> Self {
        let price_difference = signed(requested.total_price) - signed(current.total_price);
        let (upgrade_payment_required, downgrade_wallet_credit) = if price_difference > 0 {
            (
                price_difference.unsigned_abs().saturating_sub(already_paid_surplus),
                0,
            )
        } else {
            (0, price_difference.unsigned_abs())
        };

        Self {
            current_room_price: current.total_price,
            requested_room_price: requested.total_price,
            price_difference,
            already_paid_surplus,
            upgrade_payment_required,
            downgrade_wallet_credit,
        }
    }

    pub fn is_upgrade(&self) -> bool {
        self.price_difference > 0
    }
}

/// Money paid on the latest rent fee for `room` beyond the room's current price.
pub fn already_paid_surplus(room: &Room, fees: &[Fee]) -> u64 {
    fees.iter()
        .filter(|fee| fee.fee_type == FeeType::Rent && fee.room.as_ref() == Some(&room.id))
        .max_by(|left, right| {
            left.due_date
                .cmp(&right.due_date)
                .then_with(|| left.id.cmp(&right.id))
        })
        .map_or(0, |fee| fee.paid_amount.saturating_sub(room.total_price))
}

fn signed(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}
