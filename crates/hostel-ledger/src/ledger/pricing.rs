use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Room layouts offered by the hostel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Single,
    Double,
    Triple,
    Quad,
}

impl RoomType {
    pub const fn ordered() -> [Self; 4] {
        [Self::Single, Self::Double, Self::Triple, Self::Quad]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Triple => "triple",
            Self::Quad => "quad",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "double" => Some(Self::Double),
            "triple" => Some(Self::Triple),
            "quad" => Some(Self::Quad),
            _ => None,
        }
    }
}

pub const MAX_FAN_COUNT: u8 = 5;

/// Fixed-shape amenity selection for a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amenities {
    pub ac: bool,
    pub attached_bathroom: bool,
    pub geyser: bool,
    pub wifi: bool,
    pub extra_furniture: bool,
    pub fan_count: u8,
}

/// Flat yearly charge per amenity plus the per-unit fan charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmenityPrices {
    pub ac: u64,
    pub attached_bathroom: u64,
    pub geyser: u64,
    pub wifi: u64,
    pub extra_furniture: u64,
    pub fan_unit: u64,
}

impl Default for AmenityPrices {
    fn default() -> Self {
        Self {
            ac: 12_000,
            attached_bathroom: 8_000,
            geyser: 5_000,
            wifi: 3_000,
            extra_furniture: 4_000,
            fan_unit: 2_000,
        }
    }
}

/// Injected yearly price table. Every occupant owes the full room price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    pub base_prices: BTreeMap<RoomType, u64>,
    pub amenities: AmenityPrices,
}

impl Default for PricingTable {
    fn default() -> Self {
        let base_prices = BTreeMap::from([
            (RoomType::Single, 30_000),
            (RoomType::Double, 24_000),
            (RoomType::Triple, 18_000),
            (RoomType::Quad, 15_000),
        ]);

        Self {
            base_prices,
            amenities: AmenityPrices::default(),
        }
    }
}

/// Output of the calculator; `total_price` is always the sum of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: u64,
    pub amenities_price: u64,
    pub total_price: u64,
}

/// Display line for a single priced amenity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmenityLine {
    pub name: String,
    pub price: u64,
}

/// Stateless calculator over an injected [`PricingTable`].
#[derive(Debug, Clone, Default)]
pub struct PriceCalculator {
    table: PricingTable,
}

impl PriceCalculator {
    pub fn new(table: PricingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PricingTable {
        &self.table
    }

    /// Room types missing from the table price at zero.
    pub fn base_price(&self, room_type: RoomType) -> u64 {
        self.table
            .base_prices
            .get(&room_type)
            .copied()
            .unwrap_or_default()
    }

    pub fn amenities_price(&self, amenities: &Amenities) -> u64 {
        self.amenity_lines(amenities)
            .iter()
            .map(|line| line.price)
            .sum()
    }

    pub fn compute_price(&self, room_type: RoomType, amenities: &Amenities) -> PriceBreakdown {
        let base_price = self.base_price(room_type);
        let amenities_price = self.amenities_price(amenities);

        PriceBreakdown {
            base_price,
            amenities_price,
            total_price: base_price + amenities_price,
        }
    }

    pub fn amenity_lines(&self, amenities: &Amenities) -> Vec<AmenityLine> {
        let prices = &self.table.amenities;
        let Amenities {
            ac,
            attached_bathroom,
            geyser,
            wifi,
            extra_furniture,
            fan_count,
        } = *amenities;

        let flags = [
            (ac, "AC", prices.ac),
            (attached_bathroom, "Attached Bathroom", prices.attached_bathroom),
            (geyser, "Geyser", prices.geyser),
            (wifi, "Wi-Fi", prices.wifi),
            (extra_furniture, "Extra Furniture", prices.extra_furniture),
        ];

        let mut lines: Vec<AmenityLine> = flags
            .into_iter()
            .filter(|(selected, _, _)| *selected)
            .map(|(_, name, price)| AmenityLine {
                name: name.to_string(),
                price,
            })
            .collect();

        if fan_count > 0 {
            lines.push(AmenityLine {
                name: format!("Fan ({fan_count}x)"),
                price: prices.fan_unit * u64::from(fan_count),
            });
        }

        lines
    }
}
