use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static ROOM_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static STUDENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static FEE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static ROOM_CHANGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident, $sequence:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn next() -> Self {
                let id = $sequence.fetch_add(1, Ordering::Relaxed);
                Self(format!(concat!($prefix, "-{:06}"), id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

ledger_id!(
    /// Identifier wrapper for hostel rooms.
    RoomId,
    ROOM_SEQUENCE,
    "room"
);
ledger_id!(
    /// Identifier wrapper for enrolled students.
    StudentId,
    STUDENT_SEQUENCE,
    "stu"
);
ledger_id!(
    /// Identifier wrapper for fee records.
    FeeId,
    FEE_SEQUENCE,
    "fee"
);
ledger_id!(
    /// Identifier wrapper for room-change requests.
    RoomChangeId,
    ROOM_CHANGE_SEQUENCE,
    "rcr"
);
