use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// One-time reservation password handed out when a reservation is approved.
///
/// The buffer is wiped on drop and `Debug` never prints it. Holders are
/// expected to keep it in locals only; nothing in the console stores one.
#[derive(Clone, PartialEq, Eq)]
pub struct ReservationPassword(String);

impl ReservationPassword {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for ReservationPassword {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for ReservationPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReservationPassword(<redacted>)")
    }
}

impl Serialize for ReservationPassword {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReservationPassword {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}
