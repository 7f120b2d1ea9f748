//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(Uuid);

        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a sales order (quotation or confirmed order).
    OrderId,
    "OrderId"
);
uuid_newtype!(
    /// Identifier of an order line. Also used as the non-owning correlation key for
    /// complementary ("main line") and pack-group relationships.
    LineId,
    "LineId"
);
uuid_newtype!(ProductId, "ProductId");
uuid_newtype!(CategoryId, "CategoryId");
uuid_newtype!(CompanyId, "CompanyId");
uuid_newtype!(
    /// Identifier of a business partner (client or contact person).
    PartnerId,
    "PartnerId"
);
uuid_newtype!(PriceListId, "PriceListId");
uuid_newtype!(
    /// Identifier of a tax-rate *record*. Two records may carry the same numeric
    /// rate and still be distinct for aggregation purposes.
    TaxRateId,
    "TaxRateId"
);
uuid_newtype!(TaxEquivalenceId, "TaxEquivalenceId");
uuid_newtype!(FiscalPositionId, "FiscalPositionId");
uuid_newtype!(TeamId, "TeamId");
uuid_newtype!(PackId, "PackId");
uuid_newtype!(PricingRuleId, "PricingRuleId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_display() {
        let id = OrderId::new();
        let parsed: OrderId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_failure_names_the_identifier_type() {
        let err = "not-a-uuid".parse::<LineId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) if msg.starts_with("LineId") => {}
            _ => panic!("Expected InvalidId for LineId"),
        }
    }
}
