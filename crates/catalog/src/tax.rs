use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_core::{Entity, FiscalPositionId, TaxEquivalenceId, TaxRateId, ValueObject};

/// Snapshot of a tax-rate record.
///
/// Identity is the record id: two snapshots with the same numeric `rate` but
/// different ids are different taxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub id: TaxRateId,
    pub code: String,
    /// Percentage (20 means 20%).
    pub rate: Decimal,
}

impl TaxRate {
    /// The rate as a fraction (0.20 for 20%).
    pub fn fraction(&self) -> Decimal {
        self.rate / Decimal::ONE_HUNDRED
    }
}

impl ValueObject for TaxRate {}

/// Substitution of one tax by another under a fiscal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxEquivalence {
    pub id: TaxEquivalenceId,
    pub from_tax_id: TaxRateId,
    pub to_tax_id: TaxRateId,
    /// Legal mention printed on documents using this substitution.
    pub specific_note: Option<String>,
}

/// Partner/jurisdiction tax treatment: a set of tax substitutions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPosition {
    pub id: FiscalPositionId,
    pub name: String,
    /// When set, documents carry the client's own specific note instead of the
    /// notes collected from tax equivalences.
    pub customer_specific_note: bool,
    pub equivalences: Vec<TaxEquivalence>,
}

impl FiscalPosition {
    /// Equivalence substituting `tax_id`, if any.
    pub fn equivalence_for(&self, tax_id: TaxRateId) -> Option<&TaxEquivalence> {
        self.equivalences.iter().find(|eq| eq.from_tax_id == tax_id)
    }
}

impl Entity for FiscalPosition {
    type Id = FiscalPositionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fraction_divides_by_one_hundred() {
        let tax = TaxRate {
            id: TaxRateId::new(),
            code: "VAT20".to_string(),
            rate: dec!(20),
        };
        assert_eq!(tax.fraction(), dec!(0.20));
    }

    #[test]
    fn equivalence_lookup_matches_source_tax() {
        let normal = TaxRateId::new();
        let exempt = TaxRateId::new();
        let position = FiscalPosition {
            id: FiscalPositionId::new(),
            name: "Intra-EU".to_string(),
            customer_specific_note: false,
            equivalences: vec![TaxEquivalence {
                id: TaxEquivalenceId::new(),
                from_tax_id: normal,
                to_tax_id: exempt,
                specific_note: Some("VAT reverse charge".to_string()),
            }],
        };

        assert_eq!(position.equivalence_for(normal).map(|eq| eq.to_tax_id), Some(exempt));
        assert!(position.equivalence_for(exempt).is_none());
    }
}
