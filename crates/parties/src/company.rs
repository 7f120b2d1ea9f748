use serde::{Deserialize, Serialize};

use tradedoc_core::{CompanyId, CurrencyCode, Entity};

/// Selling company. Its currency is the accounting ("company") currency that
/// company-currency totals and margins are expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub currency: CurrencyCode,
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
