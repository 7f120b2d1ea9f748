use serde::{Deserialize, Serialize};

use tradedoc_core::{Entity, PartnerId};

/// Partner kind: the client an order is billed to, or a contact person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerKind {
    Customer,
    Contact,
}

/// Contact information for a partner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Business partner snapshot carried by an order.
///
/// Equality for merge purposes is by `id` (see [`Partner::same_as`]); the other
/// fields are a read-only snapshot of the partner record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub kind: PartnerKind,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    /// Client-specific legal mention, used when the fiscal position asks for it.
    pub specific_tax_note: Option<String>,
}

impl Partner {
    pub fn customer(name: impl Into<String>) -> Self {
        Self {
            id: PartnerId::new(),
            kind: PartnerKind::Customer,
            name: name.into(),
            contact: ContactInfo::default(),
            specific_tax_note: None,
        }
    }

    pub fn same_as(&self, other: &Partner) -> bool {
        self.same_entity(other)
    }
}

impl Entity for Partner {
    type Id = PartnerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
