use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_core::{CurrencyCode, PackId, ProductId};

/// Kind of a document line (order line or pack component).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    #[default]
    Normal,
    Title,
    StartOfPack,
    EndOfPack,
}

impl LineType {
    pub fn is_pack_bracket(self) -> bool {
        matches!(self, LineType::StartOfPack | LineType::EndOfPack)
    }
}

/// One component of a pack template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackLineTemplate {
    pub sequence: u32,
    pub line_type: LineType,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    /// Quantity for one pack.
    pub quantity: Decimal,
    /// Component price in the template currency; `None` uses the catalog price.
    pub price: Option<Decimal>,
}

/// Reusable bundle-of-products template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackTemplate {
    pub id: PackId,
    pub name: String,
    pub currency: CurrencyCode,
    /// Suppress the synthetic start/end bracket lines.
    pub do_not_display_header_and_end_pack: bool,
    /// Carried onto the synthetic end-of-pack line.
    pub is_show_total: bool,
    /// Carried onto the synthetic end-of-pack line.
    pub is_hide_unit_amounts: bool,
    pub lines: Vec<PackLineTemplate>,
}

impl PackTemplate {
    /// True when the component list already carries explicit bracket markers.
    pub fn has_bracket_markers(&self) -> bool {
        self.lines.iter().any(|line| line.line_type.is_pack_bracket())
    }

    /// Components in template sequence order.
    pub fn sorted_lines(&self) -> Vec<&PackLineTemplate> {
        let mut lines: Vec<&PackLineTemplate> = self.lines.iter().collect();
        lines.sort_by_key(|line| line.sequence);
        lines
    }
}
