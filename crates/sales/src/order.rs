use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tradedoc_catalog::{
    Discount, DiscountType, FiscalPosition, LineType, TaxEquivalence, TaxRate, Unit,
};
use tradedoc_core::{
    AggregateRoot, CurrencyCode, DomainError, DomainResult, Entity, LineId, OrderId, PackId,
    PriceListId, ProductId, TeamId,
};
use tradedoc_parties::{Company, Partner};

/// Sales order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Draft,
    /// Quotation sent to the client.
    Finalized,
    Confirmed,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvancePaymentStatus {
    #[default]
    Draft,
    Validated,
    Canceled,
}

/// Advance payment linked to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancePayment {
    pub amount: Decimal,
    #[serde(default)]
    pub status: AdvancePaymentStatus,
}

/// Scheduled invoicing slice of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    pub amount: Decimal,
}

/// Per-rate tax aggregate. Derived: rebuilt from scratch on every recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTaxLine {
    pub tax: TaxRate,
    pub ex_tax_base: Decimal,
    pub tax_total: Decimal,
    pub in_tax_total: Decimal,
}

/// Order line.
///
/// `main_line_id` and `parent_id` are non-owning correlation keys: the first links a
/// complementary satellite line to the line that brought it in, the second groups
/// the lines expanded from one pack. Both are resolved through [`LineIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLine {
    pub id: LineId,
    pub sequence: u32,
    pub line_type: LineType,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: Option<Decimal>,
    pub unit: Option<Unit>,
    /// Tax-exclusive unit price.
    pub price: Option<Decimal>,
    pub in_tax_price: Option<Decimal>,
    pub discount_amount: Decimal,
    pub discount_type: DiscountType,
    /// Manually authorised discount ceiling (percent) for this line.
    pub discount_derogation: Option<Decimal>,
    pub tax_rate: Option<TaxRate>,
    pub tax_equivalence: Option<TaxEquivalence>,
    /// Unit cost in company currency, snapshotted from the product.
    pub company_cost_price: Decimal,

    pub ex_tax_total: Decimal,
    pub in_tax_total: Decimal,
    pub company_ex_tax_total: Decimal,
    pub company_in_tax_total: Decimal,
    pub price_discounted: Decimal,

    pub sub_total_cost_price: Decimal,
    pub sub_total_gross_margin: Decimal,
    pub sub_margin_rate: Decimal,
    pub sub_total_markup: Decimal,

    pub is_show_total: bool,
    pub is_hide_unit_amounts: bool,
    /// Keep manually entered unit/price/discount when the product is re-resolved.
    pub enable_freeze_fields: bool,

    pub main_line_id: Option<LineId>,
    pub parent_id: Option<LineId>,
    pub pack_id: Option<PackId>,
}

impl OrderLine {
    /// A normal line for `product_id`; unit, price and tax are filled by the resolver.
    pub fn for_product(product_id: ProductId, quantity: Decimal) -> Self {
        Self {
            id: LineId::new(),
            product_id: Some(product_id),
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    /// A title line (text only, no product, no amounts).
    pub fn title(name: impl Into<String>) -> Self {
        Self {
            id: LineId::new(),
            line_type: LineType::Title,
            product_name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_normal(&self) -> bool {
        self.line_type == LineType::Normal
    }

    pub fn discount(&self) -> Discount {
        Discount {
            amount: self.discount_amount,
            discount_type: self.discount_type,
        }
    }

    pub fn set_discount(&mut self, discount: Discount) {
        self.discount_amount = discount.amount;
        self.discount_type = discount.discount_type;
    }

    /// Clear every computed amount (totals and margins).
    pub fn clear_computed(&mut self) {
        self.ex_tax_total = Decimal::ZERO;
        self.in_tax_total = Decimal::ZERO;
        self.company_ex_tax_total = Decimal::ZERO;
        self.company_in_tax_total = Decimal::ZERO;
        self.price_discounted = Decimal::ZERO;
        self.sub_total_cost_price = Decimal::ZERO;
        self.sub_total_gross_margin = Decimal::ZERO;
        self.sub_margin_rate = Decimal::ZERO;
        self.sub_total_markup = Decimal::ZERO;
    }
}

impl Entity for OrderLine {
    type Id = LineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Order-level totals. Cache only: always a pure function of lines and tax lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderTotals {
    pub ex_tax_total: Decimal,
    pub tax_total: Decimal,
    pub in_tax_total: Decimal,
    pub company_ex_tax_total: Decimal,
    pub advance_total: Decimal,
    pub amount_to_be_spread: Decimal,
}

/// Order-level margin figures, in company currency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderMargin {
    pub accounted_revenue: Decimal,
    pub total_cost_price: Decimal,
    pub total_gross_margin: Decimal,
    pub margin_rate: Decimal,
    pub markup: Decimal,
}

/// Aggregate root: SalesOrder (quotation or order).
///
/// The order owns its lines and keeps them sorted by `sequence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: OrderId,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    pub status: OrderStatus,
    /// Confirmed order reopened for edition.
    #[serde(default)]
    pub order_being_edited: bool,
    #[serde(default)]
    pub template: bool,
    pub creation_date: NaiveDate,
    pub currency: Option<CurrencyCode>,
    pub company: Option<Company>,
    pub client: Option<Partner>,
    #[serde(default)]
    pub contact: Option<Partner>,
    #[serde(default)]
    pub price_list_id: Option<PriceListId>,
    #[serde(default)]
    pub fiscal_position: Option<FiscalPosition>,
    #[serde(default)]
    pub tax_number: Option<String>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Tax-inclusive order: line totals are driven by the tax-inclusive price.
    #[serde(default)]
    pub in_ati: bool,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    lines: Vec<OrderLine>,
    #[serde(default)]
    tax_lines: Vec<OrderTaxLine>,
    #[serde(default)]
    pub advance_payments: Vec<AdvancePayment>,
    #[serde(default)]
    pub timetables: Vec<Timetable>,
    #[serde(default)]
    pub specific_notes: Option<String>,
    #[serde(default)]
    pub totals: OrderTotals,
    #[serde(default)]
    pub margin: OrderMargin,
}

impl SalesOrder {
    /// Create an empty draft order for `company`, in `currency`.
    pub fn new(company: Company, currency: CurrencyCode, creation_date: NaiveDate) -> Self {
        Self {
            id: OrderId::new(),
            version: 0,
            status: OrderStatus::Draft,
            order_being_edited: false,
            template: false,
            creation_date,
            currency: Some(currency),
            company: Some(company),
            client: None,
            contact: None,
            price_list_id: None,
            fiscal_position: None,
            tax_number: None,
            team_id: None,
            in_ati: false,
            external_reference: None,
            lines: Vec::new(),
            tax_lines: Vec::new(),
            advance_payments: Vec::new(),
            timetables: Vec::new(),
            specific_notes: None,
            totals: OrderTotals::default(),
            margin: OrderMargin::default(),
        }
    }

    /// Copy `origin` (typically a template) into a brand-new draft order.
    ///
    /// Lines get fresh ids and are re-sequenced 1..n; complementary and pack
    /// correlation keys are remapped onto the new ids. Derived totals are cleared
    /// and must be recomputed by the caller.
    pub fn copy_from(origin: &SalesOrder, creation_date: NaiveDate) -> Self {
        let mut copy = origin.clone();
        copy.id = OrderId::new();
        copy.version = 0;
        copy.status = OrderStatus::Draft;
        copy.order_being_edited = false;
        copy.template = false;
        copy.creation_date = creation_date;
        copy.advance_payments.clear();
        copy.timetables.clear();

        let remap: HashMap<LineId, LineId> = origin
            .lines
            .iter()
            .map(|line| (line.id, LineId::new()))
            .collect();

        for (idx, line) in copy.lines.iter_mut().enumerate() {
            if let Some(&new_id) = remap.get(&line.id) {
                line.id = new_id;
            }
            line.sequence = idx as u32 + 1;
            line.main_line_id = line.main_line_id.and_then(|id| remap.get(&id).copied());
            line.parent_id = line.parent_id.and_then(|id| remap.get(&id).copied());
        }

        copy.reset_derived();
        copy
    }

    pub fn company_currency(&self) -> Option<&CurrencyCode> {
        self.company.as_ref().map(|c| &c.currency)
    }

    /// Lines in sequence order.
    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [OrderLine] {
        &mut self.lines
    }

    pub fn tax_lines(&self) -> &[OrderTaxLine] {
        &self.tax_lines
    }

    pub(crate) fn tax_lines_mut(&mut self) -> &mut Vec<OrderTaxLine> {
        &mut self.tax_lines
    }

    pub fn line(&self, id: LineId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.id == id)
    }

    pub fn line_mut(&mut self, id: LineId) -> Option<&mut OrderLine> {
        self.lines.iter_mut().find(|line| line.id == id)
    }

    pub fn max_sequence(&self) -> u32 {
        self.lines.iter().map(|line| line.sequence).max().unwrap_or(0)
    }

    /// Append a line after the current last sequence. Returns its id.
    pub fn add_line(&mut self, mut line: OrderLine) -> LineId {
        line.sequence = self.max_sequence() + 1;
        let id = line.id;
        self.lines.push(line);
        id
    }

    /// Insert lines that already carry their sequence numbers.
    pub fn insert_lines(&mut self, lines: impl IntoIterator<Item = OrderLine>) {
        self.lines.extend(lines);
        self.sort_lines();
    }

    pub(crate) fn take_lines(&mut self) -> Vec<OrderLine> {
        core::mem::take(&mut self.lines)
    }

    /// Restore sequence order (stable for equal sequences).
    pub fn sort_lines(&mut self) {
        self.lines.sort_by_key(|line| line.sequence);
    }

    /// Remove a line together with its complementary satellite lines.
    pub fn remove_line(&mut self, id: LineId) -> DomainResult<Vec<OrderLine>> {
        if self.line(id).is_none() {
            return Err(DomainError::validation(format!("unknown order line {id}")));
        }

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.lines.len());
        for line in self.take_lines() {
            if line.id == id || line.main_line_id == Some(id) {
                removed.push(line);
            } else {
                kept.push(line);
            }
        }
        self.lines = kept;
        Ok(removed)
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::build(&self.lines)
    }

    /// Satellite lines brought in by `main_id`.
    pub fn complementary_lines(&self, main_id: LineId) -> Vec<&OrderLine> {
        self.line_index()
            .satellites_of(main_id)
            .iter()
            .map(|&idx| &self.lines[idx])
            .collect()
    }

    /// Lines expanded from the pack correlated by `parent_id`.
    pub fn pack_lines(&self, parent_id: LineId) -> Vec<&OrderLine> {
        self.line_index()
            .pack_members_of(parent_id)
            .iter()
            .map(|&idx| &self.lines[idx])
            .collect()
    }

    /// Whether discount ceilings apply (draft, or confirmed and being edited).
    pub fn is_discount_controlled(&self) -> bool {
        match self.status {
            OrderStatus::Draft => true,
            OrderStatus::Confirmed => self.order_being_edited,
            _ => false,
        }
    }

    /// Clear every derived figure: tax lines, totals, margins and line amounts.
    pub fn reset_derived(&mut self) {
        self.tax_lines.clear();
        self.totals = OrderTotals::default();
        self.margin = OrderMargin::default();
        self.specific_notes = None;
        for line in &mut self.lines {
            line.clear_computed();
        }
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl AggregateRoot for SalesOrder {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Lookup index over an order's lines for the non-owning correlation keys.
#[derive(Debug, Default)]
pub struct LineIndex {
    satellites: HashMap<LineId, Vec<usize>>,
    pack_members: HashMap<LineId, Vec<usize>>,
}

impl LineIndex {
    pub fn build(lines: &[OrderLine]) -> Self {
        let mut index = LineIndex::default();
        for (idx, line) in lines.iter().enumerate() {
            if let Some(main) = line.main_line_id {
                index.satellites.entry(main).or_default().push(idx);
            }
            if let Some(parent) = line.parent_id {
                index.pack_members.entry(parent).or_default().push(idx);
            }
        }
        index
    }

    pub fn satellites_of(&self, main_id: LineId) -> &[usize] {
        self.satellites.get(&main_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pack_members_of(&self, parent_id: LineId) -> &[usize] {
        self.pack_members
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
