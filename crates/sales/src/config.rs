//! Computation settings and optional capabilities.
//!
//! Settings are built explicitly (or read from the environment) and handed to each
//! component's constructor. There is no process-wide settings registry.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Optional capability that extends the base computation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Root pricing rules are matched and applied during line resolution.
    PricingRules,
    /// Orders carry advance payments and expose their total.
    AdvancePayments,
    /// Orders carry an invoicing timetable and expose the amount left to spread.
    Timetables,
}

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::PricingRules => "pricing-rules",
            Feature::AdvancePayments => "advance-payments",
            Feature::Timetables => "timetables",
        }
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pricing-rules" => Ok(Feature::PricingRules),
            "advance-payments" => Ok(Feature::AdvancePayments),
            "timetables" => Ok(Feature::Timetables),
            other => Err(format!("unknown feature '{other}'")),
        }
    }
}

/// Set of enabled capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: Feature) -> Self {
        self.0.insert(feature);
        self
    }

    pub fn enabled(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }

    /// Parse a comma-separated list, skipping (and logging) unknown entries.
    pub fn parse_list(list: &str) -> Self {
        let mut set = Self::empty();
        for item in list.split(',').filter(|s| !s.trim().is_empty()) {
            match item.parse::<Feature>() {
                Ok(feature) => set = set.with(feature),
                Err(err) => tracing::warn!(%err, "ignoring feature"),
            }
        }
        set
    }
}

impl FromIterator<Feature> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Settings shared by the computation components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesConfig {
    /// Decimal places of unit prices.
    pub unit_price_scale: u32,
    /// Decimal places of quantities.
    pub quantity_scale: u32,
    /// Include zero-cost / zero-revenue lines in margin computation.
    pub consider_zero_cost: bool,
    /// Name given to synthetic end-of-pack lines.
    pub end_of_pack_label: String,
    pub features: FeatureSet,
}

impl Default for SalesConfig {
    fn default() -> Self {
        Self {
            unit_price_scale: 2,
            quantity_scale: 2,
            consider_zero_cost: false,
            end_of_pack_label: "End of pack".to_string(),
            features: FeatureSet::empty().with(Feature::AdvancePayments),
        }
    }
}

impl SalesConfig {
    /// Read settings from `TRADEDOC_*` environment variables.
    ///
    /// Missing variables keep their default; unparsable ones are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(scale) = parse_var(&lookup, "TRADEDOC_UNIT_PRICE_SCALE") {
            config.unit_price_scale = scale;
        }
        if let Some(scale) = parse_var(&lookup, "TRADEDOC_QUANTITY_SCALE") {
            config.quantity_scale = scale;
        }
        if let Some(flag) = parse_var(&lookup, "TRADEDOC_CONSIDER_ZERO_COST") {
            config.consider_zero_cost = flag;
        }
        if let Some(label) = lookup("TRADEDOC_END_OF_PACK_LABEL") {
            config.end_of_pack_label = label;
        }
        if let Some(list) = lookup("TRADEDOC_FEATURES") {
            config.features = FeatureSet::parse_list(&list);
        }

        config
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "unparsable setting; keeping default");
            None
        }
    }
}
