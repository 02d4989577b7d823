//! Listing model
//!
//! The sale record being valued, with links into the component catalog
//! and the denormalized outputs the coordinator maintains. Denormalized
//! fields are derived and always recomputable from inputs.

use crate::breakdown::Breakdown;
use crate::context::Value;
use serde::{Deserialize, Serialize};

/// Item condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingCondition {
    New,
    Refurb,
    Used,
}

impl ListingCondition {
    /// Parse from the canonical lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "refurb" => Some(Self::Refurb),
            "used" => Some(Self::Used),
            _ => None,
        }
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Refurb => "refurb",
            Self::Used => "used",
        }
    }
}

/// A sale listing being valued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub title: String,

    /// Asking price before adjustment
    pub base_price: f64,

    pub condition: ListingCondition,

    // Catalog links
    #[serde(default)]
    pub cpu_id: Option<i64>,
    #[serde(default)]
    pub gpu_id: Option<i64>,
    #[serde(default)]
    pub ram_spec_id: Option<i64>,
    #[serde(default)]
    pub primary_storage_profile_id: Option<i64>,
    #[serde(default)]
    pub secondary_storage_profile_id: Option<i64>,
    #[serde(default)]
    pub ports_profile_id: Option<i64>,

    #[serde(default)]
    pub form_factor: Option<String>,

    /// Explicit ruleset pin; absent means "use the active ruleset"
    #[serde(default)]
    pub ruleset_id: Option<i64>,

    /// Custom fields bag, exposed as `listing.attributes.*`
    #[serde(default)]
    pub attributes: Value,

    // Denormalized valuation outputs
    #[serde(default)]
    pub adjusted_price: Option<f64>,
    #[serde(default)]
    pub valuation_breakdown: Option<Breakdown>,
    #[serde(default)]
    pub dollar_per_cpu_mark_single: Option<f64>,
    #[serde(default)]
    pub dollar_per_cpu_mark_multi: Option<f64>,
    #[serde(default)]
    pub dollar_per_cpu_mark_single_adjusted: Option<f64>,
    #[serde(default)]
    pub dollar_per_cpu_mark_multi_adjusted: Option<f64>,
    #[serde(default)]
    pub composite_score: Option<f64>,

    /// Error recorded by the last failed background recompute
    #[serde(default)]
    pub last_valuation_error: Option<String>,
}

impl Listing {
    /// Create a bare listing
    pub fn new(
        id: i64,
        title: impl Into<String>,
        base_price: f64,
        condition: ListingCondition,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            base_price,
            condition,
            cpu_id: None,
            gpu_id: None,
            ram_spec_id: None,
            primary_storage_profile_id: None,
            secondary_storage_profile_id: None,
            ports_profile_id: None,
            form_factor: None,
            ruleset_id: None,
            attributes: Value::Null,
            adjusted_price: None,
            valuation_breakdown: None,
            dollar_per_cpu_mark_single: None,
            dollar_per_cpu_mark_multi: None,
            dollar_per_cpu_mark_single_adjusted: None,
            dollar_per_cpu_mark_multi_adjusted: None,
            composite_score: None,
            last_valuation_error: None,
        }
    }

    /// Link a CPU catalog row
    pub fn with_cpu(mut self, cpu_id: i64) -> Self {
        self.cpu_id = Some(cpu_id);
        self
    }

    /// Link a RAM spec
    pub fn with_ram(mut self, ram_spec_id: i64) -> Self {
        self.ram_spec_id = Some(ram_spec_id);
        self
    }

    /// Link the primary storage profile
    pub fn with_primary_storage(mut self, profile_id: i64) -> Self {
        self.primary_storage_profile_id = Some(profile_id);
        self
    }

    /// Clear every denormalized output
    ///
    /// Used when valuation-relevant inputs change and the stored
    /// outputs can no longer be trusted.
    pub fn clear_valuation(&mut self) {
        self.adjusted_price = None;
        self.valuation_breakdown = None;
        self.dollar_per_cpu_mark_single = None;
        self.dollar_per_cpu_mark_multi = None;
        self.dollar_per_cpu_mark_single_adjusted = None;
        self.dollar_per_cpu_mark_multi_adjusted = None;
        self.last_valuation_error = None;
    }
}
