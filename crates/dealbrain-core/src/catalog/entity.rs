//! Component catalog entities
//!
//! Benchmark-bearing catalog rows referenced by listings. Benchmark and
//! spec fields are optional: catalog data arrives incomplete and the
//! engine treats missing values as nulls.

use serde::{Deserialize, Serialize};

/// CPU catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    pub id: i64,
    pub name: String,

    /// PassMark multi-thread score
    #[serde(default)]
    pub cpu_mark_multi: Option<f64>,

    /// PassMark single-thread score
    #[serde(default)]
    pub cpu_mark_single: Option<f64>,

    /// Integrated GPU score
    #[serde(default)]
    pub igpu_mark: Option<f64>,

    /// Rated TDP in watts
    #[serde(default)]
    pub tdp_w: Option<f64>,

    #[serde(default)]
    pub release_year: Option<i32>,
}

impl Cpu {
    /// Create a CPU entry with only a name; benchmarks filled later
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cpu_mark_multi: None,
            cpu_mark_single: None,
            igpu_mark: None,
            tdp_w: None,
            release_year: None,
        }
    }

    /// Set both PassMark scores
    pub fn with_marks(mut self, multi: f64, single: f64) -> Self {
        self.cpu_mark_multi = Some(multi);
        self.cpu_mark_single = Some(single);
        self
    }

    /// Set the rated TDP
    pub fn with_tdp(mut self, tdp_w: f64) -> Self {
        self.tdp_w = Some(tdp_w);
        self
    }
}

/// Discrete GPU catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gpu {
    pub id: i64,
    pub name: String,

    /// PassMark G3D score
    #[serde(default)]
    pub gpu_mark: Option<f64>,

    #[serde(default)]
    pub tdp_w: Option<f64>,

    #[serde(default)]
    pub release_year: Option<i32>,
}

impl Gpu {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gpu_mark: None,
            tdp_w: None,
            release_year: None,
        }
    }
}

/// RAM specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RamSpec {
    pub id: i64,

    /// DDR generation, e.g. "DDR4" or "DDR5"
    #[serde(default)]
    pub ddr_generation: Option<String>,

    #[serde(default)]
    pub speed_mhz: Option<u32>,

    #[serde(default)]
    pub module_count: Option<u32>,

    #[serde(default)]
    pub capacity_per_module_gb: Option<f64>,

    #[serde(default)]
    pub total_capacity_gb: Option<f64>,
}

impl RamSpec {
    /// Create a spec from total capacity alone
    pub fn with_total(id: i64, total_capacity_gb: f64) -> Self {
        Self {
            id,
            ddr_generation: None,
            speed_mhz: None,
            module_count: None,
            capacity_per_module_gb: None,
            total_capacity_gb: Some(total_capacity_gb),
        }
    }
}

/// Storage medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMedium {
    Ssd,
    Nvme,
    Hdd,
}

/// Storage profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageProfile {
    pub id: i64,

    #[serde(default)]
    pub capacity_gb: Option<f64>,

    pub medium: StorageMedium,

    /// Bus interface, e.g. "PCIe 4.0 x4" or "SATA III"
    #[serde(default)]
    pub interface: Option<String>,

    /// Physical form factor, e.g. "M.2 2280" or "2.5in"
    #[serde(default)]
    pub form_factor: Option<String>,

    #[serde(default)]
    pub performance_tier: Option<String>,
}

impl StorageProfile {
    pub fn new(id: i64, capacity_gb: f64, medium: StorageMedium) -> Self {
        Self {
            id,
            capacity_gb: Some(capacity_gb),
            medium,
            interface: None,
            form_factor: None,
            performance_tier: None,
        }
    }
}

/// A typed port count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port type, e.g. "usb_a", "usb_c", "hdmi", "ethernet"
    pub port_type: String,
    pub count: u32,
}

/// Enumerated port counts for a chassis
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortsProfile {
    pub id: i64,

    #[serde(default)]
    pub ports: Vec<Port>,
}

impl PortsProfile {
    pub fn new(id: i64) -> Self {
        Self { id, ports: Vec::new() }
    }

    /// Add a typed port count
    pub fn with_port(mut self, port_type: impl Into<String>, count: u32) -> Self {
        self.ports.push(Port {
            port_type: port_type.into(),
            count,
        });
        self
    }
}
