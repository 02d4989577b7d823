//! Catalog and listing models
//!
//! Entities the engine values and the component catalog it references:
//! CPUs, GPUs, RAM specs, storage profiles, port profiles, and the
//! listing itself with its denormalized valuation outputs.

mod entity;
mod listing;

pub use entity::{Cpu, Gpu, Port, PortsProfile, RamSpec, StorageMedium, StorageProfile};
pub use listing::{Listing, ListingCondition};
