//! In-memory entity store
//!
//! Concurrent maps over listings, catalog entities, rulesets and
//! overrides, with atomic id allocation and the reverse lookups the
//! recompute triggers need. Reads hand out clones so evaluations work
//! against a consistent snapshot of whatever they loaded.

use dashmap::DashMap;
use dealbrain_core::catalog::{Cpu, Gpu, Listing, PortsProfile, RamSpec, StorageProfile};
use dealbrain_core::rule::{select_ruleset, ListingOverride, Ruleset};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Reference to a catalog entity, used as a recompute scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum CatalogRef {
    Cpu(i64),
    Gpu(i64),
    RamSpec(i64),
    StorageProfile(i64),
    PortsProfile(i64),
}

/// In-memory entity store
#[derive(Default)]
pub struct Store {
    listings: DashMap<i64, Listing>,
    cpus: DashMap<i64, Cpu>,
    gpus: DashMap<i64, Gpu>,
    ram_specs: DashMap<i64, RamSpec>,
    storage_profiles: DashMap<i64, StorageProfile>,
    ports_profiles: DashMap<i64, PortsProfile>,
    rulesets: DashMap<i64, Ruleset>,
    overrides: DashMap<(i64, i64), ListingOverride>,
    next_id: AtomicI64,
}

impl Store {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// Allocate a fresh entity id
    pub fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn track_id(&self, id: i64) {
        self.next_id.fetch_max(id + 1, Ordering::Relaxed);
    }

    // ==================== Listings ====================

    /// Insert or replace a listing
    pub fn upsert_listing(&self, listing: Listing) {
        self.track_id(listing.id);
        self.listings.insert(listing.id, listing);
    }

    /// Get a listing snapshot
    pub fn get_listing(&self, id: i64) -> Option<Listing> {
        self.listings.get(&id).map(|l| l.clone())
    }

    /// Apply a mutation to a stored listing
    pub fn update_listing(&self, id: i64, f: impl FnOnce(&mut Listing)) -> bool {
        match self.listings.get_mut(&id) {
            Some(mut listing) => {
                f(&mut listing);
                true
            }
            None => false,
        }
    }

    /// All listing ids in stable ascending order
    pub fn listing_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.listings.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Listing count
    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }

    /// Ids of listings whose effective ruleset is the given one
    ///
    /// A listing uses the ruleset either through an explicit pin or,
    /// when unpinned, because it is the active selection.
    pub fn listing_ids_for_ruleset(&self, ruleset_id: i64) -> Vec<i64> {
        let active_id = self.active_ruleset().map(|rs| rs.id);
        let mut ids: Vec<i64> = self
            .listings
            .iter()
            .filter(|e| match e.value().ruleset_id {
                Some(pinned) => pinned == ruleset_id,
                None => active_id == Some(ruleset_id),
            })
            .map(|e| *e.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Ids of listings referencing a catalog entity
    pub fn listings_referencing(&self, entity: CatalogRef) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .listings
            .iter()
            .filter(|e| {
                let l = e.value();
                match entity {
                    CatalogRef::Cpu(id) => l.cpu_id == Some(id),
                    CatalogRef::Gpu(id) => l.gpu_id == Some(id),
                    CatalogRef::RamSpec(id) => l.ram_spec_id == Some(id),
                    CatalogRef::StorageProfile(id) => {
                        l.primary_storage_profile_id == Some(id)
                            || l.secondary_storage_profile_id == Some(id)
                    }
                    CatalogRef::PortsProfile(id) => l.ports_profile_id == Some(id),
                }
            })
            .map(|e| *e.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    // ==================== Catalog ====================

    pub fn upsert_cpu(&self, cpu: Cpu) {
        self.track_id(cpu.id);
        self.cpus.insert(cpu.id, cpu);
    }

    pub fn get_cpu(&self, id: i64) -> Option<Cpu> {
        self.cpus.get(&id).map(|c| c.clone())
    }

    pub fn upsert_gpu(&self, gpu: Gpu) {
        self.track_id(gpu.id);
        self.gpus.insert(gpu.id, gpu);
    }

    pub fn get_gpu(&self, id: i64) -> Option<Gpu> {
        self.gpus.get(&id).map(|g| g.clone())
    }

    pub fn upsert_ram_spec(&self, spec: RamSpec) {
        self.track_id(spec.id);
        self.ram_specs.insert(spec.id, spec);
    }

    pub fn get_ram_spec(&self, id: i64) -> Option<RamSpec> {
        self.ram_specs.get(&id).map(|r| r.clone())
    }

    pub fn upsert_storage_profile(&self, profile: StorageProfile) {
        self.track_id(profile.id);
        self.storage_profiles.insert(profile.id, profile);
    }

    pub fn get_storage_profile(&self, id: i64) -> Option<StorageProfile> {
        self.storage_profiles.get(&id).map(|p| p.clone())
    }

    pub fn upsert_ports_profile(&self, profile: PortsProfile) {
        self.track_id(profile.id);
        self.ports_profiles.insert(profile.id, profile);
    }

    pub fn get_ports_profile(&self, id: i64) -> Option<PortsProfile> {
        self.ports_profiles.get(&id).map(|p| p.clone())
    }

    // ==================== Rulesets ====================

    /// Insert or replace a ruleset (with its groups and rules)
    pub fn upsert_ruleset(&self, ruleset: Ruleset) {
        self.track_id(ruleset.id);
        for rule in ruleset.iter_rules() {
            self.track_id(rule.id);
        }
        self.rulesets.insert(ruleset.id, ruleset);
    }

    /// Get a ruleset snapshot
    pub fn get_ruleset(&self, id: i64) -> Option<Ruleset> {
        self.rulesets.get(&id).map(|r| r.clone())
    }

    /// The active ruleset by priority desc, id asc
    pub fn active_ruleset(&self) -> Option<Ruleset> {
        let snapshot: Vec<Ruleset> = self.rulesets.iter().map(|e| e.value().clone()).collect();
        select_ruleset(snapshot.iter()).cloned()
    }

    // ==================== Overrides ====================

    /// Insert or replace an override
    pub fn upsert_override(&self, o: ListingOverride) {
        self.overrides.insert((o.listing_id, o.rule_id), o);
    }

    /// Remove an override; returns whether it existed
    pub fn remove_override(&self, listing_id: i64, rule_id: i64) -> bool {
        self.overrides.remove(&(listing_id, rule_id)).is_some()
    }

    /// Overrides targeting one listing
    pub fn overrides_for_listing(&self, listing_id: i64) -> Vec<ListingOverride> {
        let mut found: Vec<ListingOverride> = self
            .overrides
            .iter()
            .filter(|e| e.key().0 == listing_id)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|o| o.rule_id);
        found
    }
}
