//! Evaluation context assembly
//!
//! Builds the nested context document for one listing from its eagerly
//! joined catalog rows:
//! `{ listing: { ...flat fields, cpu: {...}, gpu: {...}, ram: {...},
//! primary_storage: {...}, secondary_storage: {...}, ports: {...} } }`.
//! Dangling catalog references produce integrity warnings; the joined
//! sub-object is simply absent and rule paths through it resolve to
//! null.

use crate::error::{CoordinatorError, Result};
use crate::store::Store;
use dealbrain_core::catalog::Listing;
use dealbrain_core::context::EvaluationContext;
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};

/// A context plus the integrity problems found while joining
#[derive(Debug)]
pub struct AssembledContext {
    pub context: EvaluationContext,
    pub integrity_warnings: Vec<String>,
}

impl AssembledContext {
    /// Whether any catalog reference was dangling
    pub fn has_integrity_warning(&self) -> bool {
        !self.integrity_warnings.is_empty()
    }
}

/// Assemble the evaluation context for a listing
pub fn build_context(listing: &Listing, store: &Store) -> Result<AssembledContext> {
    let mut warnings = Vec::new();
    let mut doc = Map::new();

    doc.insert("id".to_string(), json!(listing.id));
    doc.insert("title".to_string(), json!(listing.title));
    doc.insert("base_price".to_string(), json!(listing.base_price));
    doc.insert("condition".to_string(), json!(listing.condition.as_str()));
    if let Some(form_factor) = &listing.form_factor {
        doc.insert("form_factor".to_string(), json!(form_factor));
    }

    join(
        &mut doc,
        &mut warnings,
        "cpu",
        listing.cpu_id,
        |id| store.get_cpu(id),
    )?;
    join(
        &mut doc,
        &mut warnings,
        "gpu",
        listing.gpu_id,
        |id| store.get_gpu(id),
    )?;
    join(&mut doc, &mut warnings, "ram", listing.ram_spec_id, |id| {
        store.get_ram_spec(id)
    })?;
    join(
        &mut doc,
        &mut warnings,
        "primary_storage",
        listing.primary_storage_profile_id,
        |id| store.get_storage_profile(id),
    )?;
    join(
        &mut doc,
        &mut warnings,
        "secondary_storage",
        listing.secondary_storage_profile_id,
        |id| store.get_storage_profile(id),
    )?;

    if let Some(ports_id) = listing.ports_profile_id {
        match store.get_ports_profile(ports_id) {
            Some(profile) => {
                // Port counts are exposed as a flat type -> count map
                let mut counts: Map<String, JsonValue> = Map::new();
                for port in &profile.ports {
                    let entry = counts
                        .entry(port.port_type.clone())
                        .or_insert_with(|| json!(0u64));
                    let current = entry.as_u64().unwrap_or(0);
                    *entry = json!(current + u64::from(port.count));
                }
                doc.insert("ports".to_string(), JsonValue::Object(counts));
            }
            None => warnings.push(format!("ports_profile {} missing", ports_id)),
        }
    }

    if !listing.attributes.is_null() {
        doc.insert(
            "attributes".to_string(),
            serde_json::to_value(&listing.attributes)
                .map_err(|e| CoordinatorError::context(e.to_string()))?,
        );
    }

    let root = json!({ "listing": JsonValue::Object(doc) });
    let context = EvaluationContext::new(
        serde_json::from_value(root).map_err(|e| CoordinatorError::context(e.to_string()))?,
    );

    Ok(AssembledContext {
        context,
        integrity_warnings: warnings,
    })
}

fn join<T: Serialize>(
    doc: &mut Map<String, JsonValue>,
    warnings: &mut Vec<String>,
    key: &str,
    entity_id: Option<i64>,
    fetch: impl FnOnce(i64) -> Option<T>,
) -> Result<()> {
    let Some(id) = entity_id else {
        return Ok(());
    };
    match fetch(id) {
        Some(entity) => {
            doc.insert(
                key.to_string(),
                serde_json::to_value(&entity)
                    .map_err(|e| CoordinatorError::context(e.to_string()))?,
            );
        }
        None => warnings.push(format!("{} {} missing", key, id)),
    }
    Ok(())
}
