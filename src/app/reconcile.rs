//! Reconciliation of the remote catalog against the local inventory

use std::collections::HashSet;

use crate::app::models::{CatalogEntry, LocalRomRecord};

/// Whether a catalog entry is already in the local collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Possession {
    Present,
    Missing,
}

/// Catalog entries paired with their possession flag, in catalog order
#[derive(Debug, Clone, Default)]
pub struct ReconciliationResult {
    pub items: Vec<(CatalogEntry, Possession)>,
}

impl ReconciliationResult {
    pub fn missing(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.with(Possession::Missing)
    }

    pub fn present(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.with(Possession::Present)
    }

    pub fn missing_count(&self) -> usize {
        self.missing().count()
    }

    pub fn present_count(&self) -> usize {
        self.present().count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the result, keeping only the entries
    pub fn into_entries(self) -> Vec<CatalogEntry> {
        self.items.into_iter().map(|(entry, _)| entry).collect()
    }

    fn with(&self, wanted: Possession) -> impl Iterator<Item = &CatalogEntry> {
        self.items
            .iter()
            .filter(move |(_, possession)| *possession == wanted)
            .map(|(entry, _)| entry)
    }
}

/// Flag each catalog entry as present or missing locally
///
/// Identifiers are compared exactly after lowercasing. With `missing_only`
/// set, present entries are dropped from the result altogether.
pub fn reconcile(
    catalog: &[CatalogEntry],
    local: &[LocalRomRecord],
    missing_only: bool,
) -> ReconciliationResult {
    let owned: HashSet<String> = local.iter().map(|r| r.identifier.to_lowercase()).collect();

    let items = catalog
        .iter()
        .map(|entry| {
            let possession = if owned.contains(&entry.identifier.to_lowercase()) {
                Possession::Present
            } else {
                Possession::Missing
            };
            (entry, possession)
        })
        .filter(|(_, possession)| !missing_only || *possession == Possession::Missing)
        .map(|(entry, possession)| (entry.clone(), possession))
        .collect();

    ReconciliationResult { items }
}
