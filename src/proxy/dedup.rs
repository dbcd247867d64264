//! Collapse records describing the same logical endpoint

use crate::proxy::models::{IdentityOptions, ProxyRecord};
use log::debug;
use std::collections::HashSet;

/// Removes duplicates by identity key, keeping the first occurrence
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    options: IdentityOptions,
}

impl Deduplicator {
    pub fn new(options: IdentityOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &IdentityOptions {
        &self.options
    }

    /// Keep one record per identity key, preserving first-seen order
    pub fn dedup(&self, records: Vec<ProxyRecord>) -> Vec<ProxyRecord> {
        let total = records.len();
        let mut seen = HashSet::with_capacity(total);
        let unique: Vec<ProxyRecord> = records
            .into_iter()
            .filter(|record| seen.insert(record.identity_key(&self.options)))
            .collect();

        debug!("Dropped {} duplicate records", total - unique.len());
        unique
    }
}
