//! Static advisory table keyed by disease category.
//!
//! Built once at startup and shared read-only. Lookups never fail: a label the
//! table does not know resolves to the `Healthy` entry.

use std::collections::HashMap;

use serde::Serialize;

/// Label whose entry answers every unknown lookup.
pub const DEFAULT_LABEL: &str = "Healthy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryEntry {
    pub severity: &'static str,
    pub treatment: &'static str,
    pub color: &'static str,
}

const BUILTIN: [(&str, AdvisoryEntry); 5] = [
    (
        "Fungal",
        AdvisoryEntry {
            severity: "High",
            treatment: "Potassium + Fungicide",
            color: "#ff4b4b",
        },
    ),
    (
        "Bacterial",
        AdvisoryEntry {
            severity: "Medium",
            treatment: "NPK + Copper Spray",
            color: "#ffa500",
        },
    ),
    (
        "Viral",
        AdvisoryEntry {
            severity: "Very High",
            treatment: "Remove Plant + Compost",
            color: "#ff0000",
        },
    ),
    (
        "Pest",
        AdvisoryEntry {
            severity: "Medium",
            treatment: "Neem Oil + Nitrogen",
            color: "#f1c40f",
        },
    ),
    (
        "Healthy",
        AdvisoryEntry {
            severity: "None",
            treatment: "Normal Maintenance",
            color: "#2ecc71",
        },
    ),
];

#[derive(Debug)]
pub struct KnowledgeBase {
    entries: HashMap<&'static str, AdvisoryEntry>,
    order: Vec<&'static str>,
    fallback: AdvisoryEntry,
}

impl KnowledgeBase {
    pub fn builtin() -> Self {
        let order: Vec<&'static str> = BUILTIN.iter().map(|(label, _)| *label).collect();
        let entries: HashMap<_, _> = BUILTIN.iter().cloned().collect();
        let fallback = entries
            .get(DEFAULT_LABEL)
            .cloned()
            .unwrap_or_else(|| BUILTIN[BUILTIN.len() - 1].1.clone());

        Self {
            entries,
            order,
            fallback,
        }
    }

    pub fn lookup(&self, label: &str) -> &AdvisoryEntry {
        self.entries.get(label).unwrap_or(&self.fallback)
    }

    pub fn is_known(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// Entries in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &AdvisoryEntry)> + '_ {
        self.order
            .iter()
            .filter_map(move |label| self.entries.get(label).map(|entry| (*label, entry)))
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}
