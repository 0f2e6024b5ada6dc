//! Tumor-specific vs cross-tumor gene classification
//!
//! A gene is cross-tumor when it survives filtering in two or more tumors.
//! Such genes become a single shared node in the network.

use crate::loader::TumorGenes;
use log::{debug, info};
use serde::Serialize;
use std::collections::HashMap;

/// A gene's correlation in one tumor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Association {
    pub tumor: String,
    pub correlation: f64,
}

impl Association {
    pub fn strength(&self) -> f64 {
        self.correlation.abs()
    }
}

/// Gene found in exactly one tumor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecificGene {
    pub gene: String,
    pub association: Association,
}

/// Gene found in two or more tumors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTumorGene {
    pub gene: String,
    /// One entry per tumor, in tumor order
    pub associations: Vec<Association>,
}

impl CrossTumorGene {
    /// Strongest |PCC| over all tumors
    pub fn strength(&self) -> f64 {
        self.associations
            .iter()
            .map(Association::strength)
            .fold(0.0, f64::max)
    }

    /// Tumor holding the strongest correlation (first one on ties)
    pub fn main_tumor(&self) -> &str {
        let mut best: Option<&Association> = None;
        for a in &self.associations {
            if best.map_or(true, |b| a.strength() > b.strength()) {
                best = Some(a);
            }
        }
        best.map(|a| a.tumor.as_str()).unwrap_or_default()
    }

    pub fn tumors(&self) -> Vec<&str> {
        self.associations.iter().map(|a| a.tumor.as_str()).collect()
    }
}

/// Partition of all surviving genes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    /// In order of first appearance (tumor order, then row order)
    pub specific: Vec<SpecificGene>,
    /// In order of first appearance
    pub cross: Vec<CrossTumorGene>,
}

impl Classification {
    pub fn total_genes(&self) -> usize {
        self.specific.len() + self.cross.len()
    }
}

/// Group filtered genes by symbol and split them into specific and cross-tumor sets
pub fn classify(tumors: &[TumorGenes]) -> Classification {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut genes: Vec<(&str, Vec<Association>)> = Vec::new();

    for tumor in tumors {
        for record in &tumor.records {
            let slot = *index.entry(record.gene_symbol.as_str()).or_insert_with(|| {
                genes.push((record.gene_symbol.as_str(), Vec::new()));
                genes.len() - 1
            });
            let associations = &mut genes[slot].1;
            // one association per tumor; the filter already collapsed in-tumor duplicates
            if associations.iter().any(|a| a.tumor == tumor.id) {
                continue;
            }
            associations.push(Association {
                tumor: tumor.id.clone(),
                correlation: record.correlation,
            });
        }
    }

    let mut result = Classification::default();
    for (gene, mut associations) in genes {
        if associations.len() > 1 {
            debug!(
                "{}: present in {} tumor types ({})",
                gene,
                associations.len(),
                associations
                    .iter()
                    .map(|a| a.tumor.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            result.cross.push(CrossTumorGene {
                gene: gene.to_string(),
                associations,
            });
        } else if let Some(association) = associations.pop() {
            result.specific.push(SpecificGene {
                gene: gene.to_string(),
                association,
            });
        }
    }

    info!(
        "Classified {} genes: {} tumor-specific, {} cross-tumor",
        result.total_genes(),
        result.specific.len(),
        result.cross.len()
    );

    result
}
