//! Correlation threshold and per-tumor gene cap

use crate::loader::{GeneRecord, TumorGenes};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Outcome of filtering every tumor
#[derive(Debug, Clone, Default)]
pub struct FilterResult {
    /// Tumors with at least one surviving gene, input order kept
    pub tumors: Vec<TumorGenes>,
    /// Tumors with no gene left after filtering
    pub empty: Vec<String>,
}

/// Apply threshold and cap to every tumor. Tumors left empty are dropped.
pub fn filter_tumors(tumors: Vec<TumorGenes>, threshold: f64, max_genes: usize) -> FilterResult {
    let mut result = FilterResult::default();

    for mut tumor in tumors {
        let before = tumor.records.len();
        tumor.records = filter_records(tumor.records, threshold, max_genes);

        info!(
            "{}: |PCC| >= {} keeps {} of {} rows ({} unparsable rows skipped earlier)",
            tumor.id,
            threshold,
            tumor.records.len(),
            before,
            tumor.skipped_rows
        );

        if tumor.records.is_empty() {
            warn!("{}: no genes pass the threshold, tumor omitted", tumor.id);
            result.empty.push(tumor.id);
        } else {
            result.tumors.push(tumor);
        }
    }

    result
}

/// Filter one tumor's rows.
///
/// Keeps rows with `|r| >= threshold`, collapses repeated gene symbols to
/// their strongest row, then keeps the `max_genes` strongest rows (earlier
/// rows win ties). Survivors stay in input order.
pub fn filter_records(records: Vec<GeneRecord>, threshold: f64, max_genes: usize) -> Vec<GeneRecord> {
    let passing: Vec<GeneRecord> = records
        .into_iter()
        .filter(|r| r.strength() >= threshold)
        .collect();

    let mut kept = dedup_strongest(passing);

    if kept.len() > max_genes {
        let mut order: Vec<usize> = (0..kept.len()).collect();
        // stable sort, so equal strengths stay in row order
        order.sort_by(|&a, &b| kept[b].strength().total_cmp(&kept[a].strength()));
        let mut keep = vec![false; kept.len()];
        for &i in order.iter().take(max_genes) {
            keep[i] = true;
        }
        let mut flags = keep.into_iter();
        kept.retain(|_| flags.next().unwrap_or(false));
    }

    kept
}

fn dedup_strongest(records: Vec<GeneRecord>) -> Vec<GeneRecord> {
    let mut best: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<GeneRecord> = Vec::with_capacity(records.len());

    for record in records {
        match best.get(&record.gene_symbol) {
            Some(&idx) => {
                debug!(
                    "{}: duplicate gene {} at row {} (first at row {})",
                    record.tumor_type, record.gene_symbol, record.row, out[idx].row
                );
                if record.strength() > out[idx].strength() {
                    out[idx] = record;
                }
            }
            None => {
                best.insert(record.gene_symbol.clone(), out.len());
                out.push(record);
            }
        }
    }

    // a replaced duplicate keeps the slot of the first occurrence; restore row order
    out.sort_by_key(|r| r.row);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(gene: &str, r: f64, row: usize) -> GeneRecord {
        GeneRecord {
            gene_symbol: gene.to_string(),
            correlation: r,
            tumor_type: "BLCA".to_string(),
            row,
        }
    }

    fn genes(records: &[GeneRecord]) -> Vec<&str> {
        records.iter().map(|r| r.gene_symbol.as_str()).collect()
    }

    #[test]
    fn test_threshold_on_absolute_value() {
        let records = vec![
            rec("IRF1", 0.62, 1),
            rec("LAP3", 0.55, 2),
            rec("IFNG", -0.51, 3),
            rec("XYZ", 0.3, 4),
        ];
        let kept = filter_records(records, 0.5, 1000);
        assert_eq!(genes(&kept), vec!["IRF1", "LAP3", "IFNG"]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let kept = filter_records(vec![rec("A", 0.5, 1), rec("B", -0.5, 2)], 0.5, 10);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_cap_keeps_strongest_in_input_order() {
        let records = vec![
            rec("A", 0.6, 1),
            rec("B", 0.9, 2),
            rec("C", -0.8, 3),
            rec("D", 0.7, 4),
        ];
        let kept = filter_records(records, 0.5, 2);
        assert_eq!(genes(&kept), vec!["B", "C"]);
    }

    #[test]
    fn test_cap_ties_prefer_earlier_rows() {
        let records = vec![
            rec("A", 0.7, 1),
            rec("B", 0.7, 2),
            rec("C", -0.7, 3),
        ];
        let kept = filter_records(records, 0.5, 2);
        assert_eq!(genes(&kept), vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_gene_keeps_strongest() {
        let records = vec![
            rec("A", 0.6, 1),
            rec("B", 0.7, 2),
            rec("A", -0.9, 3),
        ];
        let kept = filter_records(records, 0.5, 10);
        assert_eq!(genes(&kept), vec!["B", "A"]);
        assert_eq!(kept[1].correlation, -0.9);
    }

    #[test]
    fn test_empty_tumor_is_reported() {
        let tumors = vec![
            TumorGenes {
                id: "BLCA".to_string(),
                color: "#3D9970".to_string(),
                records: vec![rec("A", 0.9, 1)],
                skipped_rows: 0,
            },
            TumorGenes {
                id: "OV".to_string(),
                color: "#FF4081".to_string(),
                records: vec![rec("B", 0.1, 1)],
                skipped_rows: 0,
            },
        ];
        let result = filter_tumors(tumors, 0.5, 10);
        assert_eq!(result.tumors.len(), 1);
        assert_eq!(result.tumors[0].id, "BLCA");
        assert_eq!(result.empty, vec!["OV".to_string()]);
    }
}
