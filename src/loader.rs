//! Tumor correlation table loading
//!
//! One CSV per tumor type; the tumor id is the file stem
//! (`"BLCA Tumor.csv"` -> `"BLCA Tumor"`). A file that cannot be used is
//! skipped and reported, a row that cannot be parsed is skipped with a
//! warning. Neither stops the run.

use crate::config::Config;
use crate::error::{LoadError, RowError};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One row of one tumor table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneRecord {
    pub gene_symbol: String,
    /// Signed Pearson correlation with the hub gene
    pub correlation: f64,
    pub tumor_type: String,
    /// 1-based data row inside the source file
    pub row: usize,
}

impl GeneRecord {
    pub fn strength(&self) -> f64 {
        self.correlation.abs()
    }
}

/// All usable rows of one tumor
#[derive(Debug, Clone)]
pub struct TumorGenes {
    pub id: String,
    pub color: String,
    pub records: Vec<GeneRecord>,
    /// Rows dropped while parsing
    pub skipped_rows: usize,
}

/// A tumor that was left out, and why
#[derive(Debug, Clone, Serialize)]
pub struct SkippedTumor {
    pub id: String,
    pub reason: String,
}

/// Result of loading a data directory
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub tumors: Vec<TumorGenes>,
    pub skipped: Vec<SkippedTumor>,
}

/// Find tumor tables in a directory, sorted by tumor id
pub fn discover_tumor_types(data_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut found: Vec<(String, PathBuf)> = std::fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read data directory: {}", data_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?.to_string();
            Some((stem, p))
        })
        .collect();

    found.sort();

    for (id, _) in &found {
        info!("Discovered tumor type: {}", id);
    }

    Ok(found)
}

/// Load every configured (or discovered) tumor table in `data_dir`
pub fn load_all(data_dir: &Path, config: &Config) -> Result<LoadedData> {
    let sources: Vec<(String, PathBuf)> = if config.tumors.is_empty() {
        discover_tumor_types(data_dir)?
    } else {
        config
            .tumors
            .iter()
            .map(|id| (id.clone(), data_dir.join(format!("{}.csv", id))))
            .collect()
    };

    let mut data = LoadedData::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (id, path) in sources {
        if !seen.insert(id.clone()) {
            warn!("Skipping {}: tumor {} is already loaded", path.display(), id);
            data.skipped.push(SkippedTumor {
                reason: format!("duplicate tumor id ({})", path.display()),
                id,
            });
            continue;
        }

        match load_tumor(&path, &id, config) {
            Ok((records, row_errors)) => {
                for err in &row_errors {
                    warn!("{}: skipped {}", id, err);
                }
                info!(
                    "{}: loaded {} rows ({} skipped)",
                    id,
                    records.len(),
                    row_errors.len()
                );
                data.tumors.push(TumorGenes {
                    color: config.tumor_color(&id).to_string(),
                    id,
                    records,
                    skipped_rows: row_errors.len(),
                });
            }
            Err(e) => {
                warn!("Skipping tumor {}: {}", id, e);
                data.skipped.push(SkippedTumor {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(data)
}

/// Parse one tumor table.
///
/// Returns the valid rows in file order together with the rows that were dropped.
pub fn load_tumor(
    path: &Path,
    tumor_id: &str,
    config: &Config,
) -> std::result::Result<(Vec<GeneRecord>, Vec<RowError>), LoadError> {
    if !path.is_file() {
        return Err(LoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let gene_idx = column_index(&headers, &config.gene_column, path)?;
    let corr_idx = column_index(&headers, &config.correlation_column, path)?;

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                errors.push(RowError::Malformed {
                    row,
                    message: e.to_string(),
                });
                continue;
            }
        };

        match parse_row(&record, gene_idx, corr_idx, row) {
            Ok((gene_symbol, correlation)) => records.push(GeneRecord {
                gene_symbol,
                correlation,
                tumor_type: tumor_id.to_string(),
                row,
            }),
            Err(e) => errors.push(e),
        }
    }

    debug!(
        "{}: {} rows parsed from {}",
        tumor_id,
        records.len(),
        path.display()
    );

    Ok((records, errors))
}

fn column_index(
    headers: &csv::StringRecord,
    wanted: &str,
    path: &Path,
) -> std::result::Result<usize, LoadError> {
    let wanted = wanted.trim();
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: wanted.to_string(),
            found: headers.iter().collect::<Vec<_>>().join(", "),
        })
}

fn parse_row(
    record: &csv::StringRecord,
    gene_idx: usize,
    corr_idx: usize,
    row: usize,
) -> std::result::Result<(String, f64), RowError> {
    let (Some(gene), Some(value)) = (record.get(gene_idx), record.get(corr_idx)) else {
        return Err(RowError::Malformed {
            row,
            message: format!("expected at least {} fields, found {}", gene_idx.max(corr_idx) + 1, record.len()),
        });
    };

    if gene.is_empty() {
        return Err(RowError::EmptyGeneSymbol { row });
    }

    let correlation: f64 = value
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| RowError::InvalidCorrelation {
            row,
            value: value.to_string(),
        })?;

    Ok((gene.to_string(), correlation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_discover_sorted_csv_only() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "STAD Tumor.csv", "Gene Symbol,PCC\n");
        write(dir.path(), "BLCA Tumor.csv", "Gene Symbol,PCC\n");
        write(dir.path(), "notes.txt", "ignore me");

        let found = discover_tumor_types(dir.path()).unwrap();
        let ids: Vec<&str> = found.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["BLCA Tumor", "STAD Tumor"]);
    }

    #[test]
    fn test_load_tumor_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "BLCA.csv",
            "Gene Symbol,PCC,p-value\nIRF1,0.62,1e-5\nLAP3, 0.55 ,1e-4\nIFNG,-0.51,0.01\n",
        );

        let (records, errors) =
            load_tumor(&dir.path().join("BLCA.csv"), "BLCA", &Config::default()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].gene_symbol, "IRF1");
        assert_eq!(records[1].correlation, 0.55);
        assert_eq!(records[2].correlation, -0.51);
        assert_eq!(records[2].row, 3);
        assert!(records.iter().all(|r| r.tumor_type == "BLCA"));
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "CESC.csv",
            "Gene Symbol,PCC\nUGT2A1,0.7\nBAD,n/a\n,0.9\nINF,inf\nLAP3,0.6\n",
        );

        let (records, errors) =
            load_tumor(&dir.path().join("CESC.csv"), "CESC", &Config::default()).unwrap();
        let genes: Vec<&str> = records.iter().map(|r| r.gene_symbol.as_str()).collect();
        assert_eq!(genes, vec!["UGT2A1", "LAP3"]);
        assert_eq!(errors.len(), 3);
        assert_eq!(
            errors[0],
            RowError::InvalidCorrelation {
                row: 2,
                value: "n/a".to_string()
            }
        );
        assert_eq!(errors[1], RowError::EmptyGeneSymbol { row: 3 });
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "OV.csv", "Gene,Correlation\nA,0.9\n");

        let err = load_tumor(&dir.path().join("OV.csv"), "OV", &Config::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { ref column, .. } if column == "PCC" || column == "Gene Symbol"));
    }

    #[test]
    fn test_column_names_are_configurable() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "OV.csv", "gene,r\nA,0.9\n");

        let config = Config {
            gene_column: "Gene".to_string(),
            correlation_column: "R".to_string(),
            ..Config::default()
        };
        let (records, _) = load_tumor(&dir.path().join("OV.csv"), "OV", &config).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_load_all_skips_broken_tumors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "BLCA Tumor.csv", "Gene Symbol,PCC\nIRF1,0.62\n");
        write(dir.path(), "OV Tumor.csv", "Symbol,PCC\nA,0.9\n");

        let data = load_all(dir.path(), &Config::default()).unwrap();
        assert_eq!(data.tumors.len(), 1);
        assert_eq!(data.tumors[0].id, "BLCA Tumor");
        assert_eq!(data.tumors[0].color, "#3D9970");
        assert_eq!(data.skipped.len(), 1);
        assert_eq!(data.skipped[0].id, "OV Tumor");
    }

    #[test]
    fn test_configured_tumor_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "BLCA Tumor.csv", "Gene Symbol,PCC\nIRF1,0.62\n");

        let config = Config {
            tumors: vec!["SKCM Tumor".to_string(), "BLCA Tumor".to_string()],
            ..Config::default()
        };
        let data = load_all(dir.path(), &config).unwrap();
        assert_eq!(data.tumors.len(), 1);
        assert_eq!(data.skipped[0].id, "SKCM Tumor");
        assert!(data.skipped[0].reason.contains("not found"));
    }

    #[test]
    fn test_duplicate_tumor_ids_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "BLCA Tumor.csv", "Gene Symbol,PCC\nIRF1,0.62\n");

        let config = Config {
            tumors: vec!["BLCA Tumor".to_string(), "BLCA Tumor".to_string()],
            ..Config::default()
        };
        let data = load_all(dir.path(), &config).unwrap();
        assert_eq!(data.tumors.len(), 1);
        assert_eq!(data.skipped.len(), 1);
        assert_eq!(data.skipped[0].id, "BLCA Tumor");
        assert!(data.skipped[0].reason.contains("duplicate"));
    }

    #[test]
    fn test_discovered_stems_differing_in_extension_case() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "BLCA.CSV", "Gene Symbol,PCC\nIRF1,0.62\n");
        write(dir.path(), "BLCA.csv", "Gene Symbol,PCC\nLAP3,0.55\n");

        let data = load_all(dir.path(), &Config::default()).unwrap();
        assert_eq!(data.tumors.len(), 1);
        assert_eq!(data.tumors[0].id, "BLCA");
        // paths sort byte-wise, so the upper-case extension comes first
        assert_eq!(data.tumors[0].records[0].gene_symbol, "IRF1");
        assert_eq!(data.skipped.len(), 1);
    }

    #[test]
    fn test_missing_data_dir_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_all(&dir.path().join("nope"), &Config::default()).is_err());
    }
}
