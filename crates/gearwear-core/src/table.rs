//! Case-by-tooth tabulation of a result set, and the CSV table format.
//!
//! Multi-tooth tables have a `Tooth` column and one `W<n>` column per wear
//! case, one row per tooth in ascending order. Single-tooth tables have the
//! `W<n>` columns only and exactly one data row. Values are rounded to one
//! decimal; missing (tooth, case) cells are written empty and skipped on
//! load, so write → read reconstructs the original records to the stated
//! rounding.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Result, WearError};
use crate::MeasurementRecord;

/// Method tag attached to records reconstructed from a table file.
const LOADED_METHOD: &str = "table";

#[derive(Debug, Clone, PartialEq)]
struct TableRow {
    tooth: Option<u32>,
    cells: Vec<Option<f64>>,
}

/// A pivoted wear-depth table.
#[derive(Debug, Clone, PartialEq)]
pub struct WearTable {
    wear_cases: Vec<i32>,
    rows: Vec<TableRow>,
    has_tooth_column: bool,
}

impl WearTable {
    /// Pivot a result set. Records carrying tooth numbers produce the
    /// multi-tooth layout; records without produce the single-row layout.
    pub fn from_records(records: &[MeasurementRecord]) -> Self {
        let wear_cases: Vec<i32> = records
            .iter()
            .map(|r| r.wear_case)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let has_tooth_column = records.iter().any(|r| r.tooth_number.is_some());

        let rows = if has_tooth_column {
            let teeth: Vec<u32> = records
                .iter()
                .filter_map(|r| r.tooth_number)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            teeth
                .into_iter()
                .map(|tooth| {
                    let cells = wear_cases
                        .iter()
                        .map(|&case| {
                            records
                                .iter()
                                .find(|r| r.tooth_number == Some(tooth) && r.wear_case == case)
                                .map(|r| round1(r.wear_depth_um))
                        })
                        .collect();
                    TableRow {
                        tooth: Some(tooth),
                        cells,
                    }
                })
                .collect()
        } else if records.is_empty() {
            Vec::new()
        } else {
            let cells = wear_cases
                .iter()
                .map(|&case| {
                    records
                        .iter()
                        .find(|r| r.wear_case == case)
                        .map(|r| round1(r.wear_depth_um))
                })
                .collect();
            vec![TableRow {
                tooth: None,
                cells,
            }]
        };

        Self {
            wear_cases,
            rows,
            has_tooth_column,
        }
    }

    pub fn wear_cases(&self) -> &[i32] {
        &self.wear_cases
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up one cell. `tooth` must be `None` for single-tooth tables.
    pub fn depth(&self, tooth: Option<u32>, wear_case: i32) -> Option<f64> {
        let col = self.wear_cases.iter().position(|&c| c == wear_case)?;
        let row = self.rows.iter().find(|r| r.tooth == tooth)?;
        row.cells[col]
    }

    /// Flatten back into measurement records (method tag `table`).
    pub fn to_records(&self) -> Vec<MeasurementRecord> {
        let mut records = Vec::new();
        for row in &self.rows {
            for (col, cell) in row.cells.iter().enumerate() {
                if let Some(depth) = cell {
                    records.push(MeasurementRecord {
                        wear_case: self.wear_cases[col],
                        tooth_number: row.tooth,
                        wear_depth_um: *depth,
                        method: LOADED_METHOD.to_string(),
                    });
                }
            }
        }
        records
    }

    /// Serialize to the CSV table format.
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        if self.has_tooth_column {
            out.push_str("Tooth");
            for case in &self.wear_cases {
                let _ = write!(out, ",W{}", case);
            }
        } else {
            for (i, case) in self.wear_cases.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "W{}", case);
            }
        }
        out.push('\n');

        for row in &self.rows {
            let mut first = true;
            if let Some(tooth) = row.tooth {
                let _ = write!(out, "{}", tooth);
                first = false;
            }
            for cell in &row.cells {
                if !first {
                    out.push(',');
                }
                first = false;
                if let Some(depth) = cell {
                    let _ = write!(out, "{:.1}", depth);
                }
            }
            out.push('\n');
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_csv_string())?;
        Ok(())
    }

    /// Parse a table CSV written by [`write_csv`](Self::write_csv).
    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WearError::MissingResource(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|reason| WearError::Table {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| "empty file".to_string())?;
        let mut fields = header.split(',');

        let first = fields.next().unwrap_or_default().trim();
        let has_tooth_column = first == "Tooth";
        let mut wear_cases = Vec::new();
        if !has_tooth_column {
            wear_cases.push(parse_case_label(first)?);
        }
        for field in fields {
            wear_cases.push(parse_case_label(field.trim())?);
        }

        let mut rows = Vec::new();
        for line in lines {
            let mut fields = line.split(',');
            let tooth = if has_tooth_column {
                let field = fields.next().unwrap_or_default().trim();
                Some(
                    field
                        .parse::<u32>()
                        .map_err(|_| format!("bad tooth number `{}`", field))?,
                )
            } else {
                None
            };
            let mut cells = Vec::with_capacity(wear_cases.len());
            for field in fields {
                let field = field.trim();
                if field.is_empty() {
                    cells.push(None);
                } else {
                    cells.push(Some(field.parse::<f64>().map_err(|_| {
                        format!("bad depth value `{}`", field)
                    })?));
                }
            }
            if cells.len() != wear_cases.len() {
                return Err(format!(
                    "row has {} cells, header has {} wear cases",
                    cells.len(),
                    wear_cases.len()
                ));
            }
            rows.push(TableRow { tooth, cells });
        }

        if !has_tooth_column && rows.len() > 1 {
            return Err("single-tooth table must have exactly one data row".to_string());
        }

        Ok(Self {
            wear_cases,
            rows,
            has_tooth_column,
        })
    }
}

fn parse_case_label(field: &str) -> std::result::Result<i32, String> {
    field
        .strip_prefix('W')
        .and_then(|n| n.parse::<i32>().ok())
        .ok_or_else(|| format!("bad wear-case column `{}`", field))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
