//! Benchmark results as written by `memory_latency`: one row per array size,
//! `size,random_ns,sequential_ns`.

use crate::error::{PlotError, Result};
use std::path::Path;

const MIN_COLUMNS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub array_size: u64,
    pub random_ns: f64,
    pub sequential_ns: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementTable {
    rows: Vec<Measurement>,
}

impl MeasurementTable {
    pub fn new(rows: Vec<Measurement>) -> MeasurementTable {
        MeasurementTable { rows }
    }

    /// Read and parse a whole CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<MeasurementTable> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PlotError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text)?;
        log::info!("Loaded {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse CSV text.
    ///
    /// Blank lines are ignored. A first line whose leading field is not a
    /// number is a header. Every row must have the same number of fields,
    /// at least three; columns past the third are ignored.
    pub fn parse(text: &str) -> Result<MeasurementTable> {
        let mut rows = Vec::new();
        let mut width = None;
        let mut first = true;

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();

            if first {
                first = false;
                if fields[0].parse::<f64>().is_err() {
                    log::debug!("Skipping header line {:?}", line);
                    continue;
                }
            }

            match width {
                None if fields.len() < MIN_COLUMNS => {
                    return Err(PlotError::parse(
                        line_number,
                        format!(
                            "expected at least {} columns, found {}",
                            MIN_COLUMNS,
                            fields.len()
                        ),
                    ));
                }
                None => width = Some(fields.len()),
                Some(w) if w != fields.len() => {
                    return Err(PlotError::parse(
                        line_number,
                        format!("expected {} columns, found {}", w, fields.len()),
                    ));
                }
                Some(_) => {}
            }

            rows.push(Measurement {
                array_size: parse_size(fields[0], line_number)?,
                random_ns: parse_latency(fields[1], line_number)?,
                sequential_ns: parse_latency(fields[2], line_number)?,
            });
        }

        let table = MeasurementTable { rows };
        if !table.is_sorted_by_size() {
            log::warn!("Rows are not sorted by ascending array size");
        }
        Ok(table)
    }

    pub fn rows(&self) -> &[Measurement] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_sorted_by_size(&self) -> bool {
        self.rows
            .windows(2)
            .all(|w| w[0].array_size <= w[1].array_size)
    }

    pub fn random_series(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.rows
            .iter()
            .map(|r| (r.array_size as f64, r.random_ns))
    }

    pub fn sequential_series(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.rows
            .iter()
            .map(|r| (r.array_size as f64, r.sequential_ns))
    }
}

fn parse_size(field: &str, line: usize) -> Result<u64> {
    if let Ok(size) = field.parse::<u64>() {
        return Ok(size);
    }
    // Tools that go through floating point write sizes like 4096.0
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => {
            Ok(v as u64)
        }
        _ => Err(PlotError::parse(
            line,
            format!("invalid array size {:?}", field),
        )),
    }
}

fn parse_latency(field: &str, line: usize) -> Result<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(PlotError::parse(
            line,
            format!("invalid latency {:?}", field),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "100,1.25,0.5\n200,1.5,0.75\n400,2.0,0.8125\n";

    #[test]
    fn parses_every_row() {
        let table = MeasurementTable::parse(SAMPLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.rows()[1],
            Measurement {
                array_size: 200,
                random_ns: 1.5,
                sequential_ns: 0.75
            }
        );
        assert!(table.is_sorted_by_size());
    }

    #[test]
    fn values_round_trip_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let rows: Vec<(u64, f64, f64)> = (0..50)
            .map(|i| (100 * (i + 1), 0.1 * i as f64 + 1.0 / 3.0, -0.07 * i as f64))
            .collect();
        for (size, random, sequential) in &rows {
            writeln!(file, "{},{},{}", size, random, sequential).unwrap();
        }
        file.flush().unwrap();

        let table = MeasurementTable::load(file.path()).unwrap();
        assert_eq!(table.len(), rows.len());
        for (row, (size, random, sequential)) in table.rows().iter().zip(&rows) {
            assert_eq!(row.array_size, *size);
            assert_eq!(row.random_ns, *random);
            assert_eq!(row.sequential_ns, *sequential);
        }
    }

    #[test]
    fn header_and_blank_lines_are_skipped() {
        let text = "size, random_ns, sequential_ns\n\n100, 1.0, 2.0\n\n200,3.0,4.0\n";
        let table = MeasurementTable::parse(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].array_size, 100);
    }

    #[test]
    fn integral_float_sizes_are_accepted() {
        let table = MeasurementTable::parse("4096.0,1,2\n").unwrap();
        assert_eq!(table.rows()[0].array_size, 4096);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let table = MeasurementTable::parse("0,100,1,2\n1,200,3,4\n").unwrap();
        // The leading index column shifts everything: size is the first field.
        assert_eq!(table.rows()[1].array_size, 1);
        assert_eq!(table.rows()[1].random_ns, 200.0);
    }

    #[test]
    fn non_numeric_field_reports_line() {
        let err = MeasurementTable::parse("100,1.0,2.0\n200,fast,2.0\n").unwrap_err();
        match err {
            PlotError::Parse { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("fast"));
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn inconsistent_width_is_an_error() {
        let err = MeasurementTable::parse("100,1.0,2.0\n\n200,1.0,2.0,3.0\n").unwrap_err();
        assert!(matches!(err, PlotError::Parse { line: 3, .. }));
    }

    #[test]
    fn too_few_columns_is_an_error() {
        let err = MeasurementTable::parse("100,1.0\n").unwrap_err();
        assert!(matches!(err, PlotError::Parse { line: 1, .. }));
    }

    #[test]
    fn negative_or_fractional_sizes_are_errors() {
        assert!(MeasurementTable::parse("-100,1,2\n50,1,2\n").is_err());
        assert!(MeasurementTable::parse("100,1,2\n100.5,1,2\n").is_err());
    }

    #[test]
    fn nan_latency_is_an_error() {
        assert!(MeasurementTable::parse("100,NaN,2\n").is_err());
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MeasurementTable::load(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, PlotError::FileAccess { .. }));
    }

    #[test]
    fn empty_input_gives_empty_table() {
        assert!(MeasurementTable::parse("").unwrap().is_empty());
        assert!(MeasurementTable::parse("size,random,sequential\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unsorted_rows_are_kept_in_file_order() {
        let table = MeasurementTable::parse("200,1,1\n100,2,2\n").unwrap();
        assert!(!table.is_sorted_by_size());
        assert_eq!(table.rows()[0].array_size, 200);
    }
}
