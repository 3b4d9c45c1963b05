//! Plain-text loaders for seed and observation files.
//!
//! Both formats are whitespace-separated tables. The first three columns
//! are the `x y z` coordinates of a point; every following column is one
//! value per point. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! # x     y     z     density
//!   250   250   100   1000
//!   750   250   100   -500
//! ```

use std::io::BufRead;

use glam::DVec3;

use crate::error::{HarvestError, Result};

/// Points and value columns read from a table.
pub type Table = (Vec<DVec3>, Vec<Vec<f64>>);

/// Reads seed points and their physical property columns.
pub fn load_seeds(reader: impl BufRead) -> Result<Table> {
    read_table(reader)
}

/// Reads observation points and the data columns measured at them.
pub fn load_observations(reader: impl BufRead) -> Result<Table> {
    read_table(reader)
}

fn read_table(reader: impl BufRead) -> Result<Table> {
    let mut points = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    let mut width = None;

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = n + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let row = trimmed
            .split_whitespace()
            .map(|field| {
                field.parse::<f64>().map_err(|_| HarvestError::Parse {
                    line: line_no,
                    message: format!("'{field}' is not a number"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if row.len() < 3 {
            return Err(HarvestError::Parse {
                line: line_no,
                message: format!("expected at least 3 columns (x y z), found {}", row.len()),
            });
        }
        match width {
            None => {
                width = Some(row.len());
                columns = vec![Vec::new(); row.len() - 3];
            }
            Some(w) if w != row.len() => {
                return Err(HarvestError::Parse {
                    line: line_no,
                    message: format!("expected {w} columns, found {}", row.len()),
                });
            }
            Some(_) => {}
        }

        points.push(DVec3::new(row[0], row[1], row[2]));
        for (column, value) in columns.iter_mut().zip(&row[3..]) {
            column.push(*value);
        }
    }
    Ok((points, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{BufReader, Write};

    #[test]
    fn load_seeds_skips_comments_and_blank_lines() {
        let text = "# x y z density\n\n  0.5 0.5 0.5 1000\n# another\n1.5 0.5 0.5 -200.5\n";
        let (points, columns) = load_seeds(text.as_bytes()).unwrap();
        assert_eq!(points, vec![DVec3::new(0.5, 0.5, 0.5), DVec3::new(1.5, 0.5, 0.5)]);
        assert_eq!(columns, vec![vec![1000.0, -200.5]]);
    }

    #[test]
    fn load_observations_reads_several_data_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0 0 -10 1.0 2.0").unwrap();
        writeln!(file, "10 0 -10 3.0 4.0").unwrap();
        writeln!(file, "0 10 -10 5.0 6.0").unwrap();

        let reader = BufReader::new(File::open(file.path()).unwrap());
        let (points, columns) = load_observations(reader).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], DVec3::new(0.0, 10.0, -10.0));
        assert_eq!(columns, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn points_without_values_give_no_columns() {
        let (points, columns) = load_observations("1 2 3\n4 5 6\n".as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert!(columns.is_empty());
    }

    #[test]
    fn non_numeric_values_report_the_line() {
        let text = "# header\n0 0 0 1\n0 0 abc 1\n";
        let err = load_seeds(text.as_bytes()).unwrap_err();
        assert!(matches!(err, HarvestError::Parse { line: 3, .. }));
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = load_observations("0 0 0 1 2\n1 1 1 3\n".as_bytes()).unwrap_err();
        assert!(matches!(err, HarvestError::Parse { line: 2, .. }));
    }

    #[test]
    fn rows_need_three_coordinates() {
        let err = load_seeds("1 2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, HarvestError::Parse { line: 1, .. }));
    }

    #[test]
    fn empty_input_is_an_empty_table() {
        let (points, columns) = load_seeds("# nothing here\n".as_bytes()).unwrap();
        assert!(points.is_empty());
        assert!(columns.is_empty());
    }
}
