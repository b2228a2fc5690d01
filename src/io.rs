//! CSV problem-file reading and solution-file writing.
//!
//! Input is semicolon-delimited (`index;code;nCases;sizeX;sizeY;sizeZ;weight;strength;location`),
//! one header row then one row per order line. Output is comma-delimited,
//! one row per placed case plus a `Stop=1` sentinel row after each pallet.

use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;

use crate::error::{CasePickingError, Result};
use crate::types::{Case, OrderLine, OrderLineId, Solution};

#[derive(Serialize)]
struct OutputRow {
    #[serde(rename = "Stop")]
    stop: u8,
    #[serde(rename = "X")]
    x: i64,
    #[serde(rename = "Y")]
    y: i64,
    #[serde(rename = "Z")]
    z: i64,
    #[serde(rename = "SizeX")]
    size_x: i64,
    #[serde(rename = "SizeY")]
    size_y: i64,
    #[serde(rename = "SizeZ")]
    size_z: i64,
}

fn malformed(file: &str, row: usize, reason: impl Into<String>) -> CasePickingError {
    CasePickingError::InputMalformed {
        file: file.to_string(),
        row,
        reason: reason.into(),
    }
}

/// Reads the problem CSV into order lines, assigning `OrderLineId(i)` to the
/// i-th row (and to every case it spawns) in file order.
pub fn read_order_lines(path: &Path) -> Result<Vec<OrderLine>> {
    let file = path.display().to_string();
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .from_path(path)?;

    let mut order_lines = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let row = row_idx + 2; // header is row 1
        let record = result?;
        if record.len() < 9 {
            return Err(malformed(&file, row, format!("expected 9 columns, got {}", record.len())));
        }

        let code = record[1].trim().to_string();
        let n_cases: usize = record[2]
            .trim()
            .parse()
            .map_err(|_| malformed(&file, row, format!("nCases {:?} is not an integer", &record[2])))?;
        let size_x: i64 = record[3]
            .trim()
            .parse()
            .map_err(|_| malformed(&file, row, format!("sizeX {:?} is not an integer", &record[3])))?;
        let size_y: i64 = record[4]
            .trim()
            .parse()
            .map_err(|_| malformed(&file, row, format!("sizeY {:?} is not an integer", &record[4])))?;
        let size_z: i64 = record[5]
            .trim()
            .parse()
            .map_err(|_| malformed(&file, row, format!("sizeZ {:?} is not an integer", &record[5])))?;
        let weight: i64 = record[6]
            .trim()
            .parse()
            .map_err(|_| malformed(&file, row, format!("weight {:?} is not an integer", &record[6])))?;
        let strength: i64 = record[7]
            .trim()
            .parse()
            .map_err(|_| malformed(&file, row, format!("strength {:?} is not an integer", &record[7])))?;
        let location: usize = record[8]
            .trim()
            .parse()
            .map_err(|_| malformed(&file, row, format!("location {:?} is not an integer", &record[8])))?;

        let order_line_id = OrderLineId(order_lines.len());
        let cases = (0..n_cases)
            .map(|_| Case::new(code.clone(), size_x, size_y, size_z, weight, strength, order_line_id))
            .collect();

        order_lines.push(OrderLine::new(code, location, cases));
    }

    Ok(order_lines)
}

/// Writes a solution: every pallet's cases with `Stop=0`, followed by a
/// `Stop=1` sentinel row (all other fields zero) marking the pallet boundary.
pub fn write_solution(path: &Path, solution: &Solution) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b',').from_path(path)?;

    for pallet in &solution.pallets {
        for case in &pallet.cases {
            writer.serialize(OutputRow {
                stop: 0,
                x: case.x,
                y: case.y,
                z: case.z,
                size_x: case.size_x,
                size_y: case.size_y,
                size_z: case.size_z,
            })?;
        }
        writer.serialize(OutputRow {
            stop: 1,
            x: 0,
            y: 0,
            z: 0,
            size_x: 0,
            size_y: 0,
            size_z: 0,
        })?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_one_row_into_n_identical_cases() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "index;code;nCases;sizeX;sizeY;sizeZ;weight;strength;location").unwrap();
        writeln!(f, "0;SKU1;3;50;40;30;5;10;7").unwrap();
        f.flush().unwrap();

        let lines = read_order_lines(f.path()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].location, 7);
        assert_eq!(lines[0].cases.len(), 3);
        assert!(lines[0].cases.iter().all(|c| c.order_line == OrderLineId(0)));
    }

    #[test]
    fn malformed_integer_reports_file_and_row() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "index;code;nCases;sizeX;sizeY;sizeZ;weight;strength;location").unwrap();
        writeln!(f, "0;SKU1;notanumber;50;40;30;5;10;7").unwrap();
        f.flush().unwrap();

        let err = read_order_lines(f.path()).unwrap_err();
        match err {
            CasePickingError::InputMalformed { row, .. } => assert_eq!(row, 2),
            other => panic!("expected InputMalformed, got {other:?}"),
        }
    }

    #[test]
    fn write_solution_emits_sentinel_row_per_pallet() {
        use crate::types::Pallet;
        let mut pallet = Pallet::new();
        let mut case = Case::new("A".into(), 10, 20, 30, 1, 1, OrderLineId(0));
        case.set_pos(0, 0, 0);
        pallet.cases.push(case);

        let solution = Solution {
            pallets: vec![pallet],
            cost: 0.0,
        };

        let out = tempfile::NamedTempFile::new().unwrap();
        write_solution(out.path(), &solution).unwrap();

        let content = std::fs::read_to_string(out.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Stop,X,Y,Z,SizeX,SizeY,SizeZ");
        assert_eq!(lines[1], "0,0,0,0,10,20,30");
        assert_eq!(lines[2], "1,0,0,0,0,0,0");
    }
}
