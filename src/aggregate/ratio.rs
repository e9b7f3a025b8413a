//! Fill/empty ratio of two timing files.
//!
//! Both files come from the same sweep: the fill benchmark and the empty
//! benchmark. Rows are matched by position; a pair contributes when its
//! second field is an integer and both rows agree on the first two fields.

use super::{read_rows, write_output};
use crate::error::{HarnessError, Result};
use crate::row::{is_numeric, parse_metric};
use crate::utils::format_float;
use std::path::Path;

/// Default output name
pub const FILL_EMPTY_OUTPUT: &str = "fill-empty-ratio.csv";

/// Write `implementation,threads,fill/empty` rows; returns the row count
pub fn fill_empty_ratio(fill: &Path, empty: &Path, output: &Path) -> Result<usize> {
    let fill_rows = read_rows(fill)?;
    let empty_rows = read_rows(empty)?;

    let mut out = String::new();
    let mut count = 0;
    for (f, e) in fill_rows.iter().zip(empty_rows.iter()) {
        let ff = f.fields();
        let ef = e.fields();
        if ff.len() < 2 {
            return Err(HarnessError::malformed(fill, f.line, "expected at least 2 fields"));
        }
        if ef.len() < 2 {
            return Err(HarnessError::malformed(empty, e.line, "expected at least 2 fields"));
        }
        if !(is_numeric(ff[1]) && ff[0] == ef[0] && ff[1] == ef[1]) {
            continue;
        }

        let value = |path: &Path, line: u64, fields: &[&str]| -> Result<f64> {
            let field = fields
                .get(2)
                .ok_or_else(|| HarnessError::malformed(path, line, "expected a value in field 2"))?;
            parse_metric(field).map_err(|reason| HarnessError::malformed(path, line, reason))
        };
        let divisor = value(empty, e.line, &ef)?;
        if divisor == 0.0 {
            return Err(HarnessError::malformed(empty, e.line, "empty time is zero"));
        }
        let ratio = value(fill, f.line, &ff)? / divisor;

        out.push_str(&format!("{},{},{}\n", ff[0], ff[1], format_float(ratio)));
        count += 1;
    }

    write_output(output, &out)?;
    Ok(count)
}
