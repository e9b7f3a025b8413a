//! # Row Classification
//!
//! Raw result files carry no header. The meaning of a field depends on where
//! the leading run of parameter values ends, so each row is sniffed exactly
//! once here and handed on as a typed record.
//!
//! ## Tuning rows
//!
//! ```text
//! 4,16,bbq,0,1234.5
//! ^^^^      key (numeric prefix)
//!      ^^^  variant
//!          ^ thread / iteration (ignored)
//!            ^^^^^^ metric
//! ```
//!
//! ## Paired-plot rows
//!
//! Two layouts share one file; whether the second field is an integer
//! decides which one a row uses (see [`RowLayout`]).

/// Whether a field looks like a parameter value rather than a name.
///
/// Accepts non-negative decimal numbers with at most one decimal point:
/// `"12"`, `"0.5"`, `"3."`. Rejects the empty string, `"."`, signs,
/// exponents, and anything with two dots.
pub fn is_data(field: &str) -> bool {
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in field.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' if dots == 0 => dots += 1,
            _ => return false,
        }
    }
    digits > 0
}

/// Integer-only check used by the layout sentinel and row filters.
pub fn is_numeric(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit())
}

/// Return the longest prefix of data-looking fields as the grouping key.
///
/// Returns `None` when every field is numeric; such a row has no variant
/// column and cannot be grouped.
pub fn extract_key<S: AsRef<str>>(fields: &[S]) -> Option<Vec<String>> {
    let len = fields.iter().take_while(|f| is_data(f.as_ref())).count();
    if len == fields.len() {
        return None;
    }
    Some(fields[..len].iter().map(|f| f.as_ref().to_string()).collect())
}

/// A tuning row after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub key: Vec<String>,
    pub variant: String,
    pub metric: f64,
}

impl Observation {
    /// Classify a row as `key..., variant, <ignored>, metric, ...`.
    ///
    /// The error string describes what was wrong; callers attach the file
    /// and line.
    pub fn classify<S: AsRef<str>>(fields: &[S]) -> Result<Self, String> {
        let key = extract_key(fields).ok_or_else(|| "every field is numeric".to_string())?;
        let k = key.len();
        let metric_field = fields.get(k + 2).ok_or_else(|| {
            format!(
                "expected a metric at field {}, row has {} fields",
                k + 2,
                fields.len()
            )
        })?;
        let metric = parse_metric(metric_field.as_ref())?;
        Ok(Self {
            key,
            variant: fields[k].as_ref().to_string(),
            metric,
        })
    }
}

/// Layout of a row in the paired-plot files.
#[derive(Debug, Clone, PartialEq)]
pub enum RowLayout {
    /// `param, param2, variant, _, metric`
    Keyed {
        key: String,
        variant: String,
        metric: f64,
    },
    /// `param, variant, _, metric`
    Plain {
        key: String,
        variant: String,
        metric: f64,
    },
    /// Fewer than three fields; skipped
    Short,
}

impl RowLayout {
    pub fn classify<S: AsRef<str>>(fields: &[S]) -> Result<Self, String> {
        if fields.len() < 3 {
            return Ok(RowLayout::Short);
        }
        if is_numeric(fields[1].as_ref()) {
            Ok(RowLayout::Keyed {
                key: format!("{},{}", field_at(fields, 0)?, field_at(fields, 1)?),
                variant: field_at(fields, 2)?.to_string(),
                metric: parse_metric(field_at(fields, 4)?)?,
            })
        } else {
            Ok(RowLayout::Plain {
                key: field_at(fields, 0)?.to_string(),
                variant: field_at(fields, 1)?.to_string(),
                metric: parse_metric(field_at(fields, 3)?)?,
            })
        }
    }

    /// Split into `(key, variant, metric)`, or `None` for short rows
    pub fn into_parts(self) -> Option<(String, String, f64)> {
        match self {
            RowLayout::Keyed {
                key,
                variant,
                metric,
            }
            | RowLayout::Plain {
                key,
                variant,
                metric,
            } => Some((key, variant, metric)),
            RowLayout::Short => None,
        }
    }
}

fn field_at<S: AsRef<str>>(fields: &[S], i: usize) -> Result<&str, String> {
    fields
        .get(i)
        .map(|f| f.as_ref())
        .ok_or_else(|| format!("row has {} fields, needed field {}", fields.len(), i))
}

pub(crate) fn parse_metric(field: &str) -> Result<f64, String> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", field))
}
