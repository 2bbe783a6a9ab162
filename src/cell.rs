use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Scalar carried by a report cell.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print like integers ("12", not "12.0")
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One cell as described by the reporting backend.
///
/// `row`/`col` address the top-left anchor (zero-based). Spans that are
/// missing, `null` or `0` on the wire are read as 1.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CellDescriptor {
    pub row: u32,
    pub col: u32,
    #[serde(default = "one", deserialize_with = "span_or_one")]
    pub rowspan: u32,
    #[serde(default = "one", deserialize_with = "span_or_one")]
    pub colspan: u32,
    #[serde(default)]
    pub value: Option<CellValue>,
    #[serde(default, rename = "bgColor")]
    pub bg_color: Option<String>,
    #[serde(default, rename = "fontColor")]
    pub font_color: Option<String>,
    #[serde(default, rename = "fontStyle")]
    pub font_style: Option<String>,
}

fn one() -> u32 {
    1
}

fn span_or_one<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let span = Option::<u32>::deserialize(deserializer)?;
    Ok(span.unwrap_or(1).max(1))
}

impl CellDescriptor {
    pub fn create(row: u32, col: u32) -> Self {
        CellDescriptor {
            row,
            col,
            rowspan: 1,
            colspan: 1,
            value: None,
            bg_color: None,
            font_color: None,
            font_style: None,
        }
    }

    pub fn with_span(mut self, rowspan: u32, colspan: u32) -> Self {
        self.rowspan = rowspan.max(1);
        self.colspan = colspan.max(1);
        self
    }

    pub fn with_value(mut self, value: impl Into<CellValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_colors(mut self, bg: Option<&str>, font: Option<&str>) -> Self {
        self.bg_color = bg.map(str::to_string);
        self.font_color = font.map(str::to_string);
        self
    }

    pub fn bold(mut self) -> Self {
        self.font_style = Some("bold".to_string());
        self
    }

    /// Exclusive end row (`row + rowspan`).
    pub fn end_row(&self) -> usize {
        self.row as usize + self.rowspan as usize
    }

    /// Exclusive end column (`col + colspan`).
    pub fn end_col(&self) -> usize {
        self.col as usize + self.colspan as usize
    }
}

/// A resolved grid position.
///
/// `skip` positions are covered by another cell's span: they keep the
/// owner's data and resolved spans for bookkeeping but are never rendered
/// or exported on their own.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct DenseGridCell {
    pub row: u32,
    pub col: u32,
    pub rowspan: u32,
    pub colspan: u32,
    pub value: Option<CellValue>,
    #[serde(rename = "bgColor")]
    pub bg_color: Option<String>,
    #[serde(rename = "fontColor")]
    pub font_color: Option<String>,
    #[serde(rename = "fontStyle")]
    pub font_style: Option<String>,
    pub skip: bool,
}

impl DenseGridCell {
    pub(crate) fn resolve(source: &CellDescriptor, rowspan: u32, colspan: u32, skip: bool) -> Self {
        DenseGridCell {
            row: source.row,
            col: source.col,
            rowspan,
            colspan,
            value: source.value.clone(),
            bg_color: source.bg_color.clone(),
            font_color: source.font_color.clone(),
            font_style: source.font_style.clone(),
            skip,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.rowspan > 1 || self.colspan > 1
    }

    /// The value as shown to users; empty when the backend sent none.
    pub fn display_value(&self) -> String {
        self.value.as_ref().map(|v| v.to_string()).unwrap_or_default()
    }
}
