//! Column arithmetic
//!
//! Sets a result column to the sum of some columns minus others. Operands
//! are column names; a leading `-` subtracts. Empty fields count as zero.

use rowdedup_core::Row;
use tracing::debug;

use crate::digits::format_float;
use crate::filter::{field, RowFilter};
use crate::{Error, Result};

/// One operand column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub column: String,
    pub subtract: bool,
}

impl Operand {
    /// Parse `name` or `+name` (add) or `-name` (subtract)
    pub fn parse(token: &str) -> Self {
        match token.strip_prefix('-') {
            Some(column) => Self {
                column: column.to_string(),
                subtract: true,
            },
            None => Self {
                column: token.strip_prefix('+').unwrap_or(token).to_string(),
                subtract: false,
            },
        }
    }
}

/// Column positions resolved from the header
#[derive(Debug)]
struct Plan {
    /// `None` when the result column is appended to each row
    result_index: Option<usize>,
    operands: Vec<(usize, bool)>,
}

/// Computes `result = sum(+columns) - sum(-columns)`
#[derive(Debug)]
pub struct Calculate {
    result: String,
    operands: Vec<Operand>,
    plan: Option<Plan>,
    rows_seen: usize,
}

impl Calculate {
    pub fn new<S: AsRef<str>>(result: impl Into<String>, operands: &[S]) -> Self {
        Self {
            result: result.into(),
            operands: operands.iter().map(|o| Operand::parse(o.as_ref())).collect(),
            plan: None,
            rows_seen: 0,
        }
    }

    fn plan(&self, header: &mut Row) -> Result<Plan> {
        let result_index = header.iter().position(|h| *h == self.result);
        if result_index.is_none() {
            header.push(self.result.clone());
        }

        let operands = self
            .operands
            .iter()
            .map(|operand| {
                header
                    .iter()
                    .position(|h| *h == operand.column)
                    .map(|index| (index, operand.subtract))
                    .ok_or_else(|| Error::UnknownColumn {
                        column: operand.column.clone(),
                        header: header.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Calculating {:?} from {} operands ({})",
            self.result,
            operands.len(),
            if result_index.is_some() { "overwrite" } else { "append" }
        );
        Ok(Plan {
            result_index,
            operands,
        })
    }
}

fn number(value: &str, column: &str) -> Result<f64> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value.trim().parse::<f64>().map_err(|_| Error::InvalidNumber {
        column: column.to_string(),
        value: value.to_string(),
    })
}

impl RowFilter for Calculate {
    fn process(&mut self, mut row: Row, out: &mut Vec<Row>) -> Result<()> {
        let Some(plan) = &self.plan else {
            let plan = self.plan(&mut row)?;
            self.plan = Some(plan);
            out.push(row);
            return Ok(());
        };

        self.rows_seen += 1;
        let mut total = 0.0;
        for (index, (column, subtract)) in plan.operands.iter().enumerate() {
            let name = &self.operands[index].column;
            let value = number(field(&row, *column, name, self.rows_seen)?, name)?;
            if *subtract {
                total -= value;
            } else {
                total += value;
            }
        }

        let formatted = format_float(total);
        match plan.result_index {
            Some(index) => {
                let width = row.len();
                let slot = row.get_mut(index).ok_or_else(|| Error::ColumnLookup {
                    column: self.result.clone(),
                    index,
                    row: self.rows_seen,
                    width,
                })?;
                *slot = formatted;
            }
            None => row.push(formatted),
        }
        out.push(row);
        Ok(())
    }
}
