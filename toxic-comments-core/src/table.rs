use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<Option<String>>),
    Numeric(Vec<f64>),
}

/// In-memory table with ordered, named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Text(values) => values.len(),
            Column::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_column<S: Into<String>>(mut self, name: &str, values: Vec<Option<S>>) -> Result<Self> {
        let values = values.into_iter().map(|v| v.map(Into::into)).collect();
        self.push_column(name, Column::Text(values))?;
        Ok(self)
    }

    pub fn with_numeric_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.push_column(name, Column::Numeric(values))?;
        Ok(self)
    }

    pub fn push_column(&mut self, name: &str, column: Column) -> Result<()> {
        if self.has_column(name) {
            return Err(PipelineError::input_shape(format!("column \"{}\" already exists", name)));
        }
        if !self.columns.is_empty() && column.len() != self.len() {
            return Err(PipelineError::input_shape(format!(
                "column \"{}\" has {} rows, table has {}", name, column.len(), self.len()
            )));
        }

        self.names.push(name.to_owned());
        self.columns.push(column);
        Ok(())
    }

    /// Replaces an existing column in place, or appends it when absent.
    pub fn set_column(&mut self, name: &str, column: Column) -> Result<()> {
        match self.position(name) {
            Some(index) => {
                if column.len() != self.len() {
                    return Err(PipelineError::input_shape(format!(
                        "column \"{}\" has {} rows, table has {}", name, column.len(), self.len()
                    )));
                }
                self.columns[index] = column;
                Ok(())
            },
            None => self.push_column(name, column),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|index| &self.columns[index])
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub fn text_column(&self, name: &str) -> Result<&[Option<String>]> {
        match self.column(name) {
            Some(Column::Text(values)) => Ok(values),
            Some(Column::Numeric(_)) => Err(PipelineError::input_shape(format!("column \"{}\" is not a text column", name))),
            None => Err(missing_column(name)),
        }
    }

    pub fn numeric_column(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Numeric(values)) => Ok(values),
            Some(Column::Text(_)) => Err(PipelineError::input_shape(format!("column \"{}\" is not a numeric column", name))),
            None => Err(missing_column(name)),
        }
    }

    /// Row identifiers read from `name`. Numeric ids are rendered without a fractional
    /// part so that `123.0` and `"123"` join with each other.
    pub fn keys(&self, name: &str) -> Result<Vec<String>> {
        match self.column(name) {
            Some(Column::Text(values)) => values.iter()
                .enumerate()
                .map(|(row, v)| v.clone().ok_or_else(|| PipelineError::input_shape(format!(
                    "row {} has no value for key column \"{}\"", row, name
                ))))
                .collect(),
            Some(Column::Numeric(values)) => values.iter()
                .enumerate()
                .map(|(row, v)| if v.is_finite() {
                    Ok(format_numeric_key(*v))
                } else {
                    Err(PipelineError::input_shape(format!("row {} has no value for key column \"{}\"", row, name)))
                })
                .collect(),
            None => Err(missing_column(name)),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|v| v == name)
    }
}

fn missing_column(name: &str) -> PipelineError {
    PipelineError::input_shape(format!("table has no column \"{}\"", name))
}

fn format_numeric_key(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
