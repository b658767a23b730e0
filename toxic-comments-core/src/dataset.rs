use {
    std::path::Path,
    tracing::info,
    indicatif::ProgressBar,
    crate::{
        error::Result,
        table::{Table, Column},
    },
};

pub const COMMA: u8 = b',';
pub const TAB: u8 = b'\t';

/// Reads a delimited file with a header row into a [`Table`].
///
/// Columns named in `text_columns` are always kept as text. Every other column is
/// numeric when all of its non-empty cells parse as numbers (empty cells become NaN),
/// and text otherwise.
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: u8, text_columns: &[&str]) -> Result<Table> {
    let path = path.as_ref();
    info!("loading file: {}", path.display());

    let reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;

    read_table_from_reader(reader, text_columns)
}

pub fn read_table_from_reader<R: std::io::Read>(mut reader: csv::Reader<R>, text_columns: &[&str]) -> Result<Table> {
    let headers = reader.headers()?.clone();
    let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let pb = ProgressBar::new(records.len() as u64);

    let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(records.len()); headers.len()];
    for record in records {
        for (index, column) in cells.iter_mut().enumerate() {
            column.push(record.get(index).unwrap_or("").to_owned());
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    let mut table = Table::new();
    for (name, values) in headers.iter().zip(cells.into_iter()) {
        let column = if text_columns.contains(&name) {
            text_column(values)
        } else {
            parse_numeric(&values).unwrap_or_else(|| text_column(values))
        };
        table.push_column(name, column)?;
    }

    info!("loaded {} rows with columns {:?}", table.len(), table.column_names());

    Ok(table)
}

pub fn write_table<P: AsRef<Path>>(path: P, delimiter: u8, table: &Table) -> Result<()> {
    let path = path.as_ref();
    info!("writing {} rows to {}", table.len(), path.display());

    let writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;

    write_table_to_writer(writer, table)
}

pub fn write_table_to_writer<W: std::io::Write>(mut writer: csv::Writer<W>, table: &Table) -> Result<()> {
    writer.write_record(table.column_names())?;

    let columns: Vec<&Column> = table.columns().map(|(_, column)| column).collect();
    for row in 0..table.len() {
        let record: Vec<String> = columns.iter()
            .map(|column| match column {
                Column::Text(values) => values[row].clone().unwrap_or_default(),
                Column::Numeric(values) if values[row].is_nan() => String::new(),
                Column::Numeric(values) => values[row].to_string(),
            })
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn text_column(values: Vec<String>) -> Column {
    Column::Text(values.into_iter().map(|v| if v.is_empty() { None } else { Some(v) }).collect())
}

fn parse_numeric(values: &[String]) -> Option<Column> {
    values.iter()
        .map(|v| {
            let v = v.trim();
            if v.is_empty() {
                Some(f64::NAN)
            } else {
                v.parse::<f64>().ok()
            }
        })
        .collect::<Option<Vec<f64>>>()
        .map(Column::Numeric)
}
