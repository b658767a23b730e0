use {
    std::{fs, path::Path},
    anyhow::{Context, Result},
    ndarray::Array2,
    tracing::{info, warn},
    toxic_comments_core::{
        config::Config,
        dataset::{read_table, write_table, COMMA},
        table::{Table, Column},
    },
    toxic_comments_features::pipeline::Pipeline,
    crate::auxiliary_scoring::run_auxiliary_scoring_step,
};

/// Builds the vocabulary and the padded token matrices, reusing persisted auxiliary scores
/// when they exist.
pub fn run_preprocessing_step(config: &Config) -> Result<()> {
    let data = config.data();
    let mut pipeline = Pipeline::new(config);

    let (train_path, test_path) = if pipeline.auxiliary_labels().is_some() {
        if !Path::new(&data.scored_train_path()).exists() || !Path::new(&data.scored_test_path()).exists() {
            warn!("no persisted auxiliary scores found, computing them first");
            run_auxiliary_scoring_step(config)?;
        }
        (data.scored_train_path(), data.scored_test_path())
    } else {
        (data.train_path(), data.test_path())
    };

    let text_columns = [data.id_column(), data.text_column()];
    let text_columns: Vec<&str> = text_columns.iter().map(String::as_str).collect();

    let train = read_table(&train_path, COMMA, &text_columns)
        .with_context(|| format!("failed to read {}", train_path))?;
    let test = read_table(&test_path, COMMA, &text_columns)
        .with_context(|| format!("failed to read {}", test_path))?;

    let features = pipeline.run(train, test, None)?;

    let vocabulary_path = data.vocabulary_path();
    fs::write(&vocabulary_path, pipeline.vocabulary()?.to_json()?)
        .with_context(|| format!("failed to write {}", vocabulary_path))?;

    write_tokens(&data.train_tokens_path(), &data.id_column(), &features.train_ids, &features.train_tokens)?;
    write_tokens(&data.test_tokens_path(), &data.id_column(), &features.test_ids, &features.test_tokens)?;

    if let Some(sample) = &features.tracked_sample {
        info!("tracked sample {}: \"{}\" with labels {:?}", sample.index, sample.text, sample.labels);
    }

    Ok(())
}

fn write_tokens(path: &str, id_column: &str, ids: &[String], tokens: &Array2<usize>) -> Result<()> {
    let mut table = Table::new();
    table.push_column(id_column, Column::Text(ids.iter().cloned().map(Some).collect()))?;
    for (position, column) in tokens.columns().into_iter().enumerate() {
        let values = column.iter().map(|v| *v as f64).collect();
        table.push_column(&format!("token_{}", position), Column::Numeric(values))?;
    }

    write_table(path, COMMA, &table).with_context(|| format!("failed to write {}", path))
}
