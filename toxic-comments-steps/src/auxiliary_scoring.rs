use {
    std::fs,
    anyhow::{Context, Result},
    tracing::info,
    toxic_comments_core::{
        config::Config,
        dataset::{read_table, write_table, COMMA, TAB},
    },
    toxic_comments_features::{
        aggregator::join_and_sanitize,
        auxiliary::AuxiliaryScorer,
        sanitizer::Sanitizer,
    },
};

/// Fits the auxiliary models on the annotated corpora, scores train and test once, and
/// persists the scored tables for later preprocessing runs.
pub fn run_auxiliary_scoring_step(config: &Config) -> Result<()> {
    let auxiliary = config.auxiliary();
    let data = config.data();
    let sanitizer = Sanitizer::new(&config.sanitizer);
    let annotation_text_column = data.annotation_text_column();

    let mut corpora = Vec::new();
    for label in auxiliary.labels() {
        let comments_path = data.annotated_comments_path(label);
        let annotations_path = data.annotations_path(label);

        let comments = read_table(&comments_path, TAB, &[annotation_text_column.as_str()])
            .with_context(|| format!("failed to read {}", comments_path))?;
        let annotations = read_table(&annotations_path, TAB, &[])
            .with_context(|| format!("failed to read {}", annotations_path))?;

        let corpus = join_and_sanitize(&comments, &annotations, &data.annotation_key(), &annotation_text_column, &sanitizer)
            .with_context(|| format!("failed to aggregate {} annotations", label))?;
        corpora.push((label, corpus));
    }

    let scorer = AuxiliaryScorer::fit(corpora, &auxiliary)?;

    let text_columns = [data.id_column(), data.text_column()];
    let text_columns: Vec<&str> = text_columns.iter().map(String::as_str).collect();

    for (source, destination) in [
        (data.train_path(), data.scored_train_path()),
        (data.test_path(), data.scored_test_path()),
    ] {
        let mut table = read_table(&source, COMMA, &text_columns)
            .with_context(|| format!("failed to read {}", source))?;

        sanitizer.sanitize_table(&mut table, &data.text_column())?;
        scorer.attach_scores(&auxiliary.labels(), &mut table, &data.text_column())?;

        write_table(&destination, COMMA, &table)
            .with_context(|| format!("failed to write {}", destination))?;
    }

    let models_path = data.auxiliary_models_path();
    fs::write(&models_path, scorer.to_json()?)
        .with_context(|| format!("failed to write {}", models_path))?;

    info!("auxiliary scores saved");
    Ok(())
}
