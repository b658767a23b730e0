use {
    toxic_comments_core::{
        config::Config,
        dataset::{read_table_from_reader, write_table_to_writer},
        entity::AuxiliaryLabel,
        error::PipelineError,
        table::Table,
    },
    toxic_comments_features::{
        aggregator::join_and_sanitize,
        auxiliary::AuxiliaryScorer,
        pipeline::Pipeline,
        sanitizer::Sanitizer,
        tokenizer::Vocabulary,
    },
};

const CONFIG: &str = r#"
[tokenizer]
max_words = 50
max_sequence_length = 6

[auxiliary]
enabled = true
labels = ["toxicity", "attack", "aggression"]
cv_folds = 3

[data]
class_list = ["toxic", "insult"]
"#;

fn annotated(label: AuxiliaryLabel) -> (Table, Table) {
    let comments = [
        "You are a STUPID idiotNEWLINE_TOKEN", "Thanks for the helpful edit!", "stupid troll, go away",
        "great article, thanks", "idiot vandal u are", "nice work on the page",
        "what a stupid idiot troll", "helpful and nice",
    ];
    let ids: Vec<f64> = (0..comments.len()).map(|i| 100.0 + i as f64).collect();

    let comment_table = Table::new()
        .with_numeric_column("rev_id", ids.clone()).unwrap()
        .with_text_column("comment", comments.iter().map(|v| Some(*v)).collect()).unwrap();

    // two reviewers per comment
    let mut annotation_ids = ids.clone();
    annotation_ids.extend(ids.iter());
    let scores: Vec<f64> = (0..annotation_ids.len())
        .map(|i| if i % 8 % 2 == 0 { 1.0 } else { 0.0 })
        .collect();
    let annotation_table = Table::new()
        .with_numeric_column("rev_id", annotation_ids).unwrap()
        .with_numeric_column(label.annotation_column(), scores).unwrap();

    (comment_table, annotation_table)
}

fn train() -> Table {
    Table::new()
        .with_text_column("id", vec![Some("t1"), Some("t2"), Some("t3"), Some("t4")]).unwrap()
        .with_text_column("comment_text", vec![
            Some("you stupid idiot"),
            Some("thanks, nice article"),
            None,
            Some("http://spam.example.com stupid idiot idiot troll troll vandal stupid"),
        ]).unwrap()
        .with_numeric_column("toxic", vec![1.0, 0.0, 0.0, 1.0]).unwrap()
        .with_numeric_column("insult", vec![1.0, 0.0, 0.0, 0.0]).unwrap()
}

fn test() -> Table {
    Table::new()
        .with_text_column("id", vec![Some("s1"), Some("s2")]).unwrap()
        .with_text_column("comment_text", vec![Some("what an idiot"), Some("helpful page")]).unwrap()
}

fn scorer(config: &Config) -> AuxiliaryScorer {
    let sanitizer = Sanitizer::new(&config.sanitizer);
    let corpora = AuxiliaryLabel::ALL.iter()
        .map(|label| {
            let (comments, annotations) = annotated(*label);
            let corpus = join_and_sanitize(&comments, &annotations, "rev_id", "comment", &sanitizer).unwrap();
            (*label, corpus)
        })
        .collect();
    AuxiliaryScorer::fit(corpora, &config.auxiliary()).unwrap()
}

#[test]
fn test_full_pipeline_with_auxiliary_scores() {
    let config = Config::from_toml(CONFIG).unwrap();
    let scorer = scorer(&config);

    let mut pipeline = Pipeline::new(&config);
    let features = pipeline.run(train(), test(), Some(&scorer)).unwrap();

    assert_eq!(features.train_ids, vec!["t1", "t2", "t3", "t4"]);
    assert_eq!(features.test_ids, vec!["s1", "s2"]);
    assert_eq!(features.train_tokens.dim(), (4, 6));
    assert_eq!(features.test_tokens.dim(), (2, 6));
    assert_eq!(features.train_labels.dim(), (4, 2));

    let train_auxiliary = features.train_auxiliary.unwrap();
    let test_auxiliary = features.test_auxiliary.unwrap();
    assert_eq!(train_auxiliary.dim(), (4, 3));
    assert_eq!(test_auxiliary.dim(), (2, 3));
    assert!(train_auxiliary.iter().all(|v| v.is_finite()));

    // the abusive comment scores higher than the friendly one on every label
    for column in 0..3 {
        assert!(train_auxiliary[[0, column]] > train_auxiliary[[1, column]]);
    }

    // the url is stripped and the trailing tokens win
    let vocabulary = pipeline.vocabulary().unwrap();
    let last = features.train_tokens.row(3).to_vec();
    assert_eq!(vocabulary.decode(&last), vec!["idiot", "idiot", "troll", "troll", "vandal", "stupid"]);
    assert!(last.iter().all(|index| *index != 0));
}

#[test]
fn test_scores_are_independent_of_other_rows() {
    let config = Config::from_toml(CONFIG).unwrap();
    let scorer = scorer(&config);

    let alone = scorer.score(AuxiliaryLabel::Attack, &["what an idiot".to_owned()]).unwrap();
    let mixed = scorer.score(AuxiliaryLabel::Attack, &[
        "helpful page".to_owned(),
        "what an idiot".to_owned(),
        "some unrelated words".to_owned(),
    ]).unwrap();

    assert_eq!(alone[0], mixed[1]);
}

#[test]
fn test_persisted_scores_are_reused() {
    let config = Config::from_toml(CONFIG).unwrap();
    let scorer = scorer(&config);
    let sanitizer = Sanitizer::new(&config.sanitizer);

    let mut scored = train();
    sanitizer.sanitize_table(&mut scored, "comment_text").unwrap();
    scorer.attach_scores(&AuxiliaryLabel::ALL, &mut scored, "comment_text").unwrap();

    let mut buffer = Vec::new();
    write_table_to_writer(csv::Writer::from_writer(&mut buffer), &scored).unwrap();
    let data = String::from_utf8(buffer).unwrap();
    let reloaded = read_table_from_reader(csv::Reader::from_reader(data.as_bytes()), &["id", "comment_text"]).unwrap();

    let mut scored_test = test();
    sanitizer.sanitize_table(&mut scored_test, "comment_text").unwrap();
    scorer.attach_scores(&AuxiliaryLabel::ALL, &mut scored_test, "comment_text").unwrap();

    let from_disk = Pipeline::new(&config).run(reloaded, scored_test, None).unwrap();
    let fresh = Pipeline::new(&config).run(train(), test(), Some(&scorer)).unwrap();

    assert_eq!(from_disk.train_tokens, fresh.train_tokens);
    let difference = (from_disk.train_auxiliary.unwrap() - fresh.train_auxiliary.unwrap())
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    assert!(difference < 1e-9);
}

#[test]
fn test_saved_vocabulary_encodes_identically() {
    let config = Config::from_toml(&CONFIG.replace("enabled = true", "enabled = false")).unwrap();
    let mut pipeline = Pipeline::new(&config);
    let features = pipeline.run(train(), test(), None).unwrap();

    let json = pipeline.vocabulary().unwrap().to_json().unwrap();
    let mut reused = Pipeline::new(&config).with_vocabulary(Vocabulary::from_json(&json).unwrap());
    let again = reused.run(train(), test(), None).unwrap();

    assert_eq!(features.train_tokens, again.train_tokens);
    assert_eq!(features.test_tokens, again.test_tokens);
    assert_eq!(pipeline.encode_sentence("You idiot!!").unwrap(), reused.encode_sentence("You idiot!!").unwrap());
}

#[test]
fn test_aggregated_scores_are_means() {
    let (comments, annotations) = annotated(AuxiliaryLabel::Toxicity);
    let corpus = join_and_sanitize(&comments, &annotations, "rev_id", "comment", &Sanitizer::default()).unwrap();

    assert_eq!(corpus.len(), 8);
    assert_eq!(corpus.texts()[0], "you are a stupid idiot");
    assert_eq!(corpus.texts()[4], "idiot vandal you are");
    assert_eq!(corpus.judgment("toxicity").unwrap()[0], 1.0);
    assert_eq!(corpus.judgment("toxicity").unwrap()[1], 0.0);
}

#[test]
fn test_ordering_errors() {
    let config = Config::from_toml(CONFIG).unwrap();
    let pipeline = Pipeline::new(&config);
    assert!(matches!(pipeline.encode_sentence("hello"), Err(PipelineError::VocabularyNotBuilt)));

    let empty = AuxiliaryScorer::default();
    assert!(matches!(
        empty.score(AuxiliaryLabel::Aggression, &["hello".to_owned()]),
        Err(PipelineError::UnfittedModel(AuxiliaryLabel::Aggression))
    ));
}
