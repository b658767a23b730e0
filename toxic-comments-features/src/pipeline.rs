use {
    ndarray::Array2,
    tracing::info,
    toxic_comments_core::{
        config::Config,
        entity::AuxiliaryLabel,
        error::{PipelineError, Result},
        table::Table,
    },
    crate::{
        auxiliary::AuxiliaryScorer,
        sanitizer::Sanitizer,
        tokenizer::{Tokenizer, Vocabulary, pad_sequence},
    },
};

/// Everything the classifier consumes. Every matrix has one row per input row, in input order.
#[derive(Debug, Clone)]
pub struct Features {
    pub train_ids: Vec<String>,
    pub test_ids: Vec<String>,
    pub train_tokens: Array2<usize>,
    pub test_tokens: Array2<usize>,
    pub train_labels: Array2<f64>,
    /// Only when the test table carries every class column.
    pub test_labels: Option<Array2<f64>>,
    pub train_auxiliary: Option<Array2<f64>>,
    pub test_auxiliary: Option<Array2<f64>>,
    pub tracked_sample: Option<TrackedSample>,
}

/// Training row followed through the model (e.g. for attention activations).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSample {
    pub index: usize,
    pub text: String,
    pub labels: Vec<f64>,
}

pub struct Pipeline {
    sanitizer: Sanitizer,
    tokenizer: Tokenizer,
    sequence_length: usize,
    vocabulary_includes_test: bool,
    auxiliary_labels: Option<Vec<AuxiliaryLabel>>,
    id_column: String,
    text_column: String,
    class_list: Vec<String>,
    tracked_sample: Option<usize>,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        let auxiliary = config.auxiliary();
        let data = config.data();

        Self {
            sanitizer: Sanitizer::new(&config.sanitizer),
            tokenizer: Tokenizer::new(config.tokenizer.max_words),
            sequence_length: config.tokenizer.max_sequence_length,
            vocabulary_includes_test: config.tokenizer.vocabulary_includes_test,
            auxiliary_labels: if auxiliary.enabled { Some(auxiliary.labels()) } else { None },
            id_column: data.id_column(),
            text_column: data.text_column(),
            class_list: data.class_list(),
            tracked_sample: data.tracked_sample,
        }
    }

    /// Reuses a previously built vocabulary instead of building one in [`Pipeline::run`].
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.tokenizer = Tokenizer::with_vocabulary(vocabulary);
        self
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn vocabulary(&self) -> Result<&Vocabulary> {
        self.tokenizer.vocabulary()
    }

    pub fn auxiliary_labels(&self) -> Option<&[AuxiliaryLabel]> {
        self.auxiliary_labels.as_deref()
    }

    /// Sanitizes the text column in place.
    pub fn prepare(&self, table: &mut Table) -> Result<()> {
        self.sanitizer.sanitize_table(table, &self.text_column)
    }

    /// Sanitizes both tables, attaches auxiliary scores (computed by `scorer`, or already
    /// present as columns), builds the vocabulary if there is none yet, and encodes.
    pub fn run(&mut self, mut train: Table, mut test: Table, scorer: Option<&AuxiliaryScorer>) -> Result<Features> {
        if train.is_empty() {
            return Err(PipelineError::input_shape("train table is empty"));
        }

        let train_ids = train.keys(&self.id_column)?;
        let test_ids = test.keys(&self.id_column)?;
        info!("preparing {} train and {} test comments", train_ids.len(), test_ids.len());

        self.prepare(&mut train)?;
        self.prepare(&mut test)?;

        let (train_auxiliary, test_auxiliary) = match self.auxiliary_labels.as_deref() {
            Some(labels) => {
                if let Some(scorer) = scorer {
                    scorer.attach_scores(labels, &mut train, &self.text_column)?;
                    scorer.attach_scores(labels, &mut test, &self.text_column)?;
                }
                let columns: Vec<&str> = labels.iter().map(|label| label.feature_column()).collect();
                (Some(numeric_matrix(&train, &columns)?), Some(numeric_matrix(&test, &columns)?))
            },
            None => (None, None),
        };

        ensure_aligned(&train, &self.id_column, &train_ids)?;
        ensure_aligned(&test, &self.id_column, &test_ids)?;

        let train_texts = texts(&train, &self.text_column)?;
        let test_texts = texts(&test, &self.text_column)?;

        if self.tokenizer.vocabulary().is_ok() {
            info!("reusing existing vocabulary");
        } else if self.vocabulary_includes_test {
            info!("building vocabulary from train and test text");
            self.tokenizer.build_vocabulary(train_texts.iter().chain(test_texts.iter()).map(String::as_str))?;
        } else {
            info!("building vocabulary from train text");
            self.tokenizer.build_vocabulary(train_texts.iter().map(String::as_str))?;
        }

        let train_tokens = self.tokenizer.encode_all(&train_texts, self.sequence_length)?;
        let test_tokens = self.tokenizer.encode_all(&test_texts, self.sequence_length)?;

        let classes: Vec<&str> = self.class_list.iter().map(String::as_str).collect();
        let train_labels = numeric_matrix(&train, &classes)?;
        let test_labels = if classes.iter().all(|class| test.has_column(class)) {
            Some(numeric_matrix(&test, &classes)?)
        } else {
            None
        };

        let tracked_sample = match self.tracked_sample {
            Some(index) if index < train_texts.len() => Some(TrackedSample {
                index,
                text: train_texts[index].clone(),
                labels: train_labels.row(index).to_vec(),
            }),
            Some(index) => return Err(PipelineError::input_shape(format!(
                "tracked sample {} is out of range for {} train rows", index, train_texts.len()
            ))),
            None => None,
        };

        info!("encoded train {:?} and test {:?} token matrices", train_tokens.dim(), test_tokens.dim());

        Ok(Features {
            train_ids,
            test_ids,
            train_tokens,
            test_tokens,
            train_labels,
            test_labels,
            train_auxiliary,
            test_auxiliary,
            tracked_sample,
        })
    }

    /// Sanitizes, encodes and pads a single sentence with the existing vocabulary.
    pub fn encode_sentence(&self, text: &str) -> Result<Vec<usize>> {
        let sequence = self.tokenizer.encode(&self.sanitizer.sanitize(Some(text)))?;
        Ok(pad_sequence(&sequence, self.sequence_length))
    }
}

fn texts(table: &Table, column: &str) -> Result<Vec<String>> {
    Ok(table.text_column(column)?.iter().map(|v| v.clone().unwrap_or_default()).collect())
}

fn numeric_matrix(table: &Table, columns: &[&str]) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((table.len(), columns.len()));
    for (index, name) in columns.iter().enumerate() {
        let values = table.numeric_column(name)?;
        for (row, value) in values.iter().enumerate() {
            matrix[[row, index]] = *value;
        }
    }
    Ok(matrix)
}

fn ensure_aligned(table: &Table, id_column: &str, expected: &[String]) -> Result<()> {
    if table.keys(id_column)? != expected {
        return Err(PipelineError::input_shape(format!("rows of the table were reordered or dropped (key \"{}\")", id_column)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(source: &str) -> Config {
        Config::from_toml(source).unwrap()
    }

    fn train() -> Table {
        Table::new()
            .with_text_column("id", vec![Some("a"), Some("b"), Some("c")]).unwrap()
            .with_text_column("comment_text", vec![Some("You SUCK!!"), None, Some("nice nice edit")]).unwrap()
            .with_numeric_column("toxic", vec![1.0, 0.0, 0.0]).unwrap()
    }

    fn test() -> Table {
        Table::new()
            .with_text_column("id", vec![Some("x"), Some("y")]).unwrap()
            .with_text_column("comment_text", vec![Some("zebra zebra zebra suck"), Some("")]).unwrap()
    }

    const PLAIN: &str = r#"
[tokenizer]
max_words = 100
max_sequence_length = 3

[auxiliary]
enabled = false

[data]
class_list = ["toxic"]
"#;

    #[test]
    fn test_run_without_auxiliary_features() {
        let mut pipeline = Pipeline::new(&config(PLAIN));
        let features = pipeline.run(train(), test(), None).unwrap();

        assert_eq!(features.train_ids, vec!["a", "b", "c"]);
        assert_eq!(features.train_tokens.dim(), (3, 3));
        assert_eq!(features.test_tokens.dim(), (2, 3));
        assert_eq!(features.train_labels.column(0).to_vec(), vec![1.0, 0.0, 0.0]);
        assert!(features.test_labels.is_none());
        assert!(features.train_auxiliary.is_none());

        let vocabulary = pipeline.vocabulary().unwrap();
        assert_eq!(vocabulary.index("nice"), Some(1));
        assert!(vocabulary.index("unk").is_some());
        assert_eq!(vocabulary.index("zebra"), None);
    }

    #[test]
    fn test_vocabulary_can_include_test_text() {
        let source = PLAIN.replace("max_sequence_length = 3", "max_sequence_length = 3\nvocabulary_includes_test = true");
        let mut pipeline = Pipeline::new(&config(&source));
        pipeline.run(train(), test(), None).unwrap();
        assert_eq!(pipeline.vocabulary().unwrap().index("zebra"), Some(1));
    }

    #[test]
    fn test_missing_persisted_auxiliary_columns_are_an_error() {
        let source = PLAIN.replace("enabled = false", "enabled = true");
        let mut pipeline = Pipeline::new(&config(&source));
        assert!(matches!(pipeline.run(train(), test(), None), Err(PipelineError::InputShape(_))));
    }

    #[test]
    fn test_single_sentence_needs_a_vocabulary() {
        let mut pipeline = Pipeline::new(&config(PLAIN));
        assert!(matches!(pipeline.encode_sentence("nice"), Err(PipelineError::VocabularyNotBuilt)));

        pipeline.run(train(), test(), None).unwrap();
        let nice = pipeline.vocabulary().unwrap().index("nice").unwrap();
        assert_eq!(pipeline.encode_sentence("NICE!!! zebra").unwrap(), vec![0, 0, nice]);
    }

    #[test]
    fn test_tracked_sample() {
        let source = PLAIN.replace("[data]", "[data]\ntracked_sample = 0");
        let features = Pipeline::new(&config(&source)).run(train(), test(), None).unwrap();
        let sample = features.tracked_sample.unwrap();
        assert_eq!(sample.text, "you suck");
        assert_eq!(sample.labels, vec![1.0]);

        let source = PLAIN.replace("[data]", "[data]\ntracked_sample = 3");
        assert!(Pipeline::new(&config(&source)).run(train(), test(), None).is_err());
    }

    #[test]
    fn test_empty_train_table_is_rejected() {
        let mut pipeline = Pipeline::new(&config(PLAIN));
        assert!(matches!(pipeline.run(Table::new(), test(), None), Err(PipelineError::InputShape(_))));
    }
}
