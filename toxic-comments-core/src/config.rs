use {
    std::fs::read_to_string,
    serde::Deserialize,
    crate::entity::AuxiliaryLabel,
};

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    pub auxiliary: Option<AuxiliaryConfig>,
    pub data: Option<DataConfig>,
    log_level: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Keep "!" so that emphasis survives sanitization.
    pub keep_emphasis: bool,
    pub placeholder: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TokenizerConfig {
    pub max_words: usize,
    pub max_sequence_length: usize,
    /// Rank the vocabulary over train and test text together. Improves coverage, but
    /// leaks test-set word frequencies into the vocabulary.
    pub vocabulary_includes_test: bool,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AuxiliaryConfig {
    pub enabled: bool,
    labels: Option<Vec<AuxiliaryLabel>>,
    max_features: Option<usize>,
    alpha: Option<f64>,
    cv_folds: Option<usize>,
    cv_shuffle_seed: Option<u64>,
    solver_tolerance: Option<f64>,
    solver_max_iterations: Option<usize>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DataConfig {
    train_path: Option<String>,
    test_path: Option<String>,
    scored_train_path: Option<String>,
    scored_test_path: Option<String>,
    vocabulary_path: Option<String>,
    train_tokens_path: Option<String>,
    test_tokens_path: Option<String>,
    auxiliary_models_path: Option<String>,
    corpora_dir: Option<String>,
    id_column: Option<String>,
    text_column: Option<String>,
    annotation_key: Option<String>,
    annotation_text_column: Option<String>,
    class_list: Option<Vec<String>>,
    pub tracked_sample: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sanitizer: SanitizerConfig::default(),
            tokenizer: TokenizerConfig::default(),
            auxiliary: None,
            data: None,
            log_level: None,
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            keep_emphasis: false,
            placeholder: None,
        }
    }
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            max_words: 100_000,
            max_sequence_length: 200,
            vocabulary_includes_test: false,
        }
    }
}

impl Default for AuxiliaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            labels: None,
            max_features: None,
            alpha: None,
            cv_folds: None,
            cv_shuffle_seed: None,
            solver_tolerance: None,
            solver_max_iterations: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_path: None,
            test_path: None,
            scored_train_path: None,
            scored_test_path: None,
            vocabulary_path: None,
            train_tokens_path: None,
            test_tokens_path: None,
            auxiliary_models_path: None,
            corpora_dir: None,
            id_column: None,
            text_column: None,
            annotation_key: None,
            annotation_text_column: None,
            class_list: None,
            tracked_sample: None,
        }
    }
}

impl Config {
    /// Reads `./config.toml`, then `/config/config.toml`. Falls back to the defaults when
    /// neither can be read or parsed, returning the reason so that it can be logged once
    /// logging is set up.
    pub fn load() -> (Self, Option<String>) {
        Self::load_from(&["./config.toml", "/config/config.toml"])
    }

    fn load_from(paths: &[&str]) -> (Self, Option<String>) {
        let source = paths.iter()
            .find_map(|path| read_to_string(path).ok())
            .ok_or_else(|| format!("none of {:?} could be read", paths));

        match source.and_then(|v| Self::from_toml(&v)) {
            Ok(config) => (config, None),
            Err(err) => (Config::default(), Some(err)),
        }
    }

    pub fn from_toml(source: &str) -> Result<Self, String> {
        toml::from_str(source).map_err(|err| err.to_string())
    }

    pub fn auxiliary(&self) -> AuxiliaryConfig {
        self.auxiliary.as_ref().cloned().unwrap_or_default()
    }

    pub fn data(&self) -> DataConfig {
        self.data.as_ref().cloned().unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

impl SanitizerConfig {
    pub fn placeholder(&self) -> &str {
        self.placeholder.as_deref().unwrap_or("unk")
    }
}

impl AuxiliaryConfig {
    pub fn labels(&self) -> Vec<AuxiliaryLabel> {
        self.labels.as_ref().cloned().unwrap_or_else(|| AuxiliaryLabel::ALL.to_vec())
    }

    pub fn max_features(&self) -> usize {
        self.max_features.unwrap_or(60_000)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha.unwrap_or(1.0)
    }

    pub fn cv_folds(&self) -> usize {
        self.cv_folds.unwrap_or(5)
    }

    pub fn cv_shuffle_seed(&self) -> Option<u64> {
        self.cv_shuffle_seed
    }

    pub fn solver_tolerance(&self) -> f64 {
        self.solver_tolerance.unwrap_or(1e-6)
    }

    pub fn solver_max_iterations(&self) -> usize {
        self.solver_max_iterations.unwrap_or(1000)
    }
}

impl DataConfig {
    pub fn train_path(&self) -> String {
        self.train_path.as_ref().cloned().unwrap_or("./data/train.csv".to_owned())
    }

    pub fn test_path(&self) -> String {
        self.test_path.as_ref().cloned().unwrap_or("./data/test.csv".to_owned())
    }

    pub fn scored_train_path(&self) -> String {
        self.scored_train_path.as_ref().cloned().unwrap_or("./data/train_with_convai.csv".to_owned())
    }

    pub fn scored_test_path(&self) -> String {
        self.scored_test_path.as_ref().cloned().unwrap_or("./data/test_with_convai.csv".to_owned())
    }

    pub fn vocabulary_path(&self) -> String {
        self.vocabulary_path.as_ref().cloned().unwrap_or("./data/word_index.json".to_owned())
    }

    pub fn train_tokens_path(&self) -> String {
        self.train_tokens_path.as_ref().cloned().unwrap_or("./data/train_tokens.csv".to_owned())
    }

    pub fn test_tokens_path(&self) -> String {
        self.test_tokens_path.as_ref().cloned().unwrap_or("./data/test_tokens.csv".to_owned())
    }

    pub fn auxiliary_models_path(&self) -> String {
        self.auxiliary_models_path.as_ref().cloned().unwrap_or("./data/auxiliary_models.json".to_owned())
    }

    /// Annotated comments for `label`, e.g. `./data/attack_annotated_comments.tsv`.
    pub fn annotated_comments_path(&self, label: AuxiliaryLabel) -> String {
        format!("{}/{}_annotated_comments.tsv", self.corpora_dir(), label.annotation_column())
    }

    pub fn annotations_path(&self, label: AuxiliaryLabel) -> String {
        format!("{}/{}_annotations.tsv", self.corpora_dir(), label.annotation_column())
    }

    fn corpora_dir(&self) -> &str {
        self.corpora_dir.as_deref().unwrap_or("./data")
    }

    pub fn id_column(&self) -> String {
        self.id_column.as_ref().cloned().unwrap_or("id".to_owned())
    }

    pub fn text_column(&self) -> String {
        self.text_column.as_ref().cloned().unwrap_or("comment_text".to_owned())
    }

    pub fn annotation_key(&self) -> String {
        self.annotation_key.as_ref().cloned().unwrap_or("rev_id".to_owned())
    }

    pub fn annotation_text_column(&self) -> String {
        self.annotation_text_column.as_ref().cloned().unwrap_or("comment".to_owned())
    }

    pub fn class_list(&self) -> Vec<String> {
        self.class_list.as_ref().cloned().unwrap_or_else(|| {
            ["toxic", "severe_toxic", "obscene", "threat", "insult", "identity_hate"]
                .iter()
                .map(|v| v.to_string())
                .collect()
        })
    }
}
