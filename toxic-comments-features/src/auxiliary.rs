use {
    std::collections::BTreeMap,
    ndarray::{Array1, ArrayView1},
    rand::{SeedableRng, seq::SliceRandom},
    rand_xoshiro::Xoshiro256Plus,
    linfa::prelude::SingleTargetRegression,
    serde::{Serialize, Deserialize},
    sprs::CsMat,
    tracing::{info, warn},
    toxic_comments_core::{
        config::AuxiliaryConfig,
        entity::AuxiliaryLabel,
        error::{PipelineError, Result},
        table::{Table, Column},
    },
    crate::{
        aggregator::AnnotatedCorpus,
        ridge::{RidgeParams, RidgeModel},
        tfidf::TfidfVectorizer,
    },
};

/// Vectorizer and regression weights fitted for a single auxiliary label. There is no way
/// to refit or mutate it: scoring only borrows it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FittedAuxiliaryModel {
    label: AuxiliaryLabel,
    vectorizer: TfidfVectorizer,
    model: RidgeModel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    fold_mse: Vec<f64>,
}

/// Fitted models keyed by label. Scoring a label that was never fitted is an error.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AuxiliaryScorer {
    models: BTreeMap<AuxiliaryLabel, FittedAuxiliaryModel>,
}

impl FittedAuxiliaryModel {
    /// Fits the vectorizer and the ridge model on the averaged `label` judgments of `corpus`.
    /// Cross-validation results are logged only.
    pub fn fit(label: AuxiliaryLabel, corpus: &AnnotatedCorpus, config: &AuxiliaryConfig) -> Result<Self> {
        info!("fitting {} model on {} comments", label, corpus.len());

        let judgment = corpus.judgment(label.annotation_column())?;
        let rows: Vec<usize> = (0..judgment.len()).filter(|i| judgment[*i].is_finite()).collect();
        if rows.len() < judgment.len() {
            warn!("{} comments have no usable {} judgment and are not used for fitting", judgment.len() - rows.len(), label);
        }
        if rows.is_empty() {
            return Err(PipelineError::input_shape(format!("no comment has a {} judgment", label)));
        }

        let texts: Vec<String> = rows.iter().map(|i| corpus.texts()[*i].clone()).collect();
        let target = Array1::from_iter(rows.iter().map(|i| judgment[*i]));
        let (vectorizer, x) = TfidfVectorizer::fit_transform(&texts, config.max_features());
        info!("{} document-term matrix: {} x {}, {} non-zero", label, x.rows(), x.cols(), x.nnz());

        let params = RidgeParams::from_config(config);

        match cross_validate(&x, target.view(), config.cv_folds(), config.cv_shuffle_seed(), &params)? {
            Some(cv) => info!("{} cross-validated mse: {:?} (mean {:.5})", label, cv.fold_mse(), cv.mean_mse()),
            None => warn!("{} corpus is too small for cross-validation, skipping", label),
        }

        let model = params.fit(&x, target.view())?;

        Ok(Self {
            label,
            vectorizer,
            model,
        })
    }

    pub fn label(&self) -> AuxiliaryLabel {
        self.label
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Scores sanitized `texts` with the frozen vectorizer.
    pub fn predict(&self, texts: &[String]) -> Array1<f64> {
        self.model.predict(&self.vectorizer.transform(texts))
    }
}

impl CrossValidation {
    pub fn fold_mse(&self) -> &[f64] {
        &self.fold_mse
    }

    pub fn mean_mse(&self) -> f64 {
        self.fold_mse.iter().sum::<f64>() / self.fold_mse.len() as f64
    }
}

/// K-fold cross-validated mean squared error. Folds are contiguous unless a shuffle seed is
/// given; `None` when there are fewer than two rows.
pub fn cross_validate(
    x: &CsMat<f64>,
    y: ArrayView1<f64>,
    folds: usize,
    shuffle_seed: Option<u64>,
    params: &RidgeParams,
) -> Result<Option<CrossValidation>> {
    let n = x.rows();
    if n < 2 || folds < 2 {
        return Ok(None);
    }

    let mut order: Vec<usize> = (0..n).collect();
    if let Some(seed) = shuffle_seed {
        order.shuffle(&mut Xoshiro256Plus::seed_from_u64(seed));
    }

    let mut fold_mse = Vec::new();
    for (train, test) in kfold(&order, folds.min(n)) {
        let y_train = Array1::from_iter(train.iter().map(|i| y[*i]));
        let y_test = Array1::from_iter(test.iter().map(|i| y[*i]));

        let model = params.fit(&select_rows(x, &train), y_train.view())?;
        let predicted = model.predict(&select_rows(x, &test));

        let mse = predicted.mean_squared_error(&y_test)
            .map_err(|err| PipelineError::Solver(err.to_string()))?;
        fold_mse.push(mse);
    }

    Ok(Some(CrossValidation { fold_mse }))
}

// (train, test) row sets. The first `n % k` test folds get one extra row.
fn kfold(order: &[usize], k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let n = order.len();
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = n / k + if fold < n % k { 1 } else { 0 };
        let test = order[start..start + size].to_vec();

        let mut in_test = vec![false; n];
        for i in &test {
            in_test[*i] = true;
        }
        let train = order.iter().copied().filter(|i| !in_test[*i]).collect();

        folds.push((train, test));
        start += size;
    }
    folds
}

fn select_rows(x: &CsMat<f64>, rows: &[usize]) -> CsMat<f64> {
    let mut indptr = Vec::with_capacity(rows.len() + 1);
    let mut indices = Vec::new();
    let mut data = Vec::new();

    indptr.push(0);
    for row in rows {
        if let Some(view) = x.outer_view(*row) {
            for (column, value) in view.iter() {
                indices.push(column);
                data.push(*value);
            }
        }
        indptr.push(indices.len());
    }

    CsMat::new((rows.len(), x.cols()), indptr, indices, data)
}

impl AuxiliaryScorer {
    pub fn new(models: Vec<FittedAuxiliaryModel>) -> Self {
        Self {
            models: models.into_iter().map(|model| (model.label, model)).collect(),
        }
    }

    /// Fits one model per `(label, corpus)` pair. Labels are independent of each other.
    pub fn fit(corpora: Vec<(AuxiliaryLabel, AnnotatedCorpus)>, config: &AuxiliaryConfig) -> Result<Self> {
        let models = corpora.into_iter()
            .map(|(label, corpus)| FittedAuxiliaryModel::fit(label, &corpus, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(models))
    }

    pub fn labels(&self) -> impl Iterator<Item = AuxiliaryLabel> + '_ {
        self.models.keys().copied()
    }

    pub fn model(&self, label: AuxiliaryLabel) -> Result<&FittedAuxiliaryModel> {
        self.models.get(&label).ok_or(PipelineError::UnfittedModel(label))
    }

    pub fn score(&self, label: AuxiliaryLabel, texts: &[String]) -> Result<Array1<f64>> {
        Ok(self.model(label)?.predict(texts))
    }

    /// Appends one score column per label to `table`, computed from its already sanitized
    /// `text_column`. Every label is checked before the table is touched.
    pub fn attach_scores(&self, labels: &[AuxiliaryLabel], table: &mut Table, text_column: &str) -> Result<()> {
        let models = labels.iter()
            .map(|label| self.model(*label))
            .collect::<Result<Vec<_>>>()?;

        let texts: Vec<String> = table.text_column(text_column)?
            .iter()
            .map(|v| v.clone().unwrap_or_default())
            .collect();

        for model in models {
            let scores = model.predict(&texts);
            table.set_column(model.label.feature_column(), Column::Numeric(scores.to_vec()))?;
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}
