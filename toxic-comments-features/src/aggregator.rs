use {
    std::collections::{HashMap, HashSet},
    tracing::{info, warn},
    toxic_comments_core::{
        error::{PipelineError, Result},
        table::{Table, Column},
    },
    crate::sanitizer::Sanitizer,
};

/// Comments joined with the mean of their reviewer annotations, one row per comment id.
#[derive(Debug, Clone)]
pub struct AnnotatedCorpus {
    ids: Vec<String>,
    texts: Vec<String>,
    judgments: Vec<(String, Vec<f64>)>,
}

struct Accumulator {
    sums: Vec<f64>,
    counts: Vec<usize>,
}

/// Joins `comments` with `annotations` on `key`, averaging every numeric annotation column
/// per comment id, then sanitizes `text_column`.
///
/// Rows keep the order of `comments`. Comments nobody annotated are left out (and logged),
/// since there is no target to learn from.
pub fn join_and_sanitize(
    comments: &Table,
    annotations: &Table,
    key: &str,
    text_column: &str,
    sanitizer: &Sanitizer,
) -> Result<AnnotatedCorpus> {
    if comments.is_empty() {
        return Err(PipelineError::input_shape("comment table is empty"));
    }
    if annotations.is_empty() {
        return Err(PipelineError::input_shape("annotation table is empty"));
    }

    let comment_ids = comments.keys(key)?;
    let texts = comments.text_column(text_column)?;

    let mut seen = HashSet::with_capacity(comment_ids.len());
    for id in &comment_ids {
        if !seen.insert(id.as_str()) {
            return Err(PipelineError::input_shape(format!("comment id {} appears more than once", id)));
        }
    }

    let judgment_columns: Vec<(&str, &[f64])> = annotations.columns()
        .filter(|(name, _)| *name != key)
        .filter_map(|(name, column)| match column {
            Column::Numeric(values) => Some((name, values.as_slice())),
            Column::Text(_) => None,
        })
        .collect();
    if judgment_columns.is_empty() {
        return Err(PipelineError::input_shape("annotation table has no numeric judgment columns"));
    }

    let annotation_ids = annotations.keys(key)?;
    let mut groups: HashMap<&str, Accumulator> = HashMap::new();
    for (row, id) in annotation_ids.iter().enumerate() {
        let accumulator = groups.entry(id.as_str()).or_insert_with(|| Accumulator {
            sums: vec![0.0; judgment_columns.len()],
            counts: vec![0; judgment_columns.len()],
        });

        for (index, (_, values)) in judgment_columns.iter().enumerate() {
            let value = values[row];
            if !value.is_nan() {
                accumulator.sums[index] += value;
                accumulator.counts[index] += 1;
            }
        }
    }

    let mut ids = Vec::new();
    let mut raw_texts = Vec::new();
    let mut means: Vec<Vec<f64>> = vec![Vec::new(); judgment_columns.len()];
    let mut unannotated = 0;

    for (row, id) in comment_ids.iter().enumerate() {
        let accumulator = match groups.get(id.as_str()) {
            Some(v) => v,
            None => {
                unannotated += 1;
                continue;
            },
        };

        ids.push(id.clone());
        raw_texts.push(texts[row].clone());
        for (index, column) in means.iter_mut().enumerate() {
            column.push(if accumulator.counts[index] > 0 {
                accumulator.sums[index] / accumulator.counts[index] as f64
            } else {
                f64::NAN
            });
        }
    }

    if unannotated > 0 {
        warn!("{} of {} comments have no annotations and were left out", unannotated, comment_ids.len());
    }
    if ids.is_empty() {
        return Err(PipelineError::input_shape(format!("no comment id in the comment table matches an annotation on \"{}\"", key)));
    }

    info!(
        "aggregated {} annotation rows into {} comments ({} reviewers per comment on average)",
        annotation_ids.len(),
        ids.len(),
        annotation_ids.len() as f64 / groups.len() as f64,
    );

    Ok(AnnotatedCorpus {
        ids,
        texts: sanitizer.sanitize_all(&raw_texts),
        judgments: judgment_columns.iter()
            .map(|(name, _)| name.to_string())
            .zip(means.into_iter())
            .collect(),
    })
}

impl AnnotatedCorpus {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn judgment_columns(&self) -> impl Iterator<Item = &str> {
        self.judgments.iter().map(|(name, _)| name.as_str())
    }

    /// Averaged annotation scores for `column`, aligned with [`AnnotatedCorpus::ids`].
    pub fn judgment(&self, column: &str) -> Result<&[f64]> {
        self.judgments.iter()
            .find(|(name, _)| name == column)
            .map(|(_, values)| values.as_slice())
            .ok_or_else(|| PipelineError::input_shape(format!("annotations have no judgment column \"{}\"", column)))
    }
}
