use {
    std::collections::HashMap,
    once_cell::sync::Lazy,
    regex::Regex,
    serde::{Serialize, Deserialize},
    sprs::CsMat,
    tracing::info,
    crate::{
        progress::Progress,
        stop_words::is_stop_word,
    },
};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Unigram + bigram tf-idf vectorizer. Vocabulary and idf weights are fixed once fitted;
/// terms never seen during fitting get zero weight.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

#[derive(Default)]
struct TermStats {
    total: u64,
    documents: u64,
}

impl TfidfVectorizer {
    /// Fits the vectorizer on `texts` and returns it together with the transformed matrix.
    pub fn fit_transform(texts: &[String], max_features: usize) -> (Self, CsMat<f64>) {
        let mut stats: HashMap<String, TermStats> = HashMap::new();
        let mut progress = Progress::new("counting terms");

        for text in texts {
            for (term, count) in term_counts(text) {
                let entry = stats.entry(term).or_default();
                entry.total += count;
                entry.documents += 1;
            }
            progress.update();
        }
        progress.finish();

        let mut ranked: Vec<(String, TermStats)> = stats.into_iter().collect();
        ranked.sort_by(|(a_term, a), (b_term, b)| b.total.cmp(&a.total).then_with(|| a_term.cmp(b_term)));
        ranked.truncate(max_features);
        ranked.sort_by(|(a, _), (b, _)| a.cmp(b));

        let n_documents = texts.len() as f64;
        let idf = ranked.iter()
            .map(|(_, stats)| ((1.0 + n_documents) / (1.0 + stats.documents as f64)).ln() + 1.0)
            .collect();
        let vocabulary = ranked.into_iter()
            .enumerate()
            .map(|(column, (term, _))| (term, column))
            .collect::<HashMap<_, _>>();

        info!("tf-idf vocabulary has {} terms (limit {})", vocabulary.len(), max_features);

        let vectorizer = Self {
            vocabulary,
            idf,
        };
        let matrix = vectorizer.transform(texts);

        (vectorizer, matrix)
    }

    /// Sublinear tf times idf, every row L2-normalized.
    pub fn transform(&self, texts: &[String]) -> CsMat<f64> {
        let mut indptr = Vec::with_capacity(texts.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();

        indptr.push(0);
        for text in texts {
            let mut row: Vec<(usize, f64)> = term_counts(text)
                .into_iter()
                .filter_map(|(term, count)| self.vocabulary.get(&term).map(|column| {
                    (*column, (1.0 + (count as f64).ln()) * self.idf[*column])
                }))
                .collect();
            row.sort_by_key(|(column, _)| *column);

            let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            for (column, value) in row {
                indices.push(column);
                data.push(if norm > 0.0 { value / norm } else { 0.0 });
            }
            indptr.push(indices.len());
        }

        CsMat::new((texts.len(), self.idf.len()), indptr, indices, data)
    }

    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.column(term).map(|column| self.idf[column])
    }
}

fn term_counts(text: &str) -> HashMap<String, u64> {
    let lowercase = text.to_lowercase();
    let words: Vec<&str> = TOKEN_RE.find_iter(&lowercase)
        .map(|m| m.as_str())
        .filter(|word| !is_stop_word(word))
        .collect();

    let mut counts = HashMap::new();
    for word in &words {
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    for pair in words.windows(2) {
        *counts.entry(format!("{} {}", pair[0], pair[1])).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "stupid idiot stupid".to_owned(),
            "nice article thanks".to_owned(),
            "you are a stupid troll".to_owned(),
        ]
    }

    #[test]
    fn test_unigrams_and_bigrams_without_stop_words() {
        let counts = term_counts("you are a stupid troll");
        assert_eq!(counts.len(), 3);
        assert_eq!(counts["stupid"], 1);
        assert_eq!(counts["stupid troll"], 1);
        assert!(!counts.contains_key("you"));
    }

    #[test]
    fn test_smoothed_idf() {
        let (vectorizer, _) = TfidfVectorizer::fit_transform(&corpus(), 100);
        let stupid = vectorizer.idf("stupid").unwrap();
        let idiot = vectorizer.idf("idiot").unwrap();
        assert!((stupid - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        assert!((idiot - ((4.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_columns_are_alphabetical_and_capped_by_frequency() {
        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&corpus(), 2);
        assert_eq!(vectorizer.n_features(), 2);
        assert_eq!(matrix.cols(), 2);
        // "stupid" occurs 3 times; the rest once, ties broken alphabetically.
        assert_eq!(vectorizer.column("article"), Some(0));
        assert_eq!(vectorizer.column("stupid"), Some(1));
    }

    #[test]
    fn test_rows_are_unit_length_and_unknown_terms_are_zero() {
        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&corpus(), 100);
        for row in matrix.outer_iterator() {
            let norm: f64 = row.iter().map(|(_, v)| v * v).sum();
            assert!((norm - 1.0).abs() < 1e-9);
        }

        let unseen = vectorizer.transform(&["completely novel words".to_owned(), String::new()]);
        assert_eq!(unseen.rows(), 2);
        assert_eq!(unseen.nnz(), 0);
    }

    #[test]
    fn test_sublinear_term_frequency() {
        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&corpus(), 100);
        let row: HashMap<usize, f64> = matrix.outer_view(0).unwrap().iter().map(|(j, v)| (j, *v)).collect();
        let stupid = row[&vectorizer.column("stupid").unwrap()];
        let idiot = row[&vectorizer.column("idiot").unwrap()];
        let expected = (1.0 + 2.0f64.ln()) * vectorizer.idf("stupid").unwrap() / vectorizer.idf("idiot").unwrap();
        assert!((stupid / idiot - expected).abs() < 1e-9);
    }
}
