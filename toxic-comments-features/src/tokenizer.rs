use {
    std::collections::{HashMap, BTreeMap},
    ndarray::Array2,
    serde::{Serialize, Deserialize},
    tracing::info,
    toxic_comments_core::error::{PipelineError, Result},
    crate::progress::Progress,
};

pub const PADDING: usize = 0;

const FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// Word to index mapping, densely numbered from 1 by descending frequency (ties keep first
/// occurrence). Index 0 is padding and never names a word.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(into = "VocabularyFile", try_from = "VocabularyFile")]
pub struct Vocabulary {
    words: Vec<String>,
    counts: Vec<u64>,
    index: HashMap<String, usize>,
}

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    word_index: BTreeMap<String, usize>,
    word_counts: BTreeMap<String, u64>,
}

/// Holds the vocabulary once it is built. Building twice, or encoding before building, fails.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    max_words: usize,
    vocabulary: Option<Vocabulary>,
}

impl Vocabulary {
    pub fn build<'a, I>(texts: I, max_words: usize) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<String, (u64, usize)> = HashMap::new();
        let mut progress = Progress::new("counting words");

        for text in texts {
            for word in split_words(text) {
                let first_seen = counts.len();
                counts.entry(word).or_insert((0, first_seen)).0 += 1;
            }
            progress.update();
        }
        progress.finish();

        let mut ranked: Vec<(String, (u64, usize))> = counts.into_iter().collect();
        ranked.sort_by(|(_, (a_count, a_seen)), (_, (b_count, b_seen))| {
            b_count.cmp(a_count).then_with(|| a_seen.cmp(b_seen))
        });

        let total_words = ranked.len();
        ranked.truncate(max_words);

        let (words, counts): (Vec<String>, Vec<u64>) = ranked.into_iter()
            .map(|(word, (count, _))| (word, count))
            .unzip();

        info!("found {} unique tokens, keeping {}", total_words, words.len());

        Self::from_ranked(words, counts)
    }

    fn from_ranked(words: Vec<String>, counts: Vec<u64>) -> Self {
        let index = words.iter()
            .enumerate()
            .map(|(i, word)| (word.clone(), i + 1))
            .collect();

        Self {
            words,
            counts,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn index(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn count(&self, word: &str) -> Option<u64> {
        self.index(word).map(|index| self.counts[index - 1])
    }

    pub fn word_index(&self) -> &HashMap<String, usize> {
        &self.index
    }

    /// Out-of-vocabulary words are dropped.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        split_words(text)
            .filter_map(|word| self.index(&word))
            .collect()
    }

    pub fn decode(&self, sequence: &[usize]) -> Vec<&str> {
        sequence.iter()
            .filter(|index| **index != PADDING)
            .filter_map(|index| self.words.get(index - 1).map(String::as_str))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

impl From<Vocabulary> for VocabularyFile {
    fn from(vocabulary: Vocabulary) -> Self {
        Self {
            word_counts: vocabulary.words.iter().cloned().zip(vocabulary.counts.iter().copied()).collect(),
            word_index: vocabulary.index.into_iter().collect(),
        }
    }
}

impl TryFrom<VocabularyFile> for Vocabulary {
    type Error = String;

    fn try_from(file: VocabularyFile) -> std::result::Result<Self, Self::Error> {
        let mut words = vec![None; file.word_index.len()];
        for (word, index) in file.word_index {
            match words.get_mut(index.wrapping_sub(1)) {
                Some(slot) if slot.is_none() => *slot = Some(word),
                _ => return Err(format!("word index {} for \"{}\" is not dense", index, word)),
            }
        }

        let words: Vec<String> = words.into_iter().flatten().collect();
        let counts = words.iter()
            .map(|word| file.word_counts.get(word).copied().ok_or_else(|| format!("no count for \"{}\"", word)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self::from_ranked(words, counts))
    }
}

impl Tokenizer {
    pub fn new(max_words: usize) -> Self {
        Self {
            max_words,
            vocabulary: None,
        }
    }

    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self {
            max_words: vocabulary.len(),
            vocabulary: Some(vocabulary),
        }
    }

    pub fn build_vocabulary<'a, I>(&mut self, texts: I) -> Result<&Vocabulary>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.vocabulary.is_some() {
            return Err(PipelineError::VocabularyAlreadyBuilt);
        }
        Ok(self.vocabulary.insert(Vocabulary::build(texts, self.max_words)))
    }

    pub fn vocabulary(&self) -> Result<&Vocabulary> {
        self.vocabulary.as_ref().ok_or(PipelineError::VocabularyNotBuilt)
    }

    pub fn encode(&self, text: &str) -> Result<Vec<usize>> {
        Ok(self.vocabulary()?.encode(text))
    }

    /// Encodes every text and pads the result to `length` columns.
    pub fn encode_all<S: AsRef<str>>(&self, texts: &[S], length: usize) -> Result<Array2<usize>> {
        let vocabulary = self.vocabulary()?;
        let mut progress = Progress::new("encoding comments");

        let sequences: Vec<Vec<usize>> = texts.iter()
            .map(|text| {
                progress.update();
                vocabulary.encode(text.as_ref())
            })
            .collect();

        Ok(pad_sequences(&sequences, length))
    }
}

/// Keeps the last `length` entries; shorter sequences are left-padded with [`PADDING`].
pub fn pad_sequence(sequence: &[usize], length: usize) -> Vec<usize> {
    let tail = &sequence[sequence.len().saturating_sub(length)..];
    let mut padded = vec![PADDING; length - tail.len()];
    padded.extend_from_slice(tail);
    padded
}

pub fn pad_sequences(sequences: &[Vec<usize>], length: usize) -> Array2<usize> {
    let mut matrix = Array2::from_elem((sequences.len(), length), PADDING);
    for (mut row, sequence) in matrix.rows_mut().into_iter().zip(sequences) {
        for (cell, value) in row.iter_mut().zip(pad_sequence(sequence, length)) {
            *cell = value;
        }
    }
    matrix
}

fn split_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| c.is_whitespace() || FILTERS.contains(c))
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        ndarray::array,
    };

    #[test]
    fn test_vocabulary_ranks_by_frequency() {
        let vocabulary = Vocabulary::build(["a a a", "b b", "c"], 3);
        assert_eq!(vocabulary.index("a"), Some(1));
        assert_eq!(vocabulary.index("b"), Some(2));
        assert_eq!(vocabulary.index("c"), Some(3));
        assert_eq!(vocabulary.count("a"), Some(3));
        assert_eq!(vocabulary.len(), 3);
    }

    #[test]
    fn test_vocabulary_is_capped_and_ties_keep_first_occurrence() {
        let vocabulary = Vocabulary::build(["x y z y", "z w"], 2);
        assert_eq!(vocabulary.index("y"), Some(1));
        assert_eq!(vocabulary.index("z"), Some(2));
        assert_eq!(vocabulary.index("x"), None);
        assert_eq!(vocabulary.encode("w x y z"), vec![1, 2]);
    }

    #[test]
    fn test_vocabulary_is_deterministic() {
        let texts = ["the cat sat", "on the mat", "the end", "cat mat sat on"];
        assert_eq!(Vocabulary::build(texts, 10), Vocabulary::build(texts, 10));
    }

    #[test]
    fn test_filters_split_words() {
        let vocabulary = Vocabulary::build(["Hello, world! hello-world"], 10);
        assert_eq!(vocabulary.count("hello"), Some(2));
        assert_eq!(vocabulary.count("world"), Some(2));
    }

    #[test]
    fn test_padding_and_truncation() {
        assert_eq!(pad_sequence(&[5, 6, 7, 8, 9], 4), vec![6, 7, 8, 9]);
        assert_eq!(pad_sequence(&[5], 4), vec![0, 0, 0, 5]);
        assert_eq!(pad_sequence(&[], 3), vec![0, 0, 0]);
        assert_eq!(pad_sequence(&[1, 2], 0), Vec::<usize>::new());
    }

    #[test]
    fn test_encoded_rows_always_have_fixed_length() {
        let mut tokenizer = Tokenizer::new(100);
        tokenizer.build_vocabulary(["one two three four five six"]).unwrap();

        let long = "one two three four five six ".repeat(50);
        let matrix = tokenizer.encode_all(&["", "three", long.as_str(), "unknown words only"], 4).unwrap();

        assert_eq!(matrix.dim(), (4, 4));
        assert_eq!(matrix.row(0).to_vec(), vec![0, 0, 0, 0]);
        assert_eq!(matrix.row(1).to_vec(), vec![0, 0, 0, 3]);
        assert_eq!(matrix.row(2).to_vec(), vec![3, 4, 5, 6]);
        assert_eq!(matrix.row(3).to_vec(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_pad_sequences_matrix() {
        let matrix = pad_sequences(&[vec![5, 6, 7, 8, 9], vec![5]], 4);
        assert_eq!(matrix, array![[6, 7, 8, 9], [0, 0, 0, 5]]);
    }

    #[test]
    fn test_encoding_before_building_fails() {
        let tokenizer = Tokenizer::new(10);
        assert!(matches!(tokenizer.encode("hi"), Err(PipelineError::VocabularyNotBuilt)));
        assert!(matches!(tokenizer.encode_all(&["hi"], 3), Err(PipelineError::VocabularyNotBuilt)));
    }

    #[test]
    fn test_vocabulary_is_built_once() {
        let mut tokenizer = Tokenizer::new(10);
        tokenizer.build_vocabulary(["a b"]).unwrap();
        assert!(matches!(tokenizer.build_vocabulary(["c d"]), Err(PipelineError::VocabularyAlreadyBuilt)));
        assert_eq!(tokenizer.encode("c a").unwrap(), vec![1]);
    }

    #[test]
    fn test_json_round_trip_and_decode() {
        let vocabulary = Vocabulary::build(["you are you", "are not"], 10);
        let restored = Vocabulary::from_json(&vocabulary.to_json().unwrap()).unwrap();
        assert_eq!(restored, vocabulary);
        assert_eq!(restored.decode(&[0, 0, 1, 2, 3]), vec!["you", "are", "not"]);
    }

    #[test]
    fn test_sparse_word_index_is_rejected() {
        let json = r#"{"word_index": {"a": 1, "b": 3}, "word_counts": {"a": 2, "b": 1}}"#;
        assert!(Vocabulary::from_json(json).is_err());
    }
}
