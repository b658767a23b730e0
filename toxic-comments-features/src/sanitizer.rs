use {
    once_cell::sync::Lazy,
    regex::Regex,
    toxic_comments_core::{
        config::SanitizerConfig,
        error::Result,
        table::{Table, Column},
    },
};

const STRUCTURAL_MARKERS: [&str; 2] = ["NEWLINE_TOKEN", "TAB_TOKEN"];

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://(?:www\.)?\S*").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S*@\S*\s?").unwrap());
static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!+").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalizes raw comment text. The same instance has to be used for every corpus
/// (train, test and the annotated ones), otherwise the models see skewed text.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    keep_emphasis: bool,
    placeholder: String,
}

impl Sanitizer {
    pub fn new(config: &SanitizerConfig) -> Self {
        Self {
            keep_emphasis: config.keep_emphasis,
            placeholder: config.placeholder().to_owned(),
        }
    }

    pub fn keep_emphasis(&self) -> bool {
        self.keep_emphasis
    }

    /// Missing text becomes the placeholder token; the result only contains lowercase
    /// ascii letters, single spaces and (if emphasis is kept) "!". Idempotent.
    pub fn sanitize(&self, text: Option<&str>) -> String {
        let mut text = text.unwrap_or(&self.placeholder).to_owned();

        for marker in STRUCTURAL_MARKERS {
            text = text.replace(marker, " ");
        }

        let text = URL_RE.replace_all(&text, " ");
        let text = EMAIL_RE.replace_all(&text, " ");
        let text = expand_standalone_u(&text);

        let text: String = text.chars()
            .map(|c| if c.is_ascii_alphabetic() || (self.keep_emphasis && c == '!') { c } else { ' ' })
            .collect();

        let text = if self.keep_emphasis {
            EMPHASIS_RE.replace_all(&text, "! ").into_owned()
        } else {
            text
        };

        WHITESPACE_RE.replace_all(&text, " ")
            .trim()
            .to_ascii_lowercase()
    }

    pub fn sanitize_all(&self, values: &[Option<String>]) -> Vec<String> {
        values.iter().map(|v| self.sanitize(v.as_deref())).collect()
    }

    /// Rewrites `column` of `table` in place with its sanitized text.
    pub fn sanitize_table(&self, table: &mut Table, column: &str) -> Result<()> {
        let sanitized = self.sanitize_all(table.text_column(column)?);
        table.set_column(column, Column::Text(sanitized.into_iter().map(Some).collect()))
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&SanitizerConfig::default())
    }
}

// "u" -> "you" whenever the letter is not glued to another ascii letter.
fn expand_standalone_u(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);

    for (i, c) in chars.iter().enumerate() {
        let is_u = *c == 'u' || *c == 'U';
        let letter_before = i > 0 && chars[i - 1].is_ascii_alphabetic();
        let letter_after = chars.get(i + 1).map(|v| v.is_ascii_alphabetic()).unwrap_or(false);

        if is_u && !letter_before && !letter_after {
            out.push_str("you");
        } else {
            out.push(*c);
        }
    }

    out
}
