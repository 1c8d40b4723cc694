use crate::error::CorpusError;
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

static CORPUS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/corpus");

/// Word list a practice text is drawn from
#[derive(Deserialize, Clone, Debug)]
pub struct Corpus {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Corpus {
    /// Load one of the embedded corpora by name, e.g. `english`
    pub fn load(name: &str) -> Result<Self, CorpusError> {
        let file = CORPUS_DIR
            .get_file(format!("{name}.json"))
            .ok_or_else(|| CorpusError::NotFound(name.to_string()))?;

        let contents = file
            .contents_utf8()
            .ok_or_else(|| CorpusError::Encoding(name.to_string()))?;

        let corpus: Corpus = serde_json::from_str(contents)?;
        if corpus.words.is_empty() {
            return Err(CorpusError::Empty(corpus.name));
        }
        Ok(corpus)
    }

    pub fn english() -> Result<Self, CorpusError> {
        Self::load("english")
    }

    pub fn from_words<I, S>(name: &str, words: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(Into::into).collect();
        if words.is_empty() {
            return Err(CorpusError::Empty(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            size: words.len() as u32,
            words,
        })
    }
}

/// Anything that can hand a session its target text
pub trait TextSource {
    fn generate(&mut self, word_count: usize) -> String;
}

/// Draws words uniformly, with replacement, from a corpus
#[derive(Debug)]
pub struct TextGenerator {
    corpus: Corpus,
    rng: StdRng,
}

impl TextGenerator {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible texts
    pub fn seeded(corpus: Corpus, seed: u64) -> Self {
        Self {
            corpus,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl TextSource for TextGenerator {
    fn generate(&mut self, word_count: usize) -> String {
        let words = &self.corpus.words;
        let rng = &mut self.rng;
        (0..word_count.max(1))
            .filter_map(|_| words.choose(rng))
            .join(" ")
    }
}

/// A fixed, user supplied prompt served on every reset
#[derive(Debug, Clone)]
pub struct CustomPrompt(pub String);

impl TextSource for CustomPrompt {
    fn generate(&mut self, _word_count: usize) -> String {
        self.0.clone()
    }
}
