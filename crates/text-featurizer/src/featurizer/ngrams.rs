use std::{borrow::Cow, fmt};

use super::{
    params::FeaturizerParams,
    tokenizer::{Token, Tokenizer},
};

/// A word n-gram or a char-gram. Word and char grams never compare equal,
/// even when their text matches.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gram {
    Word(Vec<String>),
    Char(String),
}

impl Gram {
    pub fn word<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Word(tokens.into_iter().map(Into::into).collect())
    }

    pub fn char(chars: impl Into<String>) -> Self {
        Self::Char(chars.into())
    }

    /// Order of the gram: tokens for word grams, characters for char-grams.
    #[must_use]
    pub fn order(&self) -> usize {
        match self {
            Self::Word(tokens) => tokens.len(),
            Self::Char(chars) => chars.chars().count(),
        }
    }

    #[must_use]
    pub fn is_word(&self) -> bool {
        matches!(self, Self::Word(_))
    }
}

/// Word grams render as `the_cat`, char-grams as `<ca>`. Delimiters inside
/// the gram text are escaped with [`escape_name`], so `a_b` the unigram shows
/// as `a\_b` and never collides with the bigram `a_b`.
impl fmt::Display for Gram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(tokens) => {
                for (i, token) in tokens.iter().enumerate() {
                    if i > 0 {
                        f.write_str("_")?;
                    }
                    f.write_str(&escape_name(token))?;
                }
                Ok(())
            }
            Self::Char(chars) => write!(f, "<{}>", escape_name(chars)),
        }
    }
}

/// Backslash before every `\`, `_`, `:`, `<` and `>` in `text`. Slot names
/// are built from escaped parts, which keeps them one-to-one with slots.
pub(crate) fn escape_name(text: &str) -> Cow<'_, str> {
    if !text.contains(is_name_delimiter) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if is_name_delimiter(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

fn is_name_delimiter(c: char) -> bool {
    matches!(c, '\\' | '_' | ':' | '<' | '>')
}

/// Word n-grams for every `n` in `min_n..=max_n`, ascending `n` first and
/// left to right within each `n`.
pub fn word_grams(tokens: &[Token], min_n: usize, max_n: usize) -> impl Iterator<Item = Gram> + '_ {
    (min_n.max(1)..=max_n).flat_map(move |n| {
        tokens
            .windows(n)
            .map(|window| Gram::word(window.iter().map(Token::as_str)))
    })
}

/// Char-grams inside each token, never spanning two tokens. Same ordering as
/// [`word_grams`]: ascending `n`, then token order, then character position.
pub fn char_grams(tokens: &[Token], min_n: usize, max_n: usize) -> impl Iterator<Item = Gram> + '_ {
    (min_n.max(1)..=max_n).flat_map(move |n| {
        tokens
            .iter()
            .flat_map(move |token| char_windows(token.as_str(), n).map(Gram::char))
    })
}

/// Every run of exactly `n` consecutive characters in `text`.
fn char_windows(text: &str, n: usize) -> impl Iterator<Item = &str> {
    text.char_indices().map_while(move |(start, _)| {
        let rest = &text[start..];
        match rest.char_indices().nth(n) {
            Some((end, _)) => Some(&rest[..end]),
            None => (rest.chars().count() == n).then_some(rest),
        }
    })
}

/// Word and char gram settings applied to each text field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GramExtractor {
    ngram_range: Option<(usize, usize)>,
    chargram_range: Option<(usize, usize)>,
}

impl GramExtractor {
    #[must_use]
    pub fn new(ngram_range: Option<(usize, usize)>, chargram_range: Option<(usize, usize)>) -> Self {
        Self {
            ngram_range,
            chargram_range,
        }
    }

    pub(crate) fn from_params(params: &FeaturizerParams) -> Self {
        Self::new(params.ngram_range(), params.chargram_range())
    }

    /// Tokenize `text` and hand every gram to `visit`: word grams first,
    /// then char-grams, each in [`word_grams`] order. Returns the number of
    /// grams visited.
    pub fn extract(&self, tokenizer: &Tokenizer, text: &str, mut visit: impl FnMut(Gram)) -> usize {
        let mut emitted = 0;
        if let Some((min_n, max_n)) = self.ngram_range {
            let tokens = tokenizer.tokenize(text).collect::<Vec<_>>();
            for gram in word_grams(&tokens, min_n, max_n) {
                visit(gram);
                emitted += 1;
            }
        }
        if let Some((min_n, max_n)) = self.chargram_range {
            let terms = tokenizer.terms(text).collect::<Vec<_>>();
            for gram in char_grams(&terms, min_n, max_n) {
                visit(gram);
                emitted += 1;
            }
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        Tokenizer::default().tokenize(text).collect()
    }

    fn rendered(grams: impl Iterator<Item = Gram>) -> Vec<String> {
        grams.map(|g| g.to_string()).collect()
    }

    #[test]
    fn test_word_grams_order() {
        let toks = tokens("the cat sat");
        assert_eq!(
            rendered(word_grams(&toks, 1, 2)),
            vec!["the", "cat", "sat", "the_cat", "cat_sat"]
        );
    }

    #[test]
    fn test_word_grams_shorter_than_n() {
        let toks = tokens("alone");
        assert_eq!(rendered(word_grams(&toks, 2, 3)), Vec::<String>::new());
        assert_eq!(rendered(word_grams(&toks, 1, 3)), vec!["alone"]);
    }

    #[test]
    fn test_char_grams_two_on_ab() {
        let grams = char_grams(&tokens("ab"), 2, 2).collect::<Vec<_>>();
        assert_eq!(grams, vec![Gram::char("ab")]);

        assert_eq!(char_grams(&tokens("a"), 2, 2).count(), 0);
    }

    #[test]
    fn test_char_grams_stay_inside_tokens() {
        let toks = tokens("ab cd");
        assert_eq!(
            rendered(char_grams(&toks, 2, 3)),
            vec!["<ab>", "<cd>"]
        );
    }

    #[test]
    fn test_char_grams_multibyte() {
        let toks = Tokenizer::new(false, false, true).tokenize("žluť").collect::<Vec<_>>();
        assert_eq!(
            rendered(char_grams(&toks, 3, 3)),
            vec!["<žlu>", "<luť>"]
        );
    }

    #[test]
    fn test_char_grams_ascending_n_first() {
        let toks = tokens("abc");
        assert_eq!(
            rendered(char_grams(&toks, 1, 2)),
            vec!["<a>", "<b>", "<c>", "<ab>", "<bc>"]
        );
    }

    #[test]
    fn test_word_and_char_grams_distinct() {
        assert_ne!(Gram::word(["ab"]), Gram::char("ab"));
        assert_eq!(Gram::word(["the", "cat"]).order(), 2);
        assert_eq!(Gram::char("ž1").order(), 2);
    }

    #[test]
    fn test_display_escapes_delimiters() {
        assert_eq!(Gram::word(["a_b"]).to_string(), r"a\_b");
        assert_eq!(Gram::word(["a", "b"]).to_string(), "a_b");
        assert_eq!(Gram::word([r"a\", "b"]).to_string(), r"a\\_b");
        assert_eq!(Gram::word(["<ab>"]).to_string(), r"\<ab\>");
        assert_eq!(Gram::char("a_").to_string(), r"<a\_>");
        assert_eq!(Gram::char("ab").to_string(), "<ab>");
        assert_eq!(escape_name("x:y"), r"x\:y");
    }

    #[test]
    fn test_underscore_tokens_render_distinct_names() {
        let toks = tokens("a_b a b");
        let names = rendered(word_grams(&toks, 1, 2));
        assert_eq!(names, vec![r"a\_b", "a", "b", r"a\_b_a", "a_b"]);
        let unique = names.iter().collect::<std::collections::HashSet<_>>();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_extractor_word_then_char() {
        let extractor = GramExtractor::new(Some((1, 1)), Some((2, 2)));
        let mut seen = Vec::new();
        let count = extractor.extract(&Tokenizer::default(), "ab c", |g| seen.push(g.to_string()));
        assert_eq!(count, 3);
        assert_eq!(seen, vec!["ab", "c", "<ab>"]);
    }

    #[test]
    fn test_extractor_empty_text() {
        let extractor = GramExtractor::new(Some((1, 2)), Some((1, 3)));
        let count = extractor.extract(&Tokenizer::default(), "   ", |_| panic!("no grams expected"));
        assert_eq!(count, 0);
    }
}
