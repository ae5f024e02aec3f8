//! Lexical idea-density estimators.
//!
//! Both estimators work from closed-class word lists and suffix rules rather
//! than a trained tagger/parser, so they are cheap and deterministic:
//!
//! - idea density (CPIDR-style): propositions are verbs, adjectives, adverbs,
//!   prepositions and conjunctions; density = propositions / words.
//! - dependency density (DEPID-style): every non-root token in a sentence has
//!   one head; dependencies whose relation is determiner, auxiliary, case
//!   marker or coordinator carry no proposition and are dropped;
//!   density = remaining dependencies / words.

use crate::textprep;
use sgnl_core::{Error, PropositionEstimator, Result};

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "my", "your", "his", "her", "its", "our",
    "their", "some", "any", "each", "every", "no", "either", "neither",
];

const PREPOSITIONS: &[&str] = &[
    "about", "above", "across", "after", "against", "along", "among", "around", "at", "before",
    "behind", "below", "beneath", "beside", "between", "beyond", "by", "despite", "down", "during",
    "except", "for", "from", "in", "inside", "into", "like", "near", "of", "off", "on", "onto",
    "out", "outside", "over", "past", "through", "throughout", "to", "toward", "towards", "under",
    "until", "up", "upon", "via", "with", "within", "without", "per",
];

const CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "nor", "so", "yet", "because", "although", "though", "while", "whereas",
    "if", "unless", "since", "when", "whenever", "where", "wherever", "whether", "once", "than",
];

const COORDINATORS: &[&str] = &["and", "or", "but", "nor"];

const AUXILIARIES: &[&str] = &[
    "am", "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "having", "do",
    "does", "did", "can", "could", "will", "would", "shall", "should", "may", "might", "must",
];

const ADVERBS: &[&str] = &[
    "not", "very", "also", "too", "often", "never", "always", "just", "still", "already", "quite",
    "rather", "here", "there", "now", "then", "soon", "again", "almost", "even", "well", "however",
    "therefore", "thus", "sometimes", "usually",
];

const ADJECTIVES: &[&str] = &[
    "good", "new", "first", "last", "long", "great", "little", "own", "other", "old", "right",
    "big", "high", "different", "small", "large", "next", "early", "young", "important", "few",
    "public", "bad", "same", "able", "simple", "complex", "fast", "slow", "many", "much", "more",
    "most", "less", "least", "main", "key", "true", "false",
];

const COMMON_VERBS: &[&str] = &[
    "is", "are", "was", "were", "be", "been", "being", "am", "has", "have", "had", "do", "does",
    "did", "make", "makes", "made", "get", "gets", "got", "go", "goes", "went", "take", "takes",
    "took", "see", "sees", "saw", "know", "knows", "knew", "think", "thinks", "thought", "give",
    "gives", "gave", "find", "finds", "found", "tell", "tells", "told", "become", "becomes",
    "became", "show", "shows", "showed", "shown", "leave", "leaves", "left", "feel", "feels",
    "felt", "put", "puts", "bring", "brings", "brought", "begin", "begins", "began", "keep",
    "keeps", "kept", "hold", "holds", "held", "write", "writes", "wrote", "written", "run", "runs",
    "ran", "provide", "provides", "use", "uses", "learn", "learns", "build", "builds", "built",
    "need", "needs", "allow", "allows", "help", "helps", "let", "lets", "mean", "means", "meant",
    "say", "says", "said", "work", "works", "call", "calls", "try", "tries", "ask", "asks", "seem",
    "seems", "include", "includes", "contain", "contains", "require", "requires", "return",
    "returns", "implement", "implements", "support", "supports", "describe", "describes",
];

const NOT_VERB_ING: &[&str] = &[
    "thing", "nothing", "something", "anything", "everything", "morning", "evening", "king",
    "string", "spring", "ceiling", "during",
];

const ADJ_SUFFIXES: &[&str] = &[
    "ous", "ful", "ive", "able", "ible", "al", "ical", "ic", "less", "ish", "ary",
];

const VERB_SUFFIXES: &[&str] = &["ize", "ise", "ify", "ized", "ised", "ified"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordClass {
    Determiner,
    Auxiliary,
    Preposition,
    Conjunction,
    Adverb,
    Adjective,
    Verb,
    Other,
}

fn has_suffix(word: &str, suffixes: &[&str], min_len: usize) -> bool {
    word.chars().count() >= min_len && suffixes.iter().any(|s| word.ends_with(s))
}

fn classify(word: &str) -> WordClass {
    if DETERMINERS.contains(&word) {
        return WordClass::Determiner;
    }
    if PREPOSITIONS.contains(&word) {
        return WordClass::Preposition;
    }
    if CONJUNCTIONS.contains(&word) {
        return WordClass::Conjunction;
    }
    if AUXILIARIES.contains(&word) {
        return WordClass::Auxiliary;
    }
    if ADVERBS.contains(&word) || has_suffix(word, &["ly"], 4) {
        return WordClass::Adverb;
    }
    if ADJECTIVES.contains(&word) || has_suffix(word, ADJ_SUFFIXES, 5) {
        return WordClass::Adjective;
    }
    if COMMON_VERBS.contains(&word)
        || has_suffix(word, VERB_SUFFIXES, 5)
        || has_suffix(word, &["ed"], 5)
        || (has_suffix(word, &["ing"], 5) && !NOT_VERB_ING.contains(&word))
    {
        return WordClass::Verb;
    }
    WordClass::Other
}

fn is_proposition(class: WordClass) -> bool {
    matches!(
        class,
        WordClass::Verb
            | WordClass::Auxiliary
            | WordClass::Adjective
            | WordClass::Adverb
            | WordClass::Preposition
            | WordClass::Conjunction
    )
}

/// Idea density and dependency density from word classes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalPropositionEstimator;

impl LexicalPropositionEstimator {
    pub fn new() -> Self {
        Self
    }
}

impl PropositionEstimator for LexicalPropositionEstimator {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn idea_density(&self, text: &str) -> Result<f64> {
        let words = textprep::words(text);
        if words.is_empty() {
            return Err(Error::Estimator("no words to estimate".to_string()));
        }
        let propositions = words
            .iter()
            .filter(|w| is_proposition(classify(w)))
            .count();
        Ok(propositions as f64 / words.len() as f64)
    }

    fn dependency_density(&self, text: &str) -> Result<f64> {
        let mut total_words = 0usize;
        let mut dependencies = 0usize;
        for sentence in textprep::sentences(text) {
            let words = textprep::words(&sentence);
            if words.is_empty() {
                continue;
            }
            total_words += words.len();
            let carrying = words
                .iter()
                .filter(|w| {
                    let class = classify(w);
                    let coordinator = class == WordClass::Conjunction
                        && COORDINATORS.contains(&w.as_str());
                    !matches!(
                        class,
                        WordClass::Determiner | WordClass::Auxiliary | WordClass::Preposition
                    ) && !coordinator
                })
                .count();
            // One token per sentence is the root and has no head.
            dependencies += carrying.saturating_sub(1);
        }
        if total_words == 0 {
            return Err(Error::Estimator("no words to estimate".to_string()));
        }
        Ok(dependencies as f64 / total_words as f64)
    }
}
