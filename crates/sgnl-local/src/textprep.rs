//! Minimal, deterministic tokenization helpers shared by the lexical estimators.
//!
//! Nothing here tries to be linguistically complete; the estimators only need
//! stable word/sentence boundaries and a syllable count that agrees with the
//! usual readability-formula conventions.

/// Split text into word tokens.
///
/// A word is a maximal run of alphanumeric characters, with inner apostrophes
/// and hyphens kept ("don't", "state-of-the-art"). Tokens are lowercased.
pub fn words(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                cur.push(lc);
            }
            continue;
        }
        let joiner = matches!(ch, '\'' | '’' | '-');
        let next_is_word = chars.peek().is_some_and(|c| c.is_alphanumeric());
        if joiner && !cur.is_empty() && next_is_word {
            cur.push(if ch == '’' { '\'' } else { ch });
            continue;
        }
        if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Split text into sentences on terminal punctuation and blank lines.
///
/// Returned sentences are trimmed and never empty. Text without terminal
/// punctuation is one sentence.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut prev_newline = false;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\n' {
            if prev_newline {
                flush_sentence(&mut cur, &mut out);
            }
            prev_newline = true;
            cur.push(' ');
            continue;
        }
        if !ch.is_whitespace() {
            prev_newline = false;
        }
        cur.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            // Keep runs like "?!" or "..." together; "3.14" is not a boundary.
            while let Some(&next) = chars.peek() {
                if matches!(next, '.' | '!' | '?' | '"' | '\'' | ')') {
                    cur.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            let boundary = chars.peek().map_or(true, |c| c.is_whitespace());
            if boundary {
                flush_sentence(&mut cur, &mut out);
            }
        }
    }
    flush_sentence(&mut cur, &mut out);
    out
}

fn flush_sentence(cur: &mut String, out: &mut Vec<String>) {
    let s = cur.trim();
    if words(s).is_empty() {
        cur.clear();
        return;
    }
    out.push(s.to_string());
    cur.clear();
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Estimated syllable count of a single (lowercase) word; at least 1 for any
/// word containing a letter, 0 otherwise.
pub fn syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect();
    if letters.is_empty() {
        return 0;
    }
    if letters.len() <= 3 {
        return 1;
    }

    let mut count = 0usize;
    let mut prev_vowel = false;
    for &c in &letters {
        let v = is_vowel(c);
        if v && !prev_vowel {
            count += 1;
        }
        prev_vowel = v;
    }

    let n = letters.len();
    // Silent trailing "e" ("make"), but not "-le" after a consonant ("table").
    if letters[n - 1] == 'e' && !(letters[n - 2] == 'l' && !is_vowel(letters[n - 3])) {
        count = count.saturating_sub(1);
    }
    // "-ed" is usually not its own syllable unless preceded by t/d ("wanted").
    if n > 3
        && letters[n - 2] == 'e'
        && letters[n - 1] == 'd'
        && !matches!(letters[n - 3], 't' | 'd')
        && !is_vowel(letters[n - 3])
    {
        count = count.saturating_sub(1);
    }
    // "-es" after most consonants is silent ("makes") but not after sibilants.
    if n > 3
        && letters[n - 2] == 'e'
        && letters[n - 1] == 's'
        && !matches!(letters[n - 3], 's' | 'x' | 'z' | 'c' | 'g' | 'h')
        && !is_vowel(letters[n - 3])
    {
        count = count.saturating_sub(1);
    }
    count.max(1)
}

/// Count of alphabetic characters (what Coleman–Liau calls letters).
pub fn letter_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphabetic()).count()
}

/// Count of alphanumeric characters across word tokens (what ARI calls characters).
pub fn word_char_count(words: &[String]) -> usize {
    words
        .iter()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).count())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_keep_inner_apostrophes_and_hyphens() {
        assert_eq!(
            words("Don't stop: state-of-the-art, 42 times!"),
            vec!["don't", "stop", "state-of-the-art", "42", "times"]
        );
        assert!(words("  -- ... ").is_empty());
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let s = sentences("First one. Second one?! Third... and pi is 3.14 here");
        assert_eq!(s.len(), 4);
        assert_eq!(s[0], "First one.");
        assert_eq!(s[1], "Second one?!");
        assert_eq!(s[2], "Third...");
        assert!(s[3].contains("3.14"));
    }

    #[test]
    fn sentences_split_on_blank_lines() {
        let s = sentences("Heading without period\n\nBody text follows here");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn sentences_of_empty_text_is_empty() {
        assert!(sentences("").is_empty());
        assert!(sentences("  . ! ").is_empty());
    }

    #[test]
    fn syllable_estimates_are_reasonable() {
        assert_eq!(syllables("the"), 1);
        assert_eq!(syllables("make"), 1);
        assert_eq!(syllables("table"), 2);
        assert_eq!(syllables("wanted"), 2);
        assert_eq!(syllables("jumped"), 1);
        assert_eq!(syllables("computer"), 3);
        assert_eq!(syllables("information"), 4);
        assert_eq!(syllables("42"), 0);
    }
}
