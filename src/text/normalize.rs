//! Title normalization and tokenization
//!
//! Titles arrive in Latin, Kanji, Kana and Chinese scripts, wrapped in
//! release-group brackets and season markers. Everything in this module
//! works on the normalized form produced by [`normalize`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[.*?\]|\(.*?\)|\{.*?\}|<.*?>").expect("valid bracket regex"));

static SEASON_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(season|part|cour)\s*\d+").expect("valid season regex"));

static RELEASE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(s\d+\s*e\d+|s\d+|ova|oad|sp|special|movie|tv)\b").expect("valid release regex")
});

static ROMAN_NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(ii|iii|iv|v|vi|vii|viii|ix|x)\b").expect("valid numeral regex"));

static NON_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\w\x{3040}-\x{30ff}\x{4e00}-\x{9fff}]+").expect("valid separator regex")
});

/// Upper bound on normalization passes while looking for a fixed point.
const MAX_PASSES: usize = 4;

/// True for Hiragana, Katakana and CJK Unified Ideographs.
pub fn is_cjk_char(c: char) -> bool {
    matches!(c as u32, 0x3040..=0x309F | 0x30A0..=0x30FF | 0x4E00..=0x9FFF)
}

/// Whether any character of `text` is Hiragana, Katakana or a CJK ideograph.
pub fn has_cjk(text: &str) -> bool {
    text.chars().any(is_cjk_char)
}

/// Compatibility fold plus lowercase. NFKC turns numeral glyphs such as
/// `Ⅱ` into Latin letters, which the numeral pass then strips.
fn fold(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

fn normalize_once(text: &str) -> String {
    let t = fold(text);
    let t = BRACKETED.replace_all(&t, " ");
    let t = SEASON_MARKER.replace_all(&t, " ");
    let t = RELEASE_TOKEN.replace_all(&t, " ");
    let t = ROMAN_NUMERAL.replace_all(&t, " ");
    let t = NON_WORD.replace_all(&t, " ");
    t.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize a title for comparison.
///
/// Idempotent: stripping a token can expose another one, so passes are
/// repeated until the output stops changing.
pub fn normalize(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }
    let mut current = normalize_once(title);
    for _ in 1..MAX_PASSES {
        let next = normalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Split a normalized title into tokens.
///
/// A single all-CJK token longer than two characters is re-tokenized into
/// overlapping two-character shingles.
pub fn tokenize(title: &str) -> Vec<String> {
    tokenize_normalized(&normalize(title))
}

/// [`tokenize`] for text that is already normalized.
pub fn tokenize_normalized(normalized: &str) -> Vec<String> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if let [only] = tokens.as_slice() {
        let chars: Vec<char> = only.chars().collect();
        if chars.len() > 2 && chars.iter().all(|c| is_cjk_char(*c)) {
            return chars.windows(2).map(|w| w.iter().collect()).collect();
        }
    }
    tokens.into_iter().map(str::to_string).collect()
}

/// Jaccard index of the two titles' token sets.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    token_jaccard(&tokenize(a), &tokenize(b))
}

pub(crate) fn token_jaccard(a: &[String], b: &[String]) -> f64 {
    let sa: HashSet<&String> = a.iter().collect();
    let sb: HashSet<&String> = b.iter().collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let inter = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    inter as f64 / union as f64
}

/// Whether every token of `short_title` appears in `long_title`.
pub fn contains_all_tokens(short_title: &str, long_title: &str) -> bool {
    let short: HashSet<String> = tokenize(short_title).into_iter().collect();
    let long: HashSet<String> = tokenize(long_title).into_iter().collect();
    !short.is_empty() && !long.is_empty() && short.is_subset(&long)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_strips_brackets_and_season_markers() {
        assert_eq!(normalize("Shingeki no Kyojin Season 2"), "shingeki no kyojin");
        assert_eq!(normalize("[SubsPlease] Re:Zero (TV)"), "re zero");
        assert_eq!(normalize("Kaguya-sama {BD} <1080p> Part 2"), "kaguya sama");
        assert_eq!(normalize("Oshi no Ko S2E03"), "oshi no ko");
        assert_eq!(normalize("Mob Psycho 100 III"), "mob psycho 100");
    }

    #[test]
    fn test_full_width_and_numeral_glyphs() {
        assert_eq!(normalize("Ｆｕｌｌ Ｍｅｔａｌ"), "full metal");
        assert_eq!(normalize("Re:Zero Ⅱ"), "re zero");
        assert_eq!(normalize("Re:Zero Ⅱ"), normalize("Re:Zero II"));
        assert_eq!(normalize("Mob Psycho 100 ⅲ"), normalize("Mob Psycho 100 III"));
        assert_eq!(normalize("ＳＰＹ×ＦＡＭＩＬＹ"), "spy family");
    }

    #[test]
    fn test_release_tokens_removed_only_as_words() {
        assert_eq!(normalize("Kimi no Na wa Movie"), "kimi no na wa");
        assert_eq!(normalize("Spirited Away"), "spirited away");
        assert_eq!(normalize("Tvtropes"), "tvtropes");
    }

    #[test]
    fn test_cjk_preserved() {
        assert_eq!(normalize("葬送のフリーレン"), "葬送のフリーレン");
        assert_eq!(normalize("進撃の巨人 Season 3"), "進撃の巨人");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "[Group] Kaguya-sama wa Kokurasetai (2019) Season 2",
            "Re:Zero kara Hajimeru Isekai Seikatsu Ⅱ",
            "x.x ii-iii",
            "sea-tv-son 1",
            "ＳＰＹ×ＦＡＭＩＬＹ Part 2",
            "【推しの子】 第2期",
            "Fate/stay night [Unlimited Blade Works] (TV) S01E02",
            "(((nested)))) ]] leftovers",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_tokenize_latin() {
        assert_eq!(tokenize("Sousou no Frieren"), vec!["sousou", "no", "frieren"]);
    }

    #[test]
    fn test_tokenize_cjk_shingles() {
        assert_eq!(tokenize("鬼滅の刃"), vec!["鬼滅", "滅の", "の刃"]);
        // Two characters stay a single token
        assert_eq!(tokenize("銀魂"), vec!["銀魂"]);
        // Mixed-script single tokens are not shingled
        assert_eq!(tokenize("k-on"), vec!["k", "on"]);
    }

    #[test]
    fn test_has_cjk() {
        assert!(has_cjk("葬送のフリーレン"));
        assert!(has_cjk("ひらがな"));
        assert!(has_cjk("カタカナ"));
        assert!(has_cjk("Frieren 葬送"));
        assert!(!has_cjk("Frieren"));
        assert!(!has_cjk("한국어"));
    }

    #[test]
    fn test_token_overlap_and_containment() {
        assert_eq!(token_overlap("Sousou no Frieren", "Frieren Sousou no"), 1.0);
        assert_eq!(token_overlap("", "Frieren"), 0.0);
        assert!(contains_all_tokens("Frieren", "Sousou no Frieren"));
        assert!(!contains_all_tokens("Sousou no Frieren", "Frieren"));
    }
}
