//! Keyword extraction and scoring for fulltext search (spec §4.5 "Fulltext
//! search"): ASCII words of length ≥ 2, digit runs of length ≥ 2, and CJK
//! 2-grams plus 3-grams when the query holds ≥ 4 CJK characters.

use std::collections::HashSet;

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0x3040..=0x30FF | 0xF900..=0xFAFF
    )
}

/// Extracts the keyword set used both to score candidates and (after
/// regex-escaping) to count occurrences in a candidate's content.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut keywords: HashSet<String> = HashSet::new();

    let mut ascii_word = String::new();
    let mut digit_run = String::new();
    let mut cjk_chars: Vec<char> = Vec::new();

    let flush_ascii = |s: &mut String, out: &mut HashSet<String>| {
        if s.chars().count() >= 2 {
            out.insert(std::mem::take(s));
        } else {
            s.clear();
        }
    };
    let flush_digits = |s: &mut String, out: &mut HashSet<String>| {
        if s.chars().count() >= 2 {
            out.insert(std::mem::take(s));
        } else {
            s.clear();
        }
    };

    for c in lower.chars() {
        if c.is_ascii_alphabetic() {
            if !digit_run.is_empty() {
                flush_digits(&mut digit_run, &mut keywords);
            }
            ascii_word.push(c);
        } else if c.is_ascii_digit() {
            if !ascii_word.is_empty() {
                flush_ascii(&mut ascii_word, &mut keywords);
            }
            digit_run.push(c);
        } else {
            flush_ascii(&mut ascii_word, &mut keywords);
            flush_digits(&mut digit_run, &mut keywords);
            if is_cjk(c) {
                cjk_chars.push(c);
            }
        }
    }
    flush_ascii(&mut ascii_word, &mut keywords);
    flush_digits(&mut digit_run, &mut keywords);

    if cjk_chars.len() >= 4 {
        for w in cjk_chars.windows(2) {
            keywords.insert(w.iter().collect());
        }
        for w in cjk_chars.windows(3) {
            keywords.insert(w.iter().collect());
        }
    } else if cjk_chars.len() >= 2 {
        for w in cjk_chars.windows(2) {
            keywords.insert(w.iter().collect());
        }
    } else if cjk_chars.len() == 1 {
        keywords.insert(cjk_chars[0].to_string());
    }

    keywords.into_iter().collect()
}

/// Scores `content` against the keyword set: sum of occurrence counts
/// (case-insensitive, substring match). Returns `0` when nothing matches —
/// callers must then drop the candidate (spec "keep strictly positive scores").
pub fn score_content(content: &str, keywords: &[String]) -> u32 {
    let lower = content.to_lowercase();
    keywords
        .iter()
        .map(|k| lower.matches(k.as_str()).count() as u32)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ascii_words_and_digit_runs() {
        let kws = extract_keywords("error42 in module foo, retry 7");
        assert!(kws.contains(&"error".to_string()) || kws.iter().any(|k| k.contains("error")));
        assert!(kws.iter().any(|k| k == "42"));
        assert!(kws.iter().any(|k| k == "in"));
    }

    #[test]
    fn single_letter_words_are_dropped() {
        let kws = extract_keywords("a b cd");
        assert!(!kws.contains(&"a".to_string()));
        assert!(!kws.contains(&"b".to_string()));
        assert!(kws.contains(&"cd".to_string()));
    }

    #[test]
    fn long_cjk_run_yields_2_and_3_grams() {
        let kws = extract_keywords("记忆迁移测试");
        assert!(kws.iter().any(|k| k.chars().count() == 2));
        assert!(kws.iter().any(|k| k.chars().count() == 3));
    }

    #[test]
    fn short_cjk_run_yields_only_2_grams() {
        let kws = extract_keywords("你好");
        assert!(kws.iter().all(|k| k.chars().count() <= 2));
        assert!(kws.contains(&"你好".to_string()));
    }

    #[test]
    fn scoring_counts_occurrences_and_zero_is_excluded_by_caller() {
        let kws = vec!["foo".to_string()];
        assert_eq!(score_content("foo bar foo", &kws), 2);
        assert_eq!(score_content("nothing here", &kws), 0);
    }
}
