//! Shared utility functions

// ============================================================================
// Typo suggestions for unknown names
// ============================================================================

/// Levenshtein edit distance between two strings, two-row variant.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Closest candidate within `threshold` edits, ties going to the first seen.
pub fn find_similar_name<'a, I>(name: &str, candidates: I, threshold: usize) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best_match: Option<&str> = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        if candidate == name {
            continue;
        }
        let distance = levenshtein_distance(name, candidate);
        if distance < best_distance && distance <= threshold {
            best_distance = distance;
            best_match = Some(candidate);
        }
    }

    best_match
}

/// Edit budget for a name: short names tolerate one typo, longer ones two.
pub fn suggestion_threshold(name: &str) -> usize {
    if name.chars().count() <= 3 { 1 } else { 2 }
}

/// Format a "did you mean" suggestion hint for an unknown name.
pub fn format_suggestion_hint(suggestion: Option<&str>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean `{name}`?)"),
        None => String::new(),
    }
}
