use std::collections::HashSet;

/// Lower-cased whitespace tokens longer than two characters.
pub fn title_tokens(title: &str) -> HashSet<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Jaccard overlap of two token sets. An empty union scores 0.0.
pub fn token_set_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Symmetric title similarity in `[0, 1]`.
pub fn score(title_a: &str, title_b: &str) -> f64 {
    token_set_similarity(&title_tokens(title_a), &title_tokens(title_b))
}
