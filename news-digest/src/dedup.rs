//! First-seen-wins removal of duplicate and near-duplicate articles.
//!
//! Every candidate is compared against every article already kept, so the
//! cost is quadratic in the input size. Inputs are tens of articles per run;
//! anything replacing the pairwise scan has to keep the exact same output.

use crate::similarity::{title_tokens, token_set_similarity};
use crate::types::FetchedArticle;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    pub kept: Vec<FetchedArticle>,
    pub removed: usize,
}

/// Keep articles in input order, dropping any whose URL equals a kept
/// article's URL or whose title scores strictly above `threshold` against a
/// kept article's title.
pub fn dedupe(articles: Vec<FetchedArticle>, threshold: f64) -> DedupOutcome {
    let mut kept: Vec<FetchedArticle> = Vec::with_capacity(articles.len());
    let mut kept_tokens: Vec<HashSet<String>> = Vec::with_capacity(articles.len());
    let mut removed = 0;

    for article in articles {
        let tokens = title_tokens(&article.title);
        let duplicate_of = kept.iter().zip(&kept_tokens).position(|(existing, existing_tokens)| {
            existing.url == article.url
                || token_set_similarity(existing_tokens, &tokens) > threshold
        });

        match duplicate_of {
            Some(index) => {
                debug!(
                    "Dropping duplicate '{}' (matches '{}')",
                    article.title, kept[index].title
                );
                removed += 1;
            }
            None => {
                kept.push(article);
                kept_tokens.push(tokens);
            }
        }
    }

    if removed > 0 {
        info!("Removed {} duplicate entries", removed);
    }

    DedupOutcome { kept, removed }
}
