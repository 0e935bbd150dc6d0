use crate::types::FetchedArticle;
use tracing::debug;

/// Select at most `max_total` articles, giving each perspective an equal
/// share of the quota before filling what is left with the most recent
/// leftovers from any perspective.
///
/// Output order is every perspective's share (perspectives in order of first
/// appearance, newest first within each) followed by the fill. When
/// `max_total` is below the number of perspectives the shares are empty and
/// the whole selection comes from the recency-ordered fill.
pub fn balance(articles: &[FetchedArticle], max_total: usize) -> Vec<FetchedArticle> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (index, article) in articles.iter().enumerate() {
        match groups.iter_mut().find(|(tag, _)| *tag == article.perspective) {
            Some((_, members)) => members.push(index),
            None => groups.push((article.perspective.as_str(), vec![index])),
        }
    }

    if groups.is_empty() {
        return Vec::new();
    }

    let per_group_target = max_total / groups.len();
    let mut selected: Vec<usize> = Vec::with_capacity(max_total.min(articles.len()));

    for (tag, members) in &mut groups {
        // Stable sort: equal timestamps keep input order.
        members.sort_by(|a, b| articles[*b].published_date.cmp(&articles[*a].published_date));
        let take = members.len().min(per_group_target);
        debug!("Taking {} of {} articles for perspective '{}'", take, members.len(), tag);
        selected.extend(members.iter().take(take));
    }

    let remaining = max_total.saturating_sub(selected.len());
    let mut leftovers: Vec<usize> = (0..articles.len())
        .filter(|index| !selected.contains(index))
        .collect();
    leftovers.sort_by(|a, b| articles[*b].published_date.cmp(&articles[*a].published_date));
    selected.extend(leftovers.into_iter().take(remaining));

    selected.into_iter().map(|index| articles[index].clone()).collect()
}
