use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare<K> {
    pub category: K,
    pub count: usize,
    /// Share of the whole collection, rounded to one decimal.
    pub percentage: f64,
}

/// `count / total` as a percentage rounded to one decimal. An empty
/// collection yields `0.0`.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 * 100.0 / total as f64;
    (raw * 10.0).round() / 10.0
}

/// Tallies `items` over a fixed list of categories, keeping zero-count
/// categories so every dashboard row is present.
pub fn count_by<T, K, F>(items: &[T], categories: &[K], key: F) -> Vec<CategoryShare<K>>
where
    K: Copy + PartialEq,
    F: Fn(&T) -> K,
{
    let total = items.len();
    categories
        .iter()
        .map(|category| {
            let count = items.iter().filter(|item| key(item) == *category).count();
            CategoryShare {
                category: *category,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect()
}
