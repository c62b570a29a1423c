use std::cmp::Ordering;

pub mod metrics;
pub mod validation;

/// Indices of `scores` ordered by descending score, NaN last. The sort is
/// stable, so equal scores keep their original relative order.
pub fn rank_descending(scores: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| compare_desc(scores[a], scores[b]));
    indices
}

pub fn top_k_indices(scores: &[f64], k: usize, skip: impl Fn(usize) -> bool) -> Vec<usize> {
    rank_descending(scores)
        .into_iter()
        .filter(|&i| !skip(i))
        .take(k)
        .collect()
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Escapes text for interpolation into HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
