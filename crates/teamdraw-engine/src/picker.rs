//! Weighted outcome selection.

/// Walk `items` in order accumulating weight and return the first payload
/// whose cumulative weight reaches `sample`.
///
/// When rounding leaves `sample` above every cumulative sum, the last payload
/// is returned. `None` only for an empty input.
pub fn pick<I, T>(items: I, sample: f64) -> Option<T>
where
    I: IntoIterator<Item = (f64, T)>,
{
    let mut cumulative = 0.0;
    let mut last = None;

    for (weight, payload) in items {
        cumulative += weight;
        if sample <= cumulative {
            return Some(payload);
        }
        last = Some(payload);
    }

    last
}
