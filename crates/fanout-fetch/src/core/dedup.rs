use std::collections::HashSet;

/// Collapse `(key, source)` pairs to one entry per key.
///
/// The first source seen for a key wins; later duplicates are dropped no
/// matter what source they carry. Surviving entries keep their arrival order.
pub fn dedup_by_key<I>(entries: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|(key, _)| seen.insert(key.clone()))
        .collect()
}
