/// Progress caption for the item at `index` (1-based), or `None`.
///
/// The first item and every `every`-th after it are captioned.
pub fn caption_for(index: usize, total: usize, every: usize) -> Option<String> {
    let every = every.max(1);
    (index % every == 1 % every).then(|| format!("{index}/{total}"))
}
