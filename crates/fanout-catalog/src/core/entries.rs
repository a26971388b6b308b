use crate::data::CatalogEntry;
use crate::data::model::{Image, Track};

/// The biggest image by pixel area; the first one when sizes are missing.
pub(crate) fn largest_image(images: &[Image]) -> Option<&Image> {
    let area = |image: &Image| u64::from(image.width.unwrap_or(0)) * u64::from(image.height.unwrap_or(0));
    let first = images.first()?;
    Some(
        images
            .iter()
            .fold(first, |best, image| if area(image) > area(best) { image } else { best }),
    )
}

/// Flatten tracks into cover entries, in track order.
///
/// Tracks without a cover are skipped. Tracks without an id get
/// `unknown_<n>`, `n` being the number of entries produced so far.
pub(crate) fn entries_from_tracks<'a>(tracks: impl IntoIterator<Item = &'a Track>) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    for track in tracks {
        let Some(image) = largest_image(&track.album.images) else {
            continue;
        };
        let entry = match track.id.as_deref() {
            Some(id) if !id.is_empty() => CatalogEntry::track(image.url.clone(), id),
            _ => CatalogEntry::new(image.url.clone(), format!("unknown_{}", entries.len())),
        };
        entries.push(entry);
    }
    entries
}
