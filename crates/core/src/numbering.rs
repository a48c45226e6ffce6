//! Photo marker numbering
//!
//! Photo markers are shown as small numeric labels. A new label takes the
//! smallest positive number not used by any photo marker anywhere in the
//! document, so numbers never collide across pages.

/// Label number of a photo marker
pub type PhotoNumber = u16;

/// Largest label number a photo marker can carry
pub const MAX_PHOTO_NUMBER: PhotoNumber = 32767;

/// Every number in `1..=MAX_PHOTO_NUMBER` is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("all {MAX_PHOTO_NUMBER} photo marker numbers are in use")]
pub struct AllocatorExhausted;

/// Parse photo marker content into a label number
///
/// Returns `None` unless the text is a plain integer in `1..=MAX_PHOTO_NUMBER`.
pub fn parse_photo_number(content: &str) -> Option<PhotoNumber> {
    let trimmed = content.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match trimmed.parse::<u32>() {
        Ok(n) if (1..=MAX_PHOTO_NUMBER as u32).contains(&n) => Some(n as PhotoNumber),
        _ => None,
    }
}

/// Smallest positive number not in `existing`
///
/// The result does not depend on the iteration order of `existing`; values
/// outside the valid range are ignored.
pub fn allocate<I>(existing: I) -> Result<PhotoNumber, AllocatorExhausted>
where
    I: IntoIterator<Item = PhotoNumber>,
{
    // Slot 0 is unused so the index is the number itself.
    let mut taken = vec![false; MAX_PHOTO_NUMBER as usize + 1];
    for n in existing {
        if (1..=MAX_PHOTO_NUMBER).contains(&n) {
            taken[n as usize] = true;
        }
    }

    taken
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, used)| !**used)
        .map(|(n, _)| n as PhotoNumber)
        .ok_or(AllocatorExhausted)
}

/// Like [`allocate`], taking raw photo marker contents
///
/// Contents that don't parse as a label number occupy no slot.
pub fn allocate_from_contents<'a, I>(contents: I) -> Result<PhotoNumber, AllocatorExhausted>
where
    I: IntoIterator<Item = &'a str>,
{
    allocate(contents.into_iter().filter_map(parse_photo_number))
}
