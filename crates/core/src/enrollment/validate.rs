//! Pre-flight photo validation.

use super::types::{PhotoItem, RejectedPhoto, RejectionReason};

/// Check a single photo against the media type and size rules.
pub fn check_photo(photo: &PhotoItem, max_file_bytes: u64) -> Result<(), RejectionReason> {
    if !is_image_type(photo.media_type()) {
        return Err(RejectionReason::NotAnImage);
    }
    if photo.size_bytes() > max_file_bytes {
        return Err(RejectionReason::TooLarge {
            size_bytes: photo.size_bytes(),
            limit_bytes: max_file_bytes,
        });
    }
    Ok(())
}

/// Split `files` into accepted photos (input order kept) and rejections.
pub fn validate_photos(
    files: Vec<PhotoItem>,
    max_file_bytes: u64,
) -> (Vec<PhotoItem>, Vec<RejectedPhoto>) {
    let mut accepted = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for photo in files {
        match check_photo(&photo, max_file_bytes) {
            Ok(()) => accepted.push(photo),
            Err(reason) => rejected.push(RejectedPhoto {
                file_name: photo.file_name().to_string(),
                reason,
            }),
        }
    }

    (accepted, rejected)
}

fn is_image_type(media_type: &str) -> bool {
    let media_type = media_type.trim().to_ascii_lowercase();
    match media_type.split_once('/') {
        Some((kind, subtype)) => kind == "image" && !subtype.is_empty(),
        None => false,
    }
}
