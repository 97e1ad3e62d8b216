//! File naming policy for stored card photos.
//!
//! - New cards: `{card_id}{ext}`
//! - Duplicates: `{card_id}_{yyyyMMddHHmmssSSS}{ext}`
//! - Save collisions: `{base}_{yyyyMMddHHmmssSSS}{ext}`, then
//!   `{base}_{yyyyMMddHHmmssSSS}_{n}{ext}` while that is taken too
//!
//! `ext` keeps its leading dot and original case; it is empty when the
//! original name has no dot.

use chrono::{DateTime, Utc};

/// Extension of `file_name`, including the dot (`".jpg"`), or `""`.
pub fn file_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[idx..],
        None => "",
    }
}

/// Millisecond-resolution timestamp used to disambiguate names.
pub fn millis_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S%3f").to_string()
}

/// Name for a newly registered card.
pub fn canonical_file_name(card_id: &str, extension: &str) -> String {
    format!("{}{}", card_id, extension)
}

/// Name for a photo of a card that is already registered.
pub fn duplicate_file_name(card_id: &str, extension: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}{}", card_id, millis_stamp(at), extension)
}

/// Name used when `file_name` is already taken in the asset store.
pub fn disambiguated_file_name(file_name: &str, at: DateTime<Utc>) -> String {
    let extension = file_extension(file_name);
    let base = &file_name[..file_name.len() - extension.len()];
    format!("{}_{}{}", base, millis_stamp(at), extension)
}

/// `file_name` with `_{n}` inserted before its extension.
pub fn numbered_file_name(file_name: &str, n: u32) -> String {
    let extension = file_extension(file_name);
    let base = &file_name[..file_name.len() - extension.len()];
    format!("{}_{}{}", base, n, extension)
}

/// MIME type for the extraction request, guessed from the name.
pub fn guess_mime_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
