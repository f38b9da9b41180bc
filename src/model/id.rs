use std::path::Path;

use sha2::{Digest, Sha256};

use super::item::ItemKind;

/// First 8 hex characters of the SHA-256 of `text`.
pub fn text_hash8(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..4])
}

/// Content-derived item ID: `{kind}_{indentation}_{headerLevel}_{hash8}_{position}`.
///
/// Identical lines at the same structural location always produce the same
/// ID. The position component shifts whenever a line is inserted or removed
/// above, which is what reconciliation recovers from.
pub fn stable_id(
    kind: ItemKind,
    text: &str,
    header_level: usize,
    indentation: usize,
    position: usize,
) -> String {
    format!(
        "{}_{}_{}_{}_{}",
        kind.as_str(),
        indentation,
        header_level,
        text_hash8(text),
        position
    )
}

/// Storage key for a tracked file: full SHA-256 hex of its absolute path.
///
/// Keyed by path, so a moved or renamed file starts with no saved progress.
pub fn path_identity(path: &Path) -> String {
    hex::encode(Sha256::digest(path.to_string_lossy().as_bytes()))
}
