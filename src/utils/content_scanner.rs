use crate::error::ScanError;
use encoding_rs::Encoding;
use std::fs;
use std::path::Path;
use tracing::trace;

/// Label of the code page tried first when a file carries no byte order mark.
pub const DEFAULT_ENCODING_LABEL: &str = "shift_jis";

/// Code page tried first when a file carries no byte order mark
pub fn default_encoding() -> &'static Encoding {
    encoding_rs::SHIFT_JIS
}

/// Check whether the text of `path` contains `tag` as a literal substring,
/// decoding with the default code page.
pub fn contains_tag<P: AsRef<Path>>(path: P, tag: &str) -> bool {
    contains_tag_with(path, tag, default_encoding())
}

/// Check whether the text of `path` contains `tag` as a literal substring.
///
/// The file is read whole and decoded with `encoding` first, unless a byte
/// order mark names another Unicode encoding. If that decode fails it is
/// retried once as strict UTF-8. Any I/O error or a second decode failure
/// reports `false`; nothing is propagated.
pub fn contains_tag_with<P: AsRef<Path>>(path: P, tag: &str, encoding: &'static Encoding) -> bool {
    let path = path.as_ref();

    match read_text(path, encoding) {
        Ok(text) => text.contains(tag),
        Err(e) => {
            trace!("Treating {:?} as untagged: {}", path, e);
            false
        }
    }
}

fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String, ScanError> {
    let bytes = fs::read(path)?;

    match decode_default(&bytes, encoding) {
        Err(ScanError::Decode { encoding }) => {
            trace!("{:?} is not {}, retrying as UTF-8", path, encoding);
            decode_strict(&bytes, encoding_rs::UTF_8)
        }
        decoded => decoded,
    }
}

/// BOM-aware decode: the encoding named by a byte order mark wins, otherwise
/// `encoding` is used. No replacement characters are substituted.
fn decode_default(bytes: &[u8], encoding: &'static Encoding) -> Result<String, ScanError> {
    match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_length)) => decode_strict(&bytes[bom_length..], bom_encoding),
        None => decode_strict(bytes, encoding),
    }
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Result<String, ScanError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or(ScanError::Decode {
            encoding: encoding.name(),
        })
}
