use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSnapshot {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("snapshot is not valid {encoding}")]
    Malformed { encoding: String },
}

/// Decodes a saved page snapshot: BOM, then a declared charset, then detection.
pub fn decode_snapshot(bytes: &[u8], declared_charset: Option<&str>) -> Result<DecodedSnapshot, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    let declared = declared_charset
        .map(str::to_string)
        .or_else(|| meta_charset(bytes))
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    if let Some(encoding) = declared {
        return decode_with(bytes, encoding);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

/// `<meta charset=...>` within the first kilobyte, read as ASCII.
fn meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let start = head.find("charset=")? + "charset=".len();
    let value: String = head[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    (!value.is_empty()).then_some(value)
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedSnapshot, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(DecodedSnapshot {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}
