//! `PlantUML` text encoding for server URLs.
//!
//! The source is compressed as a raw deflate stream (no zlib header or
//! checksum) and the bytes are written in groups of three as four symbols of
//! the `PlantUML` alphabet `0-9A-Za-z-_`. A trailing partial group is padded
//! with zero bytes.

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

/// Encode diagram source for a `PlantUML` server URL.
#[must_use]
pub fn encode_plantuml(source: &str) -> String {
    encode_bytes(&deflate(source.as_bytes()))
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::with_capacity(data.len()), Compression::best());
    // Writes into a Vec cannot fail
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

/// Map bytes onto the 64-symbol alphabet, three bytes to four symbols.
#[must_use]
pub fn encode_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk[0];
        let b2 = chunk.get(1).copied().unwrap_or(0);
        let b3 = chunk.get(2).copied().unwrap_or(0);
        for index in [
            b1 >> 2,
            ((b1 & 0x3) << 4) | (b2 >> 4),
            ((b2 & 0xF) << 2) | (b3 >> 6),
            b3 & 0x3F,
        ] {
            out.push(char::from(ALPHABET[usize::from(index)]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;
    use std::io::Read;

    fn decode_bytes(text: &str) -> Vec<u8> {
        let symbols: Vec<u8> = text
            .bytes()
            .map(|c| ALPHABET.iter().position(|a| *a == c).unwrap() as u8)
            .collect();
        let mut out = Vec::new();
        for group in symbols.chunks(4) {
            out.push((group[0] << 2) | (group[1] >> 4));
            out.push(((group[1] & 0xF) << 4) | (group[2] >> 2));
            out.push(((group[2] & 0x3) << 6) | group[3]);
        }
        out
    }

    #[test]
    fn test_encode_bytes_golden() {
        assert_eq!(encode_bytes(b"Hello"), "I6LiR6y0");
        assert_eq!(encode_bytes(b"abc"), "OM9Z");
        assert_eq!(encode_bytes(&[0, 0, 0]), "0000");
        assert_eq!(encode_bytes(&[0xFF, 0xFF, 0xFF]), "____");
        assert_eq!(encode_bytes(b""), "");
    }

    #[test]
    fn test_encode_is_url_safe_and_stable() {
        let source = "@startuml\nAlice -> Bob: hello\n@enduml";
        let first = encode_plantuml(source);
        let second = encode_plantuml(source);

        assert_eq!(first, second);
        assert!(
            first
                .bytes()
                .all(|c| c.is_ascii_alphanumeric() || c == b'-' || c == b'_')
        );
        assert_eq!(first.len() % 4, 0);
    }

    #[test]
    fn test_encode_plantuml_golden() {
        // Short sources do not shrink under deflate and are sent as one
        // stored block: header 0x01, length 37 and its complement, raw bytes
        assert_eq!(
            encode_plantuml("@startuml\nAlice -> Bob: hello\n@enduml"),
            "0IK0slz0StHXSdHrRMmAGMnfOsKWBJuWGczYEY1ePMniRmf0PMvaTMri"
        );
    }

    #[test]
    fn test_encode_compresses_repetitive_source() {
        let body = "Alice -> Bob: hello\n".repeat(20);
        let source = format!("@startuml\n{body}@enduml");

        let encoded = encode_plantuml(&source);

        // Stored bytes alone would need four symbols per three input bytes
        assert!(encoded.len() < source.len() / 2, "{}", encoded.len());
    }

    #[test]
    fn test_encode_roundtrips_through_inflate() {
        let source = "@startuml\nAlice -> Bob: hello\nBob --> Alice: 你好\n@enduml";
        let bytes = decode_bytes(&encode_plantuml(source));

        let mut decoded = String::new();
        DeflateDecoder::new(bytes.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, source);
    }

    #[test]
    fn test_decoder_reads_reference_encoding() {
        // Reference output of zlib raw deflate at level 9
        let reference = "SoWkIImgAStDuNBCoKnELT2rKt3AJx9Io4ZDoSddSaZDIm7A0G00";
        let mut decoded = String::new();
        DeflateDecoder::new(decode_bytes(reference).as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "@startuml\nAlice -> Bob: hello\n@enduml");
    }
}
