//! ICY (Shoutcast) in-stream metadata: probe an internet-radio stream for
//! one metadata block and extract the current track title.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tracing::debug;

use volnabot_common::error::Error;

/// Total time allowed for one metadata probe, covering connect and reads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

// Titles may embed `'` and `;`, so the capture is non-greedy: it ends at
// the first `';` that lets the pattern match. `-u` keeps the regex byte
// oriented; metadata blocks are not guaranteed to be valid UTF-8.
static STREAM_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is-u)StreamTitle='(.*?)';").expect("stream title pattern"));

/// Reads the currently playing track title embedded in an ICY stream.
///
/// One long-lived HTTP client is shared across every probe.
pub struct IcyTitleFetcher {
    client: reqwest::Client,
}

impl Default for IcyTitleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl IcyTitleFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("volnabot/0.1 (+ICY)")
            .build()
            .expect("metadata HTTP client");
        Self { client }
    }

    /// Fetches the `StreamTitle` for `url`. All failures (network error,
    /// missing `icy-metaint` header, short read, absent metadata block)
    /// collapse to `None`.
    pub async fn fetch_title(&self, url: &str) -> Option<String> {
        match self.probe(url).await {
            Ok(title) => title,
            Err(e) => {
                debug!("ICY probe failed for {url}: {e}");
                None
            }
        }
    }

    async fn probe(&self, url: &str) -> Result<Option<String>, Error> {
        let mut resp = self
            .client
            .get(url)
            .header("Icy-MetaData", "1")
            .send()
            .await?;

        let Some(metaint) = resp
            .headers()
            .get("icy-metaint")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<usize>().ok())
        else {
            return Ok(None);
        };

        // The audio payload runs for `metaint` bytes, then one length byte,
        // then the metadata block itself (length x 16 bytes).
        let mut to_skip = metaint;
        let mut meta: Vec<u8> = Vec::new();
        let mut wanted: Option<usize> = None;

        while let Some(chunk) = resp.chunk().await? {
            let mut rest = &chunk[..];
            if to_skip > 0 {
                if rest.len() <= to_skip {
                    to_skip -= rest.len();
                    continue;
                }
                rest = &rest[to_skip..];
                to_skip = 0;
            }
            meta.extend_from_slice(rest);

            if wanted.is_none() {
                match meta.first() {
                    Some(0) => return Ok(None),
                    Some(&len) => wanted = Some(1 + len as usize * 16),
                    None => continue,
                }
            }
            if let Some(needed) = wanted {
                if meta.len() >= needed {
                    return Ok(parse_stream_title(&meta[1..needed]));
                }
            }
        }

        // Stream closed before a full metadata block arrived.
        Ok(None)
    }
}

/// Extracts and decodes the `StreamTitle='...';` payload from a raw ICY
/// metadata block. Trailing zero padding is ignored.
pub fn parse_stream_title(block: &[u8]) -> Option<String> {
    let end = block.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    let caps = STREAM_TITLE_RE.captures(&block[..end])?;
    decode_title(caps.get(1)?.as_bytes())
}

/// Decode ladder for raw title bytes: UTF-8, then Windows-1251 (common on
/// Russian-language streams), then a lossy UTF-8 recovery, then Latin-1.
fn decode_title(raw: &[u8]) -> Option<String> {
    if let Ok(s) = std::str::from_utf8(raw) {
        return non_empty(s);
    }

    let (decoded, had_errors) = encoding_rs::WINDOWS_1251.decode_without_bom_handling(raw);
    if !had_errors {
        if let Some(title) = non_empty(&decoded) {
            return Some(title);
        }
    }

    let recovered: String = String::from_utf8_lossy(raw)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect();
    if let Some(title) = non_empty(&recovered) {
        return Some(title);
    }

    let latin: String = raw.iter().map(|&b| b as char).collect();
    non_empty(&latin)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(payload: &[u8]) -> Vec<u8> {
        let mut block = payload.to_vec();
        let target = payload.len().div_ceil(16) * 16;
        block.resize(target, 0);
        block
    }

    #[test]
    fn extracts_plain_ascii_title() {
        let block = padded(b"StreamTitle='Artist - Song';");
        assert_eq!(
            parse_stream_title(&block),
            Some("Artist - Song".to_string())
        );
    }

    #[test]
    fn missing_pattern_yields_none() {
        let block = padded(b"StreamUrl='http://example.com';");
        assert_eq!(parse_stream_title(&block), None);
    }

    #[test]
    fn all_zero_block_yields_none() {
        assert_eq!(parse_stream_title(&[0u8; 32]), None);
    }

    #[test]
    fn title_may_contain_quotes_and_semicolons() {
        let block = padded(b"StreamTitle='It's a Sin';StreamUrl='';");
        assert_eq!(parse_stream_title(&block), Some("It's a Sin".to_string()));
    }

    #[test]
    fn pattern_match_is_case_insensitive() {
        let block = padded(b"streamtitle='Artist - Song';");
        assert_eq!(
            parse_stream_title(&block),
            Some("Artist - Song".to_string())
        );
    }

    #[test]
    fn windows_1251_titles_are_decoded() {
        let title = "Руки Вверх - Крошка моя";
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(title);
        let mut payload = b"StreamTitle='".to_vec();
        payload.extend_from_slice(&encoded);
        payload.extend_from_slice(b"';");
        let block = padded(&payload);

        assert_eq!(parse_stream_title(&block), Some(title.to_string()));
    }

    #[test]
    fn whitespace_only_title_yields_none() {
        let block = padded(b"StreamTitle='   ';");
        assert_eq!(parse_stream_title(&block), None);
    }
}
