//! HLS manifest inspection.
//!
//! The transcode engine writes the playlist; this module only reads it
//! back to recover best-effort metadata. Duration is the sum of the
//! `#EXTINF` tags, which is as accurate as the engine chose to be.

use regex::Regex;
use std::path::Path;

/// Sum the `#EXTINF` segment durations in a playlist. `None` when the file
/// is unreadable or carries no segment tags; duration stays best-effort.
pub async fn playlist_duration(manifest: &Path) -> Option<f64> {
    let content = tokio::fs::read_to_string(manifest).await.ok()?;
    sum_extinf(&content)
}

/// Whether a playlist is finished, i.e. carries the VOD end marker.
pub fn is_playlist_complete(content: &str) -> bool {
    content.lines().any(|l| l.trim() == "#EXT-X-ENDLIST")
}

fn sum_extinf(content: &str) -> Option<f64> {
    let re = Regex::new(r"(?m)^#EXTINF:([0-9]+(?:\.[0-9]+)?),").ok()?;
    let mut total = 0.0;
    let mut seen = false;
    for caps in re.captures_iter(content) {
        if let Ok(d) = caps[1].parse::<f64>() {
            total += d;
            seen = true;
        }
    }
    seen.then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PLAYLIST: &str = "#EXTM3U\n\
        #EXT-X-VERSION:3\n\
        #EXT-X-TARGETDURATION:10\n\
        #EXT-X-MEDIA-SEQUENCE:0\n\
        #EXT-X-PLAYLIST-TYPE:VOD\n\
        #EXTINF:10.000000,\n\
        segment_000.ts\n\
        #EXTINF:10.000000,\n\
        segment_001.ts\n\
        #EXTINF:4.500000,\n\
        segment_002.ts\n\
        #EXT-X-ENDLIST\n";

    #[test]
    fn sums_segment_durations() {
        let total = sum_extinf(PLAYLIST).unwrap();
        assert!((total - 24.5).abs() < 1e-9);
    }

    #[test]
    fn no_segments_means_unknown() {
        assert_eq!(sum_extinf("#EXTM3U\n#EXT-X-ENDLIST\n"), None);
        assert_eq!(sum_extinf(""), None);
    }

    #[test]
    fn detects_end_marker() {
        assert!(is_playlist_complete(PLAYLIST));
        assert!(!is_playlist_complete("#EXTM3U\n#EXTINF:10.0,\nseg.ts\n"));
    }

    #[tokio::test]
    async fn reads_duration_from_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("index.m3u8");
        tokio::fs::write(&path, PLAYLIST).await.unwrap();

        let total = playlist_duration(&path).await.unwrap();
        assert!((total - 24.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_manifest_is_unknown() {
        let tmp = tempdir().unwrap();
        assert_eq!(playlist_duration(&tmp.path().join("index.m3u8")).await, None);
    }
}
