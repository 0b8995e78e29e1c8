use super::{endpoint, AdapterType, StationAdapter};
use crate::header::{Assignments, WaterfallHeader};
use crate::prelude::{FetchError, FetchResult, FrequencyWindow};
use reqwest::Url;

const KIWI_PORT: u16 = 8073;
const KIWI_HOST_MARKER: &str = "kiwisdr";
const WATERFALL_WIDTH: u32 = 1024;

/// KiwiSDR receivers. Matched by host name or the stock port.
///
/// The `/status` page is `key=value` lines; `bands=<low>-<high>` in Hz gives
/// the single tunable span and the waterfall is always 1024 pixels wide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KiwiAdapter;

impl StationAdapter for KiwiAdapter {
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Kiwi
    }

    fn can_handle(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let host_matches = url
            .host_str()
            .map(|host| host.to_ascii_lowercase().contains(KIWI_HOST_MARKER))
            .unwrap_or(false);
        host_matches || url.port() == Some(KIWI_PORT)
    }

    fn header_url(&self, base: &str) -> String {
        endpoint(base, "status")
    }

    fn data_url(&self, base: &str, window: FrequencyWindow, bins: usize) -> String {
        format!(
            "{}?start={:.3}&end={:.3}&bins={}",
            endpoint(base, "wf"),
            window.min_hz / 1_000.0,
            window.max_hz / 1_000.0,
            bins
        )
    }

    fn audio_url(&self, base: &str, freq_hz: f64, mode: &str) -> String {
        format!(
            "{}?f={:.2}{}",
            endpoint(base, ""),
            freq_hz / 1_000.0,
            mode.to_ascii_lowercase()
        )
    }

    fn parse_header(&self, body: &str) -> FetchResult<WaterfallHeader> {
        let assignments = Assignments::scan(body);
        let bands = assignments
            .scalar("bands")
            .ok_or_else(|| FetchError::ParseFailure("missing bands".into()))?;
        let (low, high): (f64, f64) = bands
            .split_once('-')
            .and_then(|(low, high)| Some((low.trim().parse().ok()?, high.trim().parse().ok()?)))
            .ok_or_else(|| FetchError::ParseFailure(format!("malformed bands {}", bands)))?;
        let name = assignments.scalar("name").unwrap_or("HF").to_string();

        WaterfallHeader::from_ranges(vec![(name, low, high)], WATERFALL_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_by_host_or_port() {
        let by_host = Url::parse("http://x.kiwisdr.example:80").unwrap();
        let by_port = Url::parse("http://10.0.0.4:8073").unwrap();
        let other = Url::parse("http://websdr.example.org:8901").unwrap();
        assert!(KiwiAdapter.can_handle(&by_host));
        assert!(KiwiAdapter.can_handle(&by_port));
        assert!(!KiwiAdapter.can_handle(&other));
    }

    #[test]
    fn non_http_schemes_are_not_kiwi() {
        let by_host = Url::parse("ftp://rx.kiwisdr.example").unwrap();
        let by_port = Url::parse("ftp://10.0.0.4:8073").unwrap();
        assert!(!KiwiAdapter.can_handle(&by_host));
        assert!(!KiwiAdapter.can_handle(&by_port));
    }

    #[test]
    fn parses_status_page() {
        let body = "status=active\nname=Hilltop Kiwi\nusers=1\nbands=0-30000000\n";
        let header = KiwiAdapter.parse_header(body).unwrap();
        assert_eq!(header.total_width_pixels, 1024);
        assert_eq!(header.bands.len(), 1);
        assert_eq!(header.bands[0].name, "Hilltop Kiwi");
        assert_eq!(header.bands[0].end_hz, 30_000_000.0);
        assert_eq!(header.bands[0].end_pixel, 1024);
    }

    #[test]
    fn malformed_bands_fail() {
        assert!(KiwiAdapter.parse_header("bands=zero-thirty").is_err());
        assert!(KiwiAdapter.parse_header("status=active").is_err());
    }

    #[test]
    fn builds_vendor_urls() {
        let window = FrequencyWindow::new(7_000_000.0, 7_200_000.0).unwrap();
        let base = "http://x.kiwisdr.example:8073";
        assert_eq!(
            KiwiAdapter.header_url(base),
            "http://x.kiwisdr.example:8073/status"
        );
        assert_eq!(
            KiwiAdapter.data_url(base, window, 512),
            "http://x.kiwisdr.example:8073/wf?start=7000.000&end=7200.000&bins=512"
        );
        assert_eq!(
            KiwiAdapter.audio_url(base, 7_074_000.0, "LSB"),
            "http://x.kiwisdr.example:8073/?f=7074.00lsb"
        );
    }
}
