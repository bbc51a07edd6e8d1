use crate::{data::MockHeader, error::Error};
use hyper::{
    header::{self, HeaderName, HeaderValue},
    Body, HeaderMap, Request, Uri,
};
use log::warn;
use std::collections::HashMap;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Current UTC time as an ISO-8601 string.
pub fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Host of the page that issued `request`: taken from `Origin`, then
/// `Referer`, then the request URI itself.
pub fn page_host(request: &Request<Body>) -> String {
    let from_header = |name: header::HeaderName| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Uri>().ok())
            .and_then(|uri| uri.authority().map(|authority| authority.to_string()))
    };

    from_header(header::ORIGIN)
        .or_else(|| from_header(header::REFERER))
        .or_else(|| request.uri().authority().map(|authority| authority.to_string()))
        .unwrap_or_default()
}

/// One entry per header value, repeats included, each with a fresh id.
pub fn harvest_headers(header_map: &HeaderMap) -> Vec<MockHeader> {
    header_map
        .iter()
        .map(|(key, value)| MockHeader::new(key.as_str(), String::from_utf8_lossy(value.as_bytes())))
        .collect()
}

/// Collapses an ordered header list into a key-unique map; the last
/// occurrence of a key wins and entries with an empty key are skipped.
pub fn collapse_headers(headers: &[MockHeader]) -> Result<HeaderMap<HeaderValue>, Error> {
    let mut header_map = HeaderMap::new();

    for header in headers.iter().filter(|header| !header.key.trim().is_empty()) {
        let header_name = HeaderName::from_lowercase(header.key.trim().to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(&header.value)?;
        header_map.insert(header_name, header_value);
    }

    Ok(header_map)
}

/// Merges `headers` into `header_map`, replacing existing values. Returns how
/// many were applied; unrepresentable pairs are logged and skipped.
pub fn merge_headers(header_map: &mut HeaderMap<HeaderValue>, headers: &HashMap<String, String>) -> usize {
    let mut merged = 0;

    for (key, value) in headers {
        let header_name = match HeaderName::from_lowercase(key.to_lowercase().as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                warn!("skipping injected header with invalid name {:?}", key);
                continue;
            }
        };
        let header_value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(_) => {
                warn!("skipping injected header {} with invalid value", key);
                continue;
            }
        };
        header_map.insert(header_name, header_value);
        merged += 1;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_keeps_last_duplicate() {
        let headers = vec![MockHeader::new("X", "1"), MockHeader::new("X", "2")];

        let header_map = collapse_headers(&headers).unwrap();

        assert_eq!(header_map.len(), 1);
        assert_eq!(header_map["x"], "2");
    }

    #[test]
    fn collapse_skips_empty_keys() {
        let headers = vec![MockHeader::new("", "lost"), MockHeader::new("Content-Type", "text/plain")];

        let header_map = collapse_headers(&headers).unwrap();

        assert_eq!(header_map.len(), 1);
        assert_eq!(header_map["content-type"], "text/plain");
    }

    #[test]
    fn collapse_rejects_invalid_names() {
        let headers = vec![MockHeader::new("bad header", "1")];

        assert!(matches!(collapse_headers(&headers), Err(Error::InvalidHeaderName)));
    }

    #[test]
    fn merge_overrides_existing_values() {
        let mut header_map = HeaderMap::new();
        header_map.insert("authorization", HeaderValue::from_static("old"));
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "new".to_string());
        headers.insert("X-Trace".to_string(), "1".to_string());

        assert_eq!(merge_headers(&mut header_map, &headers), 2);

        assert_eq!(header_map["authorization"], "new");
        assert_eq!(header_map.get_all("authorization").iter().count(), 1);
        assert_eq!(header_map["x-trace"], "1");
    }

    #[test]
    fn merge_skips_invalid_pairs() {
        let mut header_map = HeaderMap::new();
        let mut headers = HashMap::new();
        headers.insert("bad name".to_string(), "1".to_string());
        headers.insert("x-ok".to_string(), "line\nbreak".to_string());

        assert_eq!(merge_headers(&mut header_map, &headers), 0);
        assert!(header_map.is_empty());
    }

    #[test]
    fn page_host_prefers_origin() {
        let request = Request::get("http://api.example.com/x")
            .header("origin", "https://app.example.com")
            .header("referer", "https://other.example.com/page")
            .body(Body::empty())
            .unwrap();

        assert_eq!(page_host(&request), "app.example.com");
    }

    #[test]
    fn page_host_falls_back_to_referer_then_uri() {
        let request = Request::get("http://api.example.com:8080/x")
            .header("referer", "https://other.example.com/page")
            .body(Body::empty())
            .unwrap();
        assert_eq!(page_host(&request), "other.example.com");

        let request = Request::get("http://api.example.com:8080/x")
            .body(Body::empty())
            .unwrap();
        assert_eq!(page_host(&request), "api.example.com:8080");
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let now = timestamp();
        assert!(OffsetDateTime::parse(&now, &Rfc3339).is_ok(), "{}", now);
    }

    #[test]
    fn harvest_keeps_repeated_keys() {
        let mut header_map = HeaderMap::new();
        header_map.append("set-cookie", HeaderValue::from_static("a=1"));
        header_map.append("set-cookie", HeaderValue::from_static("b=2"));

        let harvested = harvest_headers(&header_map);

        assert_eq!(harvested.len(), 2);
        assert_eq!(harvested[0].key, "set-cookie");
        assert_eq!(harvested[1].value, "b=2");
        assert_ne!(harvested[0].id, harvested[1].id);
    }

    #[test]
    fn harvest_keeps_opaque_values() {
        let mut header_map = HeaderMap::new();
        header_map.insert("x-raw", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let harvested = harvest_headers(&header_map);

        assert_eq!(harvested.len(), 1);
        assert_eq!(harvested[0].value, "caf\u{fffd}");
    }
}
