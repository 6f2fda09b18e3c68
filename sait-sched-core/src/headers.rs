//! Session capture from pasted browser request headers.
//!
//! The user copies a raw request out of their browser's network inspector;
//! this module scrapes the cookies, the CSRF synchronizer token, and the
//! host out of that text so every later Banner call can replay them.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::{BannerSession, Error, Result};

fn cookie_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^Cookie:\s*(.+)$").expect("valid regex"))
}

fn sync_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^X-Synchronizer-Token:\s*(.+)$").expect("valid regex"))
}

fn host_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^Host:\s*(.+)$").expect("valid regex"))
}

fn session_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"uniqueSessionId=([^&\s]+)").expect("valid regex"))
}

/// Parse raw request headers into a [`BannerSession`].
///
/// Requires a Cookie header and an X-Synchronizer-Token header; everything
/// else is optional. All missing pieces are reported in one error so the
/// user can fix their paste in one round trip.
pub fn parse_session(headers_text: &str) -> Result<BannerSession> {
    let mut missing = Vec::new();

    let cookies = cookie_re()
        .captures(headers_text)
        .map(|c| parse_cookie_string(c[1].trim()))
        .unwrap_or_default();
    if cookies.is_empty() {
        missing.push("Cookie header");
    }

    let sync_token = sync_token_re()
        .captures(headers_text)
        .map(|c| c[1].trim().to_string());
    if sync_token.is_none() {
        missing.push("X-Synchronizer-Token header");
    }

    let host = host_re()
        .captures(headers_text)
        .map(|c| c[1].trim().to_string());
    if host.is_none() {
        missing.push("Host header");
    }

    if !missing.is_empty() {
        return Err(Error::Config(format!(
            "could not parse session headers, missing: {}",
            missing.join(", ")
        )));
    }

    let unique_session_id = session_id_re()
        .captures(headers_text)
        .map(|c| c[1].trim().to_string());

    Ok(BannerSession {
        base_url: format!("https://{}", host.unwrap_or_default()),
        cookies,
        sync_token: sync_token.unwrap_or_default(),
        unique_session_id,
    })
}

fn parse_cookie_string(cookie_string: &str) -> BTreeMap<String, String> {
    cookie_string
        .split(';')
        .filter_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "GET /StudentRegistrationSsb/ssb/classSearch/get_subjectcoursecombo?searchTerm=&term=202530&offset=1&max=10&uniqueSessionId=54ktv1761859042020&_=1761868113369 HTTP/1.1\r\n\
Accept: application/json, text/javascript, */*; q=0.01\r\n\
Cookie: JSESSIONID=3CB2F72D0B8566B63FE6EED5CE220199; NLB=1116a3db; NSC_ESNS=14ca2989-05d6\r\n\
Host: sait-sust-prd-prd1-ban-ss-ssag6.sait.ca\r\n\
Referer: https://sait-sust-prd-prd1-ban-ss-ssag6.sait.ca/StudentRegistrationSsb/ssb/classRegistration/classRegistration\r\n\
X-Requested-With: XMLHttpRequest\r\n\
X-Synchronizer-Token: 36392fea-6d6b-41d3-a4d3-f46333133e9a\r\n";

    #[test]
    fn parses_full_header_paste() {
        let session = parse_session(SAMPLE).unwrap();
        assert_eq!(session.base_url, "https://sait-sust-prd-prd1-ban-ss-ssag6.sait.ca");
        assert_eq!(session.sync_token, "36392fea-6d6b-41d3-a4d3-f46333133e9a");
        assert_eq!(
            session.unique_session_id.as_deref(),
            Some("54ktv1761859042020")
        );
        assert_eq!(session.cookies.len(), 3);
        assert_eq!(
            session.cookies.get("JSESSIONID").map(String::as_str),
            Some("3CB2F72D0B8566B63FE6EED5CE220199")
        );
    }

    #[test]
    fn cookie_header_round_trips() {
        let session = parse_session(SAMPLE).unwrap();
        let header = session.cookie_header();
        assert!(header.contains("JSESSIONID=3CB2F72D0B8566B63FE6EED5CE220199"));
        assert!(header.contains("; "));
    }

    #[test]
    fn missing_token_reports_what_was_absent() {
        let text = "Cookie: JSESSIONID=abc\r\nHost: example.sait.ca\r\n";
        let err = parse_session(text).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("X-Synchronizer-Token"));
        assert!(!message.contains("Cookie header"));
    }

    #[test]
    fn missing_everything_lists_all_pieces() {
        let err = parse_session("GET / HTTP/1.1\r\n").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Cookie header"));
        assert!(message.contains("X-Synchronizer-Token"));
        assert!(message.contains("Host header"));
    }

    #[test]
    fn header_names_match_case_insensitively() {
        let text = "cookie: A=1\r\nhost: h.sait.ca\r\nx-synchronizer-token: tok\r\n";
        let session = parse_session(text).unwrap();
        assert_eq!(session.sync_token, "tok");
        assert_eq!(session.base_url, "https://h.sait.ca");
        assert!(session.unique_session_id.is_none());
    }
}
