//! Outbound status line and header accumulation.
//!
//! Headers are drained when sent, so sending twice only repeats the status
//! line and the CORS block.

use crate::ajax::upper_first;
use crate::http::response::{ResponseBuilder, StatusCode};

const STATUS_HEADER_NAMES: [&str; 3] = ["HTTP/1.1", "HTTP/1.0", "Status"];

const CORS_ALLOW_HEADERS: &str = "Content-Type, Depth, User-Agent, X-File-Size, X-Requested-With, \
If-Modified-Since, X-File-Name, Cache-Control, X-Auth-Token";
const CORS_MAX_AGE: &str = "86400";

#[derive(Debug, Default)]
pub struct ResponseHeaderSet {
    status: Option<StatusCode>,
    headers: Vec<(String, String)>,
}

impl ResponseHeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-argument form. An empty `value` means `name` is itself a status
    /// value, as in `add_header("404", "")`.
    ///
    /// Returns `false` when a status value is not in the status table; the
    /// set is left untouched in that case.
    pub fn add_header(&mut self, name: &str, value: &str) -> bool {
        if !name.is_empty() && value.is_empty() {
            return self.add_status(name);
        }

        let name = name.trim().replace(['_', ' '], "-");
        if STATUS_HEADER_NAMES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&name))
        {
            return self.add_status(value);
        }

        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value.to_string(),
            None => self.headers.push((name, value.to_string())),
        }
        true
    }

    /// One-argument form: `value` is a code (`"404"`) or a reason phrase
    /// (`"Not Found"`). The first letter is upper-cased and `Ok` becomes `OK`
    /// before lookup.
    pub fn add_status(&mut self, value: &str) -> bool {
        let value = value.trim();
        let mut normalized = upper_first(value);
        if normalized == "Ok" {
            normalized = "OK".to_string();
        }

        let status = normalized
            .parse::<u16>()
            .ok()
            .and_then(StatusCode::from_u16)
            .or_else(|| StatusCode::from_reason(&normalized));

        match status {
            Some(status) => {
                self.status = Some(status);
                true
            }
            None => false,
        }
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True when no status and no headers are pending.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.headers.is_empty()
    }

    /// Moves everything pending onto `builder`, status first (200 when never
    /// set), then the accumulated headers, then the CORS block for `verb`.
    pub fn send(&mut self, verb: &str, builder: ResponseBuilder) -> ResponseBuilder {
        let status = self.status.take().unwrap_or(StatusCode::Ok);
        let mut builder = builder.status(status);

        for (name, value) in self.headers.drain(..) {
            builder = builder.header(name, value);
        }

        let verb = verb.to_ascii_uppercase();
        builder
            .header("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)
            .header("Access-Control-Allow-Methods", verb.as_str())
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Max-Age", CORS_MAX_AGE)
            .header("Allow", verb)
    }
}
