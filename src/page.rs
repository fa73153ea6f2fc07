//! Derives counter keys and display titles from incoming requests.

use std::net::SocketAddr;

use percent_encoding::percent_decode_str;
use tracing::warn;

use crate::counter::{PageId, UserId};

static HOME_TITLE: &str = "Home";

/// Unique identifier of the viewed page: the decoded request path.
///
/// The trailing slash is dropped so `page/` and `page` are counted as the same
/// page, which also turns the root path into the empty id.
pub fn page_id(path: &str) -> PageId {
    canonical_page_id(percent_decode_str(path).decode_utf8_lossy().into_owned())
}

/// Same as [`page_id`] for a path that is already decoded.
pub fn canonical_page_id(mut path: String) -> PageId {
    if path.ends_with('/') {
        path.pop();
    }

    path
}

/// Unique identifier of the visitor: the remote address of the connection.
pub fn user_id(remote: SocketAddr) -> UserId {
    remote.to_string()
}

/// Human readable title for the page at `raw_path`.
///
/// Works on the still-encoded path so an escaped `%2F` stays inside its
/// segment instead of splitting it.
pub fn page_title(raw_path: &str) -> String {
    let path = raw_path.strip_suffix('/').unwrap_or(raw_path);
    if path.is_empty() {
        return HOME_TITLE.to_owned();
    }

    let segment = path.rsplit('/').next().unwrap_or(path);
    let decoded = percent_decode_str(segment);
    let title = match decoded.clone().decode_utf8() {
        Ok(title) => title,
        Err(err) => {
            warn!(segment, "Page title is not valid UTF-8: {err}");
            decoded.decode_utf8_lossy()
        }
    };

    title_case(&title)
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;

    for c in s.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        word_start = !(c.is_alphanumeric() || c == '_');
    }

    out
}
