//! Public URLs for galleries and photo files.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::thumbnails::DerivativeSize;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Builds absolute URLs below a configured base.
///
/// Galleries live at `{base}/project/{slug}/{token}`; files under the
/// projects root are served from `{base}/projects/{slug}/...`.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base_url: String,
}

impl UrlBuilder {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn gallery_url(&self, slug: &str, token: &str) -> String {
        self.join(&["project", slug, token])
    }

    pub fn photo_url(&self, slug: &str, filename: &str) -> String {
        self.join(&["projects", slug, filename])
    }

    pub fn derivative_url(&self, slug: &str, size: DerivativeSize, filename: &str) -> String {
        self.join(&["projects", slug, size.dir_name(), filename])
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.extend(utf8_percent_encode(segment, SEGMENT));
        }
        url
    }
}
