use url::Url;

/// Placeholder used when a URL has no usable final path segment.
pub const FALLBACK_FILENAME: &str = "download";

/// Final path segment of `url`, or [`FALLBACK_FILENAME`].
pub fn filename_from_url(url: &str) -> String {
    url_path(url)
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Path component of `url` with query and fragment removed.
///
/// Strings that do not parse as absolute URLs are cut at the first `?` or `#`.
pub fn url_path(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => {
            let trimmed = url.trim();
            let end = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
            trimmed[..end].to_string()
        }
    }
}

/// Lower-cased, dot-prefixed suffix after the last `.` of the final segment
/// of `name`. Both `/` and `\` count as separators.
pub fn suffix_of_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (_, ext) = base.rsplit_once('.')?;
    if ext.is_empty() || ext.chars().any(is_forbidden) {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

pub fn suffix_of_url(url: &str) -> Option<String> {
    suffix_of_name(&url_path(url))
}

fn is_forbidden(c: char) -> bool {
    matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_falls_back_for_empty_path() {
        assert_eq!(filename_from_url("http://x/"), "download");
        assert_eq!(filename_from_url("http://x"), "download");
        assert_eq!(filename_from_url("http://x/dir/"), "download");
        assert_eq!(filename_from_url("http://x/dir/a.tar.gz#top"), "a.tar.gz");
    }

    #[test]
    fn suffix_uses_last_dot_only() {
        assert_eq!(suffix_of_name("archive.tar.GZ").as_deref(), Some(".gz"));
        assert_eq!(suffix_of_name("C:\\Users\\me\\Downloads\\Report.PDF").as_deref(), Some(".pdf"));
        assert_eq!(suffix_of_name("/home/me/dir.d/README"), None);
        assert_eq!(suffix_of_name("trailing."), None);
        assert_eq!(suffix_of_name("noext"), None);
    }

    #[test]
    fn url_suffix_ignores_query_and_fragment() {
        assert_eq!(suffix_of_url("http://x/a.PDF?x=1").as_deref(), Some(".pdf"));
        assert_eq!(suffix_of_url("http://x/a?file=b.pdf"), None);
        assert_eq!(suffix_of_url("/relative/b.zip#frag").as_deref(), Some(".zip"));
    }
}
