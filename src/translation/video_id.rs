use url::Url;

use crate::errors::TranslationError;

const LONG_HOSTS: [&str; 3] = ["www.youtube.com", "youtube.com", "m.youtube.com"];
const SHORT_HOST: &str = "youtu.be";
const PATH_PREFIXES: [&str; 3] = ["/embed/", "/v/", "/shorts/"];

/// Extract the video identifier from a recognized video URL
///
/// Accepted shapes: `youtu.be/<id>`, `/watch?v=<id>`, `/embed/<id>`,
/// `/v/<id>` and `/shorts/<id>` on the youtube.com hosts.
pub fn extract_video_id(raw_url: &str) -> Result<String, TranslationError> {
    let invalid = || TranslationError::InvalidUrl(raw_url.to_string());
    let url = Url::parse(raw_url.trim()).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?.to_lowercase();

    let id = if host == SHORT_HOST {
        url.path().trim_start_matches('/').split('/').next().map(str::to_string)
    } else if LONG_HOSTS.contains(&host.as_str()) {
        if url.path() == "/watch" {
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
        } else {
            PATH_PREFIXES.iter().find_map(|prefix| {
                url.path()
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.split('/').next())
                    .map(str::to_string)
            })
        }
    } else {
        None
    };

    id.filter(|id| !id.is_empty()).ok_or_else(invalid)
}
