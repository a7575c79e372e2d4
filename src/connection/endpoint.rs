use tracing::debug;
use url::Url;

use crate::Member;

/// Derive the `host:port` endpoint list from cluster membership
///
/// The result is positional: entry `i` belongs to `members[i]`. A member
/// without an advertised client URL, or whose first URL cannot be parsed,
/// leaves an empty string at its position. Store adapters skip those gaps
/// when applying the list.
pub fn derive_endpoints(members: &[Member]) -> Vec<String> {
    members.iter().map(member_endpoint).collect()
}

fn member_endpoint(member: &Member) -> String {
    let Some(raw) = member.client_urls.first() else {
        debug!(member = %member.name, "member advertises no client URL");
        return String::new();
    };

    match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) => {
                let port = url.port_or_known_default().map(|p| p.to_string()).unwrap_or_default();
                format!("{host}:{port}")
            }
            None => {
                debug!(member = %member.name, url = %raw, "client URL has no host");
                String::new()
            }
        },
        Err(e) => {
            debug!(member = %member.name, url = %raw, "unparsable client URL: {}", e);
            String::new()
        }
    }
}
