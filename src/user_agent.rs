//! User-Agent string shared by every outgoing HTTP client.

/// Project URL advertised in the User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/andreixdbolos/proiect-vf";

/// Default User-Agent for search and publishing requests.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("vtools/{version} (research-tool; +{PROJECT_UA_URL})")
}
