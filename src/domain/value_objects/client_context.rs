use std::collections::BTreeMap;
use std::net::IpAddr;

/// What the caller knows about the peer of the current request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    remote_addr: Option<IpAddr>,
    /// Header names are stored lowercase
    headers: BTreeMap<String, String>,
}

impl ClientContext {
    pub const UNKNOWN_ADDR: &'static str = "0.0.0.0";
    pub const UNKNOWN_USER_AGENT: &'static str = "unknown";

    pub fn new(remote_addr: Option<IpAddr>) -> Self {
        Self {
            remote_addr,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_user_agent(self, user_agent: impl Into<String>) -> Self {
        self.with_header("user-agent", user_agent)
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn user_agent(&self) -> &str {
        self.header("user-agent").unwrap_or(Self::UNKNOWN_USER_AGENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_case_insensitive() {
        let ctx = ClientContext::new(None).with_header("X-Forwarded-For", "198.51.100.1");
        assert_eq!(ctx.header("x-forwarded-for"), Some("198.51.100.1"));
        assert_eq!(ctx.header("X-FORWARDED-FOR"), Some("198.51.100.1"));
    }

    #[test]
    fn test_user_agent_default() {
        assert_eq!(ClientContext::default().user_agent(), "unknown");
        let ctx = ClientContext::default().with_user_agent("curl/8.0");
        assert_eq!(ctx.user_agent(), "curl/8.0");
    }
}
