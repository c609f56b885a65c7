//! Fast URL splitting for pattern matching
//!
//! These functions avoid allocations and work directly on string slices.
//! Only the structural split is performed: no percent-decoding, no
//! case folding and no IDNA processing.

// =============================================================================
// Components
// =============================================================================

/// A URL component addressable by URL patterns and template paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Protocol,
    Username,
    Password,
    Hostname,
    Port,
    Pathname,
    Search,
    Hash,
}

impl Component {
    pub const ALL: [Component; 8] = [
        Component::Protocol,
        Component::Username,
        Component::Password,
        Component::Hostname,
        Component::Port,
        Component::Pathname,
        Component::Search,
        Component::Hash,
    ];

    /// Name used in template paths (`pathname.groups.id`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Username => "username",
            Self::Password => "password",
            Self::Hostname => "hostname",
            Self::Port => "port",
            Self::Pathname => "pathname",
            Self::Search => "search",
            Self::Hash => "hash",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Separator that bounds a `:name` segment inside this component.
    #[inline]
    pub fn segment_delimiter(&self) -> Option<char> {
        match self {
            Self::Hostname => Some('.'),
            Self::Pathname => Some('/'),
            _ => None,
        }
    }
}

// =============================================================================
// Scheme
// =============================================================================

/// Position of the ':' that ends the scheme, if the URL starts with a
/// syntactically valid scheme.
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    if bytes.is_empty() || !bytes[0].is_ascii_alphabetic() {
        return None;
    }

    for (i, &b) in bytes.iter().enumerate().skip(1) {
        match b {
            b':' => return Some(i),
            b'+' | b'-' | b'.' => {}
            _ if b.is_ascii_alphanumeric() => {}
            _ => return None,
        }
    }

    None
}

// =============================================================================
// URL Parts
// =============================================================================

/// Zero-copy view of an absolute URL split into components.
///
/// Delimiters are not part of the components: `protocol` has no trailing
/// ':', `search` no leading '?', `hash` no leading '#'.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub protocol: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub hostname: &'a str,
    pub port: &'a str,
    pub pathname: &'a str,
    pub search: &'a str,
    pub hash: &'a str,
}

impl<'a> UrlParts<'a> {
    #[inline]
    pub fn get(&self, component: Component) -> &'a str {
        match component {
            Component::Protocol => self.protocol,
            Component::Username => self.username,
            Component::Password => self.password,
            Component::Hostname => self.hostname,
            Component::Port => self.port,
            Component::Pathname => self.pathname,
            Component::Search => self.search,
            Component::Hash => self.hash,
        }
    }
}

/// Split an absolute URL into its components.
/// Returns None when the input has no scheme.
pub fn split_url(url: &str) -> Option<UrlParts<'_>> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    let mut parts = UrlParts {
        protocol: &url[..scheme_end],
        username: "",
        password: "",
        hostname: "",
        port: "",
        pathname: "",
        search: "",
        hash: "",
    };

    let mut path_start = scheme_end + 1;
    let has_authority = url[path_start..].starts_with("//");

    if has_authority {
        let auth_start = path_start + 2;
        let mut auth_end = bytes.len();
        for (i, &b) in bytes[auth_start..].iter().enumerate() {
            if b == b'/' || b == b'?' || b == b'#' {
                auth_end = auth_start + i;
                break;
            }
        }

        let authority = &url[auth_start..auth_end];
        let host_port = match authority.rfind('@') {
            Some(at_pos) => {
                let userinfo = &authority[..at_pos];
                match userinfo.find(':') {
                    Some(colon) => {
                        parts.username = &userinfo[..colon];
                        parts.password = &userinfo[colon + 1..];
                    }
                    None => parts.username = userinfo,
                }
                &authority[at_pos + 1..]
            }
            None => authority,
        };

        let (hostname, port) = split_host_port(host_port);
        parts.hostname = hostname;
        parts.port = port;
        path_start = auth_end;
    }

    // Find path end
    let mut path_end = bytes.len();
    for (i, &b) in bytes[path_start..].iter().enumerate() {
        if b == b'?' || b == b'#' {
            path_end = path_start + i;
            break;
        }
    }

    parts.pathname = &url[path_start..path_end];
    if has_authority && parts.pathname.is_empty() {
        parts.pathname = "/";
    }

    if path_end < bytes.len() && bytes[path_end] == b'?' {
        let search_start = path_end + 1;
        let search_end = url[search_start..]
            .find('#')
            .map_or(bytes.len(), |pos| search_start + pos);
        parts.search = &url[search_start..search_end];
        if search_end < bytes.len() {
            parts.hash = &url[search_end + 1..];
        }
    } else if path_end < bytes.len() {
        parts.hash = &url[path_end + 1..];
    }

    Some(parts)
}

/// Split `host[:port]`, keeping IPv6 literals bracketed.
#[inline]
fn split_host_port(host_port: &str) -> (&str, &str) {
    if host_port.starts_with('[') {
        if let Some(close) = host_port.find(']') {
            let host = &host_port[..=close];
            let port = host_port[close + 1..].strip_prefix(':').unwrap_or("");
            return (host, port);
        }
        return (host_port, "");
    }

    match host_port.find(':') {
        Some(colon) => (&host_port[..colon], &host_port[colon + 1..]),
        None => (host_port, ""),
    }
}
