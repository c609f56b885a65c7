//! Template rendering for rule `to` strings
//!
//! Two placeholder forms are expanded against match captures:
//!
//! - `$1`, `$2`, ... positional groups (missing groups render empty)
//! - `{{ path.expression | pipeA | pipeB }}` dotted lookups into the
//!   captures, post-processed by a left-to-right pipe chain
//!
//! Rendering is fail-soft. A placeholder whose path does not resolve is
//! copied through verbatim, an unknown pipe is the identity and a pipe that
//! fails hands back its input. Everything outside placeholders is literal.

use base64::prelude::*;

use crate::pattern::Captures;

// =============================================================================
// Pipes
// =============================================================================

/// Error raised inside a pipe. Never escapes [`render`].
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("Malformed percent-encoding")]
    MalformedPercent,
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Decoded value is not UTF-8")]
    NotUtf8,
}

/// Post-processing function applicable inside `{{ ... }}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipe {
    DecodeUriComponent,
    EncodeUriComponent,
    /// Base64 decode
    Atob,
    /// Base64 encode
    Btoa,
    ToLowerCase,
    ToUpperCase,
    Trim,
}

impl Pipe {
    pub const ALL: [Pipe; 7] = [
        Pipe::DecodeUriComponent,
        Pipe::EncodeUriComponent,
        Pipe::Atob,
        Pipe::Btoa,
        Pipe::ToLowerCase,
        Pipe::ToUpperCase,
        Pipe::Trim,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DecodeUriComponent => "decodeURIComponent",
            Self::EncodeUriComponent => "encodeURIComponent",
            Self::Atob => "atob",
            Self::Btoa => "btoa",
            Self::ToLowerCase => "toLowerCase",
            Self::ToUpperCase => "toUpperCase",
            Self::Trim => "trim",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|pipe| pipe.name() == name)
    }

    pub fn apply(&self, input: &str) -> Result<String, PipeError> {
        match self {
            Self::DecodeUriComponent => decode_uri_component(input),
            Self::EncodeUriComponent => Ok(encode_uri_component(input)),
            Self::Atob => {
                let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                let bytes = BASE64_STANDARD
                    .decode(&compact)
                    .or_else(|_| BASE64_STANDARD_NO_PAD.decode(&compact))
                    .or_else(|_| BASE64_URL_SAFE_NO_PAD.decode(compact.trim_end_matches('=')))?;
                String::from_utf8(bytes).map_err(|_| PipeError::NotUtf8)
            }
            Self::Btoa => Ok(BASE64_STANDARD.encode(input.as_bytes())),
            Self::ToLowerCase => Ok(input.to_lowercase()),
            Self::ToUpperCase => Ok(input.to_uppercase()),
            Self::Trim => Ok(input.trim().to_string()),
        }
    }
}

/// Apply a pipe by name. Unknown names and failures return the input.
pub fn apply_pipe(name: &str, input: String) -> String {
    let Some(pipe) = Pipe::from_name(name) else {
        log::debug!("Unknown pipe {name:?}, passing value through");
        return input;
    };
    match pipe.apply(&input) {
        Ok(output) => output,
        Err(e) => {
            log::debug!("Pipe {name} failed: {e}");
            input
        }
    }
}

fn decode_uri_component(input: &str) -> Result<String, PipeError> {
    let bytes = input.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%'
            && !(i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit())
        {
            return Err(PipeError::MalformedPercent);
        }
    }
    urlencoding::decode(input)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| PipeError::NotUtf8)
}

/// Characters `encodeURIComponent` leaves alone besides the unreserved set.
const COMPONENT_SAFE: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

fn encode_uri_component(input: &str) -> String {
    let mut encoded = urlencoding::encode(input).into_owned();
    for (escaped, raw) in COMPONENT_SAFE {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, raw);
        }
    }
    encoded
}

// =============================================================================
// Rendering
// =============================================================================

/// Render `template` against `captures`.
pub fn render(template: &str, captures: &Captures) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'$' => {
                if let Some((value, consumed)) = positional(&template[i + 1..], captures) {
                    out.push_str(&template[literal_start..i]);
                    out.push_str(value);
                    i += 1 + consumed;
                    literal_start = i;
                    continue;
                }
            }
            b'{' if template[i..].starts_with("{{") => {
                if let Some(close) = template[i + 2..].find("}}") {
                    let end = i + 2 + close + 2;
                    if let Some(value) = evaluate(&template[i + 2..end - 2], captures) {
                        out.push_str(&template[literal_start..i]);
                        out.push_str(&value);
                        literal_start = end;
                    }
                    // Unresolved placeholders stay verbatim, contents included.
                    i = end;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    out.push_str(&template[literal_start..]);
    out
}

/// Resolve `$N` at the start of `rest` (text after the '$').
/// Returns the substituted value and the number of digits consumed.
fn positional<'c>(rest: &str, captures: &'c Captures) -> Option<(&'c str, usize)> {
    let digits = rest.bytes().take(2).take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let count = captures.positional_count();
    if digits == 2 {
        let index: usize = rest[..2].parse().ok()?;
        if (1..=count).contains(&index) {
            return Some((captures.positional(index)?.unwrap_or(""), 2));
        }
    }

    let index: usize = rest[..1].parse().ok()?;
    if index == 0 {
        return None;
    }
    // Beyond the last group renders empty.
    Some((captures.positional(index).flatten().unwrap_or(""), 1))
}

/// Evaluate the inside of a `{{ ... }}` placeholder.
fn evaluate(expression: &str, captures: &Captures) -> Option<String> {
    let mut stages = expression.split('|');
    let path = stages.next()?.trim();
    if path.is_empty() {
        return None;
    }

    let keys: Vec<&str> = path.split('.').map(str::trim).collect();
    if keys.iter().any(|key| !is_path_key(key)) {
        return None;
    }

    let mut value = captures.lookup(&keys)?.unwrap_or("").to_string();
    for stage in stages {
        value = apply_pipe(stage.trim(), value);
    }
    Some(value)
}

#[inline]
fn is_path_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::match_pattern;
    use crate::types::MatchMode;

    fn regex_caps(pattern: &str, url: &str) -> Captures {
        match_pattern(pattern, MatchMode::Regex, url).unwrap()
    }

    fn url_caps(pattern: &str, url: &str) -> Captures {
        match_pattern(pattern, MatchMode::UrlPattern, url).unwrap()
    }

    #[test]
    fn test_positional() {
        let caps = regex_caps("https://youtu.be/(.*)", "https://youtu.be/abc123");
        assert_eq!(render("https://www.youtube.com/watch?v=$1", &caps), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_positional_missing_groups_render_empty() {
        let caps = regex_caps("a(b)?(c)", "ac");
        assert_eq!(render("[$1][$2][$7]", &caps), "[][c][]");
    }

    #[test]
    fn test_positional_two_digits() {
        let caps = regex_caps("(a)(b)(c)(d)(e)(f)(g)(h)(i)(j)(k)", "abcdefghijk");
        assert_eq!(render("$10-$11-$1", &caps), "j-k-a");
        let caps = regex_caps("(a)(b)", "ab");
        assert_eq!(render("$10", &caps), "a0");
    }

    #[test]
    fn test_dollar_literals() {
        let caps = regex_caps("(x)", "x");
        assert_eq!(render("$ $$ $a $0 $&", &caps), "$ $$ $a $0 $&");
    }

    #[test]
    fn test_positional_with_url_pattern() {
        let caps = url_caps("https://:sub.example.com/:id/*", "https://m.example.com/BV1/x/y");
        assert_eq!(render("$1|$2|$3|$4", &caps), "m|BV1|x/y|");
    }

    #[test]
    fn test_expression() {
        let caps = url_caps("https://youtu.be/:id", "https://youtu.be/sRHOrI59tRQ");
        assert_eq!(
            render("https://www.youtube.com/watch?v={{pathname.groups.id}}", &caps),
            "https://www.youtube.com/watch?v=sRHOrI59tRQ"
        );
        assert_eq!(render("{{ pathname.groups.id }}|{{pathname.input}}", &caps), "sRHOrI59tRQ|/sRHOrI59tRQ");
    }

    #[test]
    fn test_expression_with_pipe() {
        let caps = url_caps(
            "https://link.example.com/?target=:url",
            "https://link.example.com/?target=https%253A%252F%252Fexample.org%252Fa%2520b",
        );
        assert_eq!(render("{{ search.groups.url }}", &caps), "https%3A%2F%2Fexample.org%2Fa%20b");
        assert_eq!(
            render("{{ search.groups.url | decodeURIComponent }}", &caps),
            "https://example.org/a b"
        );
    }

    #[test]
    fn test_missing_path_left_verbatim() {
        let caps = url_caps("https://youtu.be/:id", "https://youtu.be/abc");
        assert_eq!(render("x{{ search.groups.nope }}y", &caps), "x{{ search.groups.nope }}y");
        assert_eq!(render("{{ bogus.path }}{{}}{{ a..b }}", &caps), "{{ bogus.path }}{{}}{{ a..b }}");
    }

    #[test]
    fn test_unresolved_placeholder_contents_not_substituted() {
        let caps = regex_caps("(x)", "x");
        assert_eq!(render("{{ nope.$1 }}$1", &caps), "{{ nope.$1 }}x");
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let caps = regex_caps("(x)", "x");
        assert_eq!(render("{{ groups.1 $1", &caps), "{{ groups.1 x");
    }

    #[test]
    fn test_regex_expression_paths() {
        let caps = regex_caps("https://(?P<host>[^/]+)/(.*)", "https://example.com/path");
        assert_eq!(render("{{groups.host}}:{{groups.2}}", &caps), "example.com:path");
        assert_eq!(render("{{ input }}", &caps), "https://example.com/path");
    }

    #[test]
    fn test_unknown_pipe_is_identity() {
        let caps = url_caps("https://youtu.be/:id", "https://youtu.be/abc");
        assert_eq!(render("{{ pathname.groups.id | reverse | toUpperCase }}", &caps), "ABC");
    }

    #[test]
    fn test_failing_pipe_returns_input() {
        let caps = url_caps("https://r.example.com/?u=:u", "https://r.example.com/?u=not*base64");
        assert_eq!(render("{{ search.groups.u | atob }}", &caps), "not*base64");
    }

    #[test]
    fn test_atob_pipe() {
        // aHR0cHM6Ly9leGFtcGxlLmNvbS8= is https://example.com/
        let caps = url_caps("https://r.example.com/:b", "https://r.example.com/aHR0cHM6Ly9leGFtcGxlLmNvbS8=");
        assert_eq!(render("{{ pathname.groups.b | atob }}", &caps), "https://example.com/");
    }

    #[test]
    fn test_literal_text_preserved() {
        let caps = regex_caps("(x)", "x");
        assert_eq!(render("a\\b{c}(d)[e]^f", &caps), "a\\b{c}(d)[e]^f");
    }

    #[test]
    fn test_pipe_functions() {
        assert_eq!(Pipe::DecodeUriComponent.apply("a%20b%2Fc").unwrap(), "a b/c");
        assert!(Pipe::DecodeUriComponent.apply("100%").is_err());
        assert!(Pipe::DecodeUriComponent.apply("%zz").is_err());
        assert_eq!(Pipe::EncodeUriComponent.apply("a b/c!(*)").unwrap(), "a%20b%2Fc!(*)");
        assert_eq!(Pipe::Btoa.apply("hello").unwrap(), "aGVsbG8=");
        assert_eq!(Pipe::Atob.apply("aGVsbG8").unwrap(), "hello");
        assert_eq!(Pipe::Trim.apply("  x ").unwrap(), "x");
        assert_eq!(Pipe::from_name("atob"), Some(Pipe::Atob));
        assert_eq!(Pipe::from_name("eval"), None);
    }
}
