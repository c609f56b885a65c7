//! URL-pattern matcher
//!
//! A pattern such as `https://duckduckgo.com/?*&q=:id&*` is tokenized,
//! split into URL components and every component is compiled to an
//! anchored, case-insensitive regex. Components the pattern leaves out
//! match anything.
//!
//! Supported syntax inside a component:
//!
//! - `:name` named group (one path segment in `pathname`, one label in
//!   `hostname`, anything non-empty elsewhere)
//! - `:name(regex)` named group with a custom regex
//! - `(regex)` unnamed group, keyed by its positional index
//! - `*` unnamed full wildcard
//! - `{...}` non-capturing group
//! - `?`, `*`, `+` modifiers after a group
//! - `\x` escaped literal

use std::collections::BTreeMap;

use fancy_regex::Regex;

use super::{ComponentMatch, PatternError, UrlPatternCaptures};
use crate::url::{split_url, Component};

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Char(char),
    Escaped(char),
    Name(String),
    Regex(String),
    Asterisk,
    Open,
    Close,
    Modifier(char),
}

impl Token {
    /// Whether a following `?`, `*` or `+` modifies this token.
    fn takes_modifier(&self) -> bool {
        matches!(self, Token::Name(_) | Token::Regex(_) | Token::Asterisk | Token::Close)
    }

    #[inline]
    fn is_char(&self, c: char) -> bool {
        matches!(self, Token::Char(t) if *t == c)
    }
}

#[inline]
fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

#[inline]
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn invalid(msg: impl Into<String>) -> PatternError {
    PatternError::InvalidUrlPattern(msg.into())
}

fn tokenize(pattern: &str) -> Result<Vec<Token>, PatternError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens: Vec<Token> = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let after_group = tokens.last().is_some_and(Token::takes_modifier);

        match c {
            '\\' => {
                let escaped = *chars
                    .get(i + 1)
                    .ok_or_else(|| invalid("trailing backslash"))?;
                tokens.push(Token::Escaped(escaped));
                i += 2;
                continue;
            }
            '?' | '+' | '*' if after_group => tokens.push(Token::Modifier(c)),
            '*' => tokens.push(Token::Asterisk),
            '{' => tokens.push(Token::Open),
            '}' => tokens.push(Token::Close),
            ':' if chars.get(i + 1).copied().is_some_and(is_name_start) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                tokens.push(Token::Name(chars[start..end].iter().collect()));
                i = end;
                continue;
            }
            '(' => {
                let end = find_group_end(&chars, i)?;
                let body: String = chars[i + 1..end].iter().collect();
                if body.is_empty() {
                    return Err(invalid("empty regex group"));
                }
                tokens.push(Token::Regex(body));
                i = end + 1;
                continue;
            }
            _ => tokens.push(Token::Char(c)),
        }
        i += 1;
    }

    Ok(tokens)
}

/// Index of the ')' closing the group opened at `open`.
fn find_group_end(chars: &[char], open: usize) -> Result<usize, PatternError> {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut i = open;

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    Err(invalid("unterminated regex group"))
}

// =============================================================================
// Component Split
// =============================================================================

/// Token ranges per component. None means the pattern leaves it out.
type ComponentTokens = [Option<Vec<Token>>; 8];

/// Positions of top-level (outside `{}`) tokens matching `pred`.
fn top_level_find(tokens: &[Token], start: usize, pred: impl Fn(&Token) -> bool) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        match token {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            _ if depth == 0 && pred(token) => return Some(i),
            _ => {}
        }
    }
    None
}

fn top_level_rfind(tokens: &[Token], pred: impl Fn(&Token) -> bool) -> Option<usize> {
    let mut found = None;
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            _ if depth == 0 && pred(token) => found = Some(i),
            _ => {}
        }
    }
    found
}

fn split_components(tokens: &[Token]) -> Result<ComponentTokens, PatternError> {
    let mut out: ComponentTokens = Default::default();
    let mut has_authority = false;

    let path_start = if tokens.first().is_some_and(|t| t.is_char('/')) {
        0
    } else {
        let colon = top_level_find(tokens, 0, |t| t.is_char(':'))
            .ok_or_else(|| invalid("missing protocol"))?;
        if colon == 0 {
            return Err(invalid("empty protocol"));
        }
        out[Component::Protocol.index()] = Some(tokens[..colon].to_vec());

        let after = colon + 1;
        let slashes = tokens.get(after).is_some_and(|t| t.is_char('/'))
            && tokens.get(after + 1).is_some_and(|t| t.is_char('/'));
        if slashes {
            has_authority = true;
            let auth_start = after + 2;
            let auth_end = top_level_find(tokens, auth_start, |t| {
                t.is_char('/') || t.is_char('?') || t.is_char('#')
            })
            .unwrap_or(tokens.len());
            split_authority(&tokens[auth_start..auth_end], &mut out)?;
            auth_end
        } else {
            after
        }
    };

    let path_end = top_level_find(tokens, path_start, |t| t.is_char('?') || t.is_char('#'))
        .unwrap_or(tokens.len());
    let mut pathname = tokens[path_start..path_end].to_vec();
    if pathname.is_empty() && has_authority {
        pathname.push(Token::Char('/'));
    }
    out[Component::Pathname.index()] = Some(pathname);

    if path_end < tokens.len() {
        if tokens[path_end].is_char('?') {
            let search_start = path_end + 1;
            let search_end = top_level_find(tokens, search_start, |t| t.is_char('#'))
                .unwrap_or(tokens.len());
            out[Component::Search.index()] = Some(tokens[search_start..search_end].to_vec());
            if search_end < tokens.len() {
                out[Component::Hash.index()] = Some(tokens[search_end + 1..].to_vec());
            }
        } else {
            // A hash with no search pins the search to empty.
            out[Component::Search.index()] = Some(Vec::new());
            out[Component::Hash.index()] = Some(tokens[path_end + 1..].to_vec());
        }
    }

    Ok(out)
}

fn split_authority(tokens: &[Token], out: &mut ComponentTokens) -> Result<(), PatternError> {
    let host_port = match top_level_rfind(tokens, |t| t.is_char('@')) {
        Some(at) => {
            let userinfo = &tokens[..at];
            match top_level_find(userinfo, 0, |t| t.is_char(':')) {
                Some(colon) => {
                    out[Component::Username.index()] = Some(userinfo[..colon].to_vec());
                    out[Component::Password.index()] = Some(userinfo[colon + 1..].to_vec());
                }
                None => out[Component::Username.index()] = Some(userinfo.to_vec()),
            }
            &tokens[at + 1..]
        }
        None => tokens,
    };

    let port_colon = if host_port.first().is_some_and(|t| t.is_char('[')) {
        let close = top_level_find(host_port, 0, |t| t.is_char(']'))
            .ok_or_else(|| invalid("unterminated IPv6 host"))?;
        host_port.get(close + 1).filter(|t| t.is_char(':')).map(|_| close + 1)
    } else {
        top_level_find(host_port, 0, |t| t.is_char(':'))
    };

    match port_colon {
        Some(colon) => {
            out[Component::Hostname.index()] = Some(host_port[..colon].to_vec());
            out[Component::Port.index()] = Some(host_port[colon + 1..].to_vec());
        }
        None => out[Component::Hostname.index()] = Some(host_port.to_vec()),
    }

    if out[Component::Hostname.index()].as_ref().is_some_and(Vec::is_empty) {
        return Err(invalid("empty hostname"));
    }
    Ok(())
}

// =============================================================================
// Component Compilation
// =============================================================================

/// Regex group name and public capture name.
#[derive(Debug, Clone)]
struct GroupSlot {
    key: String,
    name: String,
}

#[derive(Debug)]
struct ComponentMatcher {
    component: Component,
    regex: Regex,
    slots: Vec<GroupSlot>,
}

struct ComponentCompiler {
    component: Component,
    slots: Vec<GroupSlot>,
    positional: usize,
}

impl ComponentCompiler {
    fn new(component: Component) -> Self {
        Self {
            component,
            slots: Vec::new(),
            positional: 0,
        }
    }

    fn segment_wildcard(&self) -> String {
        match self.component.segment_delimiter() {
            Some(delim) => format!("[^{}]+?", fancy_regex::escape(&delim.to_string())),
            None => ".+?".to_string(),
        }
    }

    fn slot(&mut self, name: Option<&str>) -> String {
        let key = format!("g{}", self.slots.len());
        let name = match name {
            Some(name) => name.to_string(),
            None => {
                let index = self.positional;
                self.positional += 1;
                index.to_string()
            }
        };
        self.slots.push(GroupSlot { key: key.clone(), name });
        key
    }

    fn emit(&mut self, tokens: &[Token], out: &mut String) -> Result<(), PatternError> {
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Char(c) | Token::Escaped(c) => {
                    out.push_str(&fancy_regex::escape(&c.to_string()));
                    i += 1;
                }
                Token::Name(name) => {
                    let (body, next) = match tokens.get(i + 1) {
                        Some(Token::Regex(body)) => (body.clone(), i + 2),
                        _ => (self.segment_wildcard(), i + 1),
                    };
                    let (modifier, next) = take_modifier(tokens, next);
                    let name = name.clone();
                    self.emit_group(Some(&name), &body, modifier, tokens, i, out);
                    i = next;
                }
                Token::Regex(body) => {
                    let (modifier, next) = take_modifier(tokens, i + 1);
                    let body = body.clone();
                    self.emit_group(None, &body, modifier, tokens, i, out);
                    i = next;
                }
                Token::Asterisk => {
                    let (modifier, next) = take_modifier(tokens, i + 1);
                    self.emit_group(None, ".*", modifier, tokens, i, out);
                    i = next;
                }
                Token::Open => {
                    let close = matching_close(tokens, i)?;
                    let mut inner = String::new();
                    self.emit(&tokens[i + 1..close], &mut inner)?;
                    let (modifier, next) = take_modifier(tokens, close + 1);
                    out.push_str("(?:");
                    out.push_str(&inner);
                    out.push(')');
                    if let Some(m) = modifier {
                        out.push(m);
                    }
                    i = next;
                }
                Token::Close => return Err(invalid("unbalanced '}'")),
                Token::Modifier(m) => {
                    out.push_str(&fancy_regex::escape(&m.to_string()));
                    i += 1;
                }
            }
        }
        Ok(())
    }

    /// Emit one capturing group. In `pathname`, an optional or repeated
    /// group directly after a '/' takes that '/' with it.
    fn emit_group(
        &mut self,
        name: Option<&str>,
        body: &str,
        modifier: Option<char>,
        tokens: &[Token],
        at: usize,
        out: &mut String,
    ) {
        let key = self.slot(name);
        let slash_prefix = self.component == Component::Pathname
            && modifier.is_some()
            && at > 0
            && tokens[at - 1].is_char('/');

        match (modifier, slash_prefix) {
            (None, _) => out.push_str(&format!("(?P<{key}>{body})")),
            (Some(m), true) => {
                out.pop();
                let repeated = format!("(?:{body})(?:/(?:{body}))*");
                match m {
                    '?' => out.push_str(&format!("(?:/(?P<{key}>{body}))?")),
                    '+' => out.push_str(&format!("/(?P<{key}>{repeated})")),
                    _ => out.push_str(&format!("(?:/(?P<{key}>{repeated}))?")),
                }
            }
            (Some(m), false) => match m {
                '?' => out.push_str(&format!("(?P<{key}>{body})?")),
                '+' => out.push_str(&format!("(?P<{key}>(?:{body})+)")),
                _ => out.push_str(&format!("(?P<{key}>(?:{body})*)")),
            },
        }
    }
}

fn take_modifier(tokens: &[Token], at: usize) -> (Option<char>, usize) {
    match tokens.get(at) {
        Some(Token::Modifier(m)) => (Some(*m), at + 1),
        _ => (None, at),
    }
}

fn matching_close(tokens: &[Token], open: usize) -> Result<usize, PatternError> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(invalid("unbalanced '{'"))
}

fn compile_component(component: Component, tokens: &[Token]) -> Result<ComponentMatcher, PatternError> {
    let mut builder = ComponentCompiler::new(component);
    let mut body = String::new();
    builder.emit(tokens, &mut body)?;

    let regex = Regex::new(&format!("(?i)^{body}$")).map_err(|e| {
        invalid(format!("{} does not compile: {e}", component.name()))
    })?;

    Ok(ComponentMatcher {
        component,
        regex,
        slots: builder.slots,
    })
}

// =============================================================================
// Matcher
// =============================================================================

/// A compiled URL pattern.
#[derive(Debug)]
pub struct UrlPatternMatcher {
    components: Vec<ComponentMatcher>,
}

impl UrlPatternMatcher {
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let tokens = tokenize(pattern)?;
        let split = split_components(&tokens)?;

        let components = Component::ALL
            .iter()
            .zip(split.iter())
            .filter_map(|(component, tokens)| tokens.as_ref().map(|t| (*component, t)))
            .map(|(component, tokens)| compile_component(component, tokens))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { components })
    }

    pub fn captures(&self, url: &str) -> Option<UrlPatternCaptures> {
        let parts = split_url(url)?;
        let mut result = UrlPatternCaptures::default();
        result.push_positional(Some(url.to_string()));

        // Left-out components match anything.
        for component in Component::ALL {
            let input = parts.get(component);
            let mut groups = BTreeMap::new();
            groups.insert("0".to_string(), Some(input.to_string()));
            result.set(
                component,
                ComponentMatch {
                    input: input.to_string(),
                    groups,
                },
            );
        }

        for matcher in &self.components {
            let input = parts.get(matcher.component);
            let captures = match matcher.regex.captures(input) {
                Ok(Some(captures)) => captures,
                Ok(None) => return None,
                Err(e) => {
                    log::debug!("URL pattern {} failed on {input:?}: {e}", matcher.component.name());
                    return None;
                }
            };

            let mut groups = BTreeMap::new();
            for slot in &matcher.slots {
                // Group values are percent-decoded once; inputs stay raw.
                let value = captures.name(&slot.key).map(|m| decode_once(m.as_str()));
                result.push_positional(value.clone());
                groups.insert(slot.name.clone(), value);
            }

            result.set(
                matcher.component,
                ComponentMatch {
                    input: input.to_string(),
                    groups,
                },
            );
        }

        Some(result)
    }
}

/// Percent-decode once, keeping the raw value when it is not valid UTF-8.
fn decode_once(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
