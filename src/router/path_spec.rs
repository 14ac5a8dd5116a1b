//! Compiled path templates.

use std::fmt;

use regex::Regex;

use crate::router::error::Error;

/// One template segment.
#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    /// `{name}`: any single non-empty segment.
    Named(String),
    /// `{name:regex}`: a single segment the regex matches in full.
    NamedPattern(String, Regex),
    /// Trailing `*`: whatever is left of the path, possibly nothing.
    Tail,
}

/// Parameters captured by a successful match, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A path template compiled once at registration time.
///
/// Templates are split on `/` after stripping leading and trailing
/// slashes, and matched one segment against one path segment, left to
/// right, with no backtracking.
#[derive(Debug, Clone)]
pub struct PathSpec {
    template: String,
    segments: Vec<Segment>,
}

impl PathSpec {
    /// Compile a template such as `/users/{id:[0-9]+}/posts/{slug}`.
    pub fn compile(template: &str) -> Result<Self, Error> {
        let pieces = split(template);
        let last = pieces.len().saturating_sub(1);
        let mut segments = Vec::with_capacity(pieces.len());

        for (idx, piece) in pieces.into_iter().enumerate() {
            let segment = if piece == "*" {
                if idx != last {
                    return Err(Error::pattern(template, "'*' is only allowed as the last segment"));
                }
                Segment::Tail
            } else if let Some(inner) = piece.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                let (name, pattern) = match inner.split_once(':') {
                    Some((name, pattern)) => (name.trim(), Some(pattern)),
                    None => (inner.trim(), None),
                };
                if name.is_empty() {
                    return Err(Error::pattern(template, "parameter without a name"));
                }
                match pattern {
                    Some(pattern) => {
                        let regex = Regex::new(&format!("^(?:{pattern})$"))
                            .map_err(|err| Error::pattern(template, err.to_string()))?;
                        Segment::NamedPattern(name.to_string(), regex)
                    }
                    None => Segment::Named(name.to_string()),
                }
            } else {
                Segment::Literal(piece.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// A spec matching every path.
    pub fn any() -> Self {
        Self {
            template: "/*".to_string(),
            segments: vec![Segment::Tail],
        }
    }

    /// The template this spec was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match `path` (without query string), returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut parts = split(path).into_iter();
        let mut params = Vec::new();

        for segment in &self.segments {
            if let Segment::Tail = segment {
                return Some(PathParams(params));
            }
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Named(name) if !part.is_empty() => {
                    params.push((name.clone(), part.to_string()));
                }
                Segment::NamedPattern(name, regex) if !part.is_empty() && regex.is_match(part) => {
                    params.push((name.clone(), part.to_string()));
                }
                _ => return None,
            }
        }

        match parts.next() {
            Some(_) => None,
            None => Some(PathParams(params)),
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Segments of a path with leading and trailing slashes removed.
fn split(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}
