use std::{borrow::Cow, fmt};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const COMMENT_PREFIX: &str = "#";
const ASSIGNMENT_OPERATOR: &str = "=";
const QUOTE: char = '"';

/// An env file held in memory as an ordered sequence of lines.
///
/// Lines that look like `KEY=VALUE` are tokenized so they can be matched and
/// rewritten by key; everything else (comments, blank lines, lines without an
/// assignment) is carried verbatim and written back untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvFile<'a> {
  pub lines: Vec<Line<'a>>,
}

impl<'a> fmt::Display for EnvFile<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for line in &self.lines {
      writeln!(f, "{}", line)?;
    }
    Ok(())
  }
}

impl<'a> From<&'a str> for EnvFile<'a> {
  fn from(s: &'a str) -> Self {
    #[cfg(feature = "tracing")]
    debug!("Parsing env file with {} lines", s.lines().count());

    let lines = s.lines().map(Line::from).collect();

    Self { lines }
  }
}

impl<'a> EnvFile<'a> {
  /// Returns the value of the first assignment whose key equals `key` exactly.
  pub fn get(&self, key: &str) -> Option<&str> {
    self.lines.iter().find_map(|line| {
      if let Line::Assignment { key: k, value, .. } = line
        && k.as_ref() == key
      {
        Some(value.as_ref())
      } else {
        None
      }
    })
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  /// Rewrites every assignment of `key` to a canonical `KEY="VALUE"` line,
  /// appending one at end-of-file when no line matched. Untouched lines keep
  /// their original text. Returns the previous value of the first match.
  pub fn set(&mut self, key: &str, value: &str) -> Option<Cow<'a, str>> {
    #[cfg(feature = "tracing")]
    trace!("Setting {} in file with {} lines", key, self.lines.len());

    let rendered = format!("{key}{ASSIGNMENT_OPERATOR}{QUOTE}{value}{QUOTE}");
    let mut previous = None;

    for line in &mut self.lines {
      if let Line::Assignment { key: k, value: v, raw } = line
        && k.as_ref() == key
      {
        let old = std::mem::replace(v, Cow::Owned(value.to_string()));
        if previous.is_none() {
          previous = Some(old);
        }
        *raw = Cow::Owned(rendered.clone());
      }
    }

    if previous.is_none() {
      self.lines.push(Line::Assignment {
        key: Cow::Owned(key.to_string()),
        value: Cow::Owned(value.to_string()),
        raw: Cow::Owned(rendered),
      });
    }

    previous
  }
}

/// One line of an env file.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<'a> {
  /// A `KEY=VALUE` line. The raw text is kept so that lines we never touch
  /// round-trip byte-for-byte.
  Assignment {
    key: Cow<'a, str>,
    value: Cow<'a, str>,
    raw: Cow<'a, str>,
  },
  /// Comment, blank, or anything we do not recognize. Passed through verbatim.
  Raw(Cow<'a, str>),
}

impl<'a> fmt::Display for Line<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Line::Assignment { raw, .. } => write!(f, "{}", raw),
      Line::Raw(raw) => write!(f, "{}", raw),
    }
  }
}

impl<'a> From<&'a str> for Line<'a> {
  fn from(s: &'a str) -> Self {
    let trimmed = s.trim();

    if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
      return Line::Raw(Cow::Borrowed(s));
    }

    if let Some((key, value)) = s.split_once(ASSIGNMENT_OPERATOR) {
      let key = key.trim();
      if !key.is_empty() {
        #[cfg(feature = "tracing")]
        trace!("Parsed assignment: key={}", key);

        return Line::Assignment {
          key: Cow::Borrowed(key),
          value: Cow::Borrowed(unquote(value.trim())),
          raw: Cow::Borrowed(s),
        };
      }
    }

    Line::Raw(Cow::Borrowed(s))
  }
}

/// Strips one surrounding pair of double quotes, if present. Values are
/// accepted quoted or unquoted on read; writes always quote.
fn unquote(value: &str) -> &str {
  value
    .strip_prefix(QUOTE)
    .and_then(|v| v.strip_suffix(QUOTE))
    .unwrap_or(value)
}
