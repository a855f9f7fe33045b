use std::fmt;

use smol_str::SmolStr;

/// A module URL as written in source. May be relative, may be schemeless, may
/// use a custom scheme. Immutable and compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleUrl(SmolStr);

/// A URL that uniquely and stably identifies one loadable module, independent
/// of how a request reached it.
pub type CanonicalId = ModuleUrl;

impl ModuleUrl {
  pub fn new(url: impl AsRef<str>) -> Self {
    Self(SmolStr::new(url))
  }

  #[inline]
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The RFC 3986 scheme, if the URL has one.
  pub fn scheme(&self) -> Option<&str> {
    scheme_of(&self.0)
  }

  /// A schemeless URL, only meaningful relative to some base.
  #[inline]
  pub fn is_relative(&self) -> bool {
    self.scheme().is_none()
  }

  /// The path component, with scheme and authority stripped and query and
  /// fragment excluded.
  pub fn path(&self) -> &str {
    let rest = &self.0[self.prefix_len()..];
    match rest.find(|c| c == '?' || c == '#') {
      Some(end) => &rest[..end],
      None => rest,
    }
  }

  /// The final segment of the path.
  pub fn basename(&self) -> &str {
    let path = self.path();
    match path.rfind('/') {
      Some(i) => &path[i + 1..],
      None => path,
    }
  }

  /// Resolves `reference` against this URL per RFC 3986 section 5.2,
  /// tolerating a schemeless base. An absolute reference wins outright.
  pub fn resolve(&self, reference: &str) -> ModuleUrl {
    if reference.is_empty() {
      return self.clone();
    }
    if scheme_of(reference).is_some() {
      return ModuleUrl::new(reference);
    }
    if let Some(rest) = reference.strip_prefix("//") {
      return match self.scheme() {
        Some(scheme) => ModuleUrl::new(format!("{}://{}", scheme, rest)),
        None => ModuleUrl::new(reference),
      };
    }

    let prefix = &self.0[..self.prefix_len()];
    let (ref_path, tail) = split_tail(reference);
    if ref_path.is_empty() {
      // query- or fragment-only reference keeps the base path
      return ModuleUrl::new(format!("{}{}{}", prefix, self.path(), tail));
    }

    let merged = if ref_path.starts_with('/') {
      remove_dot_segments(ref_path)
    } else {
      let base_path = self.path();
      let dir = match base_path.rfind('/') {
        Some(i) => &base_path[..=i],
        None => "",
      };
      remove_dot_segments(&format!("{}{}", dir, ref_path))
    };
    ModuleUrl::new(format!("{}{}{}", prefix, merged, tail))
  }

  /// This URL with the final path segment replaced by `name`. Query and
  /// fragment are dropped.
  pub fn with_basename(&self, name: &str) -> ModuleUrl {
    let prefix_len = self.prefix_len();
    let path = self.path();
    let dir_end = prefix_len
      + match path.rfind('/') {
        Some(i) => i + 1,
        None => 0,
      };
    ModuleUrl::new(format!("{}{}", &self.0[..dir_end], name))
  }

  // Byte length of the scheme and authority portion.
  fn prefix_len(&self) -> usize {
    let s = self.0.as_str();
    let mut len = match scheme_of(s) {
      Some(scheme) => scheme.len() + 1,
      None => 0,
    };
    if s[len..].starts_with("//") {
      let rest = &s[len + 2..];
      let authority = rest
        .find(|c| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
      len += 2 + authority;
    }
    len
  }
}

impl fmt::Display for ModuleUrl {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ModuleUrl {
  fn from(url: &str) -> Self {
    Self::new(url)
  }
}

fn scheme_of(s: &str) -> Option<&str> {
  let colon = s.find(':')?;
  let candidate = &s[..colon];
  let mut chars = candidate.chars();
  let first = chars.next()?;
  if !first.is_ascii_alphabetic() {
    return None;
  }
  if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
    Some(candidate)
  } else {
    None
  }
}

fn split_tail(s: &str) -> (&str, &str) {
  match s.find(|c| c == '?' || c == '#') {
    Some(i) => s.split_at(i),
    None => (s, ""),
  }
}

// RFC 3986 section 5.2.4.
fn remove_dot_segments(path: &str) -> String {
  let absolute = path.starts_with('/');
  let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
  let mut segments: Vec<&str> = Vec::new();
  for segment in path.split('/').filter(|s| !s.is_empty()) {
    match segment {
      "." => {}
      ".." => {
        if matches!(segments.last(), Some(s) if *s != "..") {
          segments.pop();
        } else if !absolute {
          segments.push("..");
        }
      }
      _ => segments.push(segment),
    }
  }

  let mut out = String::new();
  if absolute {
    out.push('/');
  }
  out.push_str(&segments.join("/"));
  if trailing && !out.is_empty() && !out.ends_with('/') {
    out.push('/');
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scheme() {
    assert_eq!(ModuleUrl::new("file:/x.scss").scheme(), Some("file"));
    assert_eq!(ModuleUrl::new("pkg+git:x").scheme(), Some("pkg+git"));
    assert_eq!(ModuleUrl::new("./a/b:c").scheme(), None);
    assert_eq!(ModuleUrl::new("partials/_x.scss").scheme(), None);
  }

  #[test]
  fn resolve_relative() {
    let base = ModuleUrl::new("file:/dir/main.scss");
    assert_eq!(base.resolve("./y").as_str(), "file:/dir/y");
    assert_eq!(base.resolve("y.scss").as_str(), "file:/dir/y.scss");
    assert_eq!(base.resolve("../other/y").as_str(), "file:/other/y");
    assert_eq!(base.resolve("/abs.scss").as_str(), "file:/abs.scss");
  }

  #[test]
  fn resolve_absolute_reference_wins() {
    let base = ModuleUrl::new("file:/dir/main.scss");
    assert_eq!(base.resolve("pkg:lib").as_str(), "pkg:lib");
  }

  #[test]
  fn resolve_schemeless_base() {
    let base = ModuleUrl::new("a/b/main.scss");
    assert_eq!(base.resolve("../up.scss").as_str(), "a/up.scss");
    assert_eq!(base.resolve("sib").as_str(), "a/b/sib");
  }

  #[test]
  fn resolve_with_authority() {
    let base = ModuleUrl::new("https://host/a/b.scss");
    assert_eq!(base.resolve("c.scss").as_str(), "https://host/a/c.scss");
    assert_eq!(base.resolve("/c.scss").as_str(), "https://host/c.scss");
  }

  #[test]
  fn basename_substitution() {
    let url = ModuleUrl::new("a/b");
    assert_eq!(url.with_basename("_name.ext").as_str(), "a/_name.ext");
    let url = ModuleUrl::new("file:/dir/x.scss");
    assert_eq!(url.with_basename("_x.scss").as_str(), "file:/dir/_x.scss");
  }

  #[test]
  fn basename() {
    assert_eq!(ModuleUrl::new("scheme:/dir/_name.ext").basename(), "_name.ext");
    assert_eq!(ModuleUrl::new("plain").basename(), "plain");
  }
}
