use thiserror::Error;

use crate::logger::Logger;
use crate::url::ModuleUrl;

/// The source dialect a module is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
  Scss,
  Indented,
  Css,
}

impl Syntax {
  /// Picks a syntax from a URL's extension, defaulting to SCSS.
  pub fn for_url(url: &ModuleUrl) -> Self {
    match url.path().rsplit('.').next() {
      Some("sass") => Syntax::Indented,
      Some("css") => Syntax::Css,
      _ => Syntax::Scss,
    }
  }
}

/// Malformed module content. Fatal: propagated to the caller, never cached.
#[derive(Debug, Error)]
#[error("{url}: {message}")]
pub struct ParseError {
  pub url: ModuleUrl,
  pub message: String,
}

/// The parser seam. The cache invokes this exactly once per canonical
/// identity on a parse-cache miss.
pub trait Parser: Send + Sync {
  type Ast: Send + Sync;

  fn parse(
    &self,
    content: &str,
    syntax: Syntax,
    url: &ModuleUrl,
    logger: &dyn Logger,
  ) -> Result<Self::Ast, ParseError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn syntax_from_extension() {
    assert_eq!(Syntax::for_url(&ModuleUrl::new("file:/a.scss")), Syntax::Scss);
    assert_eq!(Syntax::for_url(&ModuleUrl::new("file:/a.sass")), Syntax::Indented);
    assert_eq!(Syntax::for_url(&ModuleUrl::new("file:/a.css")), Syntax::Css);
    assert_eq!(Syntax::for_url(&ModuleUrl::new("file:/noext")), Syntax::Scss);
  }
}
