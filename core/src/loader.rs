use std::ffi::OsStr;
use std::path::PathBuf;

use crate::types::LoadResult;
use crate::url::{CanonicalId, ModuleUrl};

/// A pluggable resolver and reader: turns a requested URL into a canonical
/// identity, and a canonical identity into raw source.
///
/// Hooks must be safely callable with schemeless or absolute URLs, and must
/// be reentrant for calls issued across different keys. Hook failures
/// propagate to the requester and are never cached.
pub trait Loader: Send + Sync {
  fn name(&self) -> &str;

  /// May legally return a schemeless URL; the cache then warns that relative
  /// canonicalization is deprecated.
  fn canonicalize(&self, url: &ModuleUrl, for_import: bool)
    -> anyhow::Result<Option<CanonicalId>>;

  fn load(&self, canonical_id: &CanonicalId) -> anyhow::Result<Option<LoadResult>>;
}

/// Light handle into a [LoaderRegistry]. Cache entries hold one of these
/// instead of owning loader lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderId(usize);

/// Immutable ordered loader chain, owned by one cache instance. Declaration
/// order doubles as resolution priority order.
pub struct LoaderRegistry {
  loaders: Vec<Box<dyn Loader>>,
}

impl LoaderRegistry {
  pub fn new(loaders: Vec<Box<dyn Loader>>) -> Self {
    Self { loaders }
  }

  #[inline]
  pub fn get(&self, id: LoaderId) -> &dyn Loader {
    &*self.loaders[id.0]
  }

  pub fn len(&self) -> usize {
    self.loaders.len()
  }

  pub fn is_empty(&self) -> bool {
    self.loaders.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (LoaderId, &dyn Loader)> {
    self
      .loaders
      .iter()
      .enumerate()
      .map(|(index, loader)| (LoaderId(index), &**loader))
  }
}

/// Assembles the loader chain the way a host environment does: explicit
/// loaders first, then one filesystem-style loader per load path, then the
/// load-path environment value, then an optional package-manifest loader.
/// Concrete loaders stay external; the builder only needs a factory that
/// wraps a directory.
pub struct LoaderRegistryBuilder<F> {
  loaders: Vec<Box<dyn Loader>>,
  filesystem: F,
}

impl<F> LoaderRegistryBuilder<F>
where
  F: Fn(PathBuf) -> Box<dyn Loader>,
{
  pub fn new(filesystem: F) -> Self {
    Self {
      loaders: Vec::new(),
      filesystem,
    }
  }

  pub fn loader(mut self, loader: Box<dyn Loader>) -> Self {
    self.loaders.push(loader);
    self
  }

  pub fn load_paths<I>(mut self, paths: I) -> Self
  where
    I: IntoIterator<Item = PathBuf>,
  {
    for path in paths {
      let loader = (self.filesystem)(path);
      self.loaders.push(loader);
    }
    self
  }

  /// Splits `value` with the platform's path-list separator (`;` on Windows,
  /// `:` elsewhere) and appends one loader per directory.
  pub fn env_load_path(self, value: &OsStr) -> Self {
    let paths: Vec<PathBuf> = std::env::split_paths(value).collect();
    self.load_paths(paths)
  }

  pub fn package_loader(self, loader: Option<Box<dyn Loader>>) -> Self {
    match loader {
      Some(loader) => self.loader(loader),
      None => self,
    }
  }

  pub fn build(self) -> LoaderRegistry {
    LoaderRegistry::new(self.loaders)
  }
}
