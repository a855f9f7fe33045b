use std::sync::Arc;

use ahash::RandomState;
use dashmap::DashMap;
use log::debug;
use smol_str::SmolStr;
use thiserror::Error;

use crate::loader::{Loader, LoaderId, LoaderRegistry};
use crate::logger::{Logger, QuietLogger, StdLogger};
use crate::parser::{ParseError, Parser};
use crate::types::{AbsoluteKey, BaseContext, LoadResult, RelativeKey, ResolutionRecord};
use crate::url::{CanonicalId, ModuleUrl};
use crate::utils::once_map::OnceMap;

#[derive(Debug, Error)]
pub enum ImportError {
  /// A loader hook raised while canonicalizing or loading. Never cached; the
  /// next request for the same key re-runs the hook.
  #[error("loader error: {0}")]
  Loader(anyhow::Error),
  #[error(transparent)]
  Parse(#[from] ParseError),
}

impl From<anyhow::Error> for ImportError {
  fn from(err: anyhow::Error) -> Self {
    Self::Loader(err)
  }
}

/// The import-resolution cache: resolves requested URLs to canonical module
/// identities through an ordered loader chain, loads and parses each identity
/// at most once, and serves memoized results to every later request.
///
/// One instance owns its loader registry and all three cache maps; it is
/// created per compiler session and may be retained across incremental
/// recompilations, with the two `invalidate_*` operations evicting entries
/// for files that changed on disk.
pub struct ImportCache<P: Parser> {
  registry: LoaderRegistry,
  parser: P,
  logger: Box<dyn Logger>,
  // two independent key-spaces: resolution in a base context must never be
  // served for a base-less request, and vice versa
  absolute: OnceMap<AbsoluteKey, Option<ResolutionRecord>>,
  relative: OnceMap<RelativeKey, Option<ResolutionRecord>>,
  parsed: OnceMap<CanonicalId, Option<Arc<P::Ast>>>,
  load_results: DashMap<CanonicalId, LoadResult, RandomState>,
}

impl<P: Parser> ImportCache<P> {
  pub fn new(registry: LoaderRegistry, parser: P) -> Self {
    Self::with_logger(registry, parser, Box::new(StdLogger))
  }

  pub fn with_logger(registry: LoaderRegistry, parser: P, logger: Box<dyn Logger>) -> Self {
    Self {
      registry,
      parser,
      logger,
      absolute: OnceMap::default(),
      relative: OnceMap::default(),
      parsed: OnceMap::default(),
      load_results: DashMap::default(),
    }
  }

  pub fn registry(&self) -> &LoaderRegistry {
    &self.registry
  }

  /// Resolves `url` to the loader and canonical identity that claim it.
  ///
  /// With a base context the referencing module's loader gets the first
  /// chance, keyed privately to that context; only a miss there falls through
  /// to the global chain in declaration order. Both outcomes, including "no
  /// loader claims this URL", are memoized, and concurrent requests for one
  /// key share a single hook traversal.
  pub fn canonicalize(
    &self,
    url: &str,
    base: Option<&BaseContext>,
    for_import: bool,
  ) -> Result<Option<ResolutionRecord>, ImportError> {
    if let Some(base) = base {
      let resolved = match &base.url {
        Some(base_url) => base_url.resolve(url),
        None => ModuleUrl::new(url),
      };
      let key = RelativeKey {
        url: SmolStr::new(url),
        for_import,
        base_loader: base.loader,
        base_url: base.url.clone(),
      };
      let record = self
        .relative
        .get_or_try_init(&key, || self.canonicalize_with(base.loader, &resolved, for_import))?;
      if record.is_some() {
        return Ok(record);
      }
    }

    let key = AbsoluteKey {
      url: SmolStr::new(url),
      for_import,
    };
    let requested = ModuleUrl::new(url);
    self.absolute.get_or_try_init(&key, || {
      for (id, _) in self.registry.iter() {
        if let Some(record) = self.canonicalize_with(id, &requested, for_import)? {
          return Ok(Some(record));
        }
      }
      debug!("no loader claims {:?}", url);
      Ok(None)
    })
  }

  // Runs one loader's canonicalize hook and applies the relative-canonical-URL
  // deprecation policy. Only reached on a real cache miss, so the warning
  // fires once per realized resolution rather than once per lookup.
  fn canonicalize_with(
    &self,
    loader: LoaderId,
    url: &ModuleUrl,
    for_import: bool,
  ) -> Result<Option<ResolutionRecord>, ImportError> {
    let hook = self.registry.get(loader);
    let canonical_id = match hook.canonicalize(url, for_import)? {
      Some(id) => id,
      None => return Ok(None),
    };
    if canonical_id.is_relative() {
      self.logger.warn(
        &format!(
          "Loader {} canonicalized {} to relative URL {}, which is deprecated.",
          hook.name(),
          url,
          canonical_id
        ),
        true,
      );
    }
    debug!("{} canonicalized {:?} to {:?}", hook.name(), url.as_str(), canonical_id.as_str());
    Ok(Some(ResolutionRecord {
      loader,
      canonical_id,
      resolved_original_url: url.clone(),
    }))
  }

  /// Convenience composition: canonicalize, then load and parse the result.
  /// An unresolvable URL short-circuits without attempting a load.
  pub fn import(
    &self,
    url: &str,
    base: Option<&BaseContext>,
    for_import: bool,
  ) -> Result<Option<(LoaderId, Arc<P::Ast>)>, ImportError> {
    let record = match self.canonicalize(url, base, for_import)? {
      Some(record) => record,
      None => return Ok(None),
    };
    let ast = self.import_canonical(
      record.loader,
      &record.canonical_id,
      Some(&record.resolved_original_url),
      false,
    )?;
    Ok(ast.map(|ast| (record.loader, ast)))
  }

  /// Loads and parses the module identified by `canonical_id`, at most once
  /// per identity regardless of how many requests reach it or how.
  ///
  /// `original_url` rebases loaders that legally return canonical URLs only
  /// meaningful relative to the requesting module. `quiet` silences the
  /// warning channel for this call only. A load miss is cached as "none"; a
  /// parse failure propagates and leaves the identity uncached, so it is
  /// re-attempted on the next request.
  pub fn import_canonical(
    &self,
    loader: LoaderId,
    canonical_id: &CanonicalId,
    original_url: Option<&ModuleUrl>,
    quiet: bool,
  ) -> Result<Option<Arc<P::Ast>>, ImportError> {
    self.parsed.get_or_try_init(canonical_id, || {
      let result = match self.registry.get(loader).load(canonical_id)? {
        Some(result) => result,
        None => {
          debug!("{} found nothing for {:?}", self.registry.get(loader).name(), canonical_id.as_str());
          return Ok(None);
        }
      };
      // side channel for later source-map lookup, written on every realized
      // load even though the parse cache is the gate
      self.load_results.insert(canonical_id.clone(), result.clone());

      let url = match original_url {
        Some(original) => original.resolve(canonical_id.as_str()),
        None => canonical_id.clone(),
      };
      let logger: &dyn Logger = if quiet { &QuietLogger } else { self.logger.as_ref() };
      let ast = self.parser.parse(&result.content, result.syntax, &url, logger)?;
      Ok(Some(Arc::new(ast)))
    })
  }

  /// Derives a URL fit for diagnostics: the shortest originally-written URL
  /// that resolved to this identity without a base, with its final segment
  /// replaced by the canonical basename. Base-relative entries are excluded.
  /// Falls back to the identity itself when nothing matches.
  pub fn humanize(&self, canonical_id: &CanonicalId) -> ModuleUrl {
    let mut best: Option<ModuleUrl> = None;
    self.absolute.for_each_value(|_, record| {
      if let Some(record) = record {
        if record.canonical_id == *canonical_id {
          let candidate = &record.resolved_original_url;
          let shorter = match &best {
            Some(current) => candidate.path().len() < current.path().len(),
            None => true,
          };
          if shorter {
            best = Some(candidate.clone());
          }
        }
      }
    });
    match best {
      Some(url) => url.with_basename(canonical_id.basename()),
      None => canonical_id.clone(),
    }
  }

  /// The source-map URL recorded when `canonical_id` was loaded, or the
  /// identity itself if no load-result entry exists. Pure read.
  pub fn source_map_url(&self, canonical_id: &CanonicalId) -> ModuleUrl {
    self
      .load_results
      .get(canonical_id)
      .and_then(|result| result.source_map_url.clone())
      .unwrap_or_else(|| canonical_id.clone())
  }

  /// Evicts every canonicalization entry for `url`: both import kinds in the
  /// absolute cache, and every base-relative entry regardless of context.
  /// The next canonicalize for it re-runs the loader chain. Does not touch
  /// the parse or load-result caches.
  pub fn invalidate_resolution(&self, url: &str) {
    self.absolute.remove(&AbsoluteKey {
      url: SmolStr::new(url),
      for_import: false,
    });
    self.absolute.remove(&AbsoluteKey {
      url: SmolStr::new(url),
      for_import: true,
    });
    self.relative.retain(|key| key.url != url);
  }

  /// Evicts the parse and load-result entries for `canonical_id`. The next
  /// import for it re-invokes load and parse. Does not touch the
  /// canonicalization caches.
  pub fn invalidate_module(&self, canonical_id: &CanonicalId) {
    self.parsed.remove(canonical_id);
    self.load_results.remove(canonical_id);
  }

  /// Drops every cached entry at once, for hosts whose change notifications
  /// are too coarse to map to individual files.
  pub fn clear(&self) {
    self.absolute.clear();
    self.relative.clear();
    self.parsed.clear();
    self.load_results.clear();
  }
}
