use smol_str::SmolStr;

use crate::loader::LoaderId;
use crate::parser::Syntax;
use crate::url::{CanonicalId, ModuleUrl};

/// One successful canonicalization: the loader that claimed the URL, the
/// identity it produced, and the request URL after base resolution. The
/// loader handle indexes the registry; entries never own loader lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRecord {
  pub loader: LoaderId,
  pub canonical_id: CanonicalId,
  pub resolved_original_url: ModuleUrl,
}

/// Raw loader output. Retained after parsing only so the source-map URL can
/// still be looked up by canonical identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
  pub content: String,
  pub syntax: Syntax,
  pub source_map_url: Option<ModuleUrl>,
}

/// The module context a relative URL is resolved in: the loader that produced
/// the referencing module, and that module's URL when it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseContext {
  pub loader: LoaderId,
  pub url: Option<ModuleUrl>,
}

/// Key for resolutions performed without a base context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsoluteKey {
  pub url: SmolStr,
  pub for_import: bool,
}

/// Key for base-relative resolutions. Lives in a separate map from
/// [AbsoluteKey] so the two key-spaces can never cross-contaminate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativeKey {
  pub url: SmolStr,
  pub for_import: bool,
  pub base_loader: LoaderId,
  pub base_url: Option<ModuleUrl>,
}
