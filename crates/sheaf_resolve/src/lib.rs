//! Asset resolution: mapping stylesheet references to files and public URLs.
//!
//! A reference is either bare (`css/site.less`, looked up under the primary
//! asset root) or module-qualified (`blog:css/theme.less`, looked up under the
//! root registered for `blog`). Path-style references whose first segment
//! names a module (`blog/css/theme.less`) are normalized into the qualified
//! form, so the same file always resolves under a single identity.

#![warn(missing_docs)]

pub mod error;
pub mod reference;
pub mod registry;
pub mod resolver;

pub use error::{ResolutionFailure, ResolutionKind};
pub use reference::{canonical_module_name, AssetReference, MODULE_DELIMITER};
pub use registry::{ModuleRegistry, ModuleRoot, StaticRegistry};
pub use resolver::{AssetResolver, ImportResolver, ResolvedAsset};
