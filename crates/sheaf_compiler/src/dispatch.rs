//! Routing a request to the backend for its stylesheet language.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use sheaf_resolve::ImportResolver;

use crate::compiler::StylesheetCompiler;
use crate::error::{CompileError, CompileErrorKind};
use crate::request::{CompileRequest, CompiledCss};

/// Stylesheet language, told apart by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    /// `.less` (and plain `.css`, which Less accepts as is).
    Less,
    /// `.scss` or `.sass`.
    Sass,
}

impl Language {
    /// The language of `path`, or `None` for an unknown extension.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "less" | "css" => Some(Language::Less),
            "scss" | "sass" => Some(Language::Sass),
            _ => None,
        }
    }
}

/// Compiles Less requests with one backend and Sass requests with another.
///
/// Every source of a request must share one language.
pub struct ByLanguage {
    less: Arc<dyn StylesheetCompiler>,
    sass: Arc<dyn StylesheetCompiler>,
    id: OnceLock<String>,
}

impl ByLanguage {
    /// Creates the router.
    pub fn new(less: Arc<dyn StylesheetCompiler>, sass: Arc<dyn StylesheetCompiler>) -> Self {
        Self {
            less,
            sass,
            id: OnceLock::new(),
        }
    }

    fn backend(&self, request: &CompileRequest) -> Result<&dyn StylesheetCompiler, CompileError> {
        let mut language = None;
        for source in &request.sources {
            let this = Language::of(&source.absolute_path).ok_or_else(|| {
                CompileError::new(
                    CompileErrorKind::Parse,
                    format!(
                        "{} has no known stylesheet extension",
                        source.absolute_path.display()
                    ),
                    source.reference.clone(),
                )
            })?;
            match language {
                Some(first) if first != this => {
                    return Err(CompileError::new(
                        CompileErrorKind::Parse,
                        "Less and Sass sources cannot be compiled together",
                        source.reference.clone(),
                    ));
                }
                _ => language = Some(this),
            }
        }
        Ok(match language {
            Some(Language::Sass) => self.sass.as_ref(),
            _ => self.less.as_ref(),
        })
    }
}

impl StylesheetCompiler for ByLanguage {
    fn id(&self) -> &str {
        self.id
            .get_or_init(|| format!("{}+{}", self.less.id(), self.sass.id()))
    }

    fn compile(
        &self,
        request: &CompileRequest,
        resolver: &dyn ImportResolver,
    ) -> Result<CompiledCss, CompileError> {
        self.backend(request)?.compile(request, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_resolve::{AssetReference, ResolvedAsset};
    use std::path::PathBuf;

    struct Named(&'static str);

    impl StylesheetCompiler for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn compile(
            &self,
            _request: &CompileRequest,
            _resolver: &dyn ImportResolver,
        ) -> Result<CompiledCss, CompileError> {
            Ok(CompiledCss {
                css: self.0.to_string(),
                dependencies: Vec::new(),
            })
        }
    }

    struct NoImports;

    impl ImportResolver for NoImports {
        fn resolve_import(&self, _import: &str) -> Option<ResolvedAsset> {
            None
        }
    }

    fn request(paths: &[&str]) -> CompileRequest {
        CompileRequest::new(
            paths
                .iter()
                .map(|p| ResolvedAsset {
                    reference: AssetReference::parse(p),
                    absolute_path: PathBuf::from("/site").join(p),
                    public_base_url: "/".to_string(),
                })
                .collect(),
        )
    }

    fn router() -> ByLanguage {
        ByLanguage::new(Arc::new(Named("less")), Arc::new(Named("sass")))
    }

    #[test]
    fn language_by_extension() {
        assert_eq!(Language::of(Path::new("a.less")), Some(Language::Less));
        assert_eq!(Language::of(Path::new("a.CSS")), Some(Language::Less));
        assert_eq!(Language::of(Path::new("a.scss")), Some(Language::Sass));
        assert_eq!(Language::of(Path::new("a.sass")), Some(Language::Sass));
        assert_eq!(Language::of(Path::new("a.styl")), None);
        assert_eq!(Language::of(Path::new("Makefile")), None);
    }

    #[test]
    fn routes_by_source_language() {
        let router = router();
        let less = router.compile(&request(&["a.less", "b.css"]), &NoImports).unwrap();
        assert_eq!(less.css, "less");
        let sass = router.compile(&request(&["a.scss", "b.sass"]), &NoImports).unwrap();
        assert_eq!(sass.css, "sass");
    }

    #[test]
    fn mixed_languages_are_rejected() {
        let err = router()
            .compile(&request(&["a.less", "b.scss"]), &NoImports)
            .unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Parse);
        assert_eq!(err.reference.path(), "b.scss");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = router()
            .compile(&request(&["a.styl"]), &NoImports)
            .unwrap_err();
        assert_eq!(err.reference.path(), "a.styl");
    }

    #[test]
    fn id_names_both_backends() {
        assert_eq!(router().id(), "less+sass");
    }
}
