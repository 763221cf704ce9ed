//! Keyword name resolution
//!
//! Suite keywords shadow imported libraries, which shadow BuiltIn. A
//! qualified `Owner.Keyword` name skips the search and goes straight to
//! the named owner.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::keywords::{normalize_name, KeywordError, Library, LibraryRegistry, BUILTIN_LIBRARY};
use crate::models::{KeywordDefinition, Suite};

/// Something a keyword call can run
#[derive(Clone)]
pub enum Invocable<'a> {
    /// Keyword defined in the suite
    User(&'a KeywordDefinition),
    /// Keyword provided by a library
    Library {
        library: Arc<dyn Library>,
        /// Normalized keyword name
        keyword: String,
    },
}

impl Invocable<'_> {
    /// Library name, or the suite name for user keywords
    pub fn owner<'s>(&'s self, suite: &'s str) -> &'s str {
        match self {
            Invocable::User(_) => suite,
            Invocable::Library { library, .. } => library.name(),
        }
    }
}

/// Name lookup for one suite run
pub struct KeywordResolver<'a> {
    suite_name: &'a str,
    user: HashMap<String, &'a KeywordDefinition>,
    imported: Vec<Arc<dyn Library>>,
    builtin: Option<Arc<dyn Library>>,
}

impl<'a> KeywordResolver<'a> {
    /// Resolve the suite's imports once; returns the resolver and one
    /// error message per library that could not be imported
    pub fn new(suite: &'a Suite, registry: &LibraryRegistry) -> (Self, Vec<String>) {
        let mut errors = Vec::new();
        let mut imported: Vec<Arc<dyn Library>> = Vec::new();

        for import in suite.imports() {
            if normalize_name(&import.library) == normalize_name(BUILTIN_LIBRARY) {
                continue;
            }
            match registry.get(&import.library) {
                Some(library) => {
                    debug!("Imported library '{}'", library.name());
                    imported.push(library);
                }
                None => errors.push(format!(
                    "Importing library '{}' failed: No library with that name.",
                    import.library
                )),
            }
        }

        let user = suite
            .keywords()
            .iter()
            .map(|k| (normalize_name(k.name()), k))
            .collect();

        let resolver = Self {
            suite_name: suite.name(),
            user,
            imported,
            builtin: registry.builtin(),
        };
        (resolver, errors)
    }

    pub fn suite_name(&self) -> &'a str {
        self.suite_name
    }

    /// Find what `name` refers to
    pub fn resolve(&self, name: &str) -> Result<Invocable<'a>, KeywordError> {
        let normalized = normalize_name(name);

        if let Some(found) = self.resolve_exact(name, &normalized)? {
            return Ok(found);
        }

        if let Some((owner, keyword)) = normalized.rsplit_once('.') {
            if let Some(found) = self.resolve_qualified(owner, keyword) {
                return Ok(found);
            }
        }

        Err(KeywordError::NotFound(name.to_string()))
    }

    fn resolve_exact(
        &self,
        name: &str,
        normalized: &str,
    ) -> Result<Option<Invocable<'a>>, KeywordError> {
        if let Some(definition) = self.user.get(normalized) {
            return Ok(Some(Invocable::User(*definition)));
        }

        let matches: Vec<&Arc<dyn Library>> = self
            .imported
            .iter()
            .filter(|l| l.has_keyword(normalized))
            .collect();

        match matches.as_slice() {
            [] => {}
            [library] => return Ok(Some(library_keyword(library, normalized))),
            many => {
                let candidates = many
                    .iter()
                    .map(|l| {
                        let keyword = l.keyword_name(normalized).unwrap_or(normalized);
                        format!("{}.{}", l.name(), keyword)
                    })
                    .collect();
                return Err(KeywordError::Ambiguous {
                    name: name.to_string(),
                    candidates,
                });
            }
        }

        Ok(self
            .builtin
            .as_ref()
            .filter(|b| b.has_keyword(normalized))
            .map(|b| library_keyword(b, normalized)))
    }

    fn resolve_qualified(&self, owner: &str, keyword: &str) -> Option<Invocable<'a>> {
        if owner == normalize_name(self.suite_name) {
            return self.user.get(keyword).map(|d| Invocable::User(*d));
        }

        self.imported
            .iter()
            .chain(self.builtin.iter())
            .find(|l| normalize_name(l.name()) == owner && l.has_keyword(keyword))
            .map(|l| library_keyword(l, keyword))
    }
}

fn library_keyword(library: &Arc<dyn Library>, keyword: &str) -> Invocable<'static> {
    Invocable::Library {
        library: Arc::clone(library),
        keyword: keyword.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::{KeywordContext, ReturnValue};
    use async_trait::async_trait;

    struct Fake(&'static str);

    #[async_trait]
    impl Library for Fake {
        fn name(&self) -> &str {
            self.0
        }

        fn keyword_names(&self) -> &[&'static str] {
            &["Log", "Run"]
        }

        async fn run_keyword(
            &self,
            _name: &str,
            _args: &[String],
            _ctx: &mut KeywordContext,
        ) -> Result<ReturnValue, KeywordError> {
            Ok(ReturnValue::None)
        }
    }

    fn registry() -> LibraryRegistry {
        let mut registry = LibraryRegistry::standard();
        registry.register(Arc::new(Fake("Alpha")));
        registry.register(Arc::new(Fake("Beta")));
        registry
    }

    fn owner_of(invocable: &Invocable<'_>) -> String {
        invocable.owner("Suite").to_string()
    }

    #[test]
    fn test_builtin_without_imports() {
        let suite = Suite::new("Suite");
        let registry = registry();
        let (resolver, errors) = KeywordResolver::new(&suite, &registry);
        assert!(errors.is_empty());
        assert_eq!(owner_of(&resolver.resolve("log").unwrap()), "BuiltIn");
        assert!(matches!(
            resolver.resolve("Run And Return Rc"),
            Err(KeywordError::NotFound(_))
        ));
    }

    #[test]
    fn test_imported_library_shadows_builtin() {
        let mut suite = Suite::new("Suite");
        suite.add_library_import("Alpha").unwrap();
        let registry = registry();
        let (resolver, _) = KeywordResolver::new(&suite, &registry);
        assert_eq!(owner_of(&resolver.resolve("Log").unwrap()), "Alpha");
        assert_eq!(owner_of(&resolver.resolve("BuiltIn.Log").unwrap()), "BuiltIn");
    }

    #[test]
    fn test_two_imports_are_ambiguous() {
        let mut suite = Suite::new("Suite");
        suite.add_library_import("Alpha").unwrap();
        suite.add_library_import("Beta").unwrap();
        let registry = registry();
        let (resolver, _) = KeywordResolver::new(&suite, &registry);

        match resolver.resolve("Run") {
            Err(KeywordError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates, vec!["Alpha.Run", "Beta.Run"]);
            }
            _ => panic!("expected ambiguity"),
        }
        assert_eq!(owner_of(&resolver.resolve("Beta.Run").unwrap()), "Beta");
    }

    #[test]
    fn test_suite_keyword_shadows_everything() {
        let mut suite = Suite::new("Suite");
        suite.add_library_import("Alpha").unwrap();
        suite.define_keyword("Log", Vec::<String>::new()).unwrap();
        let registry = registry();
        let (resolver, _) = KeywordResolver::new(&suite, &registry);

        assert!(matches!(resolver.resolve("log").unwrap(), Invocable::User(_)));
        assert!(matches!(resolver.resolve("Suite.Log").unwrap(), Invocable::User(_)));
        assert_eq!(owner_of(&resolver.resolve("Alpha.Log").unwrap()), "Alpha");
    }

    #[test]
    fn test_unknown_import_reported() {
        let mut suite = Suite::new("Suite");
        suite.add_library_import("Collections").unwrap();
        suite.add_library_import("BuiltIn").unwrap();
        let registry = registry();
        let (_, errors) = KeywordResolver::new(&suite, &registry);
        assert_eq!(
            errors,
            vec!["Importing library 'Collections' failed: No library with that name."]
        );
    }
}
