use std::collections::HashMap;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Node;
use apollo_compiler::executable;

/// The fragment definitions of a document, by name.
#[derive(Debug, Default)]
pub(crate) struct Fragments {
    map: HashMap<String, Node<executable::Fragment>>,
}

impl Fragments {
    pub(crate) fn from_hir(document: &ExecutableDocument) -> Self {
        let map = document
            .fragments
            .iter()
            .map(|(name, fragment)| (name.as_str().to_owned(), fragment.clone()))
            .collect();
        Fragments { map }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Node<executable::Fragment>> {
        self.map.get(key)
    }
}
