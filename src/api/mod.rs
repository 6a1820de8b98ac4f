use std::error::Error;

use crate::{
    cache::ArtifactCache,
    export::GitExporter,
    fetch,
    mirror::GitMirror,
    model::{FetchRequest, FetchedTree},
    store::ArtifactStore,
};

mod builder;

pub use builder::TreefetchBuilder;

/// Production wiring of the fetch pipeline: a git-backed mirror, the
/// per-commit pointer cache next to it, an exporter reading the same mirror,
/// and an artifact store.
pub struct Treefetch {
    mirror: GitMirror,
    cache: ArtifactCache,
    exporter: GitExporter,
    store: Box<dyn ArtifactStore>,
    restricted: bool,
}

impl Treefetch {
    pub fn builder() -> TreefetchBuilder {
        TreefetchBuilder::default()
    }

    /// Fetches the requested revision and returns its materialized tree.
    pub fn fetch(&self, request: &FetchRequest) -> Result<FetchedTree, Box<dyn Error>> {
        let tree = fetch::fetch_tree(
            request,
            &self.mirror,
            &self.cache,
            &self.exporter,
            self.store.as_ref(),
            self.restricted,
        )?;
        Ok(tree)
    }
}
