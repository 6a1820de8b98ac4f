use std::{env, error::Error, path::PathBuf};

use home::home_dir;

use crate::{
    cache::ArtifactCache,
    export::GitExporter,
    git::GitCli,
    mirror::GitMirror,
    store::{ArtifactStore, LocalStore},
    Treefetch,
};

#[derive(Default)]
pub struct TreefetchBuilder {
    cache_directory: Option<PathBuf>,
    store_directory: Option<PathBuf>,
    store: Option<Box<dyn ArtifactStore>>,
    restricted: bool,
}

impl TreefetchBuilder {
    /// Location of the mirror repository and its cache pointers.
    ///
    /// Defaults to `$XDG_CACHE_HOME/treefetch/git`, falling back to
    /// `$HOME/.cache/treefetch/git`.
    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory = Some(path.into());
        self
    }

    /// Location of the built-in artifact store.
    ///
    /// Defaults to `$XDG_CACHE_HOME/treefetch/store`. Ignored when a custom
    /// store is injected.
    pub fn store_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_directory = Some(path.into());
        self
    }

    /// Substitutes the artifact store collaborator; the embedding system's
    /// own store goes here.
    pub fn store(mut self, store: Box<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Rejects every fetch up front. Set when running under a restricted or
    /// sandboxed evaluation.
    pub fn restricted(mut self, restricted: bool) -> Self {
        self.restricted = restricted;
        self
    }

    /// Wires the pipeline together. Touches no filesystem state; the mirror,
    /// cache and store directories appear lazily inside the first successful
    /// fetch.
    pub fn try_build(self) -> Result<Treefetch, Box<dyn Error>> {
        let Self {
            cache_directory,
            store_directory,
            store,
            restricted,
        } = self;

        let cache_directory = match cache_directory {
            Some(dir) => dir,
            None => default_base_directory().join("git"),
        };

        let store = match store {
            Some(store) => store,
            None => {
                let store_directory =
                    store_directory.unwrap_or_else(|| default_base_directory().join("store"));
                Box::new(LocalStore::new(store_directory))
            }
        };

        let mirror = GitMirror::new(cache_directory.clone(), Box::new(GitCli));
        let cache = ArtifactCache::new(cache_directory.clone());
        let exporter = GitExporter::new(cache_directory, Box::new(GitCli));

        Ok(Treefetch {
            mirror,
            cache,
            exporter,
            store,
            restricted,
        })
    }
}

fn default_base_directory() -> PathBuf {
    match env::var_os("XDG_CACHE_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir).join("treefetch"),
        _ => home_dir()
            .expect("Could not find home dir. Please define $HOME env variable.")
            .join(".cache/treefetch"),
    }
}
