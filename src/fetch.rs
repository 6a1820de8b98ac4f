use log::info;
use thiserror::Error;

use crate::{
    cache::{ArtifactCache, CacheError, CacheLookup},
    export::{ExportError, TreeExporter},
    mirror::{MirrorError, MirrorStore},
    model::{FetchRequest, FetchedTree, LocalRef, Locator, ParseError, Revision},
    store::ArtifactStore,
};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("fetching git trees is not allowed in restricted mode")]
    Restricted,
    #[error("invalid fetch request: {0}")]
    Usage(#[from] ParseError),
    #[error("error while synchronizing the mirror: {0}")]
    Mirror(#[from] MirrorError),
    #[error("error while consulting the artifact cache: {0}")]
    Cache(#[from] CacheError),
    #[error("error while exporting the tree: {0}")]
    Export(#[from] ExportError),
}

/// Fetches the requested revision and returns its materialized tree,
/// reusing a previously produced artifact whenever the cache still has a
/// valid one.
///
/// Restricted mode is rejected up front, before any filesystem or network
/// access. Input validation comes next for the same reason: nothing below
/// runs on a malformed request.
pub fn fetch_tree(
    request: &FetchRequest,
    mirror: &dyn MirrorStore,
    cache: &ArtifactCache,
    exporter: &dyn TreeExporter,
    store: &dyn ArtifactStore,
    restricted: bool,
) -> Result<FetchedTree, FetchError> {
    if restricted {
        return Err(FetchError::Restricted);
    }

    let locator = Locator::parse(&request.url)?;
    let revision = match &request.rev {
        Some(rev) => Revision::parse(rev)?,
        None => Revision::default(),
    };
    let local_ref = LocalRef::derive(&locator, &revision);

    info!("fetching git repository '{}'", locator);
    mirror.ensure()?;
    mirror.sync_ref(&locator, &revision, &local_ref)?;
    let commit = mirror.read_ref(&local_ref)?;
    info!("using revision {} of repository '{}'", commit, locator);

    let path = match cache.lookup_or_reserve(&commit, store)? {
        CacheLookup::Hit(path) => path,
        CacheLookup::Miss(slot) => {
            let path = exporter.export(&commit, store)?;
            slot.publish(&path)?;
            path
        }
    };

    Ok(FetchedTree::new(path, commit))
}
