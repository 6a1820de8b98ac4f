use std::error::Error;

use log::debug;

use crate::{api::Treefetch, config::TreefetchConfig, model::FetchRequest};

use super::args::CliArgs;

/// Handler to the fetch operation. Prints the store path of the fetched
/// tree on stdout, everything else goes to the log.
pub fn do_fetch(args: CliArgs, config: TreefetchConfig) -> Result<(), Box<dyn Error>> {
    let mut builder = Treefetch::builder().restricted(args.restricted);

    if let Some(directory) = args.cache_directory.or(config.cache_dir) {
        builder = builder.cache_directory(directory);
    }
    if let Some(directory) = args.store_directory.or(config.store_dir) {
        builder = builder.store_directory(directory);
    }

    let treefetch = builder.try_build()?;

    let mut request = FetchRequest::new(args.url);
    if let Some(rev) = args.rev {
        request = request.with_rev(rev);
    }

    let tree = treefetch.fetch(&request)?;
    debug!("revision {} fetched to {}", tree.commit, tree.path);

    println!("{}", tree.path);

    Ok(())
}
