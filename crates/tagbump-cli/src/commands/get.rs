//! `tagbump get` command - Print the current value of a field.

use anyhow::Result;
use tagbump_core::{Config, FieldPath, NoRegistry, ObjectStore, TransactionRunner};
use tokio::runtime::Runtime;

use crate::commands::TargetArgs;
use crate::commands::utils::{self, Store};
use crate::output;

/// Run the get command.
pub fn run(target: &TargetArgs, config: &Config) -> Result<()> {
    let field = FieldPath::parse(&target.field)?;
    let ref_name = utils::qualified_ref(&target.git_ref);
    let path = target.path.trim_matches('/');
    let rt = utils::runtime()?;

    let value = match utils::open_store(target, config)? {
        Store::GitHub(store) => read(&rt, &store, &ref_name, path, &field)?,
        Store::Local(repo) => read(&rt, &repo, &ref_name, path, &field)?,
    };

    output::essential(&value);
    Ok(())
}

fn read<S: ObjectStore>(
    rt: &Runtime,
    store: &S,
    ref_name: &str,
    path: &str,
    field: &FieldPath,
) -> Result<String> {
    let runner = TransactionRunner::new(store, &NoRegistry);
    Ok(rt.block_on(runner.read_field(ref_name, path, field))?)
}
