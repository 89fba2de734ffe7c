//! `tagbump promote` command - Write a new version and advance the branch.

use std::time::Duration;

use anyhow::{Context, Result};
use tagbump_core::{
    Config, FieldPath, ObjectStore, PromotionRequest, PromotionStatus, RetryPolicy,
    TransactionRunner,
};
use tokio::runtime::Runtime;

use crate::commands::PromoteArgs;
use crate::commands::utils::{self, Registry, Store};
use crate::output;

/// Run the promote command.
pub fn run(args: &PromoteArgs, config: &Config) -> Result<()> {
    let request = build_request(args, config)?;
    let policy = RetryPolicy::new(
        args.retry_count.unwrap_or(config.retry.attempts),
        Duration::from_millis(args.retry_delay_ms.unwrap_or(config.retry.delay_ms)),
    );

    let rt = utils::runtime()?;
    let registry = utils::registry(&rt, args)?;

    match utils::open_store(&args.target, config)? {
        Store::GitHub(store) => promote(&rt, &store, &registry, &request, &policy),
        Store::Local(repo) => promote(&rt, &repo, &registry, &request, &policy),
    }
}

fn build_request(args: &PromoteArgs, config: &Config) -> Result<PromotionRequest> {
    let field = FieldPath::parse(&args.target.field)?;
    let repository_field = args
        .repository_field
        .as_deref()
        .map(FieldPath::parse)
        .transpose()?;
    let message_name = args
        .message_name
        .clone()
        .or_else(|| config.commit.message_name.clone())
        .unwrap_or_else(|| utils::repository_name(&args.target));

    Ok(PromotionRequest {
        ref_name: utils::qualified_ref(&args.target.git_ref),
        path: args.target.path.trim_matches('/').to_string(),
        field,
        repository_field,
        new_version: args.new_version.trim().to_string(),
        message_name,
        identity: config.commit.identity(),
    })
}

fn promote<S: ObjectStore>(
    rt: &Runtime,
    store: &S,
    registry: &Registry,
    request: &PromotionRequest,
    policy: &RetryPolicy,
) -> Result<()> {
    output::info(&format!(
        "Promoting {} in {} on {} to {}",
        request.field, request.path, request.ref_name, request.new_version
    ));

    let runner = TransactionRunner::new(store, registry);
    let outcome = rt.block_on(runner.run(request, policy))?;

    if let Some(status) = &outcome.registry {
        output::registry(&request.new_version, status);
    }

    let line = output::status_line(request.field.as_str(), &outcome.status);
    match outcome.status {
        PromotionStatus::Updated { .. } => {
            output::success(&line);
            output::detail(&format!(
                "  {} is now at {}",
                request.ref_name,
                outcome.commit.short()
            ));
        }
        PromotionStatus::Unchanged { .. } => output::info(&line),
    }
    if outcome.attempts > 1 {
        output::detail(&format!(
            "  committed after {} attempts (the branch moved concurrently)",
            outcome.attempts
        ));
    }

    let commit = outcome.commit.to_string();
    output::essential(&commit);
    output::github_output("commit", &commit).context("Failed to write GITHUB_OUTPUT")?;

    Ok(())
}
