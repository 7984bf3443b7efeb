//! External release gates.
//!
//! A filter can delegate the final say to an external script or webhook.
//! Both are advisory vetoes: a status other than the expected one rejects
//! the release, errors reject with a logged reason, nothing is retried.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::indexer::template;
use crate::models::{Filter, Release};

const GATE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum GateError {
    #[error("script timed out")]
    ScriptTimeout,
    #[error("script failed to run: {0}")]
    Script(#[from] std::io::Error),
    #[error("webhook failed: {0}")]
    Webhook(#[from] reqwest::Error),
    #[error("gate template failed: {0}")]
    Template(#[from] template::TemplateError),
}

/// Variables exposed to script args and webhook payload templates.
fn gate_vars(release: &Release, filter: &Filter) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("torrentName".to_string(), release.torrent_name.clone());
    vars.insert("torrentUrl".to_string(), release.torrent_url.clone());
    vars.insert("infoUrl".to_string(), release.info_url.clone());
    vars.insert("indexer".to_string(), release.indexer.clone());
    vars.insert("category".to_string(), release.category.clone());
    vars.insert("size".to_string(), release.size.to_string());
    vars.insert("filter".to_string(), filter.name.clone());
    vars
}

/// Runs the filter's external script; `Ok(true)` means the release may pass.
pub async fn run_script(release: &Release, filter: &Filter) -> Result<bool, GateError> {
    let args = template::render(&filter.external_script_args, &gate_vars(release, filter))?;

    let mut command = Command::new(&filter.external_script_cmd);
    command.args(args.split_whitespace());

    let status = timeout(GATE_TIMEOUT, command.status())
        .await
        .map_err(|_| GateError::ScriptTimeout)??;

    let code = status.code().unwrap_or(-1);
    debug!(
        cmd = %filter.external_script_cmd,
        code,
        expected = filter.external_script_expect_status,
        "external script gate finished"
    );
    Ok(code == filter.external_script_expect_status)
}

/// Posts the filter's webhook; `Ok(true)` means the release may pass.
pub async fn run_webhook(
    client: &reqwest::Client,
    release: &Release,
    filter: &Filter,
) -> Result<bool, GateError> {
    let body = template::render(&filter.external_webhook_data, &gate_vars(release, filter))?;

    let response = client
        .post(&filter.external_webhook_host)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .timeout(GATE_TIMEOUT)
        .send()
        .await?;

    let status = response.status().as_u16();
    debug!(
        host = %filter.external_webhook_host,
        status,
        expected = filter.external_webhook_expect_status,
        "external webhook gate finished"
    );
    Ok(status == filter.external_webhook_expect_status)
}
