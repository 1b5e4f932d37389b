//! Command-line parsing

use anyhow::{Context, Result, anyhow, bail};
use bleemeo_client::Resource;
use serde_json::Value;

pub const USAGE: &str = "\
Usage: bleemeo [--config PATH] [--json-logs] [--metrics] <command> [args]

Commands:
  list <resource> [key=value ...] [--limit N]   stream every matching record
  get <resource> <id> [--fields a,b]            fetch one record
  count <resource> [key=value ...]              count matching records
  create <resource> <json>                      create a record
  update <resource> <id> <json>                 partially update a record
  delete <resource> <id>                        delete a record
  tokens                                        print the OAuth token pair

Credentials come from BLEEMEO_USER / BLEEMEO_PASSWORD,
BLEEMEO_OAUTH_INITIAL_REFRESH_TOKEN or the [auth] section of the config file.
--metrics prints the client's Prometheus counters to stderr on exit.
";

#[derive(Debug, PartialEq)]
pub struct Cli {
    pub config_path: Option<String>,
    pub json_logs: bool,
    pub metrics: bool,
    pub command: Command,
}

#[derive(Debug, PartialEq)]
pub enum Command {
    List {
        resource: Resource,
        params: Vec<(String, String)>,
        limit: Option<usize>,
    },
    Get {
        resource: Resource,
        id: String,
        fields: Vec<String>,
    },
    Count {
        resource: Resource,
        params: Vec<(String, String)>,
    },
    Create {
        resource: Resource,
        body: Value,
    },
    Update {
        resource: Resource,
        id: String,
        body: Value,
    },
    Delete {
        resource: Resource,
        id: String,
    },
    Tokens,
    Help,
}

impl Cli {
    /// Parse arguments, program name excluded.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut config_path = None;
        let mut json_logs = false;
        let mut metrics = false;
        let mut fields = Vec::new();
        let mut limit = None;
        let mut positional = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    config_path = Some(iter.next().context("--config needs a path")?.clone());
                }
                "--json-logs" => json_logs = true,
                "--metrics" => metrics = true,
                "--fields" => {
                    let value = iter.next().context("--fields needs a value")?;
                    fields = value
                        .split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "--limit" => {
                    let value = iter.next().context("--limit needs a value")?;
                    limit = Some(
                        value
                            .parse()
                            .with_context(|| format!("invalid --limit value {value:?}"))?,
                    );
                }
                "-h" | "--help" => {
                    return Ok(Self {
                        config_path,
                        json_logs,
                        metrics,
                        command: Command::Help,
                    });
                }
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                _ => positional.push(arg.as_str()),
            }
        }

        let command = parse_command(&positional, fields, limit)?;
        Ok(Self {
            config_path,
            json_logs,
            metrics,
            command,
        })
    }
}

fn parse_command(args: &[&str], fields: Vec<String>, limit: Option<usize>) -> Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    let command = match (*name, rest) {
        ("list", [resource, filters @ ..]) => Command::List {
            resource: resource_arg(resource)?,
            params: params(filters)?,
            limit,
        },
        ("get", [resource, id]) => Command::Get {
            resource: resource_arg(resource)?,
            id: id.to_string(),
            fields,
        },
        ("count", [resource, filters @ ..]) => Command::Count {
            resource: resource_arg(resource)?,
            params: params(filters)?,
        },
        ("create", [resource, body]) => Command::Create {
            resource: resource_arg(resource)?,
            body: json_arg(body)?,
        },
        ("update", [resource, id, body]) => Command::Update {
            resource: resource_arg(resource)?,
            id: id.to_string(),
            body: json_arg(body)?,
        },
        ("delete", [resource, id]) => Command::Delete {
            resource: resource_arg(resource)?,
            id: id.to_string(),
        },
        ("tokens", []) => Command::Tokens,
        ("help", _) => Command::Help,
        ("list" | "get" | "count" | "create" | "update" | "delete" | "tokens", _) => {
            bail!("wrong arguments for `{name}`\n\n{USAGE}")
        }
        _ => bail!("unknown command `{name}`\n\n{USAGE}"),
    };
    Ok(command)
}

fn resource_arg(arg: &str) -> Result<Resource> {
    arg.parse().map_err(|e| anyhow!("{e}"))
}

fn json_arg(arg: &str) -> Result<Value> {
    serde_json::from_str(arg).with_context(|| format!("invalid JSON body {arg:?}"))
}

fn params(filters: &[&str]) -> Result<Vec<(String, String)>> {
    filters
        .iter()
        .map(|f| {
            f.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("filter {f:?} must be key=value"))
        })
        .collect()
}
