use std::collections::HashMap;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use agentflow::{
    CapabilityRegistry, Client, Config, DirectoryOutput, Engine, FlowLoader, Output, Settings,
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "agentflow",
    version,
    about = "Run a scripted LLM conversation and save its transcript"
)]
struct Cli {
    /// Name of the flow to run (`<flows-dir>/<name>.json`)
    #[arg(long)]
    flow: String,
    /// Values for the flow's placeholders, as key=value
    #[arg(long, num_args = 1.., value_parser = parse_variable)]
    variables: Vec<(String, String)>,
    /// Log progress at info level
    #[arg(short, long)]
    verbose: bool,
    /// Directory holding flow documents (overrides AGENTFLOW_FLOWS_DIR)
    #[arg(long)]
    flows_dir: Option<PathBuf>,
    /// Directory receiving run outputs (overrides AGENTFLOW_OUTPUTS_DIR)
    #[arg(long)]
    outputs_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from_env()?;
    let flows_dir = cli.flows_dir.unwrap_or(config.flows_dir.clone());
    let outputs_dir = cli.outputs_dir.unwrap_or(config.outputs_dir.clone());
    let variables: HashMap<String, String> = cli.variables.into_iter().collect();

    let flow = FlowLoader::new(flows_dir)
        .with_defaults(Settings::with_model(config.default_model.clone()))
        .load(&cli.flow, &variables)?;

    let output: Arc<dyn Output> = Arc::new(DirectoryOutput::create(&outputs_dir, flow.name())?);
    let client = Client::new(config.openai());
    let registry = CapabilityRegistry::builtin(client.clone(), output.clone());
    let engine = Engine::new(Arc::new(client), registry, output);

    let path = engine.run(&flow).await?;
    let location = path.parent().unwrap_or(&path);
    println!("Find outputs at {}", location.display());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

/// Splits `key=value` on the first `=`.
fn parse_variable(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("missing variable name in {raw:?}")),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected key=value, got {raw:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable() {
        assert_eq!(
            parse_variable("topic=otters").unwrap(),
            ("topic".to_string(), "otters".to_string())
        );
        assert_eq!(
            parse_variable("query=a=b").unwrap(),
            ("query".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_variable("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_variable("no_equals").is_err());
        assert!(parse_variable("=value").is_err());
    }

    #[test]
    fn test_cli_collects_variables() {
        let cli = Cli::try_parse_from([
            "agentflow",
            "--flow",
            "write_poem",
            "--variables",
            "topic=otters",
            "style=haiku",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.flow, "write_poem");
        assert!(cli.verbose);
        assert_eq!(
            cli.variables,
            vec![
                ("topic".to_string(), "otters".to_string()),
                ("style".to_string(), "haiku".to_string())
            ]
        );
    }

    #[test]
    fn test_cli_requires_flow() {
        assert!(Cli::try_parse_from(["agentflow"]).is_err());
    }
}
