use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vecconv_core::{
    load_config, metrics::register_metrics, validate_config, Config, ConversionOptions, Converter,
    Format,
};

/// Convert vector documents between SVG, EPS, PS, PDF and EMF.
#[derive(Debug, Parser)]
#[command(name = "vecconv", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "VECCONV_CONFIG")]
    config: Option<PathBuf>,

    /// Print Prometheus metrics to stdout when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert INPUT to OUTPUT, formats taken from the file extensions
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Export SVG without editor metadata
        #[arg(long)]
        plain_svg: bool,
        /// Crop PostScript input to its bounding box
        #[arg(long)]
        eps_crop: bool,
    },
    /// List supported conversions and whether the tools are installed
    Formats,
    /// Print a drawing's width or height in pixels
    Query {
        input: PathBuf,
        #[arg(value_enum)]
        dimension: QueryDimension,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QueryDimension {
    Width,
    Height,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_deref())?;
    let converter = Converter::from_config(&config);
    debug!(?converter, "converter ready");

    let registry = Registry::new();
    if cli.metrics {
        register_metrics(&registry).context("Failed to register metrics")?;
    }

    match cli.command {
        Command::Convert {
            input,
            output,
            plain_svg,
            eps_crop,
        } => {
            let options = merge_options(converter.defaults(), plain_svg, eps_crop);
            let document = converter
                .convert_file(&input, &output, &options)
                .await
                .with_context(|| {
                    format!("Failed to convert {} to {}", input.display(), output.display())
                })?;
            info!(
                "Wrote {} ({} bytes, {})",
                output.display(),
                document.content().len(),
                document.mimetype()
            );
        }
        Command::Formats => {
            for strategy in converter.registry().strategies() {
                let status = if strategy.available() { "available" } else { "not found" };
                println!("{}: {}", strategy.name(), status);
            }
            for (from, to) in converter.supported_conversions() {
                println!("{from} -> {to}");
            }
        }
        Command::Query { input, dimension } => {
            let format = Format::from_path(&input)
                .with_context(|| format!("Cannot determine format of {}", input.display()))?;
            let content = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let value = match dimension {
                QueryDimension::Width => converter.query_width(&content, format).await,
                QueryDimension::Height => converter.query_height(&content, format).await,
            }
            .context("Dimension query failed")?;
            println!("{value}");
        }
    }

    if cli.metrics {
        print_metrics(&registry)?;
    }
    Ok(())
}

/// Loads and validates the config file, or uses defaults when none is given.
fn resolve_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    info!("Loading configuration from {:?}", path);
    let config =
        load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?;
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

/// Command-line flags can only switch options on.
fn merge_options(defaults: &ConversionOptions, plain_svg: bool, eps_crop: bool) -> ConversionOptions {
    defaults
        .clone()
        .plain_svg(defaults.plain_svg || plain_svg)
        .eps_crop(defaults.eps_crop || eps_crop)
}

fn print_metrics(registry: &Registry) -> Result<()> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    let text = String::from_utf8(buffer).context("Metrics output is not UTF-8")?;
    print!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_convert() {
        let cli = Cli::try_parse_from([
            "vecconv",
            "convert",
            "in.pdf",
            "out.svg",
            "--plain-svg",
            "--metrics",
        ])
        .unwrap();
        assert!(cli.metrics);
        match cli.command {
            Command::Convert {
                input,
                output,
                plain_svg,
                eps_crop,
            } => {
                assert_eq!(input, PathBuf::from("in.pdf"));
                assert_eq!(output, PathBuf::from("out.svg"));
                assert!(plain_svg);
                assert!(!eps_crop);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from(["vecconv", "query", "a.svg", "height"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Query {
                dimension: QueryDimension::Height,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["vecconv", "query", "a.svg", "depth"]).is_err());
    }

    #[test]
    fn test_merge_options() {
        let defaults = ConversionOptions::default().eps_crop(true);
        let merged = merge_options(&defaults, true, false);
        assert!(merged.plain_svg);
        assert!(merged.eps_crop);
    }

    #[test]
    fn test_resolve_config() {
        assert_eq!(resolve_config(None).unwrap().execution.timeout_secs, 120);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[execution]\ntimeout_secs = 0").unwrap();
        let err = resolve_config(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("timeout_secs"));

        assert!(resolve_config(Some(Path::new("/nonexistent/vecconv.toml"))).is_err());
    }
}
