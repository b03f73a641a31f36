//! evidex: Disease-target association ETL.
//! Entry point for the command line binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use evidex_config::Config;
use evidex_pipeline::run_pipeline;
use tracing_subscriber::EnvFilter;

/// Download Open Targets evidence, aggregate association scores and count
/// targets that share diseases.
#[derive(Debug, Parser)]
#[command(name = "evidex", version, about)]
struct Cli {
    /// Configuration file (defaults to $EVIDEX_CONFIG, then ./evidex.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// File server URL, e.g. ftp://ftp.ebi.ac.uk or https://ftp.ebi.ac.uk
    #[arg(short = 'f', long = "ftp-server", value_name = "URL")]
    ftp_server: Option<String>,

    /// Remote directory holding the evidence files
    #[arg(short = 'a', long = "assoc-dir", value_name = "DIR")]
    assoc_dir: Option<String>,

    /// Remote directory holding the target files
    #[arg(short = 't', long = "target-dir", value_name = "DIR")]
    target_dir: Option<String>,

    /// Remote directory holding the disease files
    #[arg(short = 'd', long = "disease-dir", value_name = "DIR")]
    disease_dir: Option<String>,

    /// Local directory for the output files
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Local directory for downloaded datasets
    #[arg(long = "data-dir", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Number of parallel workers for downloads, decoding and pair counting
    #[arg(short = 'p', long = "processes", value_name = "N")]
    processes: Option<usize>,

    /// Minimum number of shared diseases for a target pair to be counted
    #[arg(long = "min-shared", value_name = "N")]
    min_shared: Option<usize>,

    /// Reuse datasets already present under the data directory
    #[arg(long)]
    skip_download: bool,
}

impl Cli {
    /// Load the configuration file, apply the flags, then validate the result.
    fn configure(self) -> anyhow::Result<Config> {
        let mut config =
            Config::load(self.config.as_deref()).context("failed to load configuration")?;
        self.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Command line flags win over the configuration file.
    fn apply(self, config: &mut Config) {
        if let Some(url) = self.ftp_server {
            config.server.url = url;
        }
        if let Some(dir) = self.assoc_dir {
            config.server.evidence_dir = dir;
        }
        if let Some(dir) = self.target_dir {
            config.server.target_dir = dir;
        }
        if let Some(dir) = self.disease_dir {
            config.server.disease_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = dir;
        }
        if let Some(dir) = self.data_dir {
            config.storage.data_dir = dir;
        }
        if let Some(n) = self.processes {
            config.transform.workers = n;
        }
        if let Some(n) = self.min_shared {
            config.transform.min_shared_diseases = n;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("evidex=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let skip_download = cli.skip_download;

    let config = cli.configure()?;

    tracing::info!(
        server = %config.server.url,
        data_dir = %config.storage.data_dir.display(),
        output_dir = %config.output.dir.display(),
        workers = config.transform.workers,
        "evidex starting"
    );

    let summary = run_pipeline(&config, skip_download)
        .await
        .context("association pipeline failed")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "evidex", "-f", "https://ftp.ebi.ac.uk", "-a", "/ev", "-t", "/tg", "-d", "/ds",
            "-o", "/tmp/out", "-p", "8", "--min-shared", "3",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.server.url, "https://ftp.ebi.ac.uk");
        assert_eq!(config.server.evidence_dir, "/ev");
        assert_eq!(config.server.target_dir, "/tg");
        assert_eq!(config.server.disease_dir, "/ds");
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.transform.workers, 8);
        assert_eq!(config.transform.min_shared_diseases, 3);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["evidex", "--skip-download"]);
        assert!(cli.skip_download);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_can_fix_invalid_file_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("evidex.toml");
        std::fs::write(&path, "[transform]\nworkers = 0\n").unwrap();
        let path = path.to_str().unwrap();

        let config = Cli::parse_from(["evidex", "--config", path, "-p", "4"]).configure().unwrap();
        assert_eq!(config.transform.workers, 4);

        assert!(Cli::parse_from(["evidex", "--config", path]).configure().is_err());
    }
}
