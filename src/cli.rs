use crate::pipeline::DEFAULT_RESULTS_DIR;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "screenshare-analysis", version, about="screen-sharing benchmark analysis tool", long_about = None, arg_required_else_help(true), propagate_version(true))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(arg_required_else_help = true)]
    GenerateAutoComplete { shell: Shell },

    /// Render the comparison charts and summary statistics for a results directory
    Analyze {
        #[arg(
            short,
            long,
            env = "RESULTS_DIR",
            default_value = DEFAULT_RESULTS_DIR,
            help = "directory holding results.csv or results.json"
        )]
        results_dir: PathBuf,
        #[arg(
            short,
            long,
            required = false,
            help = "analyze this .csv or .json file instead of searching the results directory"
        )]
        input: Option<PathBuf>,
        #[arg(
            short,
            long,
            required = false,
            help = "where charts and the summary are written, defaults to <results-dir>/visualizations"
        )]
        out_dir: Option<PathBuf>,
        #[arg(
            long,
            required = false,
            default_value_t = 1000,
            value_parser = clap::value_parser!(u32).range(100..),
            help = "chart width in pixels"
        )]
        width: u32,
        #[arg(
            long,
            required = false,
            default_value_t = 600,
            value_parser = clap::value_parser!(u32).range(100..),
            help = "chart height in pixels"
        )]
        height: u32,
    },

    /// Write a synthetic results.json and results.csv covering the full test grid
    GenerateSample {
        #[arg(
            short,
            long,
            env = "RESULTS_DIR",
            default_value = DEFAULT_RESULTS_DIR,
            help = "directory the sample files are written to"
        )]
        results_dir: PathBuf,
        #[arg(
            short,
            long,
            required = false,
            help = "seed for reproducible sample data"
        )]
        seed: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_defaults() {
        let cli = Cli::try_parse_from(["screenshare-analysis", "analyze", "-r", "out"]).unwrap();
        match cli.command {
            Commands::Analyze {
                results_dir,
                input,
                out_dir,
                width,
                height,
            } => {
                assert_eq!(results_dir, PathBuf::from("out"));
                assert_eq!((width, height), (1000, 600));
                assert!(input.is_none());
                assert!(out_dir.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_analyze_overrides() {
        let cli = Cli::try_parse_from([
            "screenshare-analysis",
            "analyze",
            "--results-dir",
            "runs",
            "--input",
            "runs/other.json",
            "--out-dir",
            "charts",
            "--width",
            "1600",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                input,
                out_dir,
                width,
                height,
                ..
            } => {
                assert_eq!(input, Some(PathBuf::from("runs/other.json")));
                assert_eq!(out_dir, Some(PathBuf::from("charts")));
                assert_eq!((width, height), (1600, 600));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_tiny_chart_rejected() {
        assert!(Cli::try_parse_from(["screenshare-analysis", "analyze", "-r", "x", "--width", "10"]).is_err());
    }

    #[test]
    fn test_generate_sample_seed() {
        let cli = Cli::try_parse_from([
            "screenshare-analysis",
            "generate-sample",
            "-r",
            "tmp",
            "--seed",
            "42",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::GenerateSample { seed: Some(42), .. }
        ));
    }
}
