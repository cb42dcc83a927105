use clap::{Command, CommandFactory, Parser};
use clap_complete::{generate, Generator};
use screenshare_analysis::chart::PlottersRenderer;
use screenshare_analysis::cli::Commands::{Analyze, GenerateAutoComplete, GenerateSample};
use screenshare_analysis::cli::Cli;
use screenshare_analysis::error::AnalysisResult;
use screenshare_analysis::pipeline::{Analyzer, AnalyzerConfig};
use screenshare_analysis::sample_data::{generate_results, rng_from_seed, save_sample_data};
use screenshare_analysis::utils::format_number;
use std::io;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> AnalysisResult<()> {
    let mut cmd = Cli::command();
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into());
    let subscriber = fmt()
        .pretty()
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(filter);

    subscriber.init();

    match cli.command {
        GenerateAutoComplete { shell } => {
            eprintln!("Generating completion file for {shell}...");
            print_completions(shell, &mut cmd);
        }

        Analyze {
            results_dir,
            input,
            out_dir,
            width,
            height,
        } => {
            let config = AnalyzerConfig {
                results_dir,
                input,
                out_dir,
            };
            let report = Analyzer::new(config, PlottersRenderer::new(width, height)).run()?;
            info!(
                "{} records analyzed ({} excluded) from {}, {} charts written, {} skipped",
                format_number(report.records as u64),
                format_number(report.excluded as u64),
                report.source,
                report.charts_written.len(),
                report.charts_skipped.len()
            );
        }

        GenerateSample { results_dir, seed } => {
            let mut rng = rng_from_seed(seed);
            let results = generate_results(&mut rng);
            let files = save_sample_data(&results_dir, results)?;
            info!(
                "Run `analyze --results-dir {}` to chart {} sample results",
                results_dir.display(),
                format_number(files.total as u64)
            );
        }
    }

    Ok(())
}

fn print_completions<G: Generator>(
    gen: G,
    cmd: &mut Command,
) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
