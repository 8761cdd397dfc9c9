use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use state_estimator_rs::config::UkfConfig;
use state_estimator_rs::models::{DoubleIntegrator, Model, Pendulum, Unicycle};
use state_estimator_rs::replay::{load_log, replay, ReplayLog, ReplayReport};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModelKind {
    DoubleIntegrator,
    Pendulum,
    Unicycle,
}

#[derive(Parser, Debug)]
#[command(about = "Replay a recorded sample log through an unscented Kalman filter")]
struct Args {
    /// Path to a sample log (.json or .json.gz)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Model the log was recorded from
    #[arg(long, value_enum, default_value = "double-integrator")]
    model: ModelKind,

    /// Filter configuration (JSON); the model default when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the model's default configuration here and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,

    /// Log a warning whenever the covariance looks degenerate
    #[arg(long, default_value_t = false)]
    conditioning_check: bool,

    /// Directory for the replay report
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Omit per-sample estimates from the report
    #[arg(long, default_value_t = false)]
    summary_only: bool,
}

fn ts_now_clean() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn resolve_config<M, const S: usize, const I: usize, const O: usize>(
    args: &Args,
) -> anyhow::Result<UkfConfig>
where
    M: Model<S, I, O>,
{
    let mut config = match args.config.as_ref() {
        Some(path) => UkfConfig::load(path)?,
        None => M::default_config(),
    };
    if args.conditioning_check {
        config.conditioning_check = true;
    }
    Ok(config)
}

fn run<M, const S: usize, const I: usize, const O: usize>(
    args: &Args,
    log: &ReplayLog,
) -> anyhow::Result<Option<ReplayReport>>
where
    M: Model<S, I, O>,
{
    if let Some(path) = args.dump_config.as_ref() {
        M::default_config().save(path)?;
        println!("Wrote {} default config to {}", M::NAME, path.display());
        return Ok(None);
    }

    let config = resolve_config::<M, S, I, O>(args)?;
    Ok(Some(replay::<M, S, I, O>(log, &config)?))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let log = match (args.dump_config.as_ref(), args.log.as_ref()) {
        (Some(_), _) => ReplayLog::default(),
        (None, Some(path)) => load_log(path)?,
        (None, None) => anyhow::bail!("Provide --log or --dump-config"),
    };

    let report = match args.model {
        ModelKind::DoubleIntegrator => run::<DoubleIntegrator, 2, 1, 1>(&args, &log)?,
        ModelKind::Pendulum => run::<Pendulum, 2, 1, 1>(&args, &log)?,
        ModelKind::Unicycle => run::<Unicycle, 3, 2, 2>(&args, &log)?,
    };
    let Some(mut report) = report else {
        return Ok(());
    };

    println!(
        "[{}] {} samples | {} predict | {} correct | {} extra | {} skipped",
        report.model,
        report.samples,
        report.predictions,
        report.corrections,
        report.extra_corrections,
        report.skipped_samples
    );
    if let Some(rmse) = report.rmse.as_ref() {
        let formatted: Vec<String> = rmse.iter().map(|v| format!("{:.4}", v)).collect();
        println!("RMSE per state: [{}]", formatted.join(", "));
    }
    println!(
        "Final estimate: {:?} (trace P = {:.4e})",
        report.final_estimate.x_hat, report.final_estimate.covariance_trace
    );

    if args.summary_only {
        report.estimates.clear();
    }

    std::fs::create_dir_all(&args.output_dir)?;
    let filename = args
        .output_dir
        .join(format!("replay_{}_{}.json", report.model, ts_now_clean()));
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&filename, json)?;
    println!("Report saved to {}", filename.display());

    Ok(())
}
