use clap::{Parser, Subcommand};
use probe_harness::config::{get_default_config_path, Config, ConfigError, ConfigLoader};
use probe_harness::resolver::EnumeratedPorts;
use probe_harness::shell::{self, Output, RunSummary, SessionOutcome};
use probe_harness::{
    logging, AppError, CandidateProvider, CommandUploader, PortResolver, RunReport, TestProtocol,
    TestRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "probe-harness",
    version,
    about = "Hardware-in-the-loop test harness for servo probe firmware.",
    long_about = "Sends a PWM pulse width to a probe over a serial line, reads back the \
                  measured PWM and position, and checks both against tolerance windows. \
                  Can flash the firmware with PlatformIO first."
)]
struct Args {
    /// Configuration file to use instead of the standard locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the run summary as JSON on stdout; progress moves to stderr.
    #[arg(long, global = true)]
    json: bool,

    /// Log filter, e.g. `debug` or `probe_harness=trace`. RUST_LOG wins.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the PWM readback test against an already flashed device.
    Test {
        #[command(flatten)]
        target: TestTarget,
    },

    /// Flash firmware and filesystem image, then run the test.
    UploadAndTest {
        /// PlatformIO project directory.
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[command(flatten)]
        target: TestTarget,
    },

    /// List the ports the harness would try, in order.
    Ports,

    /// Print the effective configuration, or write it to a file.
    Config {
        /// Write instead of printing; without PATH, to the loaded config file.
        #[arg(long, value_name = "PATH", num_args = 0..=1)]
        write: Option<Option<PathBuf>>,
    },
}

#[derive(clap::Args, Debug)]
struct TestTarget {
    /// PWM pulse width in microseconds.
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(i64).range(0..))]
    pwm: i64,

    /// Position the probe should report for that pulse width.
    #[arg(long, default_value_t = 1500, allow_negative_numbers = true)]
    probe: i64,

    /// Serial port or alias to try before scanning.
    #[arg(short, long)]
    port: Option<String>,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, AppError> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    logging::init(&loader.config().logging, args.log_level.as_deref())?;
    tracing::debug!(path = ?loader.config_path, "Configuration loaded");

    match args.command {
        Command::Test { target } => {
            let config = loader.into_config();
            let request = TestRequest::from_config(target.pwm, target.probe, &config.protocol);
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let printer = shell::spawn_printer(rx, progress_output(args.json));

            let port = target.port.or_else(|| config.serial.port.clone());
            let report = shell::run_test(build_protocol(&config), request, port, tx).await?;
            printer.await?;

            finish(&report, args.json)
        }
        Command::UploadAndTest {
            project_dir,
            target,
        } => {
            let config = loader.into_config();
            let request = TestRequest::from_config(target.pwm, target.probe, &config.protocol);
            let uploader = CommandUploader::from_config(&config.upload);
            let port = target.port.or_else(|| config.serial.port.clone());
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let printer = shell::spawn_printer(rx, progress_output(args.json));

            let outcome = shell::upload_and_test(
                &uploader,
                &project_dir,
                build_protocol(&config),
                request,
                port,
                tx,
            )
            .await?;
            printer.await?;

            match outcome {
                SessionOutcome::Tested(report) => finish(&report, args.json),
                SessionOutcome::UploadFailed(e) => {
                    if args.json {
                        let body = serde_json::json!({
                            "passed": false,
                            "upload_error": e.to_string(),
                        });
                        println!("{}", serde_json::to_string_pretty(&body)?);
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Ports => {
            let resolver = PortResolver::from_config(&loader.config().serial);
            let scan = resolver.candidates();
            let detected = EnumeratedPorts { usb_only: false }.candidates();

            if args.json {
                let body = serde_json::json!({ "scan_order": scan, "detected": detected });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("Scan order:");
                for name in &scan {
                    println!("  {name}");
                }
                println!("Detected by the OS:");
                if detected.is_empty() {
                    println!("  (none)");
                }
                for name in &detected {
                    println!("  {name}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { write: None } => {
            print_config(loader.config(), args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { write: Some(target) } => {
            let path = match target.or_else(|| loader.config_path.clone()) {
                Some(path) => path,
                None => get_default_config_path().ok_or(ConfigError::NoWriteTarget)?,
            };
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            loader.save_to(&path)?;
            println!("Configuration written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_protocol(config: &Config) -> Arc<TestProtocol> {
    let resolver = PortResolver::from_config(&config.serial);
    Arc::new(TestProtocol::new(resolver, config.protocol.clone()))
}

fn progress_output(json: bool) -> Output {
    if json {
        Output::Stderr
    } else {
        Output::Stdout
    }
}

/// Print the outcome and pick the exit code: success only when both checks
/// passed.
fn finish(report: &RunReport, json: bool) -> Result<ExitCode, AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(&RunSummary::from(report))?);
    } else {
        for line in shell::render_report(report) {
            println!("{line}");
        }
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_config(config: &Config, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        let text = toml::to_string_pretty(config).map_err(ConfigError::from)?;
        print!("{text}");
    }
    Ok(())
}
