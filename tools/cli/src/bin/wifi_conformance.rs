//! Wi-Fi chip conformance runner
//!
//! Runs the lifecycle conformance catalog against the reference chip and
//! writes a JSON report.

use clap::{Arg, ArgAction, Command};
use log::{error, info};
use std::sync::Arc;

use wifi_chip::{ChipController, FactoryChipProvider, ReferenceChip, ReferenceChipConfig};
use wifi_harness::{
    Config, ConfigBuilder, ConformanceReport, ENV_PREFIX, HarnessConfig, HarnessConfigLayer,
    LifecycleHarness, ScenarioOutcome, ScenarioRunner, catalog,
};

fn build_cli() -> Command {
    Command::new("wifi-conformance")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Wi-Fi chip mode / iface lifecycle conformance runner")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Harness configuration file (TOML or JSON)"),
        )
        .arg(
            Arg::new("chip-config")
                .long("chip-config")
                .value_name("FILE")
                .help("Reference chip configuration file (TOML)"),
        )
        .arg(
            Arg::new("nan")
                .long("nan")
                .action(ArgAction::SetTrue)
                .help("Expect NAN support and run the NAN scenarios"),
        )
        .arg(
            Arg::new("max-retries")
                .long("max-retries")
                .value_name("COUNT")
                .value_parser(clap::value_parser!(u32))
                .help("Retries on transient unavailability"),
        )
        .arg(
            Arg::new("scenario")
                .long("scenario")
                .short('s')
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Only run scenarios whose name contains PATTERN (repeatable)"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Report output path")
                .default_value("conformance_report.json"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .action(ArgAction::SetTrue)
                .help("List scenario names and exit"),
        )
}

fn load_harness_config(
    matches: &clap::ArgMatches,
) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
    let mut builder = ConfigBuilder::<HarnessConfig>::new();
    if let Some(path) = matches.get_one::<String>("config") {
        builder = builder.with_file(path)?;
    }
    builder = builder.with_env(ENV_PREFIX)?;

    // 只有命令行上实际给出的参数才覆盖文件与环境变量
    let cli = HarnessConfigLayer {
        nan_enabled: matches.get_flag("nan").then_some(true),
        max_retries: matches.get_one::<u32>("max-retries").copied(),
        ..Default::default()
    };
    Ok(builder.with_override(cli).build()?)
}

fn load_chip_config(
    matches: &clap::ArgMatches,
    harness: &HarnessConfig,
) -> Result<ReferenceChipConfig, Box<dyn std::error::Error>> {
    match matches.get_one::<String>("chip-config") {
        Some(path) => Ok(ConfigBuilder::<ReferenceChipConfig>::new()
            .with_file(path)?
            .build()?),
        // 未指定时让参考芯片与期望的 NAN 支持保持一致
        None => {
            let config = ReferenceChipConfig {
                feature_aware: harness.nan_enabled,
                ..ReferenceChipConfig::default()
            };
            config.validate()?;
            Ok(config)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let matches = build_cli().get_matches();

    if matches.get_flag("list") {
        for name in catalog::scenario_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = load_harness_config(&matches)?;
    let chip_config = load_chip_config(&matches, &config)?;
    info!("Harness config: {:?}", config);
    info!("Reference chip config: {:?}", chip_config);

    let provider = FactoryChipProvider::new(move || {
        Arc::new(ReferenceChip::new(chip_config.clone())) as Arc<dyn ChipController>
    });
    let harness = LifecycleHarness::new(Arc::new(provider), config.clone());

    let patterns: Vec<String> = matches
        .get_many::<String>("scenario")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let scenarios = catalog::select(catalog::conformance_catalog(), &patterns);
    info!("Running {} scenario(s)", scenarios.len());

    let mut report = ConformanceReport::new(config);
    report.extend(ScenarioRunner::new(&harness).run_all(&scenarios));
    report.finish();

    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or("conformance_report.json");
    report.save_to_file(output)?;
    info!("Report saved to {}", output);

    println!("\n==== Conformance summary ====");
    for result in &report.results {
        let status = match &result.outcome {
            ScenarioOutcome::Passed => "PASS".to_string(),
            ScenarioOutcome::Failed { reason, .. } => format!("FAIL  {}", reason),
            ScenarioOutcome::Skipped { reason } => format!("SKIP  {}", reason),
        };
        println!("{:<40} {:>6} ms  {}", result.name, result.duration_ms, status);
    }
    println!(
        "\ntotal {}  passed {}  failed {}  skipped {}",
        report.summary.total, report.summary.passed, report.summary.failed, report.summary.skipped
    );

    if !report.is_success() {
        error!("{} scenario(s) failed", report.summary.failed);
        std::process::exit(1);
    }
    Ok(())
}
