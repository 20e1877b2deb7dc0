use clap::Parser;
use spectra_recon::adapters::reset_workspace;
use spectra_recon::utils::error::ErrorSeverity;
use spectra_recon::utils::{logger, validation::Validate};
use spectra_recon::{
    check_assets, CaptureDirectory, CliConfig, Command, CsvResultSink, FileImageSource,
    ReconConfig, ReconEngine, ReconError, SpectralPipeline,
};

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    let loaded = ReconConfig::from_file_or_default(&cli.config);

    // 初始化日誌 (CLI 旗標優先於配置中的 log_level)
    let log_level = loaded
        .as_ref()
        .ok()
        .and_then(|c| c.monitoring.log_level.clone());
    if cli.json_logs {
        logger::init_json_logger(cli.verbose, log_level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, log_level.as_deref());
    }

    tracing::info!("Starting spectra-recon");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = loaded.and_then(|config| execute(&cli, config)) {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ {} (Kind: {:?}, Severity: {:?})",
            e,
            e.kind(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn execute(cli: &CliConfig, config: ReconConfig) -> Result<(), ReconError> {
    // 驗證配置
    config.validate()?;

    match cli.command() {
        Command::Reconstruct { image } => reconstruct(cli, config, image),
        Command::Check => {
            let report = check_assets(&config);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.ok {
                println!("✅ Model assets look usable");
            } else {
                println!("⚠️  Model assets have problems, see errors above");
            }
            Ok(())
        }
        Command::Reset => {
            let (captures, results) =
                reset_workspace(&config.capture_dir(), &config.result_dir())?;
            println!(
                "🧹 Removed {} capture(s) and {} result(s)",
                captures, results
            );
            Ok(())
        }
        Command::ShowConfig => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| ReconError::config(format!("cannot render config: {}", e)))?;
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn reconstruct(
    cli: &CliConfig,
    config: ReconConfig,
    image: Option<std::path::PathBuf>,
) -> Result<(), ReconError> {
    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let sink = CsvResultSink::new(config.result_dir());
    let capture = CaptureDirectory::new(config.capture_dir(), config.capture_timeout());
    let engine =
        ReconEngine::new_with_monitoring(SpectralPipeline::from_config(config)?, monitor_enabled);

    let summary = match image {
        Some(path) => engine.run(&FileImageSource::new(path), &sink)?,
        None => engine.run(&capture, &sink)?,
    };

    println!("✅ Reconstruction completed: {} points", summary.points);
    if let (Some(wavelength), Some(intensity)) = (summary.peak_wavelength, summary.peak_intensity)
    {
        println!("📈 Peak at {:.1} nm (intensity {:.4})", wavelength, intensity);
    }
    println!("📁 Output saved to: {}", summary.output.display());
    Ok(())
}
