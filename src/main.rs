use anyhow::Context;
use clap::Parser;
use transit_finder::config::Command;
use transit_finder::core::ConfigProvider;
use transit_finder::utils::error::{ErrorSeverity, VizError};
use transit_finder::utils::{logger, validation::Validate};
use transit_finder::{
    CliConfig, LightCurveViewer, LocalStorage, MastClient, PlottersBackend, TargetId,
};

type Viewer = LightCurveViewer<MastClient, LocalStorage, PlottersBackend>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting transit-finder CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.load_config().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let target = match TargetId::new(cli.command.target()) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let archive = MastClient::from_config(&config, config.archive.missions.clone())
        .context("Failed to build the archive client")?;
    let storage = LocalStorage::new(config.output_path().to_string());
    let viewer = LightCurveViewer::new(
        archive,
        storage,
        PlottersBackend::new(),
        config.viewer_options(),
    )
    .with_progress(config.render.progress.observer());

    if let Err(e) = run(&viewer, &cli.command, &target).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
            target,
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = exit_code(&e);
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(viewer: &Viewer, command: &Command, target: &TargetId) -> Result<(), VizError> {
    match command {
        Command::List { .. } => {
            let handles = viewer.datasets(target).await?;
            if handles.is_empty() {
                println!("No datasets found for {}.", target);
            }
            for (index, handle) in handles.iter().enumerate() {
                println!("{:>3}. {}  [{}]", index + 1, handle, handle.product_filename);
            }
        }
        Command::Overview { .. } => match viewer.overview(target).await? {
            Some(overview) => {
                println!(
                    "✅ Overview of {} datasets saved to: {}",
                    overview.dataset_count, overview.output_path
                );
            }
            None => println!("No datasets found for {}.", target),
        },
        Command::Detail { set, .. } => {
            let path = viewer.detail(target, *set).await?;
            println!("✅ Dataset {} saved to: {}", set, path);
        }
        Command::PeriodogramOverview { .. } => match viewer.periodogram_overview(target).await? {
            Some(path) => println!("✅ Periodogram overview saved to: {}", path),
            None => println!("No datasets found for {}.", target),
        },
        Command::PeriodogramDetail { set, .. } => {
            let path = viewer.periodogram_detail(target, *set).await?;
            println!("✅ Periodogram of dataset {} saved to: {}", set, path);
        }
    }
    Ok(())
}

/// 根據錯誤嚴重程度決定退出碼
fn exit_code(error: &VizError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重試錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    }
}
