use clap::Parser;
use course_sync::core::{ConfigProvider, CourseId, ModuleId};
use course_sync::utils::error::{ErrorSeverity, SyncError};
use course_sync::utils::{logger, validation::Validate};
use course_sync::{
    AssociationStore, CliConfig, Command, DragIntent, HttpModuleRepository, ModuleBoard,
    OptimisticSyncController, SyncOutcome, SyncSettings, TomlConfig, TracingNotifier,
};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = if Path::new(&cli.config).exists() {
        match TomlConfig::from_file(&cli.config) {
            Ok(config) => config,
            Err(e) => fail(&e),
        }
    } else {
        TomlConfig::default()
    };
    config.apply_cli(&cli);

    match config.log_format() {
        "json" => logger::init_json_logger(config.verbose()),
        _ => logger::init_cli_logger(config.verbose()),
    }

    tracing::info!("Starting course-sync against {}", config.api_base_url());
    tracing::debug!("Effective config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        fail(&e);
    }

    if let Err(e) = run(&cli.command, &config).await {
        tracing::error!(
            "course-sync failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        fail(&e);
    }

    Ok(())
}

async fn run(command: &Command, config: &TomlConfig) -> course_sync::Result<()> {
    let repository = HttpModuleRepository::from_config(config)?;
    let controller = OptimisticSyncController::new(
        AssociationStore::new().shared(),
        repository,
        TracingNotifier,
        SyncSettings::from_config(config),
    );
    controller.refresh().await?;

    let outcome = match command {
        Command::Show => None,
        Command::Assign { module, course } => {
            let intent = ModuleBoard::add_to_course(
                ModuleId::new(module.as_str()),
                CourseId::new(course.as_str()),
            );
            Some(controller.execute(intent).await?)
        }
        Command::Reorder { course, from, to } => {
            let intent = DragIntent::Reorder {
                course_id: CourseId::new(course.as_str()),
                module_id: None,
                source_index: *from,
                target_index: *to,
            };
            Some(controller.execute(intent).await?)
        }
        Command::DeleteModule { module } => {
            Some(controller.delete_module(&ModuleId::new(module.as_str())).await?)
        }
        Command::DeleteCourse { course } => {
            Some(controller.delete_course(&CourseId::new(course.as_str())).await?)
        }
    };

    match outcome {
        Some(SyncOutcome::Confirmed) => println!("✅ Change confirmed by the content API"),
        Some(SyncOutcome::AlreadyMember) => println!("ℹ️  Module is already part of this course"),
        Some(SyncOutcome::Unchanged) => println!("ℹ️  Nothing to change"),
        Some(SyncOutcome::RolledBack { message }) => println!("❌ {} (local state restored)", message),
        None => {}
    }

    let store = controller.store();
    let store = store.lock().await;
    for course in store.courses() {
        println!("\n📚 {} ({})", course.title, course.id);
        for module in store.get_course_modules(&course.id) {
            let order = module.membership(&course.id).map(|m| m.order).unwrap_or_default();
            println!("  {:>3}. {} ({})", order, module.title, module.id);
        }
    }

    let pool = store.unassigned_modules();
    if !pool.is_empty() {
        println!("\n📦 Unassigned modules");
        for module in pool {
            println!("   - {} ({})", module.title, module.id);
        }
    }

    Ok(())
}

fn fail(e: &SyncError) -> ! {
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
