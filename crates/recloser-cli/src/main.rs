//! CLI binary for the recloser catalog: create, edit, browse and compare
//! firmware service trees.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recloser_core::CatalogStore;
use recloser_core::config::RecloserConfig;
use recloser_core::error::CatalogError;
use recloser_core::model::NewService;
use recloser_core::sqlite::SqliteCatalog;
use recloser_nav::{diff, inventory, layout, render, tree, validate};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "recloser", about = "Recloser firmware catalog")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Display language (defaults to display.default_language)
    #[arg(short, long, global = true)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog database (or bring its schema up to date)
    Init,

    /// Print the service/feature tree of one firmware
    Tree {
        /// Firmware version id
        firmware: i64,
    },

    /// Compare the service trees of two firmwares
    Diff {
        /// Baseline firmware id
        firmware_a: i64,
        /// Firmware id compared against the baseline
        firmware_b: i64,
    },

    /// Print the screen layout rooted at a service
    Layout {
        /// Service id
        service: i64,
    },

    /// Print every recloser with its firmwares and service trees
    Inventory,

    /// Check a value against a feature's component type and limits
    Validate {
        /// Service whose layout contains the feature
        service: i64,
        /// Feature id
        feature: i64,
        /// Candidate value
        value: String,
    },

    /// Manage languages
    Language {
        #[command(subcommand)]
        action: LanguageAction,
    },

    /// Add or replace a translation of a description key
    Translate {
        key: String,
        language: String,
        value: String,
    },

    /// Manage reclosers
    Recloser {
        #[command(subcommand)]
        action: RecloserAction,
    },

    /// Manage firmware versions
    Firmware {
        #[command(subcommand)]
        action: FirmwareAction,
    },

    /// Manage services of a firmware tree
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },

    /// Manage features of a service
    Feature {
        #[command(subcommand)]
        action: FeatureAction,
    },

    /// Bind a UI component type to a feature
    Bind {
        feature: i64,
        /// Component type name, e.g. Integer or ComboBox
        component: String,
    },

    /// Remove a component binding and its limits
    Unbind {
        binding: i64,
    },

    /// Set (or with --remove, clear) one limit on a component binding
    Limit {
        binding: i64,
        /// Limit key, e.g. MIN_VALUE or MAX_CHAR
        key: String,
        #[arg(required_unless_present = "remove")]
        value: Option<String>,
        /// Remove the limit instead of setting it
        #[arg(long, conflicts_with = "value")]
        remove: bool,
    },
}

#[derive(Subcommand)]
enum LanguageAction {
    Add { code: String, name: String },
    List,
}

#[derive(Subcommand)]
enum RecloserAction {
    Add {
        /// Description key naming the device
        key: String,
        model: String,
    },
    Update {
        id: i64,
        key: String,
        model: String,
    },
    Delete {
        id: i64,
    },
    List,
}

#[derive(Subcommand)]
enum FirmwareAction {
    Add {
        recloser: i64,
        version: String,
    },
    Update {
        id: i64,
        recloser: i64,
        version: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum ServiceAction {
    Add {
        firmware: i64,
        key: String,
        /// Description key (defaults to the service key)
        #[arg(long)]
        description: Option<String>,
        /// Parent service id; omit for a root service
        #[arg(long)]
        parent: Option<i64>,
    },
    Update {
        id: i64,
        firmware: i64,
        key: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        parent: Option<i64>,
    },
    Delete {
        id: i64,
    },
    /// Define a shared service (shared_services schema only)
    Share {
        key: String,
        #[arg(long)]
        description: Option<String>,
        /// Parent shared service definition id
        #[arg(long)]
        parent: Option<i64>,
    },
    /// Attach a shared service definition to a firmware
    Link {
        shared: i64,
        firmware: i64,
    },
    /// Detach a shared service definition from a firmware
    Unlink {
        shared: i64,
        firmware: i64,
    },
}

#[derive(Subcommand)]
enum FeatureAction {
    Add {
        service: i64,
        /// Description key of the feature
        key: String,
    },
    Update {
        id: i64,
        service: i64,
        key: String,
    },
    Delete {
        id: i64,
    },
}

struct Session {
    catalog: SqliteCatalog,
    config: RecloserConfig,
    json: bool,
    lang: String,
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn open(project_root: &Path, cli: &Cli) -> Result<Session> {
    let config = RecloserConfig::load(project_root)?;
    let catalog = SqliteCatalog::open_configured(&config, project_root).with_context(|| {
        format!(
            "failed to open catalog at {}",
            config.database_path(project_root).display()
        )
    })?;
    let lang = cli
        .lang
        .clone()
        .unwrap_or_else(|| config.display.default_language.clone());
    Ok(Session {
        catalog,
        config,
        json: cli.json,
        lang,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;
    let ctx = open(&project_root, &cli)?;

    match cli.command {
        Commands::Init => cmd_init(&ctx, &project_root),
        Commands::Tree { firmware } => cmd_tree(&ctx, firmware),
        Commands::Diff {
            firmware_a,
            firmware_b,
        } => cmd_diff(&ctx, firmware_a, firmware_b),
        Commands::Layout { service } => cmd_layout(&ctx, service),
        Commands::Inventory => cmd_inventory(&ctx),
        Commands::Validate {
            service,
            feature,
            value,
        } => cmd_validate(&ctx, service, feature, &value),
        Commands::Language { action } => cmd_language(&ctx, action),
        Commands::Translate {
            key,
            language,
            value,
        } => {
            ctx.catalog.add_translation(&key, &language, &value)?;
            println!("Set {key} [{language}] = {value}");
            Ok(())
        }
        Commands::Recloser { action } => cmd_recloser(&ctx, action),
        Commands::Firmware { action } => cmd_firmware(&ctx, action),
        Commands::Service { action } => cmd_service(&ctx, action),
        Commands::Feature { action } => cmd_feature(&ctx, action),
        Commands::Bind { feature, component } => {
            let binding = ctx.catalog.bind_component(feature, &component)?;
            println!("Bound {component} to feature {feature} (binding {binding})");
            Ok(())
        }
        Commands::Unbind { binding } => {
            require_id("binding", binding)?;
            ctx.catalog.unbind_component(binding)?;
            println!("Removed binding {binding}");
            Ok(())
        }
        Commands::Limit {
            binding,
            key,
            value,
            remove,
        } => {
            require_id("binding", binding)?;
            match value {
                Some(value) if !remove => {
                    ctx.catalog.set_limit(binding, &key, &value)?;
                    println!("Set {key} = {value} on binding {binding}");
                }
                _ => {
                    ctx.catalog.remove_limit(binding, &key)?;
                    println!("Removed {key} from binding {binding}");
                }
            }
            Ok(())
        }
    }
}

fn emit<T: Serialize>(ctx: &Session, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

/// Every id the catalog hands out is positive.
fn require_id(name: &str, id: i64) -> Result<()> {
    if id <= 0 {
        anyhow::bail!("{name} must be a positive id, got {id}");
    }
    Ok(())
}

fn require_firmware(store: &dyn CatalogStore, id: i64) -> recloser_core::Result<()> {
    match store.firmware(id)? {
        Some(_) => Ok(()),
        None => Err(CatalogError::not_found("firmware", id)),
    }
}

fn cmd_init(ctx: &Session, project_root: &Path) -> Result<()> {
    let version = ctx.catalog.schema_version()?;
    println!(
        "Catalog ready at {} ({} schema, version {})",
        ctx.config.database_path(project_root).display(),
        ctx.catalog.variant(),
        version
    );
    Ok(())
}

fn cmd_tree(ctx: &Session, firmware: i64) -> Result<()> {
    require_id("firmware", firmware)?;
    let nodes = ctx
        .catalog
        .read_with(ctx.config.store.snapshot_reads, |store| {
            require_firmware(store, firmware)?;
            tree::build_tree(store, firmware)
        })?;
    emit(ctx, &nodes, |nodes| {
        if nodes.is_empty() {
            format!("Firmware {firmware} has no services.\n")
        } else {
            render::format_tree(nodes, &ctx.lang)
        }
    })
}

fn cmd_diff(ctx: &Session, firmware_a: i64, firmware_b: i64) -> Result<()> {
    require_id("firmware_a", firmware_a)?;
    require_id("firmware_b", firmware_b)?;
    let result = ctx
        .catalog
        .read_with(ctx.config.store.snapshot_reads, |store| {
            require_firmware(store, firmware_a)?;
            require_firmware(store, firmware_b)?;
            diff::diff_trees(store, firmware_a, firmware_b, &ctx.lang)
        })?;
    emit(ctx, &result, render::format_diff)
}

fn cmd_layout(ctx: &Session, service: i64) -> Result<()> {
    require_id("service", service)?;
    let result = ctx
        .catalog
        .read_with(ctx.config.store.snapshot_reads, |store| {
            layout::assemble_layout(store, service)
        })?
        .ok_or_else(|| CatalogError::not_found("service", service))?;
    emit(ctx, &result, |l| render::format_layout(l, &ctx.lang))
}

fn cmd_inventory(ctx: &Session) -> Result<()> {
    let result = ctx
        .catalog
        .read_with(ctx.config.store.snapshot_reads, |store| {
            inventory::full_inventory(store)
        })?;
    emit(ctx, &result, |inv| {
        if inv.is_empty() {
            "No reclosers in catalog.\n".to_string()
        } else {
            render::format_inventory(inv, &ctx.lang)
        }
    })
}

#[derive(Serialize)]
struct ValidationReport {
    feature_id: i64,
    value: String,
    valid: bool,
    message: String,
}

fn cmd_validate(ctx: &Session, service: i64, feature: i64, value: &str) -> Result<()> {
    require_id("service", service)?;
    require_id("feature", feature)?;
    let layout = ctx
        .catalog
        .read_with(ctx.config.store.snapshot_reads, |store| {
            layout::assemble_layout(store, service)
        })?
        .ok_or_else(|| CatalogError::not_found("service", service))?;
    let target = layout
        .find_feature(feature)
        .ok_or_else(|| CatalogError::not_found("feature", feature))?;
    let message = validate::validation_message(target, value);
    let report = ValidationReport {
        feature_id: feature,
        value: value.to_string(),
        valid: message.is_empty(),
        message,
    };
    emit(ctx, &report, |r| {
        if r.valid {
            format!("'{}' is valid for feature {}\n", r.value, r.feature_id)
        } else {
            format!("invalid: {}\n", r.message)
        }
    })
}

fn cmd_language(ctx: &Session, action: LanguageAction) -> Result<()> {
    match action {
        LanguageAction::Add { code, name } => {
            ctx.catalog.add_language(&code, &name)?;
            println!("Added language {code} ({name})");
            Ok(())
        }
        LanguageAction::List => {
            let languages = ctx.catalog.languages()?;
            emit(ctx, &languages, |langs| {
                langs
                    .iter()
                    .map(|l| format!("{}\t{}\n", l.code, l.display_name))
                    .collect()
            })
        }
    }
}

fn cmd_recloser(ctx: &Session, action: RecloserAction) -> Result<()> {
    match action {
        RecloserAction::Add { key, model } => {
            let id = ctx.catalog.add_recloser(&key, &model)?;
            println!("Created recloser {id}");
        }
        RecloserAction::Update { id, key, model } => {
            require_id("recloser", id)?;
            ctx.catalog.update_recloser(id, &key, &model)?;
            println!("Updated recloser {id}");
        }
        RecloserAction::Delete { id } => {
            require_id("recloser", id)?;
            ctx.catalog.delete_recloser(id)?;
            println!("Deleted recloser {id}");
        }
        RecloserAction::List => {
            let reclosers = ctx.catalog.reclosers()?;
            return emit(ctx, &reclosers, |list| {
                list.iter()
                    .map(|r| {
                        let name = ctx
                            .catalog
                            .translation_for(&r.description_key, &ctx.lang)
                            .unwrap_or_default();
                        format!("{}\t{}\t{}\n", r.id, r.model, name)
                    })
                    .collect()
            });
        }
    }
    Ok(())
}

fn cmd_firmware(ctx: &Session, action: FirmwareAction) -> Result<()> {
    match action {
        FirmwareAction::Add { recloser, version } => {
            require_id("recloser", recloser)?;
            let id = ctx.catalog.add_firmware(&version, recloser)?;
            println!("Created firmware {id} ({version})");
        }
        FirmwareAction::Update {
            id,
            recloser,
            version,
        } => {
            require_id("firmware", id)?;
            require_id("recloser", recloser)?;
            ctx.catalog.update_firmware(id, &version, recloser)?;
            println!("Updated firmware {id}");
        }
        FirmwareAction::Delete { id } => {
            require_id("firmware", id)?;
            ctx.catalog.delete_firmware(id)?;
            println!("Deleted firmware {id}");
        }
    }
    Ok(())
}

fn cmd_service(ctx: &Session, action: ServiceAction) -> Result<()> {
    match action {
        ServiceAction::Add {
            firmware,
            key,
            description,
            parent,
        } => {
            require_id("firmware", firmware)?;
            let new = NewService {
                description_key: description.unwrap_or_else(|| key.clone()),
                service_key: key,
                firmware_id: firmware,
                parent_id: parent,
            };
            let id = ctx.catalog.add_service(&new)?;
            println!("Created service {id} ({})", new.service_key);
        }
        ServiceAction::Update {
            id,
            firmware,
            key,
            description,
            parent,
        } => {
            require_id("service", id)?;
            require_id("firmware", firmware)?;
            let new = NewService {
                description_key: description.unwrap_or_else(|| key.clone()),
                service_key: key,
                firmware_id: firmware,
                parent_id: parent,
            };
            ctx.catalog.update_service(id, &new)?;
            println!("Updated service {id}");
        }
        ServiceAction::Delete { id } => {
            require_id("service", id)?;
            ctx.catalog.delete_service(id)?;
            println!("Deleted service {id}");
        }
        ServiceAction::Share {
            key,
            description,
            parent,
        } => {
            if let Some(parent) = parent {
                require_id("parent", parent)?;
            }
            let description = description.unwrap_or_else(|| key.clone());
            let id = ctx.catalog.add_shared_service(&key, &description, parent)?;
            println!("Created shared service {id} ({key})");
        }
        ServiceAction::Link { shared, firmware } => {
            require_id("shared service", shared)?;
            require_id("firmware", firmware)?;
            let id = ctx.catalog.link_service(shared, firmware)?;
            println!("Linked shared service {shared} to firmware {firmware} as service {id}");
        }
        ServiceAction::Unlink { shared, firmware } => {
            require_id("shared service", shared)?;
            require_id("firmware", firmware)?;
            ctx.catalog.unlink_service(shared, firmware)?;
            println!("Unlinked shared service {shared} from firmware {firmware}");
        }
    }
    Ok(())
}

fn cmd_feature(ctx: &Session, action: FeatureAction) -> Result<()> {
    match action {
        FeatureAction::Add { service, key } => {
            require_id("service", service)?;
            let id = ctx.catalog.add_feature(&key, service)?;
            println!("Created feature {id} ({key})");
        }
        FeatureAction::Update { id, service, key } => {
            require_id("feature", id)?;
            require_id("service", service)?;
            ctx.catalog.update_feature(id, &key, service)?;
            println!("Updated feature {id}");
        }
        FeatureAction::Delete { id } => {
            require_id("feature", id)?;
            ctx.catalog.delete_feature(id)?;
            println!("Deleted feature {id}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_diff_with_globals() {
        let cli = Cli::try_parse_from(["recloser", "diff", "1", "2", "--json", "-l", "ptBr"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.lang.as_deref(), Some("ptBr"));
        assert!(matches!(
            cli.command,
            Commands::Diff {
                firmware_a: 1,
                firmware_b: 2
            }
        ));
    }

    #[test]
    fn test_parse_service_add_with_parent() {
        let cli = Cli::try_parse_from([
            "recloser", "service", "add", "3", "SEC_GROUND", "--parent", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Service {
                action:
                    ServiceAction::Add {
                        firmware,
                        key,
                        description,
                        parent,
                    },
            } => {
                assert_eq!(firmware, 3);
                assert_eq!(key, "SEC_GROUND");
                assert_eq!(description, None);
                assert_eq!(parent, Some(7));
            }
            _ => panic!("expected service add"),
        }
    }

    #[test]
    fn test_require_id_rejects_non_positive() {
        assert!(require_id("service", 0).is_err());
        assert!(require_id("service", -4).is_err());
        assert!(require_id("service", 1).is_ok());
    }

    #[test]
    fn test_parse_service_link() {
        let cli = Cli::try_parse_from(["recloser", "service", "link", "4", "2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Service {
                action: ServiceAction::Link {
                    shared: 4,
                    firmware: 2
                }
            }
        ));
    }

    #[test]
    fn test_require_firmware_reports_unknown_id() {
        use recloser_core::schema::SchemaVariant;

        let cat = SqliteCatalog::open_in_memory(SchemaVariant::FirmwareScoped).unwrap();
        let r = cat.add_recloser("ZEUS", "3P4W").unwrap();
        let fw = cat.add_firmware("v1", r).unwrap();
        assert!(require_firmware(&cat, fw).is_ok());
        let err = require_firmware(&cat, fw + 1).unwrap_err();
        assert_eq!(err.code(), recloser_core::ErrorCode::NotFound);
    }

    #[test]
    fn test_parse_limit_set_and_remove() {
        let cli = Cli::try_parse_from(["recloser", "limit", "5", "MAX_VALUE", "5000"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Limit { binding: 5, ref value, remove: false, .. } if value.as_deref() == Some("5000")
        ));

        let cli = Cli::try_parse_from(["recloser", "limit", "5", "MAX_VALUE", "--remove"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Limit { value: None, remove: true, .. }
        ));

        assert!(Cli::try_parse_from(["recloser", "limit", "5", "MAX_VALUE"]).is_err());
        assert!(Cli::try_parse_from(["recloser", "limit", "5", "MAX_VALUE", "1", "--remove"]).is_err());

        let cli = Cli::try_parse_from(["recloser", "unbind", "7"]).unwrap();
        assert!(matches!(cli.command, Commands::Unbind { binding: 7 }));
    }
}
