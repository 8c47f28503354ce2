use clap::Subcommand;
use kairo_core::catalog::{build_catalog, SessionFamily};
use kairo_core::storage::Config;

#[derive(Subcommand)]
pub enum ModesAction {
    /// List the catalog for a family
    List {
        /// "focus" or "break"
        #[arg(long, default_value = "focus")]
        family: String,
    },
}

pub fn run(action: ModesAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ModesAction::List { family } => {
            let family = SessionFamily::parse(&family.to_uppercase())
                .ok_or_else(|| format!("unknown family '{family}' (use focus or break)"))?;
            let config = Config::load_or_default();
            let catalog = build_catalog(
                family,
                config.timer.custom_focus_seconds,
                config.timer.custom_break_seconds,
            );
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
    }
    Ok(())
}
