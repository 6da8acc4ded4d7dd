use clap::Subcommand;
use progression_core::Config;

/// Keys accepted by `get` and `set`, shown in `--help`.
const KEYS_HELP: &str = "\
Keys:
  energy.max                          energy capacity (>= 1, default 100)
  energy.regen_interval_minutes       minutes per regenerated unit (>= 1, default 5)
  experience.xp_per_correct_answer    XP per correct answer in a finished session (default 10)
  experience.xp_per_level             XP needed per level (>= 1, default 100)
  experience.achievement_points_as_xp credit achievement points as XP (default true)
  logging.level                       tracing filter when RUST_LOG is unset (default info)
  catalog_path                        TOML or JSON catalog; unset uses the built-in one";

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one progression setting
    #[command(after_help = KEYS_HELP)]
    Get {
        /// Dotted key, e.g. "energy.regen_interval_minutes"
        key: String,
    },
    /// Change one progression setting; the result is validated before saving
    #[command(after_help = KEYS_HELP)]
    Set {
        /// Dotted key, e.g. "experience.xp_per_level"
        key: String,
        /// New value, parsed to the key's type
        value: String,
    },
    /// Print every setting as JSON
    List,
    /// Overwrite config.toml with the defaults
    Reset,
    /// Print where config.toml lives (PROGRESSION_ENV=dev selects progression-dev)
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => println!("{}", Config::path()?.display()),
    }
    Ok(())
}
