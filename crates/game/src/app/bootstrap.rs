use std::env;

use engine::{resolve_app_paths, Game, KeyValueStore, LoopConfig, StartupError};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::defs::LevelDefs;
use super::root::GladeGame;
use super::savegame;

const SAVE_FILE: &str = "glade_save.json";
/// Set to `1` to wipe the save before starting (the "reset" switch).
pub(crate) const RESET_SAVE_ENV_VAR: &str = "GLADE_RESET_SAVE";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) game: Box<dyn Game>,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Glade Startup ===");

    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        saves_dir = %app_paths.saves_dir.display(),
        "startup"
    );

    let mut store = KeyValueStore::open(app_paths.saves_dir.join(SAVE_FILE));
    if env::var(RESET_SAVE_ENV_VAR).is_ok_and(|value| value == "1") {
        savegame::clear_all(&mut store);
        info!("save_cleared");
    }
    if savegame::load_level(&store).is_none() {
        savegame::init_defaults(&mut store);
        info!("save_initialized");
    }
    info!(
        sound = savegame::load_sound(&store),
        overlay_seen = savegame::load_overlay_seen(&store),
        "save_flags"
    );

    let defs = LevelDefs::load(&app_paths.assets_dir.join("defs").join("levels.xml"));

    let config = LoopConfig {
        window_title: "Glade".to_string(),
        assets_dir: app_paths.assets_dir,
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        game: Box::new(GladeGame::new(store, defs)),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
