use env_logger::Env;
use techno_room::{config::RoomConfig, TechnoRoomApp};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = RoomConfig::from_env();
    log::info!("Loading assets from '{}'", config.asset_root.display());
    TechnoRoomApp::new(config)?.run()
}
