use rflock::engine::{Engine, SCENE_FLOCK};
use rflock::FlockError;
use tracing::{error, info};

const DEFAULT_TICKS: u64 = 500;
const REPORT_EVERY: u64 = 50;

fn main() {
    init_tracing();

    // rflock [config.json | scene-id] [ticks]
    let mut args = std::env::args().skip(1);
    let source = args.next().unwrap_or_else(|| SCENE_FLOCK.to_string());
    let ticks = args
        .next()
        .and_then(|t| t.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TICKS);

    let mut engine = match load(&source) {
        Ok(engine) => engine,
        Err(err) => {
            error!(%source, "{err}");
            std::process::exit(1);
        }
    };

    info!(%source, ticks, seed = engine.seed(), "running headless");
    for t in 1..=ticks {
        if let Err(err) = engine.tick() {
            error!(tick = t, "{err}");
            std::process::exit(1);
        }
        if t % REPORT_EVERY == 0 || t == ticks {
            let stats = engine.stats();
            info!(
                tick = t,
                boids = stats.boids,
                mean_speed = stats.mean_speed,
                overlapping = stats.overlapping,
                distance_variance = stats.pairwise_distance_variance,
                "stats"
            );
        }
    }
}

fn load(source: &str) -> Result<Engine, FlockError> {
    if source.ends_with(".json") {
        let text = std::fs::read_to_string(source)
            .map_err(|e| FlockError::InvalidConfig(format!("cannot read {source}: {e}")))?;
        Engine::from_json(&text)
    } else {
        Engine::new_scene(source, None)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
