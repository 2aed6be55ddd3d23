//! Bullet pooling demo
//!
//! Runs a headless turret for a few simulated seconds. Bullets come from a
//! pool registered through a manifest, live for a fixed lifetime and go back
//! to the pool on their own; every impact spawns a spark. A temporary
//! "rapid fire" override on the fire interval shows the overlay in action.
//!
//! Usage: `bullet_demo [manifest.toml|manifest.ron]`

use std::time::Duration;

use pool_kit::foundation::logging;
use pool_kit::prelude::*;

const FRAME: Duration = Duration::from_millis(16);
const FRAMES: u32 = 300;
const BULLET_LIFETIME: Duration = Duration::from_millis(400);
const SPARK_LIFETIME: Duration = Duration::from_millis(120);
const DEFAULT_MANIFEST: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/pools.toml");

/// Demo errors
#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Builder error: {0}")]
    Builder(#[from] BuilderError),
}

/// Traces lifecycle notifications for one template
struct ShotCounter {
    name: &'static str,
}

impl Poolable for ShotCounter {
    fn on_spawn(&mut self, instance: InstanceId) {
        log::trace!("{} {:?} spawned", self.name, instance);
    }

    fn on_despawn(&mut self, instance: InstanceId) {
        log::trace!("{} {:?} despawned", self.name, instance);
    }
}

struct BulletDemo {
    host: HeadlessHost,
    registry: PoolRegistry<HeadlessHost>,
    builders: BuilderPools,
    fire_interval: OverlayableValue<Duration>,
    since_last_shot: Duration,
    shots: u32,
}

impl BulletDemo {
    fn new(manifest: &PoolManifest<String>) -> Self {
        let mut host = HeadlessHost::new();
        host.register_listener("bullet", |_| Box::new(ShotCounter { name: "bullet" }));
        host.register_listener("spark", |_| Box::new(ShotCounter { name: "spark" }));

        let root = host.create_scope("Pools", None);
        let mut registry = PoolRegistry::new();
        registry.set_pool_root(Some(root));
        let registered = registry.register_manifest(&mut host, manifest);
        log::info!("Registered {} pools from manifest", registered);

        let mut fire_interval = OverlayableValue::new(Duration::from_millis(100));
        fire_interval.on_value_changed(|interval| log::info!("Fire interval is now {:?}", interval));

        Self {
            host,
            registry,
            builders: BuilderPools::new(),
            fire_interval,
            since_last_shot: Duration::ZERO,
            shots: 0,
        }
    }

    fn fire(&mut self, frame: u32) -> Result<(), DemoError> {
        let angle = frame as f32 * 0.05;
        let mut builder = self.builders.spawn_builder::<HeadlessHost>("Bullet");
        builder
            .with_position(Vec3::new(angle.cos(), 0.0, angle.sin()))?
            .with_rotation(Quat::from_euler_angles(0.0, angle, 0.0))?;

        if let Some(bullet) = builder.build((&mut self.registry, &mut self.host))? {
            self.registry.despawn_after(bullet, BULLET_LIFETIME);
            self.shots += 1;
        }
        Ok(())
    }

    fn update(&mut self, frame: u32) -> Result<(), DemoError> {
        self.since_last_shot += FRAME;
        if self.since_last_shot >= *self.fire_interval.value() {
            self.since_last_shot = Duration::ZERO;
            self.fire(frame)?;
        }

        let report = self.registry.tick(&mut self.host, FRAME);
        for bullet in &report.expired {
            let impact = self
                .host
                .instance(*bullet)
                .map_or_else(Vec3::zeros, |record| record.position);
            self.registry
                .spawn_for(&mut self.host, "Spark", &Placement::at(impact), SPARK_LIFETIME);
        }

        if frame % 60 == 0 {
            self.log_stats(frame);
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), DemoError> {
        let mut rapid_fire = None;
        for frame in 0..FRAMES {
            match frame {
                100 => rapid_fire = Some(self.fire_interval.set_value(Duration::from_millis(32), 10)),
                200 => {
                    if let Some(token) = rapid_fire.take() {
                        self.fire_interval.remove_value(token);
                    }
                }
                _ => {}
            }
            self.update(frame)?;
        }

        let despawned = self.registry.despawn_all(&mut self.host, "Bullet")
            + self.registry.despawn_all(&mut self.host, "Spark");
        log::info!("Fired {} bullets, returned {} at shutdown", self.shots, despawned);
        self.log_stats(FRAMES);

        self.registry.clear_all(&mut self.host);
        log::info!(
            "Host created {} instances and destroyed {}",
            self.host.instantiated_total(),
            self.host.destroyed_total()
        );
        Ok(())
    }

    fn log_stats(&self, frame: u32) {
        for key in ["Bullet", "Spark"] {
            if let Some(pool) = self.registry.pool(key) {
                let stats = pool.stats();
                log::info!(
                    "[frame {}] {}: all={} active={} idle={}/{}",
                    frame,
                    key,
                    stats.count_all,
                    stats.count_active,
                    stats.count_inactive,
                    stats.max_size
                );
            }
        }
    }
}

fn load_manifest() -> Result<PoolManifest<String>, DemoError> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_MANIFEST.to_string());
    let manifest = PoolManifest::<String>::load_from_file(&path)?;
    manifest.validate()?;
    Ok(manifest)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest = load_manifest()?;
    logging::init_with_level(&manifest.settings.log_level);

    log::info!("Starting bullet pooling demo");
    let mut demo = BulletDemo::new(&manifest);
    demo.run()?;
    log::info!("Bullet demo finished");
    Ok(())
}
