use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";

/// Sprite ids the scene cannot be built without.
pub const REQUIRED_SPRITE_IDS: [&str; 3] = ["truck", "wheel", "hill"];

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: world {}x{}, gravity {}, {} wheel mounts, {} sprites.",
        config.game.world.width,
        config.game.world.height,
        config.game.world.gravity,
        config.vehicle.wheel_mounts.len(),
        config.sprite_assets_by_id.len()
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub vehicle: VehicleFile,
    pub assets: AssetsFile,
    pub sprite_assets_by_id: HashMap<String, SpriteAssetConfig>,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let vehicle: VehicleFile = read_toml(&config_dir.join("vehicle.toml"))?;
        let assets: AssetsFile = read_toml(&config_dir.join("assets.toml"))?;

        Self::from_files(game, vehicle, assets)
    }

    pub fn from_files(
        game: GameFile,
        vehicle: VehicleFile,
        assets: AssetsFile,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            sprite_assets_by_id: to_index("assets.toml::sprites", &assets.sprites)?,
            game,
            vehicle,
            assets,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let app = &self.game.app;
        if app.view_width <= 0.0 || app.view_height <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app view size must be > 0".to_string(),
            ));
        }

        let world = &self.game.world;
        if world.width < app.view_width || world.height < app.view_height {
            return Err(ConfigError::Validation(format!(
                "game.toml::world ({}x{}) must be at least as large as the view ({}x{})",
                world.width, world.height, app.view_width, app.view_height
            )));
        }
        if world.gravity < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::world.gravity must be >= 0".to_string(),
            ));
        }
        if world.boundary_thickness <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::world.boundary_thickness must be > 0".to_string(),
            ));
        }

        let materials = &self.game.materials;
        for (label, friction, restitution) in [
            (
                "materials",
                materials.default_friction,
                materials.default_restitution,
            ),
            (
                "materials.wheel_ground",
                materials.wheel_ground.friction,
                materials.wheel_ground.restitution,
            ),
        ] {
            if friction < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "game.toml::{label} friction must be >= 0"
                )));
            }
            if restitution < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "game.toml::{label} restitution must be >= 0"
                )));
            }
        }

        // Wheel colliders resolve the pair rule with a max combine against ground.
        if materials.wheel_ground.friction < materials.default_friction
            || materials.wheel_ground.restitution < materials.default_restitution
        {
            return Err(ConfigError::Validation(
                "game.toml::materials.wheel_ground coefficients must be >= the default surface coefficients"
                    .to_string(),
            ));
        }

        let vehicle = &self.vehicle;
        if vehicle.wheel_mounts.len() != 2 {
            return Err(ConfigError::Validation(format!(
                "vehicle.toml::wheel_mounts must contain exactly 2 entries (found {})",
                vehicle.wheel_mounts.len()
            )));
        }
        if vehicle.wheel.radius <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::wheel.radius must be > 0".to_string(),
            ));
        }
        if vehicle.wheel.max_force <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::wheel.max_force must be > 0".to_string(),
            ));
        }
        if vehicle.drive.angular_speed <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::drive.angular_speed must be > 0".to_string(),
            ));
        }
        if vehicle.drive.motor_factor <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::drive.motor_factor must be > 0".to_string(),
            ));
        }
        if vehicle.bounce.speed <= 0.0 {
            return Err(ConfigError::Validation(
                "vehicle.toml::bounce.speed must be > 0".to_string(),
            ));
        }

        let [spawn_x, spawn_y] = vehicle.chassis.spawn;
        if !(0.0..=world.width).contains(&spawn_x) || !(0.0..=world.height).contains(&spawn_y) {
            return Err(ConfigError::Validation(format!(
                "vehicle.toml::chassis.spawn [{spawn_x}, {spawn_y}] lies outside the world"
            )));
        }
        if !(0.0..=world.width).contains(&vehicle.terrain.center_x) {
            return Err(ConfigError::Validation(format!(
                "vehicle.toml::terrain.center_x {} lies outside the world",
                vehicle.terrain.center_x
            )));
        }

        for id in REQUIRED_SPRITE_IDS {
            if !self.sprite_assets_by_id.contains_key(id) {
                return Err(ConfigError::Validation(format!(
                    "assets.toml::sprites is missing required sprite id `{id}`"
                )));
            }
        }

        for (label, sprite_id) in [
            ("chassis.sprite", &vehicle.chassis.sprite),
            ("wheel.sprite", &vehicle.wheel.sprite),
            ("terrain.sprite", &vehicle.terrain.sprite),
        ] {
            if !self.sprite_assets_by_id.contains_key(sprite_id) {
                return Err(ConfigError::Validation(format!(
                    "vehicle.toml::{label} references unknown sprite id `{sprite_id}`"
                )));
            }
        }

        if self.assets.shapes.trim().is_empty() {
            return Err(ConfigError::Validation(
                "assets.toml::shapes cannot be empty".to_string(),
            ));
        }

        for (index, sprite) in self.assets.sprites.iter().enumerate() {
            if sprite.path.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "assets.toml::sprites[{index}].path cannot be empty"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn to_index<T>(label: &str, rows: &[T]) -> Result<HashMap<String, T>, ConfigError>
where
    T: HasId + Clone,
{
    let mut map = HashMap::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if map.insert(id.to_string(), row.clone()).is_some() {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(map)
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub world: WorldConfig,
    pub materials: MaterialsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub view_width: f32,
    pub view_height: f32,
    pub background_color: [f32; 3],
    pub debug_overlay: bool,
    #[serde(default)]
    pub show_bodies: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
    #[serde(default = "default_boundary_thickness")]
    pub boundary_thickness: f32,
}

fn default_boundary_thickness() -> f32 {
    40.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialsConfig {
    #[serde(default = "default_surface_friction")]
    pub default_friction: f32,
    #[serde(default)]
    pub default_restitution: f32,
    pub wheel_ground: ContactRuleConfig,
}

fn default_surface_friction() -> f32 {
    0.3
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ContactRuleConfig {
    pub friction: f32,
    pub restitution: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleFile {
    pub chassis: ChassisConfig,
    pub wheel: WheelConfig,
    pub wheel_mounts: Vec<WheelMountConfig>,
    pub drive: DriveConfig,
    pub bounce: BounceConfig,
    pub terrain: TerrainConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChassisConfig {
    pub sprite: String,
    pub shape: String,
    pub spawn: [f32; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct WheelConfig {
    pub sprite: String,
    pub radius: f32,
    pub max_force: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WheelMountConfig {
    pub offset: [f32; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    pub angular_speed: f32,
    #[serde(default = "default_motor_factor")]
    pub motor_factor: f32,
}

fn default_motor_factor() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct BounceConfig {
    pub speed: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TerrainConfig {
    pub sprite: String,
    pub shape: String,
    pub center_x: f32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AssetsFile {
    pub shapes: String,
    #[serde(default)]
    pub sprites: Vec<SpriteAssetConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpriteAssetConfig {
    pub id: String,
    pub path: String,
}

impl HasId for SpriteAssetConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const GAME_TOML: &str = include_str!("../../config/game.toml");
    const VEHICLE_TOML: &str = include_str!("../../config/vehicle.toml");
    const ASSETS_TOML: &str = include_str!("../../config/assets.toml");

    fn parse_files() -> (GameFile, VehicleFile, AssetsFile) {
        (
            toml::from_str(GAME_TOML).expect("game.toml should parse"),
            toml::from_str(VEHICLE_TOML).expect("vehicle.toml should parse"),
            toml::from_str(ASSETS_TOML).expect("assets.toml should parse"),
        )
    }

    pub(crate) fn shipped_config() -> GameConfig {
        let (game, vehicle, assets) = parse_files();
        GameConfig::from_files(game, vehicle, assets).expect("shipped config should validate")
    }

    #[test]
    fn shipped_config_matches_demo_scenario() {
        let config = shipped_config();

        assert_eq!(config.game.world.width, 1600.0);
        assert_eq!(config.game.world.gravity, 300.0);
        assert_eq!(config.vehicle.wheel_mounts.len(), 2);
        assert_eq!(config.vehicle.wheel.radius, 15.5);
        assert_eq!(config.game.materials.wheel_ground.friction, 1000.0);
        assert_eq!(config.game.materials.wheel_ground.restitution, 0.3);
        assert_eq!(
            config
                .sprite_assets_by_id
                .get("hill")
                .map(|sprite| sprite.path.as_str()),
            Some("sprites/hill.png")
        );
    }

    #[test]
    fn validation_fails_for_wrong_wheel_count() {
        let (game, mut vehicle, assets) = parse_files();
        vehicle.wheel_mounts.pop();

        let error = GameConfig::from_files(game, vehicle, assets)
            .expect_err("validation should fail");

        assert!(error.to_string().contains("exactly 2"));
    }

    #[test]
    fn validation_fails_for_missing_required_sprite() {
        let (game, vehicle, mut assets) = parse_files();
        assets.sprites.retain(|sprite| sprite.id != "hill");

        let error = GameConfig::from_files(game, vehicle, assets)
            .expect_err("validation should fail");
        let message = error.to_string();

        assert!(message.contains("hill"));
    }

    #[test]
    fn validation_fails_for_duplicate_sprite_id() {
        let (game, vehicle, mut assets) = parse_files();
        let duplicate = assets.sprites[0].clone();
        assets.sprites.push(duplicate);

        let error = GameConfig::from_files(game, vehicle, assets)
            .expect_err("validation should fail");

        assert!(error.to_string().contains("duplicate id"));
    }

    #[test]
    fn validation_fails_for_spawn_outside_world() {
        let (game, mut vehicle, assets) = parse_files();
        vehicle.chassis.spawn = [-10.0, 100.0];

        let error = GameConfig::from_files(game, vehicle, assets)
            .expect_err("validation should fail");

        assert!(error.to_string().contains("outside the world"));
    }

    #[test]
    fn validation_fails_for_negative_contact_restitution() {
        let (mut game, vehicle, assets) = parse_files();
        game.materials.wheel_ground.restitution = -0.1;

        let error = GameConfig::from_files(game, vehicle, assets)
            .expect_err("validation should fail");

        assert!(error.to_string().contains("wheel_ground restitution"));
    }

    #[test]
    fn validation_fails_for_wheel_rule_weaker_than_default_surface() {
        let (mut game, vehicle, assets) = parse_files();
        game.materials.wheel_ground.friction = 0.1;

        let error = GameConfig::from_files(game, vehicle, assets)
            .expect_err("validation should fail");

        assert!(error.to_string().contains("default surface coefficients"));
    }

    #[test]
    fn missing_config_dir_reports_io_error() {
        let error = GameConfig::load_from_dir(Path::new("does/not/exist"))
            .expect_err("loading should fail");

        assert!(matches!(error, ConfigError::Io { .. }));
        assert!(error.source().is_some());
    }
}
