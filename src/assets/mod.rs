mod shapes;

pub use shapes::{ShapeCatalog, ShapeError};

use crate::config::{GameConfig, SpriteAssetConfig};
use bevy::app::AppExit;
use bevy::prelude::*;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const ASSET_ROOT_DIR: &str = "assets";

pub struct AssetRegistryPlugin;

impl Plugin for AssetRegistryPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (sync_asset_registry, sync_shape_catalog).run_if(resource_exists::<GameConfig>),
        );
    }
}

fn sync_asset_registry(
    mut commands: Commands,
    config: Res<GameConfig>,
    asset_server: Res<AssetServer>,
    registry: Option<ResMut<AssetRegistry>>,
) {
    if !config.is_changed() {
        return;
    }
    if registry
        .as_ref()
        .is_some_and(|registry| registry.is_built_from(&config.assets.sprites))
    {
        return;
    }

    let new_registry =
        AssetRegistry::from_config(&config, &asset_server, Path::new(ASSET_ROOT_DIR));

    match registry {
        Some(mut existing_registry) => {
            *existing_registry = new_registry;
            log_asset_registry_summary("Updated", &existing_registry);
        }
        None => {
            log_asset_registry_summary("Initialized", &new_registry);
            commands.insert_resource(new_registry);
        }
    }
}

fn sync_shape_catalog(
    mut commands: Commands,
    config: Res<GameConfig>,
    catalog: Option<Res<ShapeCatalog>>,
    mut exit: MessageWriter<AppExit>,
) {
    if !config.is_changed() {
        return;
    }
    let path = Path::new(ASSET_ROOT_DIR).join(&config.assets.shapes);
    if catalog
        .as_ref()
        .is_some_and(|catalog| catalog.origin() == path.as_path())
    {
        return;
    }

    match ShapeCatalog::load(&path) {
        Ok(new_catalog) => {
            info!(
                "Loaded shape catalog `{}` with {} bodies.",
                path.display(),
                new_catalog.len()
            );
            commands.insert_resource(new_catalog);
        }
        Err(error) if catalog.is_some() => {
            error!("Shape catalog reload failed; keeping previous shapes: {error}");
        }
        Err(error) => {
            error!("Cannot start without collision shapes: {error}");
            exit.write(AppExit::error());
        }
    }
}

fn log_asset_registry_summary(prefix: &str, registry: &AssetRegistry) {
    info!(
        "{prefix} asset registry: sprites {}/{}.",
        registry.available_sprite_count(),
        registry.sprites.len(),
    );
}

#[derive(Resource, Debug, Clone, Default)]
pub struct AssetRegistry {
    pub sprites: HashMap<String, SpriteAssetEntry>,
    pub(crate) source: Vec<SpriteAssetConfig>,
}

impl AssetRegistry {
    pub fn from_config(config: &GameConfig, asset_server: &AssetServer, asset_root: &Path) -> Self {
        let sprites = config
            .assets
            .sprites
            .iter()
            .map(|entry| {
                let sprite = SpriteAssetEntry::from_config(entry, asset_server, asset_root);
                (entry.id.clone(), sprite)
            })
            .collect();

        Self {
            sprites,
            source: config.assets.sprites.clone(),
        }
    }

    /// Whether the registry already reflects these sprite rows; unrelated config
    /// edits leave it alone.
    pub fn is_built_from(&self, sprites: &[SpriteAssetConfig]) -> bool {
        self.source == sprites
    }

    /// Handle of a sprite the scene needs; absent ids and files missing on disk
    /// are errors rather than placeholders.
    pub fn required_sprite(&self, id: &str) -> Result<Handle<Image>, AssetError> {
        let entry = self
            .sprites
            .get(id)
            .ok_or_else(|| AssetError::UnknownSprite { id: id.to_string() })?;
        entry
            .handle
            .clone()
            .ok_or_else(|| AssetError::MissingOnDisk {
                id: id.to_string(),
                path: entry.path.clone(),
            })
    }

    fn available_sprite_count(&self) -> usize {
        self.sprites
            .values()
            .filter(|entry| entry.exists_on_disk)
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct SpriteAssetEntry {
    pub path: String,
    pub exists_on_disk: bool,
    pub handle: Option<Handle<Image>>,
}

impl SpriteAssetEntry {
    fn from_config(
        config: &SpriteAssetConfig,
        asset_server: &AssetServer,
        asset_root: &Path,
    ) -> Self {
        let exists_on_disk = asset_exists(asset_root, &config.path);
        let handle = exists_on_disk.then(|| asset_server.load(config.path.clone()));

        Self {
            path: config.path.clone(),
            exists_on_disk,
            handle,
        }
    }
}

fn asset_exists(asset_root: &Path, path: &str) -> bool {
    if cfg!(target_arch = "wasm32") {
        // No filesystem in the browser; the loader reports failures instead.
        return true;
    }
    let file_path = path.split('#').next().unwrap_or(path);
    asset_root.join(file_path).exists()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    UnknownSprite { id: String },
    MissingOnDisk { id: String, path: String },
    FailedToLoad { id: String },
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSprite { id } => write!(f, "sprite `{id}` is not registered"),
            Self::MissingOnDisk { id, path } => {
                write!(f, "sprite `{id}` is missing on disk (`{path}`)")
            }
            Self::FailedToLoad { id } => write!(f, "sprite `{id}` failed to load"),
        }
    }
}

impl Error for AssetError {}
