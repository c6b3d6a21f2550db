use crate::assets::{AssetError, AssetRegistry, ShapeCatalog};
use crate::config::REQUIRED_SPRITE_IDS;
use bevy::app::AppExit;
use bevy::asset::LoadState;
use bevy::prelude::*;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    Loading,
    InRun,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera)
            .add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(Update, boot_to_loading.run_if(in_state(GameState::Boot)))
            .add_systems(OnEnter(GameState::Loading), enter_loading)
            .add_systems(
                Update,
                loading_to_in_run.run_if(in_state(GameState::Loading)),
            )
            .add_systems(OnEnter(GameState::InRun), enter_in_run);
    }
}

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_loading(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::Loading);
}

fn enter_loading() {
    info!("Entered state: Loading");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadingProgress {
    Pending,
    Ready,
    Failed(AssetError),
}

fn loading_to_in_run(
    asset_server: Res<AssetServer>,
    registry: Option<Res<AssetRegistry>>,
    shapes: Option<Res<ShapeCatalog>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    let (Some(registry), Some(_)) = (registry, shapes) else {
        return;
    };

    let progress = required_sprite_progress(&registry, |handle| {
        match asset_server.load_state(handle.id()) {
            LoadState::Failed(_) => Some(false),
            _ if asset_server.is_loaded_with_dependencies(handle.id()) => Some(true),
            _ => None,
        }
    });

    match progress {
        LoadingProgress::Pending => {}
        LoadingProgress::Ready => next_state.set(GameState::InRun),
        LoadingProgress::Failed(error) => {
            error!("Cannot build the world: {error}");
            exit.write(AppExit::error());
        }
    }
}

/// `probe` answers `Some(true)` for a loaded image, `Some(false)` for a failed one
/// and `None` while loading is still in flight.
fn required_sprite_progress(
    registry: &AssetRegistry,
    mut probe: impl FnMut(&Handle<Image>) -> Option<bool>,
) -> LoadingProgress {
    let mut all_loaded = true;
    for id in REQUIRED_SPRITE_IDS {
        let handle = match registry.required_sprite(id) {
            Ok(handle) => handle,
            Err(error) => return LoadingProgress::Failed(error),
        };
        match probe(&handle) {
            Some(true) => {}
            Some(false) => {
                return LoadingProgress::Failed(AssetError::FailedToLoad { id: id.to_string() })
            }
            None => all_loaded = false,
        }
    }

    if all_loaded {
        LoadingProgress::Ready
    } else {
        LoadingProgress::Pending
    }
}

fn enter_in_run() {
    info!("Entered state: InRun");
}
