mod assets;
mod config;
mod debug;
mod gameplay;
mod states;

use assets::AssetRegistryPlugin;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_rapier2d::prelude::*;
use config::ConfigPlugin;
use debug::DebugOverlayPlugin;
use gameplay::GameplayPlugin;
use states::{GameState, GameStatePlugin};

/// Matches the default P2 scale of 20 pixels per meter.
const PIXELS_PER_METER: f32 = 20.0;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "P2 Truck".to_string(),
                resolution: (800, 500).into(),
                // Keeps arrow keys and space from scrolling the page on web.
                prevent_default_event_handling: true,
                fit_canvas_to_parent: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin::default())
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(
            PIXELS_PER_METER,
        ))
        .add_plugins(RapierDebugRenderPlugin::default().disabled())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        .add_plugins(ConfigPlugin)
        .add_plugins(AssetRegistryPlugin)
        .add_plugins(DebugOverlayPlugin)
        .add_plugins(GameplayPlugin)
        .init_state::<GameState>()
        .add_plugins(GameStatePlugin)
        .run();
}
