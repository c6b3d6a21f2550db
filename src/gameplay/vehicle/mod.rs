mod materials;
mod runtime;
mod scene;
mod terrain;

pub use materials::SurfaceMaterial;
pub use terrain::{BoundarySide, SurfaceTag};

use crate::assets::{AssetError, AssetRegistry, ShapeCatalog, ShapeError};
use crate::config::{GameConfig, MaterialsConfig, WorldConfig};
use crate::states::GameState;
use bevy::app::AppExit;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use materials::{default_surface, surface_response};
use runtime::{
    apply_wheel_drive, camera_follow_truck, read_truck_input, sync_clear_color,
    sync_contact_materials, sync_rapier_gravity_from_config,
};
use scene::{cleanup_truck_world, spawn_truck_world};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CHASSIS_Z: f32 = 10.0;
const WHEEL_Z: f32 = 11.0;
const HILL_Z: f32 = 5.0;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TruckInputState>()
            .init_resource::<TruckInputBindings>()
            .init_resource::<LastWheelDrive>()
            .add_systems(OnEnter(GameState::InRun), spawn_truck_world)
            .add_systems(OnExit(GameState::InRun), cleanup_truck_world)
            .add_systems(
                Update,
                (
                    sync_rapier_gravity_from_config,
                    sync_contact_materials,
                    sync_clear_color,
                )
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                (
                    read_truck_input.in_set(TruckSystems::Input),
                    apply_wheel_drive.in_set(TruckSystems::Drive),
                    camera_follow_truck,
                )
                    .chain()
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TruckSystems {
    Input,
    Drive,
}

/// Everything spawned for one run; despawned together when the run ends.
#[derive(Component, Debug, Clone, Copy)]
pub struct TruckWorldEntity;

#[derive(Component, Debug, Clone, Copy)]
pub struct Chassis;

/// A driven wheel, jointed to the chassis at its mount offset.
#[derive(Component, Debug, Clone, Copy)]
pub struct Wheel;

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruckInputState {
    pub steer_left: bool,
    pub steer_right: bool,
    pub jump_pressed: bool,
}

#[derive(Resource, Debug, Clone)]
struct TruckInputBindings {
    steer_left: Vec<KeyCode>,
    steer_right: Vec<KeyCode>,
    jump: Vec<KeyCode>,
}

impl Default for TruckInputBindings {
    fn default() -> Self {
        Self {
            steer_left: vec![KeyCode::ArrowLeft, KeyCode::KeyA],
            steer_right: vec![KeyCode::ArrowRight, KeyCode::KeyD],
            jump: vec![KeyCode::Space],
        }
    }
}

/// Per-tick wheel command. Exactly one is chosen per tick; left wins over right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDrive {
    RotateLeft,
    RotateRight,
    Stop,
}

impl WheelDrive {
    pub fn from_input(input: &TruckInputState) -> Self {
        if input.steer_left {
            Self::RotateLeft
        } else if input.steer_right {
            Self::RotateRight
        } else {
            Self::Stop
        }
    }

    /// Counter-clockwise is positive, so turning left rolls the truck towards -x.
    pub fn target_angular_velocity(self, angular_speed: f32) -> f32 {
        match self {
            Self::RotateLeft => angular_speed,
            Self::RotateRight => -angular_speed,
            Self::Stop => 0.0,
        }
    }
}

/// The command `apply_wheel_drive` issued on the most recent tick.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastWheelDrive(pub WheelDrive);

impl Default for LastWheelDrive {
    fn default() -> Self {
        Self(WheelDrive::Stop)
    }
}

#[derive(Debug)]
pub enum WorldBuildError {
    Asset(AssetError),
    Shape(ShapeError),
    ImageNotReady { id: String },
}

impl Display for WorldBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset(error) => write!(f, "{error}"),
            Self::Shape(error) => write!(f, "{error}"),
            Self::ImageNotReady { id } => write!(f, "image for sprite `{id}` is not loaded"),
        }
    }
}

impl Error for WorldBuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Asset(error) => Some(error),
            Self::Shape(error) => Some(error),
            Self::ImageNotReady { .. } => None,
        }
    }
}

impl From<AssetError> for WorldBuildError {
    fn from(error: AssetError) -> Self {
        Self::Asset(error)
    }
}

impl From<ShapeError> for WorldBuildError {
    fn from(error: ShapeError) -> Self {
        Self::Shape(error)
    }
}
