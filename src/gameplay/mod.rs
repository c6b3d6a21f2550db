pub mod bounce;
pub mod vehicle;

use bevy::prelude::*;
use bounce::BounceGameplayPlugin;
use vehicle::VehicleGameplayPlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(VehicleGameplayPlugin)
            .add_plugins(BounceGameplayPlugin);
    }
}
