use super::*;

pub(super) fn read_truck_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    bindings: Res<TruckInputBindings>,
    mut input_state: ResMut<TruckInputState>,
) {
    input_state.steer_left = bindings.steer_left.iter().any(|key| keyboard.pressed(*key));
    input_state.steer_right = bindings.steer_right.iter().any(|key| keyboard.pressed(*key));
    input_state.jump_pressed = bindings.jump.iter().any(|key| keyboard.just_pressed(*key));
}

/// Drives both wheel motors with this tick's command; a stop command brakes the
/// wheels to zero spin relative to the chassis.
pub(super) fn apply_wheel_drive(
    config: Res<GameConfig>,
    input: Res<TruckInputState>,
    mut last_drive: ResMut<LastWheelDrive>,
    mut wheel_query: Query<&mut ImpulseJoint, With<Wheel>>,
) {
    let drive = WheelDrive::from_input(&input);
    let target = drive.target_angular_velocity(config.vehicle.drive.angular_speed);
    let factor = config.vehicle.drive.motor_factor;

    for mut joint in &mut wheel_query {
        joint
            .data
            .as_mut()
            .set_motor_velocity(JointAxis::AngX, target, factor);
    }
    last_drive.0 = drive;
}

pub(super) fn sync_rapier_gravity_from_config(
    config: Res<GameConfig>,
    mut rapier_config_query: Query<&mut RapierConfiguration, With<DefaultRapierContext>>,
) {
    if let Ok(mut rapier_config) = rapier_config_query.single_mut() {
        rapier_config.gravity = Vec2::new(0.0, -config.game.world.gravity.max(0.0));
    }
}

#[allow(clippy::type_complexity)]
pub(super) fn sync_contact_materials(
    config: Res<GameConfig>,
    mut surface_query: Query<(&SurfaceMaterial, &mut Friction, &mut Restitution)>,
    mut chassis_query: Query<
        (&mut Friction, &mut Restitution),
        (With<Chassis>, Without<SurfaceMaterial>),
    >,
) {
    if !config.is_changed() {
        return;
    }
    for (material, mut friction, mut restitution) in &mut surface_query {
        let (next_friction, next_restitution) =
            surface_response(*material, &config.game.materials);
        *friction = next_friction;
        *restitution = next_restitution;
    }
    for (mut friction, mut restitution) in &mut chassis_query {
        let (next_friction, next_restitution) = default_surface(&config.game.materials);
        *friction = next_friction;
        *restitution = next_restitution;
    }
}

pub(super) fn sync_clear_color(config: Res<GameConfig>, mut clear_color: ResMut<ClearColor>) {
    if !config.is_changed() {
        return;
    }
    let [r, g, b] = config.game.app.background_color;
    clear_color.0 = Color::srgb(r, g, b);
}

pub(super) fn camera_follow_truck(
    config: Res<GameConfig>,
    chassis_query: Query<&Transform, With<Chassis>>,
    mut camera_query: Query<&mut Transform, (With<Camera2d>, Without<Chassis>)>,
) {
    let Ok(chassis_transform) = chassis_query.single() else {
        return;
    };
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let app = &config.game.app;
    let world = &config.game.world;
    let center = clamp_camera_center(
        chassis_transform.translation.truncate(),
        Vec2::new(app.view_width, app.view_height),
        Vec2::new(world.width, world.height),
    );
    camera_transform.translation.x = center.x;
    camera_transform.translation.y = center.y;
}

/// Keeps the view rectangle inside `[0, world]` on both axes.
fn clamp_camera_center(target: Vec2, view: Vec2, world: Vec2) -> Vec2 {
    let axis = |target: f32, view: f32, world: f32| {
        let min = view * 0.5;
        let max = world - view * 0.5;
        if max <= min {
            world * 0.5
        } else {
            target.clamp(min, max)
        }
    };
    Vec2::new(
        axis(target.x, view.x, world.x),
        axis(target.y, view.y, world.y),
    )
}
