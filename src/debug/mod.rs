use crate::config::GameConfig;
use crate::gameplay::bounce::{BounceLatch, TruckBouncedEvent};
use crate::gameplay::vehicle::{Chassis, LastWheelDrive, TruckInputState, WheelDrive};
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use bevy_rapier2d::render::DebugRenderContext;

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugRunStats>()
            .init_resource::<KeybindOverlayState>()
            .init_resource::<TruckTuningPanelState>()
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(Update, toggle_keybind_overlay)
            .add_systems(Update, sync_keybind_overlay_visibility)
            .add_systems(Update, toggle_truck_tuning_panel)
            .add_systems(
                Update,
                (init_debug_render_from_config, toggle_debug_render)
                    .chain()
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(OnEnter(GameState::InRun), reset_run_stats)
            .add_systems(
                Update,
                (update_run_stats, update_debug_overlay_text)
                    .chain()
                    .run_if(in_state(GameState::InRun)),
            )
            .add_systems(
                EguiPrimaryContextPass,
                truck_tuning_panel_ui
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct KeybindOverlayText;

#[derive(Resource, Debug, Clone, Default)]
pub struct DebugRunStats {
    pub bounces_fired: u32,
}

#[derive(Resource, Debug, Clone, Default)]
struct KeybindOverlayState {
    visible: bool,
}

/// Live-editable subset of the config exposed in the tuning window.
#[derive(Debug, Clone, PartialEq)]
struct TruckTuningParams {
    angular_speed: f32,
    motor_factor: f32,
    bounce_speed: f32,
    gravity: f32,
    wheel_ground_friction: f32,
    wheel_ground_restitution: f32,
}

impl TruckTuningParams {
    fn from_config(config: &GameConfig) -> Self {
        Self {
            angular_speed: config.vehicle.drive.angular_speed,
            motor_factor: config.vehicle.drive.motor_factor,
            bounce_speed: config.vehicle.bounce.speed,
            gravity: config.game.world.gravity,
            wheel_ground_friction: config.game.materials.wheel_ground.friction,
            wheel_ground_restitution: config.game.materials.wheel_ground.restitution,
        }
    }

    fn apply_to_config(&self, config: &mut GameConfig) {
        config.vehicle.drive.angular_speed = self.angular_speed;
        config.vehicle.drive.motor_factor = self.motor_factor;
        config.vehicle.bounce.speed = self.bounce_speed;
        config.game.world.gravity = self.gravity;
        config.game.materials.wheel_ground.friction = self.wheel_ground_friction;
        config.game.materials.wheel_ground.restitution = self.wheel_ground_restitution;
    }
}

#[derive(Resource, Debug, Clone, Default)]
struct TruckTuningPanelState {
    visible: bool,
    params: Option<TruckTuningParams>,
    status: String,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    keybind_overlay: Res<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    commands.spawn((
        DebugOverlayText,
        Text::new("debug overlay initializing..."),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.12, 0.14, 0.16)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(10.0),
            top: Val::Px(10.0),
            ..default()
        },
        ZIndex(100),
    ));

    commands.spawn((
        KeybindOverlayText,
        Text::new(keybind_overlay_text()),
        TextFont {
            font_size: 14.0,
            ..default()
        },
        TextColor(Color::srgb(0.90, 0.94, 0.97)),
        BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
        BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(10.0),
            top: Val::Px(10.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        if keybind_overlay.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        },
        ZIndex(100),
    ));
}

fn reset_run_stats(mut run_stats: ResMut<DebugRunStats>) {
    run_stats.bounces_fired = 0;
}

fn update_run_stats(
    mut bounced: MessageReader<TruckBouncedEvent>,
    mut run_stats: ResMut<DebugRunStats>,
) {
    let fired = bounced.read().count() as u32;
    run_stats.bounces_fired = run_stats.bounces_fired.saturating_add(fired);
}

fn update_debug_overlay_text(
    diagnostics: Res<DiagnosticsStore>,
    run_stats: Res<DebugRunStats>,
    chassis_query: Query<&Transform, With<Chassis>>,
    input_state: Res<TruckInputState>,
    last_drive: Res<LastWheelDrive>,
    latch: Res<BounceLatch>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);
    let chassis = chassis_query
        .single()
        .map(|transform| transform.translation.truncate())
        .unwrap_or(Vec2::ZERO);

    *text = Text::new(overlay_text(
        fps,
        chassis,
        &input_state,
        last_drive.0,
        latch.is_armed(),
        run_stats.bounces_fired,
    ));
}

fn overlay_text(
    fps: f64,
    chassis: Vec2,
    input: &TruckInputState,
    drive: WheelDrive,
    latch_armed: bool,
    bounces_fired: u32,
) -> String {
    let drive = match drive {
        WheelDrive::RotateLeft => "left",
        WheelDrive::RotateRight => "right",
        WheelDrive::Stop => "stop",
    };
    format!(
        "FPS: {fps:>5.1}\nChassis: ({x:>6.1}, {y:>6.1})\nInput: left={left} right={right}\nDrive: {drive}\nBounce: {latch} | fired {bounces_fired}\nHotkeys: H help | V tune | F1 bodies | F5 reload config",
        x = chassis.x,
        y = chassis.y,
        left = if input.steer_left { "yes" } else { "no" },
        right = if input.steer_right { "yes" } else { "no" },
        latch = if latch_armed { "armed" } else { "disarmed" },
    )
}

fn toggle_keybind_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
) {
    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyH) {
        state.visible = !state.visible;
        info!(
            "Debug keybind panel {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

fn sync_keybind_overlay_visibility(
    state: Res<KeybindOverlayState>,
    mut query: Query<&mut Visibility, With<KeybindOverlayText>>,
) {
    if !state.is_changed() {
        return;
    }

    let next_visibility = if state.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };

    for mut visibility in &mut query {
        *visibility = next_visibility;
    }
}

/// `show_bodies` only seeds the outline state; later F1 toggles survive reloads
/// and tuning edits.
fn init_debug_render_from_config(
    config: Res<GameConfig>,
    debug_render: Option<ResMut<DebugRenderContext>>,
) {
    if !config.is_added() {
        return;
    }
    if let Some(mut debug_render) = debug_render {
        debug_render.enabled = config.game.app.show_bodies;
    }
}

fn toggle_debug_render(
    keyboard: Res<ButtonInput<KeyCode>>,
    debug_render: Option<ResMut<DebugRenderContext>>,
) {
    if !keyboard.just_pressed(KeyCode::F1) {
        return;
    }
    let Some(mut debug_render) = debug_render else {
        return;
    };

    debug_render.enabled = !debug_render.enabled;
    info!(
        "Physics body outlines {}.",
        if debug_render.enabled { "shown" } else { "hidden" }
    );
}

fn toggle_truck_tuning_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut panel_state: ResMut<TruckTuningPanelState>,
    config: Option<Res<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyV) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    if panel_state.visible {
        if let Some(config) = config {
            panel_state.params = Some(TruckTuningParams::from_config(&config));
            panel_state.status.clear();
        }
        info!("Truck tuning panel shown.");
    } else {
        info!("Truck tuning panel hidden.");
    }
}

fn truck_tuning_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel_state: ResMut<TruckTuningPanelState>,
    mut config: ResMut<GameConfig>,
) {
    if !panel_state.visible {
        return;
    }

    let mut params = panel_state
        .params
        .clone()
        .unwrap_or_else(|| TruckTuningParams::from_config(&config));

    let mut window_open = panel_state.visible;
    let mut params_changed = false;
    let mut reload_clicked = false;
    let status = panel_state.status.clone();

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Truck Tuning")
        .open(&mut window_open)
        .resizable(true)
        .default_width(420.0)
        .show(ctx, |ui| {
            ui.label("Edits apply to the running config; F5 reloads from disk.");
            ui.separator();

            ui.collapsing("Drive + Bounce", |ui| {
                params_changed |= tuning_slider_row(
                    ui,
                    "wheel angular speed",
                    &mut params.angular_speed,
                    1.0..=60.0,
                    0.1,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "motor factor",
                    &mut params.motor_factor,
                    0.1..=20.0,
                    0.05,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "bounce speed",
                    &mut params.bounce_speed,
                    50.0..=1500.0,
                    1.0,
                );
            });

            ui.collapsing("World + Contact", |ui| {
                params_changed |=
                    tuning_slider_row(ui, "gravity", &mut params.gravity, 0.0..=1500.0, 1.0);
                params_changed |= tuning_slider_row(
                    ui,
                    "wheel/ground friction",
                    &mut params.wheel_ground_friction,
                    0.3..=2000.0,
                    1.0,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "wheel/ground restitution",
                    &mut params.wheel_ground_restitution,
                    0.0..=1.0,
                    0.01,
                );
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Reset From Config").clicked() {
                    reload_clicked = true;
                }
            });
            if !status.is_empty() {
                ui.separator();
                ui.label(status);
            }
        });

    panel_state.visible = window_open;
    if reload_clicked {
        panel_state.params = Some(TruckTuningParams::from_config(&config));
        panel_state.status = "Reset from running config.".to_string();
        return;
    }

    if params_changed {
        match apply_truck_tuning(&config, &params) {
            Ok(next) => {
                *config = next;
                panel_state.status.clear();
            }
            Err(error) => panel_state.status = error,
        }
    }
    panel_state.params = Some(params);
}

/// Validates the edit against a copy so a bad value never reaches the running
/// config.
fn apply_truck_tuning(config: &GameConfig, params: &TruckTuningParams) -> Result<GameConfig, String> {
    let mut next = config.clone();
    params.apply_to_config(&mut next);
    next.validate()
        .map_err(|error| format!("Tuning rejected: {error}"))?;
    Ok(next)
}

fn tuning_slider_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    slider_range: std::ops::RangeInclusive<f32>,
    drag_speed: f32,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        changed |= ui
            .add(egui::Slider::new(value, slider_range).show_value(false))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(value).speed(drag_speed as f64))
            .changed();
    });
    changed
}

fn keybind_overlay_text() -> &'static str {
    "Keybinds\n\
Left / A - Roll left\n\
Right / D - Roll right\n\
Space - Bounce\n\
H - Toggle this panel\n\
V - Toggle truck tuning panel\n\
F1 - Toggle physics body outlines\n\
F5 - Hot-reload config"
}
