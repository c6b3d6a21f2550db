use super::terrain::{hill_translation, spawn_boundary_walls, Hill};
use super::*;

#[derive(Debug, Clone)]
pub(super) struct SpriteSource {
    pub(super) handle: Handle<Image>,
    pub(super) size: Vec2,
}

#[derive(Debug, Clone)]
pub(super) struct BodyPlan {
    pub(super) sprite: SpriteSource,
    pub(super) translation: Vec2,
    pub(super) collider: Collider,
}

#[derive(Debug, Clone)]
pub(super) struct WheelPlan {
    pub(super) sprite: SpriteSource,
    pub(super) translation: Vec2,
    pub(super) pivot: Vec2,
}

/// Resolved layout of a run: sprites, colliders and world positions, with no
/// entities spawned yet.
#[derive(Debug, Clone)]
pub(super) struct TruckWorldPlan {
    pub(super) chassis: BodyPlan,
    pub(super) wheels: Vec<WheelPlan>,
    pub(super) hill: BodyPlan,
}

pub(super) fn plan_truck_world(
    config: &GameConfig,
    shapes: &ShapeCatalog,
    sprites: impl Fn(&str) -> Result<SpriteSource, WorldBuildError>,
) -> Result<TruckWorldPlan, WorldBuildError> {
    let vehicle = &config.vehicle;

    let chassis_sprite = sprites(&vehicle.chassis.sprite)?;
    let chassis_collider = shapes.collider(&vehicle.chassis.shape, chassis_sprite.size)?;
    let chassis_translation = Vec2::from(vehicle.chassis.spawn);

    let wheel_sprite = sprites(&vehicle.wheel.sprite)?;
    let wheels = vehicle
        .wheel_mounts
        .iter()
        .map(|mount| {
            let pivot = Vec2::from(mount.offset);
            WheelPlan {
                sprite: wheel_sprite.clone(),
                translation: chassis_translation + pivot,
                pivot,
            }
        })
        .collect();

    let hill_sprite = sprites(&vehicle.terrain.sprite)?;
    let hill_collider = shapes.collider(&vehicle.terrain.shape, hill_sprite.size)?;
    let hill_at = hill_translation(vehicle.terrain.center_x, hill_sprite.size);

    Ok(TruckWorldPlan {
        chassis: BodyPlan {
            sprite: chassis_sprite,
            translation: chassis_translation,
            collider: chassis_collider,
        },
        wheels,
        hill: BodyPlan {
            sprite: hill_sprite,
            translation: hill_at,
            collider: hill_collider,
        },
    })
}

pub(super) fn spawn_truck_world(
    mut commands: Commands,
    config: Res<GameConfig>,
    shapes: Option<Res<ShapeCatalog>>,
    registry: Option<Res<AssetRegistry>>,
    images: Res<Assets<Image>>,
    existing: Query<(), With<Chassis>>,
    mut exit: MessageWriter<AppExit>,
) {
    if !existing.is_empty() {
        return;
    }
    let (Some(shapes), Some(registry)) = (shapes, registry) else {
        error!("Cannot build the world: shape catalog or asset registry is missing");
        exit.write(AppExit::error());
        return;
    };

    let plan = plan_truck_world(&config, &shapes, |id| {
        let handle = registry.required_sprite(id)?;
        let image = images
            .get(&handle)
            .ok_or_else(|| WorldBuildError::ImageNotReady { id: id.to_string() })?;
        Ok(SpriteSource {
            handle,
            size: image.size_f32(),
        })
    });

    match plan {
        Ok(plan) => {
            info!(
                "Spawned truck world: chassis at ({:.0}, {:.0}), {} wheels, hill at ({:.0}, {:.0})",
                plan.chassis.translation.x,
                plan.chassis.translation.y,
                plan.wheels.len(),
                plan.hill.translation.x,
                plan.hill.translation.y
            );
            spawn_truck_world_plan(&mut commands, plan, &config);
        }
        Err(error) => {
            error!("Cannot build the world: {error}");
            exit.write(AppExit::error());
        }
    }
}

pub(super) fn spawn_truck_world_plan(
    commands: &mut Commands,
    plan: TruckWorldPlan,
    config: &GameConfig,
) -> Entity {
    let materials = &config.game.materials;
    let (default_friction, default_restitution) = default_surface(materials);
    let (ground_friction, ground_restitution) =
        surface_response(SurfaceMaterial::Ground, materials);
    let (wheel_friction, wheel_restitution) = surface_response(SurfaceMaterial::Wheel, materials);

    let chassis = commands
        .spawn((
            Name::new("TruckChassis"),
            TruckWorldEntity,
            Chassis,
            Sprite::from_image(plan.chassis.sprite.handle),
            Transform::from_translation(plan.chassis.translation.extend(CHASSIS_Z)),
        ))
        .insert((
            RigidBody::Dynamic,
            plan.chassis.collider,
            default_friction,
            default_restitution,
            Velocity::zero(),
            ExternalImpulse::default(),
            ReadMassProperties::default(),
            Sleeping::disabled(),
        ))
        .id();

    let wheel = &config.vehicle.wheel;
    for (index, wheel_plan) in plan.wheels.into_iter().enumerate() {
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(wheel_plan.pivot)
            .local_anchor2(Vec2::ZERO)
            .motor_max_force(wheel.max_force);
        commands
            .spawn((
                Name::new(format!("TruckWheel{index}")),
                TruckWorldEntity,
                Wheel,
                SurfaceMaterial::Wheel,
                Sprite::from_image(wheel_plan.sprite.handle),
                Transform::from_translation(wheel_plan.translation.extend(WHEEL_Z)),
            ))
            .insert((
                RigidBody::Dynamic,
                Collider::ball(wheel.radius),
                wheel_friction,
                wheel_restitution,
                ActiveEvents::COLLISION_EVENTS,
                Velocity::zero(),
                ImpulseJoint::new(chassis, joint.build()),
                Sleeping::disabled(),
            ));
    }

    commands.spawn((
        Name::new("Hill"),
        TruckWorldEntity,
        Hill,
        SurfaceTag::Terrain,
        SurfaceMaterial::Ground,
        Sprite::from_image(plan.hill.sprite.handle),
        Transform::from_translation(plan.hill.translation.extend(HILL_Z)),
        RigidBody::Fixed,
        plan.hill.collider,
        ground_friction,
        ground_restitution,
    ));

    spawn_boundary_walls(commands, &config.game.world, materials);
    chassis
}

pub(super) fn cleanup_truck_world(
    mut commands: Commands,
    world_query: Query<Entity, With<TruckWorldEntity>>,
) {
    for entity in &world_query {
        commands.entity(entity).try_despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::shipped_config;
    use std::path::Path;

    const SHIPPED_SHAPES: &str = include_str!("../../../assets/physics.json");

    fn shipped_shapes() -> ShapeCatalog {
        ShapeCatalog::parse(SHIPPED_SHAPES, Path::new("physics.json"))
            .expect("shipped shapes should parse")
    }

    fn shipped_sprites(id: &str) -> Result<SpriteSource, WorldBuildError> {
        let size = match id {
            "truck" => Vec2::new(140.0, 56.0),
            "wheel" => Vec2::new(32.0, 32.0),
            "hill" => Vec2::new(600.0, 140.0),
            _ => {
                return Err(WorldBuildError::Asset(AssetError::UnknownSprite {
                    id: id.to_string(),
                }))
            }
        };
        Ok(SpriteSource {
            handle: Handle::default(),
            size,
        })
    }

    #[test]
    fn plan_places_wheels_at_chassis_pivots() {
        let config = shipped_config();

        let plan = plan_truck_world(&config, &shipped_shapes(), shipped_sprites)
            .expect("shipped world should plan");

        assert_eq!(plan.chassis.translation, Vec2::new(200.0, 100.0));
        assert_eq!(plan.wheels.len(), 2);
        assert_eq!(plan.wheels[0].pivot, Vec2::new(55.0, -24.0));
        assert_eq!(plan.wheels[0].translation, Vec2::new(255.0, 76.0));
        assert_eq!(plan.wheels[1].translation, Vec2::new(148.0, 76.0));
        assert_eq!(plan.hill.translation, Vec2::new(800.0, 70.0));
    }

    #[test]
    fn missing_shape_fails_the_build() {
        let mut config = shipped_config();
        config.vehicle.terrain.shape = "mountain".to_string();

        let result = plan_truck_world(&config, &shipped_shapes(), shipped_sprites);

        assert!(matches!(
            result,
            Err(WorldBuildError::Shape(ShapeError::MissingShape { .. }))
        ));
    }

    #[test]
    fn unresolved_sprite_fails_the_build() {
        let config = shipped_config();

        let result = plan_truck_world(&config, &shipped_shapes(), |id| {
            if id == "wheel" {
                Err(WorldBuildError::ImageNotReady { id: id.to_string() })
            } else {
                shipped_sprites(id)
            }
        });

        assert!(matches!(
            result,
            Err(WorldBuildError::ImageNotReady { ref id }) if id == "wheel"
        ));
    }

    #[test]
    fn spawned_world_joins_both_wheels_to_the_chassis() {
        let config = shipped_config();
        let plan = plan_truck_world(&config, &shipped_shapes(), shipped_sprites)
            .expect("shipped world should plan");
        let mut world = World::new();

        let chassis = {
            let mut commands = world.commands();
            spawn_truck_world_plan(&mut commands, plan, &config)
        };
        world.flush();

        let mut joints = world.query::<(&Wheel, &ImpulseJoint, &ActiveEvents)>();
        let mut wheel_count = 0;
        for (_, joint, events) in joints.iter(&world) {
            assert_eq!(joint.parent, chassis);
            assert!(events.contains(ActiveEvents::COLLISION_EVENTS));
            wheel_count += 1;
        }
        assert_eq!(wheel_count, 2);

        let mut tags = world.query::<&SurfaceTag>();
        let terrain = tags
            .iter(&world)
            .filter(|tag| **tag == SurfaceTag::Terrain)
            .count();
        let boundaries = tags
            .iter(&world)
            .filter(|tag| matches!(tag, SurfaceTag::Boundary(_)))
            .count();
        assert_eq!(terrain, 1);
        assert_eq!(boundaries, 4);
    }

    #[test]
    fn chassis_uses_default_contact_coefficients() {
        let config = shipped_config();
        let plan = plan_truck_world(&config, &shipped_shapes(), shipped_sprites)
            .expect("shipped world should plan");
        let mut world = World::new();

        let chassis = {
            let mut commands = world.commands();
            spawn_truck_world_plan(&mut commands, plan, &config)
        };
        world.flush();

        let entity = world.entity(chassis);
        assert!(entity.get::<SurfaceMaterial>().is_none());
        let friction = entity.get::<Friction>().expect("chassis friction");
        let restitution = entity.get::<Restitution>().expect("chassis restitution");
        assert_eq!(friction.coefficient, config.game.materials.default_friction);
        assert!(matches!(
            friction.combine_rule,
            CoefficientCombineRule::Average
        ));
        assert_eq!(
            restitution.coefficient,
            config.game.materials.default_restitution
        );
    }

    #[test]
    fn cleanup_removes_every_world_entity() {
        let config = shipped_config();
        let plan = plan_truck_world(&config, &shipped_shapes(), shipped_sprites)
            .expect("shipped world should plan");
        let mut app = App::new();
        {
            let world = app.world_mut();
            let mut commands = world.commands();
            spawn_truck_world_plan(&mut commands, plan, &config);
        }
        app.world_mut().flush();
        app.add_systems(Update, cleanup_truck_world);

        app.update();

        let mut remaining = app
            .world_mut()
            .query_filtered::<Entity, With<TruckWorldEntity>>();
        assert_eq!(remaining.iter(app.world()).count(), 0);
    }
}
