use crate::config::GameConfig;
use crate::gameplay::vehicle::{
    BoundarySide, Chassis, SurfaceTag, TruckInputState, TruckSystems, Wheel,
};
use crate::states::GameState;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub struct BounceGameplayPlugin;

impl Plugin for BounceGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BounceLatch>()
            .add_message::<TruckBouncedEvent>()
            .add_systems(OnEnter(GameState::InRun), reset_bounce_latch)
            .add_systems(
                Update,
                fire_truck_bounce
                    .after(TruckSystems::Input)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                PostUpdate,
                rearm_bounce_on_wheel_contact
                    .after(PhysicsSet::Writeback)
                    .run_if(in_state(GameState::InRun)),
            );
    }
}

/// Gate on the chassis bounce. A jump disarms it; only a wheel landing on the
/// floor or the hill arms it again.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BounceLatch {
    armed: bool,
}

impl Default for BounceLatch {
    fn default() -> Self {
        Self { armed: true }
    }
}

impl BounceLatch {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Returns `true` and disarms when the bounce may fire.
    pub fn try_fire(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        true
    }

    /// Returns `true` when this contact flipped the latch back to armed.
    pub fn observe_contact(&mut self, class: ContactClass) -> bool {
        if !class.rearms_bounce() || self.armed {
            return false;
        }
        self.armed = true;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactClass {
    WorldBoundary,
    Terrain,
    Other,
}

impl ContactClass {
    pub fn of(tag: Option<&SurfaceTag>) -> Self {
        match tag {
            Some(SurfaceTag::Boundary(BoundarySide::Bottom)) => Self::WorldBoundary,
            Some(SurfaceTag::Terrain) => Self::Terrain,
            Some(SurfaceTag::Boundary(_)) | None => Self::Other,
        }
    }

    pub fn rearms_bounce(self) -> bool {
        matches!(self, Self::WorldBoundary | Self::Terrain)
    }
}

#[derive(Message, Debug, Clone, Copy)]
pub struct TruckBouncedEvent {
    pub impulse: Vec2,
}

fn reset_bounce_latch(mut latch: ResMut<BounceLatch>) {
    *latch = BounceLatch::default();
}

fn fire_truck_bounce(
    config: Res<GameConfig>,
    input: Res<TruckInputState>,
    mut latch: ResMut<BounceLatch>,
    mut chassis_query: Query<(&mut ExternalImpulse, Option<&ReadMassProperties>), With<Chassis>>,
    mut bounced: MessageWriter<TruckBouncedEvent>,
) {
    if !input.jump_pressed {
        return;
    }
    let Ok((mut external_impulse, mass_props)) = chassis_query.single_mut() else {
        return;
    };
    if !latch.try_fire() {
        debug!("Bounce ignored: waiting for a wheel to touch the ground");
        return;
    }

    // Velocity change of `speed` regardless of mass, matching a P2 `moveUp`.
    let mass = mass_props
        .map(|props| props.mass)
        .filter(|mass| *mass > 0.0)
        .unwrap_or(1.0);
    let impulse = Vec2::Y * mass * config.vehicle.bounce.speed;
    external_impulse.impulse += impulse;
    bounced.write(TruckBouncedEvent { impulse });
    debug!("Bounce fired: impulse {:.1}", impulse.y);
}

fn rearm_bounce_on_wheel_contact(
    mut collisions: MessageReader<CollisionEvent>,
    wheel_query: Query<(), With<Wheel>>,
    surface_query: Query<&SurfaceTag>,
    mut latch: ResMut<BounceLatch>,
) {
    for event in collisions.read() {
        let CollisionEvent::Started(first, second, _) = *event else {
            continue;
        };
        let other = if wheel_query.contains(first) {
            second
        } else if wheel_query.contains(second) {
            first
        } else {
            continue;
        };

        let class = ContactClass::of(surface_query.get(other).ok());
        if latch.observe_contact(class) {
            debug!("Bounce re-armed by {class:?} contact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::shipped_config;
    use bevy::ecs::message::Messages;
    use bevy_rapier2d::rapier::geometry::CollisionEventFlags;

    struct Scene {
        app: App,
        wheel: Entity,
        chassis: Entity,
        hill: Entity,
        side_wall: Entity,
        floor: Entity,
    }

    fn scene() -> Scene {
        let mut app = App::new();
        app.insert_resource(shipped_config())
            .init_resource::<TruckInputState>()
            .init_resource::<BounceLatch>()
            .add_message::<CollisionEvent>()
            .add_message::<TruckBouncedEvent>()
            .add_systems(
                Update,
                (fire_truck_bounce, rearm_bounce_on_wheel_contact).chain(),
            );

        let world = app.world_mut();
        let chassis = world.spawn((Chassis, ExternalImpulse::default())).id();
        let wheel = world.spawn(Wheel).id();
        let hill = world.spawn(SurfaceTag::Terrain).id();
        let side_wall = world
            .spawn(SurfaceTag::Boundary(BoundarySide::Left))
            .id();
        let floor = world
            .spawn(SurfaceTag::Boundary(BoundarySide::Bottom))
            .id();

        Scene {
            app,
            wheel,
            chassis,
            hill,
            side_wall,
            floor,
        }
    }

    impl Scene {
        /// Runs one tick and returns the impulse applied to the chassis during it.
        fn tick(&mut self, jump: bool, contacts: &[(Entity, Entity)]) -> Vec2 {
            self.app.world_mut().resource_mut::<TruckInputState>().jump_pressed = jump;
            for (first, second) in contacts {
                self.app.world_mut().write_message(CollisionEvent::Started(
                    *first,
                    *second,
                    CollisionEventFlags::empty(),
                ));
            }
            self.app.update();

            let mut chassis = self.app.world_mut().entity_mut(self.chassis);
            let mut external_impulse = chassis
                .get_mut::<ExternalImpulse>()
                .expect("chassis has an impulse component");
            let applied = external_impulse.impulse;
            external_impulse.impulse = Vec2::ZERO;
            applied
        }

        fn armed(&self) -> bool {
            self.app.world().resource::<BounceLatch>().is_armed()
        }
    }

    #[test]
    fn latch_transitions() {
        let mut latch = BounceLatch::default();
        assert!(latch.is_armed());

        assert!(latch.try_fire());
        assert!(!latch.try_fire());
        assert!(!latch.observe_contact(ContactClass::Other));
        assert!(!latch.is_armed());

        assert!(latch.observe_contact(ContactClass::Terrain));
        assert!(!latch.observe_contact(ContactClass::WorldBoundary));
        assert!(latch.is_armed());
    }

    #[test]
    fn only_floor_and_hill_qualify() {
        assert_eq!(
            ContactClass::of(Some(&SurfaceTag::Boundary(BoundarySide::Bottom))),
            ContactClass::WorldBoundary
        );
        assert_eq!(ContactClass::of(Some(&SurfaceTag::Terrain)), ContactClass::Terrain);
        for side in [BoundarySide::Left, BoundarySide::Right, BoundarySide::Top] {
            assert_eq!(
                ContactClass::of(Some(&SurfaceTag::Boundary(side))),
                ContactClass::Other
            );
        }
        assert_eq!(ContactClass::of(None), ContactClass::Other);
    }

    #[test]
    fn jump_land_jump_sequence() {
        let mut scene = scene();

        let first = scene.tick(true, &[]);
        assert_eq!(first, Vec2::new(0.0, 500.0));
        assert!(!scene.armed());

        assert_eq!(scene.tick(true, &[]), Vec2::ZERO);
        assert!(!scene.armed());

        let contact = [(scene.hill, scene.wheel)];
        assert_eq!(scene.tick(false, &contact), Vec2::ZERO);
        assert!(scene.armed());

        assert_eq!(scene.tick(true, &[]), Vec2::new(0.0, 500.0));
        assert!(!scene.armed());
    }

    #[test]
    fn floor_contact_rearms_but_side_wall_does_not() {
        let mut scene = scene();
        scene.tick(true, &[]);

        let side = [(scene.wheel, scene.side_wall)];
        scene.tick(false, &side);
        assert!(!scene.armed());

        let floor = [(scene.wheel, scene.floor)];
        scene.tick(false, &floor);
        assert!(scene.armed());
    }

    #[test]
    fn chassis_touching_the_hill_never_rearms() {
        let mut scene = scene();
        scene.tick(true, &[]);

        let contact = [(scene.chassis, scene.hill)];
        scene.tick(false, &contact);

        assert!(!scene.armed());
        assert_eq!(scene.tick(true, &[]), Vec2::ZERO);
    }

    #[test]
    fn every_fired_bounce_is_reported() {
        let mut scene = scene();
        scene.tick(true, &[]);
        scene.tick(true, &[]);

        let messages = scene.app.world().resource::<Messages<TruckBouncedEvent>>();
        let mut cursor = messages.get_cursor();
        assert_eq!(cursor.read(messages).count(), 1);
    }
}
