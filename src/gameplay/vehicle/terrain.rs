use super::*;

/// What a static collider represents when something lands on it.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTag {
    Boundary(BoundarySide),
    Terrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundarySide {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Component, Debug, Clone, Copy)]
pub(super) struct Hill;

#[derive(Component, Debug, Clone, Copy)]
pub(super) struct WorldBoundary;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct BoundaryWall {
    pub(super) side: BoundarySide,
    pub(super) center: Vec2,
    pub(super) half_extents: Vec2,
}

/// Four walls framing `[0, width] x [0, height]`, each lying just outside the
/// world rectangle so their inner faces sit on its edges.
pub(super) fn boundary_walls(world: &WorldConfig) -> [BoundaryWall; 4] {
    let half_thickness = world.boundary_thickness * 0.5;
    let horizontal = Vec2::new(world.width * 0.5 + world.boundary_thickness, half_thickness);
    let vertical = Vec2::new(half_thickness, world.height * 0.5 + world.boundary_thickness);

    [
        BoundaryWall {
            side: BoundarySide::Bottom,
            center: Vec2::new(world.width * 0.5, -half_thickness),
            half_extents: horizontal,
        },
        BoundaryWall {
            side: BoundarySide::Top,
            center: Vec2::new(world.width * 0.5, world.height + half_thickness),
            half_extents: horizontal,
        },
        BoundaryWall {
            side: BoundarySide::Left,
            center: Vec2::new(-half_thickness, world.height * 0.5),
            half_extents: vertical,
        },
        BoundaryWall {
            side: BoundarySide::Right,
            center: Vec2::new(world.width + half_thickness, world.height * 0.5),
            half_extents: vertical,
        },
    ]
}

/// The hill rests on the world floor, centred on `center_x`.
pub(super) fn hill_translation(center_x: f32, image_size: Vec2) -> Vec2 {
    Vec2::new(center_x, image_size.y * 0.5)
}

pub(super) fn spawn_boundary_walls(
    commands: &mut Commands,
    world: &WorldConfig,
    materials: &MaterialsConfig,
) {
    let (friction, restitution) = surface_response(SurfaceMaterial::Ground, materials);
    for wall in boundary_walls(world) {
        commands.spawn((
            Name::new(format!("WorldBoundary{:?}", wall.side)),
            TruckWorldEntity,
            WorldBoundary,
            SurfaceTag::Boundary(wall.side),
            SurfaceMaterial::Ground,
            RigidBody::Fixed,
            Collider::cuboid(wall.half_extents.x, wall.half_extents.y),
            friction,
            restitution,
            Transform::from_translation(wall.center.extend(0.0)),
            GlobalTransform::default(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldConfig {
        WorldConfig {
            width: 1600.0,
            height: 500.0,
            gravity: 300.0,
            boundary_thickness: 40.0,
        }
    }

    #[test]
    fn wall_inner_faces_sit_on_world_edges() {
        let walls = boundary_walls(&world());
        let face = |side: BoundarySide| {
            let wall = walls
                .iter()
                .find(|wall| wall.side == side)
                .expect("every side has a wall");
            match side {
                BoundarySide::Bottom => wall.center.y + wall.half_extents.y,
                BoundarySide::Top => wall.center.y - wall.half_extents.y,
                BoundarySide::Left => wall.center.x + wall.half_extents.x,
                BoundarySide::Right => wall.center.x - wall.half_extents.x,
            }
        };

        assert_eq!(face(BoundarySide::Bottom), 0.0);
        assert_eq!(face(BoundarySide::Top), 500.0);
        assert_eq!(face(BoundarySide::Left), 0.0);
        assert_eq!(face(BoundarySide::Right), 1600.0);
    }

    #[test]
    fn hill_bottom_touches_the_floor() {
        let translation = hill_translation(800.0, Vec2::new(600.0, 140.0));

        assert_eq!(translation, Vec2::new(800.0, 70.0));
    }
}
