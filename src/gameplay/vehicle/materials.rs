use super::*;

/// Named surface a collider is made of.
///
/// Rapier resolves friction and restitution per collider with a combine rule
/// instead of P2-style material pair tables. The wheel side therefore carries the
/// wheel/ground rule with the `Max` combine rule. Ground keeps the default surface
/// coefficients with `Average`, so a wheel touching the ground resolves to exactly
/// the configured pair rule.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceMaterial {
    Wheel,
    Ground,
}

pub(super) fn surface_response(
    material: SurfaceMaterial,
    materials: &MaterialsConfig,
) -> (Friction, Restitution) {
    match material {
        SurfaceMaterial::Wheel => (
            Friction {
                coefficient: materials.wheel_ground.friction,
                combine_rule: CoefficientCombineRule::Max,
            },
            Restitution {
                coefficient: materials.wheel_ground.restitution,
                combine_rule: CoefficientCombineRule::Max,
            },
        ),
        SurfaceMaterial::Ground => default_surface(materials),
    }
}

/// Coefficients of a collider with no named material, such as the chassis.
pub(super) fn default_surface(materials: &MaterialsConfig) -> (Friction, Restitution) {
    (
        Friction {
            coefficient: materials.default_friction,
            combine_rule: CoefficientCombineRule::Average,
        },
        Restitution {
            coefficient: materials.default_restitution,
            combine_rule: CoefficientCombineRule::Average,
        },
    )
}
