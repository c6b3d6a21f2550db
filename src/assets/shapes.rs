use bevy::prelude::*;
use bevy_rapier2d::prelude::Collider;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const MIN_POLYGON_AREA: f32 = 1.0e-3;

/// One convex piece of a body, as exported by PhysicsEditor for P2.
///
/// `shape` is a flat `[x0, y0, x1, y1, ...]` list in image pixels, origin at the
/// top-left corner and y pointing down. Density, filter and friction entries in the
/// export are ignored; materials come from config.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapeFixture {
    pub shape: Vec<f32>,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ShapeCatalog {
    bodies: HashMap<String, Vec<ShapeFixture>>,
    origin: PathBuf,
}

impl ShapeCatalog {
    pub fn load(path: &Path) -> Result<Self, ShapeError> {
        let raw = fs::read_to_string(path).map_err(|source| ShapeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    pub fn parse(raw: &str, origin: &Path) -> Result<Self, ShapeError> {
        let bodies = serde_json::from_str(raw).map_err(|source| ShapeError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        Ok(Self {
            bodies,
            origin: origin.to_path_buf(),
        })
    }

    /// File the catalog was parsed from.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.bodies.contains_key(key)
    }

    /// Converts every fixture of `key` into body-local, y-up, counter-clockwise
    /// polygons centred on the image the body is drawn with.
    pub fn polygons(&self, key: &str, image_size: Vec2) -> Result<Vec<Vec<Vec2>>, ShapeError> {
        let fixtures = self
            .bodies
            .get(key)
            .ok_or_else(|| ShapeError::MissingShape {
                key: key.to_string(),
            })?;
        if fixtures.is_empty() {
            return Err(ShapeError::MissingShape {
                key: key.to_string(),
            });
        }

        let half_size = image_size * 0.5;
        fixtures
            .iter()
            .enumerate()
            .map(|(fixture, entry)| {
                let count = entry.shape.len();
                if count % 2 != 0 {
                    return Err(ShapeError::OddCoordinateCount {
                        key: key.to_string(),
                        fixture,
                        count,
                    });
                }
                if count < 6 {
                    return Err(ShapeError::TooFewVertices {
                        key: key.to_string(),
                        fixture,
                        count: count / 2,
                    });
                }

                let mut points: Vec<Vec2> = entry
                    .shape
                    .chunks_exact(2)
                    .map(|xy| Vec2::new(xy[0] - half_size.x, half_size.y - xy[1]))
                    .collect();
                let area = polygon_area(&points);
                if area.abs() < MIN_POLYGON_AREA {
                    return Err(ShapeError::Degenerate {
                        key: key.to_string(),
                        fixture,
                    });
                }
                // The y flip mirrors the winding; Rapier polylines must be counter-clockwise.
                if area < 0.0 {
                    points.reverse();
                }
                Ok(points)
            })
            .collect()
    }

    pub fn collider(&self, key: &str, image_size: Vec2) -> Result<Collider, ShapeError> {
        let mut parts = Vec::new();
        for (fixture, points) in self.polygons(key, image_size)?.iter().enumerate() {
            let part = Collider::convex_polyline(points.clone()).ok_or_else(|| {
                ShapeError::Degenerate {
                    key: key.to_string(),
                    fixture,
                }
            })?;
            parts.push((Vec2::ZERO, 0.0, part));
        }

        if parts.len() == 1 {
            if let Some((_, _, single)) = parts.pop() {
                return Ok(single);
            }
        }
        Ok(Collider::compound(parts))
    }
}

fn polygon_area(points: &[Vec2]) -> f32 {
    let mut twice_area = 0.0;
    for (index, point) in points.iter().enumerate() {
        let next = points[(index + 1) % points.len()];
        twice_area += point.perp_dot(next);
    }
    twice_area * 0.5
}

#[derive(Debug)]
pub enum ShapeError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    MissingShape {
        key: String,
    },
    OddCoordinateCount {
        key: String,
        fixture: usize,
        count: usize,
    },
    TooFewVertices {
        key: String,
        fixture: usize,
        count: usize,
    },
    Degenerate {
        key: String,
        fixture: usize,
    },
}

impl Display for ShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::MissingShape { key } => {
                write!(f, "shape catalog has no polygons for `{key}`")
            }
            Self::OddCoordinateCount {
                key,
                fixture,
                count,
            } => write!(
                f,
                "shape `{key}` fixture {fixture} has an odd coordinate count ({count})"
            ),
            Self::TooFewVertices {
                key,
                fixture,
                count,
            } => write!(
                f,
                "shape `{key}` fixture {fixture} needs at least 3 vertices (found {count})"
            ),
            Self::Degenerate { key, fixture } => {
                write!(f, "shape `{key}` fixture {fixture} is degenerate")
            }
        }
    }
}

impl Error for ShapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}
