// Chunk - streamable unit of world geometry
// Bounding boxes, transforms and the portals that join chunks together

use glam::{Affine3A, Vec2, Vec3};
use slotmap::new_key_type;
use tracing::warn;

use crate::data_section::DataSection;
use crate::math::{BoundingBox, PlaneEq, signed_area_2d};
use crate::{NavError, Result};

new_key_type! {
    /// Generation-checked handle to a chunk in a `ChunkSpace`.
    pub struct ChunkId;
}

/// Streaming state of a chunk as far as navigation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkState {
    #[default]
    Unloaded,
    /// Items loaded and tossed in, boundary edges not yet bound
    Loaded,
    Bound,
}

/// What lies on the other side of a portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalTarget {
    Nothing,
    Heaven,
    Earth,
    Invasive,
    Extern,
    /// Names a chunk that has not been resolved to a handle yet
    Unbound,
    Chunk(ChunkId),
}

impl PortalTarget {
    fn from_name(name: &str) -> Self {
        match name {
            "" => PortalTarget::Nothing,
            "heaven" => PortalTarget::Heaven,
            "earth" => PortalTarget::Earth,
            "invasive" => PortalTarget::Invasive,
            "extern" => PortalTarget::Extern,
            _ => PortalTarget::Unbound,
        }
    }
}

/// An opening in a chunk boundary, in the owning chunk's local space.
///
/// The polygon lives in the portal plane, expressed in (u, v) coordinates
/// around `origin`. Points are kept counter-clockwise in (u, v).
#[derive(Debug, Clone)]
pub struct Portal {
    pub label: String,
    pub chunk_name: String,
    pub target: PortalTarget,
    pub internal: bool,
    pub permissive: bool,
    pub points: Vec<Vec2>,
    pub u_axis: Vec3,
    pub v_axis: Vec3,
    pub origin: Vec3,
    pub lcentre: Vec3,
    pub plane: PlaneEq,
}

impl Portal {
    pub fn new(plane: PlaneEq, u_axis: Vec3, mut points: Vec<Vec2>, chunk_name: &str) -> Self {
        if points.len() >= 3 && signed_area_2d(&points) < 0.0 {
            points.reverse();
        }

        let v_axis = plane.normal.cross(u_axis);
        let origin = plane.normal * plane.d / plane.normal.length_squared();

        let avg = if points.is_empty() {
            Vec2::ZERO
        } else {
            points.iter().copied().sum::<Vec2>() / points.len() as f32
        };
        let lcentre = u_axis * avg.x + v_axis * avg.y + origin;

        Self {
            label: String::new(),
            chunk_name: chunk_name.to_string(),
            target: PortalTarget::from_name(chunk_name),
            internal: false,
            permissive: true,
            points,
            u_axis,
            v_axis,
            origin,
            lcentre,
            plane,
        }
    }

    pub fn from_section(section: &DataSection, plane: PlaneEq) -> Self {
        let points = section
            .read_vector3s("point")
            .into_iter()
            .map(|p| Vec2::new(p.x, p.y))
            .collect();
        let u_axis = section.read_vector3("uAxis", Vec3::ZERO);

        let mut portal = Self::new(plane, u_axis, points, &section.read_string("chunk"));
        portal.label = section.as_string().to_string();
        portal.internal = section.read_bool("internal", false);
        portal.permissive = section.read_bool("permissive", true);
        portal
    }

    fn plane_coords(&self, point: Vec3) -> Vec2 {
        let rel = point - self.origin;
        Vec2::new(rel.dot(self.u_axis), rel.dot(self.v_axis))
    }

    /// Whether the point, projected onto the portal plane, lies within the
    /// portal polygon. Points on an edge are inside.
    pub fn inside(&self, point: Vec3) -> bool {
        self.outcode(point) == 0
    }

    /// One bit per polygon edge, set when the point is outside that edge.
    pub fn outcode(&self, point: Vec3) -> u32 {
        let p = self.plane_coords(point);
        let n = self.points.len();
        let mut res = 0;
        for i in 0..n {
            let p1 = self.points[i];
            let p2 = self.points[(i + 1) % n];
            let diff = Vec2::new(p1.y - p2.y, p2.x - p1.x);
            if diff.dot(p - p1) < 0.0 {
                res |= 1 << i;
            }
        }
        res
    }

    /// A polygon point in the chunk's local space.
    pub fn object_space_point(&self, i: usize) -> Vec3 {
        self.u_axis * self.points[i].x + self.v_axis * self.points[i].y + self.origin
    }

    pub fn has_chunk(&self) -> bool {
        matches!(self.target, PortalTarget::Chunk(_))
    }

    pub fn target_chunk(&self) -> Option<ChunkId> {
        match self.target {
            PortalTarget::Chunk(id) => Some(id),
            _ => None,
        }
    }
}

/// A bounding plane of a chunk and the portals cut into it.
#[derive(Debug, Clone)]
pub struct ChunkBoundary {
    pub plane: PlaneEq,
    pub portals: Vec<Portal>,
}

impl ChunkBoundary {
    pub fn new(plane: PlaneEq) -> Self {
        Self {
            plane,
            portals: Vec::new(),
        }
    }

    pub fn with_portal(mut self, portal: Portal) -> Self {
        self.portals.push(portal);
        self
    }

    pub fn from_section(section: &DataSection) -> Self {
        let plane = PlaneEq::new(
            section.read_vector3("normal", Vec3::Y),
            section.read_float("d", 0.0),
        );
        let portals = section
            .children_named("portal")
            .map(|p| Portal::from_section(p, plane))
            .collect();
        Self { plane, portals }
    }
}

/// A portal (by flat index into the owning chunk's portals) that a
/// connection was made through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalRef {
    pub chunk: ChunkId,
    pub index: usize,
}

/// The portal currently preferred while binding one boundary edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalChoice {
    pub index: usize,
    pub target: ChunkId,
    pub target_outside: bool,
    /// Unsigned distance of the test point from the portal plane
    pub plane_distance: f32,
}

impl PortalChoice {
    pub fn new(index: usize, portal: &Portal, target_outside: bool, point: Vec3) -> Option<Self> {
        Some(Self {
            index,
            target: portal.target_chunk()?,
            target_outside,
            plane_distance: portal.plane.distance_to(point).abs(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Chunk {
    pub identifier: String,
    pub transform: Affine3A,
    pub transform_inverse: Affine3A,
    /// World space
    pub bounding_box: BoundingBox,
    pub local_bounding_box: BoundingBox,
    pub outside: bool,
    pub boundaries: Vec<ChunkBoundary>,
    pub state: ChunkState,
}

impl Chunk {
    pub fn new(identifier: &str, transform: Affine3A, local_bounding_box: BoundingBox, outside: bool) -> Self {
        Self {
            identifier: identifier.to_string(),
            transform,
            transform_inverse: transform.inverse(),
            bounding_box: local_bounding_box.transformed(&transform),
            local_bounding_box,
            outside,
            boundaries: Vec::new(),
            state: ChunkState::Unloaded,
        }
    }

    /// Build a chunk from its description section. The section value is the
    /// identifier; `boundingBox` is given in world space.
    pub fn from_section(section: &DataSection) -> Result<Self> {
        let identifier = section.as_string();
        if identifier.is_empty() {
            return Err(NavError::BadSection {
                section: section.name.clone(),
                reason: "chunk has no identifier".into(),
            });
        }

        let Some(bb) = section.open_section("boundingBox") else {
            return Err(NavError::BadSection {
                section: identifier.to_string(),
                reason: "missing boundingBox".into(),
            });
        };
        let world_bb = BoundingBox::new(
            bb.read_vector3("min", Vec3::ZERO),
            bb.read_vector3("max", Vec3::ZERO),
        );

        let transform = section.read_matrix34("transform");
        let transform_inverse = transform.inverse();
        let outside = section.read_bool("outside", identifier.ends_with('o'));

        let boundaries: Vec<ChunkBoundary> = section
            .children_named("boundary")
            .map(ChunkBoundary::from_section)
            .collect();

        for portal in boundaries.iter().flat_map(|b| b.portals.iter()) {
            if portal.points.len() < 3 {
                warn!(
                    "Chunk '{}': portal to '{}' has {} points",
                    identifier,
                    portal.chunk_name,
                    portal.points.len()
                );
            }
        }

        Ok(Self {
            identifier: identifier.to_string(),
            transform,
            transform_inverse,
            bounding_box: world_bb,
            local_bounding_box: world_bb.transformed(&transform_inverse),
            outside,
            boundaries,
            state: ChunkState::Unloaded,
        })
    }

    pub fn with_boundary(mut self, boundary: ChunkBoundary) -> Self {
        self.boundaries.push(boundary);
        self
    }

    pub fn is_outside_chunk(&self) -> bool {
        self.outside
    }

    pub fn online(&self) -> bool {
        self.state == ChunkState::Bound
    }

    /// Every portal of every boundary, in declaration order.
    pub fn portals(&self) -> impl Iterator<Item = &Portal> {
        self.boundaries.iter().flat_map(|b| b.portals.iter())
    }

    pub fn portals_mut(&mut self) -> impl Iterator<Item = &mut Portal> {
        self.boundaries.iter_mut().flat_map(|b| b.portals.iter_mut())
    }

    /// Portal by its flat index, as stored in `PortalRef`.
    pub fn portal(&self, index: usize) -> Option<&Portal> {
        self.portals().nth(index)
    }

    /// Whether `candidate` should replace `current` as the portal an edge
    /// point binds through. `point` is in this chunk's local space.
    ///
    /// With a positive `min_dist` the point must lie within `min_dist` of
    /// the portal plane and inside the portal polygon. Portals into indoor
    /// chunks beat portals into outside chunks, otherwise the nearer plane
    /// wins.
    pub fn find_better_portal(
        current: Option<&PortalChoice>,
        min_dist: f32,
        candidate: &PortalChoice,
        portal: &Portal,
        point: Vec3,
    ) -> bool {
        if min_dist > 0.0 && (candidate.plane_distance > min_dist || !portal.inside(point)) {
            return false;
        }

        let Some(current) = current else {
            return true;
        };

        match (current.target_outside, candidate.target_outside) {
            (true, false) => true,
            (false, true) => false,
            _ => candidate.plane_distance < current.plane_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    /// Portal in the plane x = 10, facing -x, covering y in [-5, 5] and
    /// z in [0, 10].
    fn wall_portal() -> Portal {
        let plane = PlaneEq::new(Vec3::new(-1.0, 0.0, 0.0), -10.0);
        let points = vec![
            Vec2::new(-5.0, -10.0),
            Vec2::new(5.0, -10.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(-5.0, 0.0),
        ];
        Portal::new(plane, Vec3::Y, points, "neighbour")
    }

    #[test]
    fn test_portal_inside_and_outcode() {
        let portal = wall_portal();
        assert_eq!(portal.origin, Vec3::new(10.0, 0.0, 0.0));
        assert!(portal.inside(Vec3::new(10.0, 0.0, 5.0)));
        // on the polygon edge
        assert!(portal.inside(Vec3::new(10.0, 0.0, 10.0)));
        assert!(!portal.inside(Vec3::new(10.0, 0.0, 11.0)));
        assert_ne!(portal.outcode(Vec3::new(10.0, 9.0, 5.0)), 0);
        assert_eq!(portal.target, PortalTarget::Unbound);
    }

    #[test]
    fn test_portal_winding_is_normalised() {
        let mut portal = wall_portal();
        let mut reversed = portal.points.clone();
        reversed.reverse();
        portal = Portal::new(portal.plane, portal.u_axis, reversed, "");
        assert!(signed_area_2d(&portal.points) > 0.0);
        assert!(portal.inside(Vec3::new(10.0, 0.0, 5.0)));
        assert_eq!(portal.target, PortalTarget::Nothing);
    }

    #[test]
    fn test_object_space_point() {
        let portal = wall_portal();
        assert_eq!(portal.object_space_point(0), Vec3::new(10.0, -5.0, 10.0));
        assert_eq!(portal.lcentre, Vec3::new(10.0, 0.0, 5.0));
    }

    #[test]
    fn test_find_better_portal_prefers_indoor_then_nearer() {
        let mut keys: SlotMap<ChunkId, ()> = SlotMap::with_key();
        let target = keys.insert(());

        let mut portal = wall_portal();
        portal.target = PortalTarget::Chunk(target);
        let point = Vec3::new(10.0, 0.0, 5.0);

        let outdoor = PortalChoice::new(0, &portal, true, point).unwrap();
        let indoor = PortalChoice::new(1, &portal, false, point).unwrap();

        assert!(Chunk::find_better_portal(None, 0.0, &outdoor, &portal, point));
        assert!(Chunk::find_better_portal(Some(&outdoor), 1.0, &indoor, &portal, point));
        assert!(!Chunk::find_better_portal(Some(&indoor), 0.0, &outdoor, &portal, point));

        let far = PortalChoice { plane_distance: 0.5, ..indoor };
        assert!(!Chunk::find_better_portal(Some(&indoor), 1.0, &far, &portal, point));
        assert!(Chunk::find_better_portal(Some(&far), 1.0, &indoor, &portal, point));

        // indoor portals need the point inside the polygon
        let off = Vec3::new(10.0, 0.0, 20.0);
        let off_choice = PortalChoice::new(1, &portal, false, off).unwrap();
        assert!(!Chunk::find_better_portal(None, 1.0, &off_choice, &portal, off));
    }

    #[test]
    fn test_chunk_from_section() {
        let section = DataSection::new("chunk", "0000ffffo")
            .with_child(
                DataSection::new("transform", "")
                    .with_child(DataSection::new("row3", "100 0 0")),
            )
            .with_child(
                DataSection::new("boundingBox", "")
                    .with_child(DataSection::new("min", "100 -5 0"))
                    .with_child(DataSection::new("max", "110 5 10")),
            )
            .with_child(
                DataSection::new("boundary", "")
                    .with_child(DataSection::new("normal", "-1 0 0"))
                    .with_child(DataSection::new("d", "-10"))
                    .with_child(
                        DataSection::new("portal", "")
                            .with_child(DataSection::new("chunk", "heaven"))
                            .with_child(DataSection::new("uAxis", "0 1 0"))
                            .with_child(DataSection::new("point", "-5 -10 0"))
                            .with_child(DataSection::new("point", "5 -10 0"))
                            .with_child(DataSection::new("point", "5 0 0")),
                    ),
            );

        let chunk = Chunk::from_section(&section).unwrap();
        assert!(chunk.is_outside_chunk());
        assert_eq!(chunk.local_bounding_box.min, Vec3::new(0.0, -5.0, 0.0));
        assert_eq!(chunk.local_bounding_box.max, Vec3::new(10.0, 5.0, 10.0));
        assert_eq!(chunk.portals().count(), 1);
        assert_eq!(chunk.portal(0).unwrap().target, PortalTarget::Heaven);
        assert!(chunk.portal(1).is_none());
    }

    #[test]
    fn test_chunk_without_bounding_box_fails() {
        let section = DataSection::new("chunk", "0000ffffi");
        assert!(matches!(
            Chunk::from_section(&section),
            Err(NavError::BadSection { .. })
        ));
    }
}
