// Pack chunk-local waypoint sets into the binary navmesh format

use std::path::Path;

use anyhow::Context;
use chunknav_waypoint::{ChunkItemKind, DataSection, WaypointSetData, encode_navmesh};

/// Every navPolySet under `section` (the section itself included).
pub fn collect_sets(section: &DataSection) -> anyhow::Result<Vec<WaypointSetData>> {
    let kind = ChunkItemKind::NavPolySet;
    let Some(waypoints) = kind.waypoint_section() else {
        return Ok(Vec::new());
    };

    let mut sets = Vec::new();
    if section.name == kind.section_name() {
        sets.push(WaypointSetData::load_from_section(section, waypoints)?);
    }
    for child in section.children_named(kind.section_name()) {
        sets.push(WaypointSetData::load_from_section(child, waypoints)?);
    }
    Ok(sets)
}

pub fn run_pack(input: &Path, output: &Path) -> anyhow::Result<()> {
    let section = DataSection::from_file(input).with_context(|| format!("reading '{}'", input.display()))?;
    let sets = collect_sets(&section)?;
    if sets.is_empty() {
        return Err(anyhow::anyhow!("No navPolySet sections in '{}'", input.display()));
    }

    let bytes = encode_navmesh(&sets);
    std::fs::write(output, &bytes).with_context(|| format!("writing '{}'", output.display()))?;

    tracing::info!(
        "Pack: wrote {} sets ({} waypoints, {} bytes) to '{}'",
        sets.len(),
        sets.iter().map(WaypointSetData::waypoint_count).sum::<usize>(),
        bytes.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunknav_waypoint::decode_navmesh;

    fn nav_poly_set(girth: &str) -> DataSection {
        DataSection::new("navPolySet", "")
            .with_child(DataSection::new("girth", girth))
            .with_child(
                DataSection::new("navPoly", "7")
                    .with_child(DataSection::new("vertex", "0 0 0"))
                    .with_child(DataSection::new("vertex", "0 10 30000"))
                    .with_child(DataSection::new("vertex", "10 0 -2")),
            )
    }

    #[test]
    fn test_collect_sets_from_chunk() {
        let chunk = DataSection::new("chunk", "0000ffffo")
            .with_child(nav_poly_set("0.5"))
            .with_child(nav_poly_set("2"))
            .with_child(DataSection::new("model", ""));
        let sets = collect_sets(&chunk).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].girth(), 2.0);

        let decoded = decode_navmesh(encode_navmesh(&sets), "packed").unwrap();
        assert_eq!(decoded.len(), 2);
        assert!(decoded[0].edges()[1].adjacent_to_chunk());
        assert_eq!(decoded[0].edges()[2].neighbouring_vista(), 2);
    }

    #[test]
    fn test_collect_bare_set() {
        let sets = collect_sets(&nav_poly_set("1")).unwrap();
        assert_eq!(sets.len(), 1);
    }
}
