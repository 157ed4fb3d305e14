//! The `.level` container: a ZIP archive carrying `metadata.json`, `level.json`, and zero or
//! more `*.shape.json` members. This is the crate's only I/O boundary.

pub mod level;
pub mod manifest;
pub mod shape_file;

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use log::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{CoreError, CoreResult};
use crate::shape::Shape;

pub use level::LevelDescriptor;
pub use manifest::{Metadata, ShapeSource};
pub use shape_file::ShapeFile;

const METADATA_MEMBER: &str = "metadata.json";
const LEVEL_MEMBER: &str = "level.json";

/// The fully decoded contents of a `.level` archive.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelPackage {
    pub metadata: Metadata,
    pub level: LevelDescriptor,
    /// Custom shape members, keyed by their member filename (e.g. `"zigzag.shape.json"`).
    pub custom_shapes: BTreeMap<String, ShapeFile>,
}

impl LevelPackage {
    /// Resolves `level.shapeIds` into concrete shapes in order, looking up builtin names via
    /// `lookup_builtin` and custom names via `custom_shapes`.
    pub fn resolve_shapes(
        &self,
        lookup_builtin: impl Fn(&str) -> Option<Shape>,
    ) -> CoreResult<Vec<Shape>> {
        let mut shapes = Vec::with_capacity(self.level.shape_ids.len());
        for shape_id in &self.level.shape_ids {
            let source = self
                .metadata
                .shape_index
                .get(shape_id)
                .ok_or_else(|| CoreError::UnresolvedShapeId(shape_id.clone()))?;

            let shape = match source {
                ShapeSource::Builtin(name) => lookup_builtin(name)
                    .ok_or_else(|| CoreError::UnresolvedShapeSource(source.as_wire_string()))?,
                ShapeSource::Custom(filename) => self
                    .custom_shapes
                    .get(filename)
                    .ok_or_else(|| CoreError::UnresolvedShapeSource(source.as_wire_string()))?
                    .to_shape()?,
            };
            shapes.push(shape);
        }
        Ok(shapes)
    }
}

/// Parses a `.level` archive from raw bytes. Unknown members are ignored; a missing required
/// member or malformed JSON is a fatal parse error.
pub fn read_level_package(bytes: &[u8]) -> CoreResult<LevelPackage> {
    debug!("parsing level package ({} bytes)", bytes.len());

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let metadata = read_json_member::<Metadata>(&mut archive, METADATA_MEMBER)?;
    let level = read_json_member::<LevelDescriptor>(&mut archive, LEVEL_MEMBER)?;

    let mut custom_shapes = BTreeMap::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        if name.ends_with(".shape.json") {
            let mut contents = String::new();
            file.read_to_string(&mut contents)?;
            let shape_file =
                serde_json::from_str::<ShapeFile>(&contents).map_err(|source| CoreError::MalformedJson {
                    member: name.clone(),
                    source,
                })?;
            custom_shapes.insert(name, shape_file);
        }
    }

    debug!(
        "parsed level package: level '{}' with {} custom shape member(s)",
        level.id,
        custom_shapes.len()
    );

    Ok(LevelPackage {
        metadata,
        level,
        custom_shapes,
    })
}

fn read_json_member<T: serde::de::DeserializeOwned>(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    member: &str,
) -> CoreResult<T> {
    let mut file = archive
        .by_name(member)
        .map_err(|_| CoreError::MissingMember(member.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).map_err(|source| CoreError::MalformedJson {
        member: member.to_string(),
        source,
    })
}

/// Writes a `.level` archive. Produces exactly `metadata.json`, `level.json`, and one
/// `*.shape.json` per entry of `package.custom_shapes`, pretty-printed.
pub fn write_level_package(package: &LevelPackage) -> CoreResult<Vec<u8>> {
    debug!(
        "writing level package: level '{}' with {} custom shape member(s)",
        package.level.id,
        package.custom_shapes.len()
    );

    let mut buffer = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(&mut buffer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    write_json_member(&mut writer, options, METADATA_MEMBER, &package.metadata)?;
    write_json_member(&mut writer, options, LEVEL_MEMBER, &package.level)?;

    for (name, shape_file) in &package.custom_shapes {
        write_json_member(&mut writer, options, name, shape_file)?;
    }

    writer.finish()?;
    drop(writer);

    debug!("wrote level package ({} bytes)", buffer.get_ref().len());
    Ok(buffer.into_inner())
}

fn write_json_member<W: Write + std::io::Seek, T: serde::Serialize>(
    writer: &mut ZipWriter<W>,
    options: FileOptions,
    member: &str,
    value: &T,
) -> CoreResult<()> {
    writer.start_file(member, options)?;
    let json = serde_json::to_string_pretty(value).map_err(|source| CoreError::MalformedJson {
        member: member.to_string(),
        source,
    })?;
    writer.write_all(json.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package() -> LevelPackage {
        let mut shape_index = BTreeMap::new();
        shape_index.insert("s1".to_string(), ShapeSource::Custom("bar.shape.json".to_string()));
        let mut color_index = BTreeMap::new();
        color_index.insert("s1".to_string(), "#00FF00".to_string());

        let metadata = Metadata {
            version: 1,
            shape_index,
            color_index,
            author: None,
            description: None,
            created_at: None,
        };

        let level = LevelDescriptor {
            id: "lvl-1".to_string(),
            name: "Warm-up".to_string(),
            difficulty: 1,
            rows: 1,
            cols: 2,
            target: Some(vec!["##".to_string()]),
            shape_ids: vec!["s1".to_string()],
        };

        let mut custom_shapes = BTreeMap::new();
        custom_shapes.insert(
            "bar.shape.json".to_string(),
            ShapeFile {
                id: "s1".to_string(),
                name: "bar".to_string(),
                matrix: vec!["##".to_string()],
                anchor_row: 0,
                anchor_col: 0,
            },
        );

        LevelPackage {
            metadata,
            level,
            custom_shapes,
        }
    }

    #[test]
    fn write_then_read_round_trips_bit_for_bit() {
        let package = sample_package();
        let bytes = write_level_package(&package).unwrap();
        let parsed = read_level_package(&bytes).unwrap();
        assert_eq!(parsed, package);
    }

    #[test]
    fn missing_required_member_is_a_fatal_error() {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = ZipWriter::new(&mut buffer);
        let options = FileOptions::default();
        writer.start_file(METADATA_MEMBER, options).unwrap();
        writer.write_all(b"{}").unwrap();
        writer.finish().unwrap();

        let bytes = buffer.into_inner();
        assert!(matches!(
            read_level_package(&bytes),
            Err(CoreError::MissingMember(member)) if member == LEVEL_MEMBER
        ));
    }

    #[test]
    fn unresolved_shape_id_fails_resolution() {
        let mut package = sample_package();
        package.level.shape_ids = vec!["missing".to_string()];
        let err = package.resolve_shapes(|_| None).unwrap_err();
        assert!(matches!(err, CoreError::UnresolvedShapeId(_)));
    }

    #[test]
    fn custom_shape_resolves_from_its_member() {
        let package = sample_package();
        let shapes = package.resolve_shapes(|_| None).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].cell_count(), 2);
    }

    #[test]
    fn builtin_shape_falls_back_to_the_lookup_closure() {
        let mut package = sample_package();
        package
            .metadata
            .shape_index
            .insert("s1".to_string(), ShapeSource::Builtin("dot".to_string()));
        package.custom_shapes.clear();

        let dot = Shape::new(1, 1, &[true], None).unwrap();
        let shapes = package.resolve_shapes(|name| (name == "dot").then(|| dot.clone())).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].cell_count(), 1);
    }
}
