use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use roxmltree::Node;
use tracing::info;

use crate::app::{Rect, Vec2};

use super::error::{parse_document, read_error, NodeReader};
use super::{ContentErrorCode, ContentLoadError};

const GID_FLIP_FLAGS: u32 = 0xE000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTileset {
    pub first_gid: u32,
    pub name: String,
}

/// Tile ids row by row, row 0 at the top of the map like the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapTileLayer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub gids: Vec<u32>,
}

impl MapTileLayer {
    pub fn gid_at(&self, column: u32, row: u32) -> Option<u32> {
        if column >= self.width || row >= self.height {
            return None;
        }
        let index = row as usize * self.width as usize + column as usize;
        self.gids.get(index).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObject {
    pub id: u32,
    pub name: String,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub properties: BTreeMap<String, String>,
}

impl MapObject {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapObjectGroup {
    pub name: String,
    pub objects: Vec<MapObject>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TiledMap {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tilesets: Vec<MapTileset>,
    pub tile_layers: Vec<MapTileLayer>,
    pub object_groups: Vec<MapObjectGroup>,
}

impl TiledMap {
    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_width as f32
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * self.tile_height as f32
    }

    pub fn object_group(&self, name: &str) -> Option<&MapObjectGroup> {
        self.object_groups.iter().find(|group| group.name == name)
    }

    /// Objects of `group`, or nothing when the map has no such layer.
    pub fn objects(&self, group: &str) -> &[MapObject] {
        self.object_group(group)
            .map(|group| group.objects.as_slice())
            .unwrap_or(&[])
    }

    /// Object rectangle in world units with y pointing up.
    pub fn world_rect(&self, object: &MapObject, pixels_per_metre: f32) -> Rect {
        let bottom = self.pixel_height() - object.y - object.height;
        Rect {
            x: object.x / pixels_per_metre,
            y: bottom / pixels_per_metre,
            width: object.width / pixels_per_metre,
            height: object.height / pixels_per_metre,
        }
    }

    pub fn world_center(&self, object: &MapObject, pixels_per_metre: f32) -> Vec2 {
        self.world_rect(object, pixels_per_metre).center()
    }
}

pub fn load_tiled_map(path: &Path) -> Result<TiledMap, ContentLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| read_error(path, source))?;
    let map = parse_tiled_map(path, &raw)?;
    info!(
        path = %path.display(),
        width = map.width,
        height = map.height,
        tile_layers = map.tile_layers.len(),
        object_groups = map.object_groups.len(),
        "tiled_map_loaded"
    );
    Ok(map)
}

pub fn parse_tiled_map(file_path: &Path, raw: &str) -> Result<TiledMap, ContentLoadError> {
    let doc = parse_document(file_path, raw)?;
    let reader = NodeReader {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "map" {
        return Err(reader.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <map>".to_string(),
            root,
        ));
    }
    if let Some(orientation) = root.attribute("orientation") {
        if orientation != "orthogonal" {
            return Err(reader.error(
                ContentErrorCode::InvalidValue,
                format!("unsupported orientation '{orientation}'; only orthogonal maps load"),
                root,
            ));
        }
    }

    let mut map = TiledMap {
        width: reader.parse_required(root, "width")?,
        height: reader.parse_required(root, "height")?,
        tile_width: reader.parse_required(root, "tilewidth")?,
        tile_height: reader.parse_required(root, "tileheight")?,
        tilesets: Vec::new(),
        tile_layers: Vec::new(),
        object_groups: Vec::new(),
    };

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "tileset" => map.tilesets.push(MapTileset {
                first_gid: reader.parse_required(child, "firstgid")?,
                name: child.attribute("name").unwrap_or_default().to_string(),
            }),
            "layer" => map.tile_layers.push(parse_tile_layer(&reader, child)?),
            "objectgroup" => map.object_groups.push(parse_object_group(&reader, child)?),
            // Editor metadata and image layers carry nothing the game reads.
            _ => {}
        }
    }
    map.tilesets.sort_by_key(|tileset| tileset.first_gid);
    Ok(map)
}

fn parse_tile_layer(
    reader: &NodeReader<'_, '_>,
    node: Node<'_, '_>,
) -> Result<MapTileLayer, ContentLoadError> {
    let name = node.attribute("name").unwrap_or_default().to_string();
    let width: u32 = reader.parse_required(node, "width")?;
    let height: u32 = reader.parse_required(node, "height")?;

    let Some(data) = node
        .children()
        .find(|child| child.is_element() && child.tag_name().name() == "data")
    else {
        return Err(reader.error(
            ContentErrorCode::MissingField,
            format!("layer '{name}' has no <data>"),
            node,
        ));
    };
    if data.attribute("encoding") != Some("csv") {
        return Err(reader.error(
            ContentErrorCode::InvalidValue,
            format!("layer '{name}' must use csv encoding"),
            data,
        ));
    }

    let Some(expected) = width
        .checked_mul(height)
        .and_then(|count| usize::try_from(count).ok())
    else {
        return Err(reader.error(
            ContentErrorCode::InvalidValue,
            format!("layer '{name}' size {width}x{height} is too large"),
            node,
        ));
    };

    let text = data.text().unwrap_or_default();
    // Every id takes at least one digit and a separator.
    let mut gids = Vec::with_capacity(expected.min(text.len() / 2 + 1));
    for token in text
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        let gid = token.parse::<u32>().map_err(|_| {
            reader.error(
                ContentErrorCode::InvalidValue,
                format!("layer '{name}' has invalid tile id '{token}'"),
                data,
            )
        })?;
        gids.push(gid & !GID_FLIP_FLAGS);
    }
    if gids.len() != expected {
        return Err(reader.error(
            ContentErrorCode::InvalidValue,
            format!(
                "layer '{name}' has {} tile ids; expected {expected} ({width}x{height})",
                gids.len()
            ),
            data,
        ));
    }

    Ok(MapTileLayer {
        name,
        width,
        height,
        gids,
    })
}

fn parse_object_group(
    reader: &NodeReader<'_, '_>,
    node: Node<'_, '_>,
) -> Result<MapObjectGroup, ContentLoadError> {
    let mut objects = Vec::new();
    for object in node
        .children()
        .filter(|child| child.is_element() && child.tag_name().name() == "object")
    {
        let mut properties = BTreeMap::new();
        for property in object
            .descendants()
            .filter(|child| child.is_element() && child.tag_name().name() == "property")
        {
            let key = reader.required(property, "name")?.to_string();
            let value = property
                .attribute("value")
                .or_else(|| property.text())
                .unwrap_or_default()
                .to_string();
            properties.insert(key, value);
        }

        objects.push(MapObject {
            id: reader.parse_optional(object, "id")?.unwrap_or(0),
            name: object.attribute("name").unwrap_or_default().to_string(),
            kind: object
                .attribute("type")
                .or_else(|| object.attribute("class"))
                .unwrap_or_default()
                .to_string(),
            x: reader.parse_required(object, "x")?,
            y: reader.parse_required(object, "y")?,
            width: reader.parse_optional(object, "width")?.unwrap_or(0.0),
            height: reader.parse_optional(object, "height")?.unwrap_or(0.0),
            properties,
        });
    }

    Ok(MapObjectGroup {
        name: node.attribute("name").unwrap_or_default().to_string(),
        objects,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="4" height="2" tilewidth="100" tileheight="100">
 <editorsettings><export format="tmx"/></editorsettings>
 <tileset firstgid="17" name="decor"/>
 <tileset firstgid="1" name="ground"/>
 <layer id="1" name="graphics" width="4" height="2">
  <data encoding="csv">
0,0,17,0,
1,2,2,3
</data>
 </layer>
 <objectgroup id="2" name="zombies">
  <object id="5" type="female" x="250" y="50" width="100" height="100">
   <properties>
    <property name="facing" value="left"/>
   </properties>
  </object>
 </objectgroup>
 <objectgroup id="3" name="spawn">
  <object id="6" name="player" x="100" y="100"/>
 </objectgroup>
</map>"#;

    fn parse(raw: &str) -> Result<TiledMap, ContentLoadError> {
        parse_tiled_map(Path::new("maps/test.tmx"), raw)
    }

    #[test]
    fn parses_layers_tilesets_and_objects() {
        let map = parse(SAMPLE).expect("parse");
        assert_eq!((map.width, map.height), (4, 2));
        assert_eq!(map.pixel_width(), 400.0);
        assert_eq!(map.tilesets[0].first_gid, 1);
        assert_eq!(map.tilesets[1].name, "decor");

        let layer = &map.tile_layers[0];
        assert_eq!(layer.gid_at(2, 0), Some(17));
        assert_eq!(layer.gid_at(3, 1), Some(3));
        assert_eq!(layer.gid_at(4, 0), None);

        let zombies = map.objects("zombies");
        assert_eq!(zombies.len(), 1);
        assert_eq!(zombies[0].kind, "female");
        assert_eq!(zombies[0].property("facing"), Some("left"));
        assert!(map.objects("robots").is_empty());
    }

    #[test]
    fn world_rect_flips_y_and_scales() {
        let map = parse(SAMPLE).expect("parse");
        let zombie = &map.objects("zombies")[0];
        let rect = map.world_rect(zombie, 100.0);
        assert!((rect.x - 2.5).abs() < 1.0e-6);
        assert!((rect.y - 0.5).abs() < 1.0e-6);
        assert!((rect.width - 1.0).abs() < 1.0e-6);

        let spawn = &map.objects("spawn")[0];
        let center = map.world_center(spawn, 100.0);
        assert!((center.x - 1.0).abs() < 1.0e-6);
        assert!((center.y - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn flip_flags_are_stripped_from_gids() {
        let raw = SAMPLE.replace("0,0,17,0,", "0,0,2147483665,0,");
        let map = parse(&raw).expect("parse");
        assert_eq!(map.tile_layers[0].gid_at(2, 0), Some(17));
    }

    #[test]
    fn tile_count_mismatch_errors() {
        let raw = SAMPLE.replace("1,2,2,3", "1,2,2");
        let err = parse(&raw).expect_err("mismatch");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
        assert!(err.message.contains("expected 8"));
    }

    #[test]
    fn oversized_layer_dimensions_error_instead_of_overflowing() {
        let raw = SAMPLE.replace(
            "name=\"graphics\" width=\"4\" height=\"2\"",
            "name=\"graphics\" width=\"70000\" height=\"70000\"",
        );
        let err = parse(&raw).expect_err("oversized");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
        assert!(err.location.is_some());

        let raw = SAMPLE.replace(
            "name=\"graphics\" width=\"4\" height=\"2\"",
            "name=\"graphics\" width=\"60000\" height=\"60000\"",
        );
        let err = parse(&raw).expect_err("short data");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
        assert!(err.message.contains("expected 3600000000"));
    }

    #[test]
    fn pixel_size_does_not_overflow_on_large_maps() {
        let raw = SAMPLE.replace(
            "width=\"4\" height=\"2\" tilewidth=\"100\" tileheight=\"100\"",
            "width=\"4000000000\" height=\"2\" tilewidth=\"100\" tileheight=\"100\"",
        );
        let map = parse(&raw).expect("parse");
        assert!((map.pixel_width() - 4.0e11).abs() < 1.0e6);
    }

    #[test]
    fn non_csv_and_non_orthogonal_maps_error() {
        let base64 = SAMPLE.replace("encoding=\"csv\"", "encoding=\"base64\"");
        assert_eq!(parse(&base64).expect_err("base64").code, ContentErrorCode::InvalidValue);

        let iso = SAMPLE.replace("orthogonal", "isometric");
        assert_eq!(parse(&iso).expect_err("iso").code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn missing_map_size_reports_missing_field() {
        let raw = SAMPLE.replace(" width=\"4\" height=\"2\" tilewidth", " tilewidth");
        let err = parse(&raw).expect_err("missing");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert_eq!(err.location.map(|loc| loc.line), Some(2));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("level.tmx");
        fs::write(&path, SAMPLE).expect("write");
        let map = load_tiled_map(&path).expect("load");
        assert_eq!(map.object_groups.len(), 2);

        let err = load_tiled_map(&temp.path().join("none.tmx")).expect_err("missing");
        assert_eq!(err.code, ContentErrorCode::ReadFile);
    }
}
