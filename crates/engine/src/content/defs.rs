use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use roxmltree::Node;
use tracing::info;

use crate::animation::{Animation, PlayMode};
use crate::sprite_keys::validate_sprite_key;

use super::error::{parse_document, read_error, NodeReader};
use super::{ContentErrorCode, ContentLoadError};

const MAX_ANIMATION_FRAMES: usize = 1024;

/// Named animations and still regions, grouped by atlas.
#[derive(Debug, Clone, Default)]
pub struct AnimationLibrary {
    animations: BTreeMap<(String, String), Animation<String>>,
    regions: BTreeMap<(String, String), String>,
}

impl AnimationLibrary {
    pub fn animation(&self, atlas: &str, name: &str) -> Option<&Animation<String>> {
        self.animations.get(&(atlas.to_string(), name.to_string()))
    }

    pub fn region(&self, atlas: &str, name: &str) -> Option<&str> {
        self.regions
            .get(&(atlas.to_string(), name.to_string()))
            .map(String::as_str)
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

pub fn load_animation_library(path: &Path) -> Result<AnimationLibrary, ContentLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| read_error(path, source))?;
    let library = parse_animation_library(path, &raw)?;
    info!(
        path = %path.display(),
        animations = library.animation_count(),
        regions = library.region_count(),
        "animation_library_loaded"
    );
    Ok(library)
}

pub fn parse_animation_library(
    file_path: &Path,
    raw: &str,
) -> Result<AnimationLibrary, ContentLoadError> {
    let doc = parse_document(file_path, raw)?;
    let reader = NodeReader {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(reader.error(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut library = AnimationLibrary::default();
    for atlas in root.children().filter(|node| node.is_element()) {
        if atlas.tag_name().name() != "Atlas" {
            return Err(reader.error(
                ContentErrorCode::UnknownElement,
                format!(
                    "unsupported element <{}>; expected <Atlas>",
                    atlas.tag_name().name()
                ),
                atlas,
            ));
        }
        parse_atlas(&reader, atlas, &mut library)?;
    }
    Ok(library)
}

fn parse_atlas(
    reader: &NodeReader<'_, '_>,
    atlas: Node<'_, '_>,
    library: &mut AnimationLibrary,
) -> Result<(), ContentLoadError> {
    let atlas_name = reader.required(atlas, "name")?.to_string();
    let mut seen = HashSet::<String>::new();

    for entry in atlas.children().filter(|node| node.is_element()) {
        let name = reader.required(entry, "name")?.to_string();
        if !seen.insert(name.clone()) {
            return Err(reader.error(
                ContentErrorCode::DuplicateName,
                format!("duplicate entry '{name}' in atlas '{atlas_name}'"),
                entry,
            ));
        }

        match entry.tag_name().name() {
            "Region" => {
                let key = format!("{atlas_name}/{name}");
                check_key(reader, entry, &key)?;
                library.regions.insert((atlas_name.clone(), name), key);
            }
            "Animation" => {
                let animation = parse_animation(reader, entry, &atlas_name, &name)?;
                library.animations.insert((atlas_name.clone(), name), animation);
            }
            other => {
                return Err(reader.error(
                    ContentErrorCode::UnknownElement,
                    format!("unsupported element <{other}> in <Atlas>"),
                    entry,
                ))
            }
        }
    }
    Ok(())
}

fn parse_animation(
    reader: &NodeReader<'_, '_>,
    node: Node<'_, '_>,
    atlas_name: &str,
    name: &str,
) -> Result<Animation<String>, ContentLoadError> {
    let fps = reader.parse_required::<f32>(node, "fps")?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(reader.error(
            ContentErrorCode::InvalidValue,
            "fps must be finite and > 0".to_string(),
            node,
        ));
    }
    let frame_count = reader.parse_required::<usize>(node, "frames")?;
    if frame_count == 0 || frame_count > MAX_ANIMATION_FRAMES {
        return Err(reader.error(
            ContentErrorCode::InvalidValue,
            format!("frames must be between 1 and {MAX_ANIMATION_FRAMES}"),
            node,
        ));
    }
    let start = reader.parse_optional::<usize>(node, "start")?.unwrap_or(1);
    let Some(end) = start.checked_add(frame_count) else {
        return Err(reader.error(
            ContentErrorCode::InvalidValue,
            format!("start {start} leaves no room for {frame_count} frames"),
            node,
        ));
    };
    let play_mode = match node.attribute("playMode") {
        None => PlayMode::Normal,
        Some(raw) => PlayMode::parse(raw.trim()).ok_or_else(|| {
            reader.error(
                ContentErrorCode::InvalidValue,
                format!(
                    "invalid playMode '{raw}'; allowed values: normal, reversed, loop, loop_reversed, loop_pingpong"
                ),
                node,
            )
        })?,
    };

    let mut frames = Vec::with_capacity(frame_count);
    for index in start..end {
        let key = format!("{atlas_name}/{name}_{index}");
        check_key(reader, node, &key)?;
        frames.push(key);
    }
    Ok(Animation::new(1.0 / fps, frames, play_mode))
}

fn check_key(
    reader: &NodeReader<'_, '_>,
    node: Node<'_, '_>,
    key: &str,
) -> Result<(), ContentLoadError> {
    validate_sprite_key(key).map_err(|error| {
        reader.error(
            ContentErrorCode::InvalidValue,
            format!("sprite key '{key}' is invalid: {error}"),
            node,
        )
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn parse(raw: &str) -> Result<AnimationLibrary, ContentLoadError> {
        parse_animation_library(Path::new("defs/animations.xml"), raw)
    }

    #[test]
    fn animation_frames_are_keyed_by_atlas_and_index() {
        let library = parse(
            r#"<Defs>
                <Atlas name="zombie_male">
                    <Animation name="walk" fps="10" frames="3" playMode="loop"/>
                    <Animation name="dead" fps="20" frames="2" start="0"/>
                </Atlas>
            </Defs>"#,
        )
        .expect("parse");

        let walk = library.animation("zombie_male", "walk").expect("walk");
        assert_eq!(
            walk.frames(),
            ["zombie_male/walk_1", "zombie_male/walk_2", "zombie_male/walk_3"]
        );
        assert_eq!(walk.play_mode(), PlayMode::Loop);
        assert!((walk.frame_duration() - 0.1).abs() < 1.0e-6);

        let dead = library.animation("zombie_male", "dead").expect("dead");
        assert_eq!(dead.frames()[0], "zombie_male/dead_0");
        assert_eq!(dead.play_mode(), PlayMode::Normal);
        assert!(library.animation("zombie_female", "walk").is_none());
    }

    #[test]
    fn regions_resolve_to_flat_keys() {
        let library = parse(
            r#"<Defs><Atlas name="item"><Region name="crate"/><Region name="kunai"/></Atlas></Defs>"#,
        )
        .expect("parse");
        assert_eq!(library.region("item", "crate"), Some("item/crate"));
        assert_eq!(library.region_count(), 2);
    }

    #[test]
    fn duplicate_name_in_atlas_errors() {
        let err = parse(
            r#"<Defs><Atlas name="item"><Region name="coin"/><Animation name="coin" fps="10" frames="2"/></Atlas></Defs>"#,
        )
        .expect_err("duplicate");
        assert_eq!(err.code, ContentErrorCode::DuplicateName);
        assert!(err.location.is_some());
    }

    #[test]
    fn same_name_in_different_atlases_is_allowed() {
        let library = parse(
            r#"<Defs>
                <Atlas name="player_boy"><Animation name="idle" fps="10" frames="1"/></Atlas>
                <Atlas name="player_girl"><Animation name="idle" fps="10" frames="1"/></Atlas>
            </Defs>"#,
        )
        .expect("parse");
        assert_eq!(library.animation_count(), 2);
    }

    #[test]
    fn missing_fps_reports_location() {
        let err = parse("<Defs>\n<Atlas name=\"a\">\n<Animation name=\"run\" frames=\"2\"/>\n</Atlas></Defs>")
            .expect_err("missing");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert_eq!(err.location.map(|loc| loc.line), Some(3));
    }

    #[test]
    fn invalid_values_error() {
        for raw in [
            r#"<Defs><Atlas name="a"><Animation name="r" fps="0" frames="2"/></Atlas></Defs>"#,
            r#"<Defs><Atlas name="a"><Animation name="r" fps="10" frames="0"/></Atlas></Defs>"#,
            r#"<Defs><Atlas name="a"><Animation name="r" fps="fast" frames="2"/></Atlas></Defs>"#,
            r#"<Defs><Atlas name="a"><Animation name="r" fps="10" frames="2" playMode="bounce"/></Atlas></Defs>"#,
            r#"<Defs><Atlas name="A"><Region name="b"/></Atlas></Defs>"#,
        ] {
            let err = parse(raw).expect_err("invalid");
            assert_eq!(err.code, ContentErrorCode::InvalidValue, "raw={raw}");
        }
    }

    #[test]
    fn oversized_frame_ranges_error_instead_of_overflowing() {
        let huge_count = format!(
            r#"<Defs><Atlas name="a"><Animation name="r" fps="10" frames="{}"/></Atlas></Defs>"#,
            usize::MAX
        );
        let late_start = format!(
            r#"<Defs><Atlas name="a"><Animation name="r" fps="10" frames="2" start="{}"/></Atlas></Defs>"#,
            usize::MAX
        );
        for raw in [huge_count, late_start] {
            let err = parse(&raw).expect_err("oversized");
            assert_eq!(err.code, ContentErrorCode::InvalidValue, "raw={raw}");
            assert!(err.location.is_some());
        }
    }

    #[test]
    fn wrong_root_and_unknown_elements_error() {
        assert_eq!(
            parse("<Atlas name=\"a\"/>").expect_err("root").code,
            ContentErrorCode::InvalidRoot
        );
        assert_eq!(
            parse("<Defs><Sheet/></Defs>").expect_err("sheet").code,
            ContentErrorCode::UnknownElement
        );
        assert_eq!(
            parse("<Defs><Atlas name=\"a\"><Sound name=\"s\"/></Atlas></Defs>")
                .expect_err("sound")
                .code,
            ContentErrorCode::UnknownElement
        );
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse("<Defs><Atlas name=\"a\"></Defs>").expect_err("malformed");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn load_reads_from_disk_and_reports_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("animations.xml");
        fs::write(
            &path,
            r#"<Defs><Atlas name="item"><Animation name="coin" fps="10" frames="4" playMode="loop_pingpong"/></Atlas></Defs>"#,
        )
        .expect("write");
        let library = load_animation_library(&path).expect("load");
        assert_eq!(
            library.animation("item", "coin").map(Animation::play_mode),
            Some(PlayMode::LoopPingPong)
        );

        let err = load_animation_library(&temp.path().join("missing.xml"))
            .expect_err("missing");
        assert_eq!(err.code, ContentErrorCode::ReadFile);
    }
}
