//! Canonical asset path resolution.
//!
//! # Responsibility
//! - Map `(kind, owner, file name)` to one canonical blob path and back.
//! - Classify uploaded files without an explicit kind through an ordered
//!   rule table.
//!
//! # Invariants
//! - Resolution is pure and deterministic.
//! - Distinct effective keys never share a path. The effective key ignores
//!   the owner for kinds whose path does not embed it (`Model`, `Image`,
//!   `Environment`, `Texture`, `Upload`) and ignores the file name for
//!   `FloorModel`, whose path is `floors/{owner}.glb`.
//! - File-name case is preserved in paths; extension and "floor" matching is
//!   case-insensitive.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_SEGMENT_LEN: usize = 255;

pub const FLOORS_PREFIX: &str = "floors";
pub const MODELS_PREFIX: &str = "models";
pub const IMAGES_PREFIX: &str = "images";
pub const ENVIRONMENTS_PREFIX: &str = "environments";
pub const TEXTURES_PREFIX: &str = "textures";
pub const APARTMENT_IMAGES_PREFIX: &str = "apartment-images";
pub const UPLOADS_PREFIX: &str = "uploads";

static FORBIDDEN_SEGMENT_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).expect("valid segment regex"));
static FLOOR_MODEL_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)floor.*\.(glb|gltf)$").expect("valid floor model regex"));
static MODEL_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(glb|gltf)$").expect("valid model regex"));
static IMAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpe?g|png|webp)$").expect("valid image regex"));
static ENVIRONMENT_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(exr|hdr)$").expect("valid environment regex"));

/// Kind of asset, deciding which folder a file lands in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// General 3D model; floor-named files go to `floors/`.
    Model,
    /// The model of one floor, stored at `floors/{floor id}.glb`.
    FloorModel,
    Image,
    Environment,
    Texture { category: String },
    ApartmentImage,
    FloorPanorama,
    /// Fallback for anything unrecognized.
    Upload,
}

/// Coarse asset class reported in descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Model,
    Texture,
    Environment,
    Image,
    Other,
}

impl AssetKind {
    /// Parses a caller-supplied kind name. Unknown names fall back to
    /// `Upload`; a texture without category yields an empty category that
    /// [`resolve_path`] rejects.
    pub fn parse(kind: &str, category: Option<&str>) -> Self {
        match kind.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "model" => Self::Model,
            "floor-model" => Self::FloorModel,
            "image" => Self::Image,
            "environment" => Self::Environment,
            "texture" => Self::Texture {
                category: category.unwrap_or_default().to_string(),
            },
            "apartment-image" => Self::ApartmentImage,
            "floor-panorama" => Self::FloorPanorama,
            _ => Self::Upload,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::FloorModel => "floor-model",
            Self::Image => "image",
            Self::Environment => "environment",
            Self::Texture { .. } => "texture",
            Self::ApartmentImage => "apartment-image",
            Self::FloorPanorama => "floor-panorama",
            Self::Upload => "upload",
        }
    }

    pub fn class(&self) -> AssetClass {
        match self {
            Self::Model | Self::FloorModel => AssetClass::Model,
            Self::Texture { .. } => AssetClass::Texture,
            Self::Environment => AssetClass::Environment,
            Self::Image | Self::ApartmentImage | Self::FloorPanorama => AssetClass::Image,
            Self::Upload => AssetClass::Other,
        }
    }

    /// Whether the owner id is part of the resolved path.
    pub fn needs_owner(&self) -> bool {
        matches!(
            self,
            Self::FloorModel | Self::ApartmentImage | Self::FloorPanorama
        )
    }

    /// Whether the resolved path embeds the uploaded file name.
    pub fn embeds_file_name(&self) -> bool {
        !matches!(self, Self::FloorModel)
    }

    /// Whether uploads of this kind must carry an `image/*` content type.
    pub fn requires_image_content(&self) -> bool {
        matches!(
            self,
            Self::Image | Self::ApartmentImage | Self::FloorPanorama
        )
    }
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Texture { category } => write!(f, "texture/{category}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Error for malformed path inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    InvalidSegment {
        segment: String,
        reason: &'static str,
    },
    MissingOwner(&'static str),
    MissingCategory,
    UnsupportedExtension {
        kind: &'static str,
        file_name: String,
    },
    /// Floor id whose model path would be read back as a floor-named model.
    AmbiguousOwner(String),
    /// Path outside the canonical layout.
    NonCanonical(String),
    /// Kind whose path does not carry the file name, so it cannot be renamed.
    FixedFileName(&'static str),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSegment { segment, reason } => {
                write!(f, "invalid path segment `{segment}`: {reason}")
            }
            Self::MissingOwner(kind) => write!(f, "asset kind `{kind}` needs an owner id"),
            Self::MissingCategory => write!(f, "texture assets need a category"),
            Self::UnsupportedExtension { kind, file_name } => {
                write!(f, "file `{file_name}` has no supported extension for `{kind}`")
            }
            Self::AmbiguousOwner(owner) => {
                write!(f, "owner id `{owner}` collides with floor-named model files")
            }
            Self::NonCanonical(path) => write!(f, "`{path}` is not a canonical asset path"),
            Self::FixedFileName(kind) => {
                write!(f, "asset kind `{kind}` has a fixed file name")
            }
        }
    }
}

impl Error for PathError {}

/// Validates one path segment (file name, owner id or category).
pub fn validate_segment(segment: &str) -> Result<(), PathError> {
    let reason = if segment.trim().is_empty() {
        Some("must not be blank")
    } else if segment.chars().count() > MAX_SEGMENT_LEN {
        Some("longer than 255 characters")
    } else if segment == "." || segment == ".." {
        Some("relative segment")
    } else if FORBIDDEN_SEGMENT_CHARS.is_match(segment) {
        Some("contains a reserved character")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(PathError::InvalidSegment {
            segment: segment.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

pub fn is_floor_model_file(file_name: &str) -> bool {
    FLOOR_MODEL_FILE.is_match(file_name)
}

pub fn is_model_file(file_name: &str) -> bool {
    MODEL_FILE.is_match(file_name)
}

pub fn is_image_file(file_name: &str) -> bool {
    IMAGE_FILE.is_match(file_name)
}

pub fn is_environment_file(file_name: &str) -> bool {
    ENVIRONMENT_FILE.is_match(file_name)
}

/// Resolves the canonical blob path of an asset.
///
/// `owner` is only consulted by kinds that need one; see
/// [`AssetKind::needs_owner`].
pub fn resolve_path(kind: &AssetKind, owner: Option<&str>, file_name: &str) -> Result<String, PathError> {
    validate_segment(file_name)?;
    let owner = if kind.needs_owner() {
        let owner = owner
            .filter(|owner| !owner.trim().is_empty())
            .ok_or(PathError::MissingOwner(kind.as_str()))?;
        validate_segment(owner)?;
        Some(owner)
    } else {
        None
    };

    let path = match (kind, owner) {
        (AssetKind::Model, _) => {
            require_extension(kind, file_name, is_model_file)?;
            if is_floor_model_file(file_name) {
                format!("{FLOORS_PREFIX}/{file_name}")
            } else {
                format!("{MODELS_PREFIX}/{file_name}")
            }
        }
        (AssetKind::FloorModel, Some(floor_id)) => {
            require_extension(kind, file_name, is_model_file)?;
            if floor_id.to_ascii_lowercase().contains("floor") {
                return Err(PathError::AmbiguousOwner(floor_id.to_string()));
            }
            format!("{FLOORS_PREFIX}/{floor_id}.glb")
        }
        (AssetKind::Image, _) => {
            require_extension(kind, file_name, is_image_file)?;
            format!("{IMAGES_PREFIX}/{file_name}")
        }
        (AssetKind::Environment, _) => {
            require_extension(kind, file_name, is_environment_file)?;
            format!("{ENVIRONMENTS_PREFIX}/{file_name}")
        }
        (AssetKind::Texture { category }, _) => {
            if category.trim().is_empty() {
                return Err(PathError::MissingCategory);
            }
            validate_segment(category)?;
            format!("{TEXTURES_PREFIX}/{category}/{file_name}")
        }
        (AssetKind::ApartmentImage, Some(apartment_id)) => {
            format!("{APARTMENT_IMAGES_PREFIX}/{apartment_id}/{file_name}")
        }
        (AssetKind::FloorPanorama, Some(floor_id)) => {
            format!("{FLOORS_PREFIX}/{floor_id}/{file_name}")
        }
        (AssetKind::Upload, _) => format!("{UPLOADS_PREFIX}/{file_name}"),
        (_, None) => return Err(PathError::MissingOwner(kind.as_str())),
    };
    Ok(path)
}

fn require_extension(
    kind: &AssetKind,
    file_name: &str,
    matches: fn(&str) -> bool,
) -> Result<(), PathError> {
    if matches(file_name) {
        return Ok(());
    }
    Err(PathError::UnsupportedExtension {
        kind: kind.as_str(),
        file_name: file_name.to_string(),
    })
}

/// Kind inferred for a file uploaded without an explicit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    FloorModel,
    Model,
    Image,
    Environment,
    Upload,
}

impl FileClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FloorModel => "floor-model",
            Self::Model => "model",
            Self::Image => "image",
            Self::Environment => "environment",
            Self::Upload => "upload",
        }
    }

    /// Asset kind used to resolve the path. Floor-named models stay
    /// `Model`; the resolver routes them to `floors/`.
    pub fn asset_kind(self) -> AssetKind {
        match self {
            Self::FloorModel | Self::Model => AssetKind::Model,
            Self::Image => AssetKind::Image,
            Self::Environment => AssetKind::Environment,
            Self::Upload => AssetKind::Upload,
        }
    }
}

/// One `(predicate -> class)` entry of the classification table.
pub struct ClassificationRule {
    pub class: FileClass,
    pub matches: fn(&str) -> bool,
}

/// Evaluated top to bottom; the first match wins.
pub static CLASSIFICATION_RULES: [ClassificationRule; 4] = [
    ClassificationRule {
        class: FileClass::FloorModel,
        matches: is_floor_model_file,
    },
    ClassificationRule {
        class: FileClass::Model,
        matches: is_model_file,
    },
    ClassificationRule {
        class: FileClass::Image,
        matches: is_image_file,
    },
    ClassificationRule {
        class: FileClass::Environment,
        matches: is_environment_file,
    },
];

/// Classifies a file by name. Total: anything unmatched is `Upload`.
pub fn classify_file_name(file_name: &str) -> FileClass {
    CLASSIFICATION_RULES
        .iter()
        .find(|rule| (rule.matches)(file_name))
        .map(|rule| rule.class)
        .unwrap_or(FileClass::Upload)
}

/// Path of a file uploaded without an explicit kind.
pub fn resolve_uploaded_file(file_name: &str) -> Result<String, PathError> {
    resolve_path(&classify_file_name(file_name).asset_kind(), None, file_name)
}

/// Structured form of a canonical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub kind: AssetKind,
    pub owner: Option<String>,
    pub file_name: String,
}

/// Inverse of [`resolve_path`]. `None` for paths outside the rule set.
pub fn parse_path(path: &str) -> Option<ParsedPath> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|segment| validate_segment(segment).is_err()) {
        return None;
    }

    match segments[..] {
        [FLOORS_PREFIX, file] if is_floor_model_file(file) => Some(parsed(AssetKind::Model, None, file)),
        [FLOORS_PREFIX, file] => file
            .strip_suffix(".glb")
            .map(|floor_id| parsed(AssetKind::FloorModel, Some(floor_id), file)),
        [FLOORS_PREFIX, floor_id, file] => Some(parsed(AssetKind::FloorPanorama, Some(floor_id), file)),
        [MODELS_PREFIX, file] if is_model_file(file) && !is_floor_model_file(file) => {
            Some(parsed(AssetKind::Model, None, file))
        }
        [IMAGES_PREFIX, file] if is_image_file(file) => Some(parsed(AssetKind::Image, None, file)),
        [ENVIRONMENTS_PREFIX, file] if is_environment_file(file) => {
            Some(parsed(AssetKind::Environment, None, file))
        }
        [TEXTURES_PREFIX, category, file] => Some(parsed(
            AssetKind::Texture {
                category: category.to_string(),
            },
            None,
            file,
        )),
        [APARTMENT_IMAGES_PREFIX, apartment_id, file] => {
            Some(parsed(AssetKind::ApartmentImage, Some(apartment_id), file))
        }
        [UPLOADS_PREFIX, file] => Some(parsed(AssetKind::Upload, None, file)),
        _ => None,
    }
}

fn parsed(kind: AssetKind, owner: Option<&str>, file_name: &str) -> ParsedPath {
    ParsedPath {
        kind,
        owner: owner.map(str::to_string),
        file_name: file_name.to_string(),
    }
}

/// Last path segment.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// MIME type inferred from the file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "glb" => "model/gltf-binary",
        "gltf" => "model/gltf+json",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "exr" => "image/x-exr",
        "hdr" => "image/vnd.radiance",
        "json" => "application/json",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// File name used when the plain name is already taken.
///
/// `attempt == 0` gives `{stamp}-{file}`, later attempts
/// `{stamp}-{attempt}-{file}`.
pub fn disambiguated_file_name(file_name: &str, stamp: i64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{stamp}-{file_name}")
    } else {
        format!("{stamp}-{attempt}-{file_name}")
    }
}

/// Built-in assets looked up with soft-fail semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAsset {
    SkyEnvironment,
    FloorTexture,
}

impl DefaultAsset {
    pub fn path(self) -> &'static str {
        match self {
            Self::SkyEnvironment => "environments/default-sky.exr",
            Self::FloorTexture => "textures/floors/default-floor.jpg",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkyEnvironment => "default_sky",
            Self::FloorTexture => "default_floor_texture",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn texture(category: &str) -> AssetKind {
        AssetKind::Texture {
            category: category.to_string(),
        }
    }

    #[test]
    fn floor_named_model_lands_under_floors() {
        assert_eq!(
            resolve_path(&AssetKind::Model, Some("F1"), "ground-floor.glb").unwrap(),
            "floors/ground-floor.glb"
        );
        assert_eq!(
            resolve_path(&AssetKind::Model, None, "tower.glb").unwrap(),
            "models/tower.glb"
        );
    }

    #[test]
    fn texture_goes_under_its_category() {
        assert_eq!(
            resolve_path(&texture("floors"), None, "marble.jpg").unwrap(),
            "textures/floors/marble.jpg"
        );
        assert_eq!(
            resolve_path(&texture(""), None, "marble.jpg"),
            Err(PathError::MissingCategory)
        );
    }

    #[test]
    fn unknown_kind_falls_back_to_uploads() {
        let kind = AssetKind::parse("brochure", None);
        assert_eq!(kind, AssetKind::Upload);
        assert_eq!(
            resolve_path(&kind, None, "price-list.pdf").unwrap(),
            "uploads/price-list.pdf"
        );
    }

    #[test]
    fn owner_scoped_kinds_embed_the_owner() {
        assert_eq!(
            resolve_path(&AssetKind::FloorModel, Some("f1"), "whatever.glb").unwrap(),
            "floors/f1.glb"
        );
        assert_eq!(
            resolve_path(&AssetKind::ApartmentImage, Some("a1"), "kitchen.jpg").unwrap(),
            "apartment-images/a1/kitchen.jpg"
        );
        assert_eq!(
            resolve_path(&AssetKind::FloorPanorama, Some("f1"), "floor-f1-angle-0.jpg").unwrap(),
            "floors/f1/floor-f1-angle-0.jpg"
        );
        assert_eq!(
            resolve_path(&AssetKind::FloorPanorama, None, "x.jpg"),
            Err(PathError::MissingOwner("floor-panorama"))
        );
    }

    #[test]
    fn floor_model_owner_containing_floor_is_refused() {
        assert_eq!(
            resolve_path(&AssetKind::FloorModel, Some("top-floor"), "m.glb"),
            Err(PathError::AmbiguousOwner("top-floor".to_string()))
        );
    }

    #[test]
    fn reserved_characters_and_relative_segments_are_rejected() {
        for bad in ["", "a/b.jpg", "..", "x?.jpg", "tab\t.jpg", "q\".png"] {
            assert!(
                resolve_path(&AssetKind::Upload, None, bad).is_err(),
                "{bad:?} should be rejected"
            );
        }
        let long = format!("{}.jpg", "a".repeat(300));
        assert!(resolve_path(&AssetKind::Upload, None, &long).is_err());
    }

    #[test]
    fn classification_order_is_respected() {
        assert_eq!(classify_file_name("Ground-FLOOR.GLB"), FileClass::FloorModel);
        assert_eq!(classify_file_name("tower.gltf"), FileClass::Model);
        assert_eq!(classify_file_name("floor-plan.png"), FileClass::Image);
        assert_eq!(classify_file_name("sky.exr"), FileClass::Environment);
        assert_eq!(classify_file_name("notes.txt"), FileClass::Upload);
        assert_eq!(classify_file_name("no-extension"), FileClass::Upload);

        assert_eq!(
            resolve_uploaded_file("Ground-FLOOR.GLB").unwrap(),
            "floors/Ground-FLOOR.GLB"
        );
        assert_eq!(resolve_uploaded_file("lobby.webp").unwrap(), "images/lobby.webp");
        assert_eq!(resolve_uploaded_file("sky.hdr").unwrap(), "environments/sky.hdr");
    }

    #[test]
    fn distinct_effective_keys_never_collide() {
        let owners = ["f1", "a1", "b2"];
        let files = [
            "ground-floor.glb",
            "tower.glb",
            "Tower.glb",
            "kitchen.jpg",
            "sky.exr",
            "notes.txt",
        ];
        let kinds = [
            AssetKind::Model,
            AssetKind::FloorModel,
            AssetKind::Image,
            AssetKind::Environment,
            texture("floors"),
            texture("walls"),
            AssetKind::ApartmentImage,
            AssetKind::FloorPanorama,
            AssetKind::Upload,
        ];

        let mut seen: HashMap<String, (AssetKind, Option<&str>, &str)> = HashMap::new();
        for kind in &kinds {
            for owner in owners {
                for file in files {
                    let Ok(path) = resolve_path(kind, Some(owner), file) else {
                        continue;
                    };
                    assert_eq!(resolve_path(kind, Some(owner), file).unwrap(), path);

                    let effective_owner = kind.needs_owner().then_some(owner);
                    let effective_file = if kind.embeds_file_name() { file } else { "" };
                    let key = (kind.clone(), effective_owner, effective_file);
                    if let Some(previous) = seen.get(&path) {
                        assert_eq!(previous, &key, "collision on {path}");
                    }
                    seen.insert(path, key);
                }
            }
        }
        assert!(seen.len() > 20);
    }

    #[test]
    fn parse_inverts_resolve() {
        let cases = [
            (AssetKind::Model, None, "tower.glb"),
            (AssetKind::Model, None, "ground-floor.glb"),
            (AssetKind::Image, None, "lobby.png"),
            (AssetKind::Environment, None, "sky.exr"),
            (texture("floors"), None, "marble.jpg"),
            (AssetKind::ApartmentImage, Some("a1"), "kitchen.jpg"),
            (AssetKind::FloorPanorama, Some("f1"), "floor-f1-angle-2.jpg"),
            (AssetKind::Upload, None, "notes.txt"),
        ];
        for (kind, owner, file) in cases {
            let path = resolve_path(&kind, owner, file).unwrap();
            let parsed = parse_path(&path).unwrap();
            assert_eq!(parsed.kind, kind, "{path}");
            assert_eq!(parsed.owner.as_deref(), owner, "{path}");
            assert_eq!(parsed.file_name, file, "{path}");
        }

        let floor_model = parse_path("floors/f1.glb").unwrap();
        assert_eq!(floor_model.kind, AssetKind::FloorModel);
        assert_eq!(floor_model.owner.as_deref(), Some("f1"));
        assert!(parse_path("misc/readme.md").is_none());
        assert!(parse_path("floors/a/b/c.jpg").is_none());
    }

    #[test]
    fn content_types_follow_extensions() {
        assert_eq!(content_type_for("a.GLB"), "model/gltf-binary");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("sky.exr"), "image/x-exr");
        assert_eq!(content_type_for("blob"), "application/octet-stream");
    }

    #[test]
    fn disambiguated_names_keep_the_original_suffix() {
        assert_eq!(disambiguated_file_name("a.jpg", 1700, 0), "1700-a.jpg");
        assert_eq!(disambiguated_file_name("a.jpg", 1700, 2), "1700-2-a.jpg");
        assert_eq!(
            DefaultAsset::FloorTexture.path(),
            "textures/floors/default-floor.jpg"
        );
    }
}
