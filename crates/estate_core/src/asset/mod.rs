//! Asset naming rules shared by the asset repository and blob adapters.

pub mod path;

pub use path::{
    classify_file_name, content_type_for, disambiguated_file_name, file_name_of, parse_path,
    resolve_path, resolve_uploaded_file, AssetClass, AssetKind, DefaultAsset, FileClass,
    ParsedPath, PathError,
};
