use super::types::{AccessRuleSettings, BundleSettings, KindSchema};
use lineage_commons::CudOperation;
use std::collections::BTreeMap;

// Default value functions
pub fn default_true() -> bool {
    true
}

pub fn default_database_path() -> String {
    "./data/lineage.db".to_string()
}

pub fn default_lut_table() -> String {
    "hierarchical_access_lut".to_string()
}

pub fn default_null_alias() -> String {
    "lut_null".to_string()
}

pub fn default_existence_alias() -> String {
    "lut_exist".to_string()
}

pub fn default_container_schema() -> KindSchema {
    KindSchema::new("node", "nid", "node__").with_label_column("title")
}

pub fn default_wrapper_schema() -> KindSchema {
    KindSchema::new("media", "mid", "media__").with_label_column("name")
}

pub fn default_leaf_schema() -> KindSchema {
    KindSchema::new("file_managed", "fid", "file__").with_label_column("filename")
}

pub fn default_container_reference_field() -> String {
    "field_media_of".to_string()
}

pub fn default_leaf_handler() -> String {
    "default:file".to_string()
}

pub fn default_bundles() -> Vec<BundleSettings> {
    vec![
        BundleSettings::new("file", "field_media_file", Some("default:file")),
        BundleSettings::new("image", "field_media_image", Some("default:file")),
        BundleSettings::new("document", "field_media_document", Some("default:file")),
        BundleSettings::new("remote_video", "field_media_oembed_video", None),
    ]
}

pub fn default_inherited_operations() -> Vec<String> {
    vec!["view".to_string(), "download".to_string()]
}

pub fn default_wrapper_access_rule() -> AccessRuleSettings {
    let mut operation_map = BTreeMap::new();
    operation_map.insert("download".to_string(), "view".to_string());
    AccessRuleSettings {
        operations: default_inherited_operations(),
        operation_map,
    }
}

pub fn default_delete_only() -> Vec<CudOperation> {
    vec![CudOperation::Delete]
}

pub fn default_all_operations() -> Vec<CudOperation> {
    vec![CudOperation::Create, CudOperation::Update, CudOperation::Delete]
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}
