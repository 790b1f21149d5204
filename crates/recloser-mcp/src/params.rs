//! MCP tool parameter structs: one per tool handler, deserialized from JSON-RPC calls.

use schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for the `get_service_tree` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ServiceTreeParams {
    /// Firmware version id whose service tree to build
    pub(crate) firmware_id: i64,
}

/// Parameters for the `compare_service_trees` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CompareServiceTreesParams {
    /// Baseline firmware id
    pub(crate) firmware_a: i64,
    /// Firmware id compared against the baseline
    pub(crate) firmware_b: i64,
    /// Language for display names (e.g. 'enUs'); defaults to the configured language
    pub(crate) language_code: Option<String>,
}

/// Parameters for the `get_screen_layout` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ScreenLayoutParams {
    /// Service id at the root of the layout
    pub(crate) service_id: i64,
}

/// Parameters for the `validate_feature_value` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct ValidateFeatureValueParams {
    /// Service whose layout contains the feature
    pub(crate) service_id: i64,
    /// Feature to validate against
    pub(crate) feature_id: i64,
    /// Candidate value, as the user typed it
    pub(crate) value: String,
}

/// Parameters for the `create_recloser` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CreateRecloserParams {
    /// Description key naming the device (registered if new)
    pub(crate) description_key: String,
    /// Model designation, e.g. '3P4W'
    pub(crate) model: String,
}

/// Parameters for the `update_recloser` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct UpdateRecloserParams {
    pub(crate) recloser_id: i64,
    pub(crate) description_key: String,
    pub(crate) model: String,
}

/// Parameters for the `delete_recloser` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct DeleteRecloserParams {
    /// Recloser to delete; its firmware versions and trees go with it
    pub(crate) recloser_id: i64,
}

/// Parameters for the `create_firmware` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CreateFirmwareParams {
    /// Owning recloser
    pub(crate) recloser_id: i64,
    /// Version label, e.g. 'v1.2.0'
    pub(crate) version: String,
}

/// Parameters for the `update_firmware` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct UpdateFirmwareParams {
    pub(crate) firmware_id: i64,
    pub(crate) recloser_id: i64,
    pub(crate) version: String,
}

/// Parameters for the `delete_firmware` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct DeleteFirmwareParams {
    pub(crate) firmware_id: i64,
}

/// Parameters for the `add_service_node` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct AddServiceNodeParams {
    /// Firmware the service belongs to
    pub(crate) firmware_id: i64,
    /// Service key, unique within the firmware (e.g. 'SEC_PROT')
    pub(crate) service_key: String,
    /// Description key; defaults to the service key
    pub(crate) description_key: Option<String>,
    /// Parent service in the same firmware; omit for a root
    pub(crate) parent_id: Option<i64>,
}

/// Parameters for the `update_service_node` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct UpdateServiceNodeParams {
    pub(crate) service_id: i64,
    pub(crate) firmware_id: i64,
    pub(crate) service_key: String,
    /// Description key; defaults to the service key
    pub(crate) description_key: Option<String>,
    /// New parent; must not be the service itself or one of its descendants
    pub(crate) parent_id: Option<i64>,
}

/// Parameters for the `delete_service_node` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct DeleteServiceNodeParams {
    /// Service to delete together with its subtree
    pub(crate) service_id: i64,
}

/// Parameters for the `create_feature` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct CreateFeatureParams {
    /// Owning service
    pub(crate) service_id: i64,
    /// Description key of the feature (e.g. 'FEAT_OVERCURRENT')
    pub(crate) description_key: String,
}

/// Parameters for the `update_feature` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct UpdateFeatureParams {
    pub(crate) feature_id: i64,
    pub(crate) service_id: i64,
    pub(crate) description_key: String,
}

/// Parameters for the `delete_feature` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub(crate) struct DeleteFeatureParams {
    pub(crate) feature_id: i64,
}
