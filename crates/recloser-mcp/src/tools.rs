//! MCP tool handlers: every `#[tool]` method in a single `#[tool_router]` impl block.
//!
//! Bodies delegate to [`crate::handlers`], which run the store work synchronously
//! and return before any await point.

use rmcp::{handler::server::wrapper::Parameters, tool, tool_router};

use crate::handlers::{self, respond};
use crate::params::{
    AddServiceNodeParams, CompareServiceTreesParams, CreateFeatureParams, CreateFirmwareParams,
    CreateRecloserParams, DeleteFeatureParams, DeleteFirmwareParams, DeleteRecloserParams,
    DeleteServiceNodeParams, ScreenLayoutParams, ServiceTreeParams, UpdateFeatureParams,
    UpdateFirmwareParams, UpdateRecloserParams, UpdateServiceNodeParams,
    ValidateFeatureValueParams,
};
use crate::server::CatalogServer;

#[tool_router]
impl CatalogServer {
    #[tool(
        description = "Return the service tree of a firmware version: root services in insertion order, each with its features (key and translations) and nested child services. Fails with NOT_FOUND for an unknown firmware."
    )]
    async fn get_service_tree(
        &self,
        Parameters(params): Parameters<ServiceTreeParams>,
    ) -> Result<String, String> {
        respond(handlers::service_tree(&self.catalog, &self.read_options, &params))
    }

    #[tool(
        description = "Compare the service trees of two firmware versions. Services are matched by service key level by level; the result has a top-level summary {added, removed, modified} and a list of ADDED/REMOVED/MODIFIED services with feature and child differences. Display names use language_code (default: configured language)."
    )]
    async fn compare_service_trees(
        &self,
        Parameters(params): Parameters<CompareServiceTreesParams>,
    ) -> Result<String, String> {
        respond(handlers::compare_service_trees(
            &self.catalog,
            &self.read_options,
            &params,
        ))
    }

    #[tool(
        description = "Return the screen layout rooted at a service: its features with bound component type and limits (MIN_VALUE, MAX_VALUE, STEP, MIN_CHAR, MAX_CHAR), recursively for child services. Fails with NOT_FOUND for an unknown service."
    )]
    async fn get_screen_layout(
        &self,
        Parameters(params): Parameters<ScreenLayoutParams>,
    ) -> Result<String, String> {
        respond(handlers::screen_layout(&self.catalog, &self.read_options, &params))
    }

    #[tool(
        description = "List every recloser with its translations and firmware versions, each firmware with its full service tree."
    )]
    async fn get_full_inventory(&self) -> Result<String, String> {
        respond(handlers::full_inventory(&self.catalog, &self.read_options))
    }

    #[tool(
        description = "Check a candidate value for a feature against its component type and limits. Returns {valid, message}; message is empty when the value is accepted."
    )]
    async fn validate_feature_value(
        &self,
        Parameters(params): Parameters<ValidateFeatureValueParams>,
    ) -> Result<String, String> {
        respond(handlers::validate_feature_value(
            &self.catalog,
            &self.read_options,
            &params,
        ))
    }

    #[tool(description = "Create a recloser. Returns {recloser_id}.")]
    async fn create_recloser(
        &self,
        Parameters(params): Parameters<CreateRecloserParams>,
    ) -> Result<String, String> {
        respond(handlers::create_recloser(&self.catalog, &params))
    }

    #[tool(description = "Change a recloser's description key and model.")]
    async fn update_recloser(
        &self,
        Parameters(params): Parameters<UpdateRecloserParams>,
    ) -> Result<String, String> {
        respond(handlers::update_recloser(&self.catalog, &params))
    }

    #[tool(description = "Delete a recloser together with its firmware versions and their service trees.")]
    async fn delete_recloser(
        &self,
        Parameters(params): Parameters<DeleteRecloserParams>,
    ) -> Result<String, String> {
        respond(handlers::delete_recloser(&self.catalog, params.recloser_id))
    }

    #[tool(description = "Create a firmware version for a recloser. Returns {firmware_id}.")]
    async fn create_firmware(
        &self,
        Parameters(params): Parameters<CreateFirmwareParams>,
    ) -> Result<String, String> {
        respond(handlers::create_firmware(&self.catalog, &params))
    }

    #[tool(description = "Change a firmware version's label or owning recloser.")]
    async fn update_firmware(
        &self,
        Parameters(params): Parameters<UpdateFirmwareParams>,
    ) -> Result<String, String> {
        respond(handlers::update_firmware(&self.catalog, &params))
    }

    #[tool(description = "Delete a firmware version and its service tree.")]
    async fn delete_firmware(
        &self,
        Parameters(params): Parameters<DeleteFirmwareParams>,
    ) -> Result<String, String> {
        respond(handlers::delete_firmware(&self.catalog, params.firmware_id))
    }

    #[tool(
        description = "Add a service node to a firmware tree, optionally under a parent in the same firmware. Returns {service_id}."
    )]
    async fn add_service_node(
        &self,
        Parameters(params): Parameters<AddServiceNodeParams>,
    ) -> Result<String, String> {
        respond(handlers::add_service_node(&self.catalog, &params))
    }

    #[tool(
        description = "Rewrite a service node. Fails with FAILED_PRECONDITION if the new parent is the service itself or one of its descendants."
    )]
    async fn update_service_node(
        &self,
        Parameters(params): Parameters<UpdateServiceNodeParams>,
    ) -> Result<String, String> {
        respond(handlers::update_service_node(&self.catalog, &params))
    }

    #[tool(description = "Delete a service node together with its subtree and features.")]
    async fn delete_service_node(
        &self,
        Parameters(params): Parameters<DeleteServiceNodeParams>,
    ) -> Result<String, String> {
        respond(handlers::delete_service_node(&self.catalog, params.service_id))
    }

    #[tool(description = "Attach a feature to a service. Returns {feature_id}.")]
    async fn create_feature(
        &self,
        Parameters(params): Parameters<CreateFeatureParams>,
    ) -> Result<String, String> {
        respond(handlers::create_feature(&self.catalog, &params))
    }

    #[tool(description = "Change a feature's description key or owning service.")]
    async fn update_feature(
        &self,
        Parameters(params): Parameters<UpdateFeatureParams>,
    ) -> Result<String, String> {
        respond(handlers::update_feature(&self.catalog, &params))
    }

    #[tool(description = "Delete a feature and its component binding and limits.")]
    async fn delete_feature(
        &self,
        Parameters(params): Parameters<DeleteFeatureParams>,
    ) -> Result<String, String> {
        respond(handlers::delete_feature(&self.catalog, params.feature_id))
    }
}

impl CatalogServer {
    pub(crate) fn create_tool_router() -> rmcp::handler::server::router::tool::ToolRouter<Self> {
        Self::tool_router()
    }
}
