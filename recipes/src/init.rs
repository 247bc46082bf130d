//! Process-wide initialization and the framework entry points.
//!
//! One call to [`init`] freezes the whole configuration: recipe construction
//! runs exactly once, override hooks run exactly once, and everything the
//! hosting framework touches afterwards reads from the frozen instance.

use crate::third_party_passwordless::{ThirdPartyPasswordlessConfig, ThirdPartyPasswordlessRecipe};
use authkit_core::client::{CoreClient, CoreConnection, HttpCoreClient};
use authkit_core::http::{NormalisedPath, Request, ResponseSink};
use authkit_core::recipe::{
    DispatchOutcome, RecipeModule, aggregate_cors_headers, dispatch, route_error,
};
use authkit_core::{AuthKitError, Result};
use std::sync::{Arc, RwLock};

static INSTANCE: RwLock<Option<Arc<AuthKit>>> = RwLock::new(None);

/// Everything [`init`] needs.
pub struct AuthKitConfig {
    /// Application name, used for logging only.
    pub app_name: String,
    /// Prefix under which the hosting framework mounts the auth surface.
    pub api_base_path: String,
    /// Connection to the remote core; ignored when `core_client` is set.
    pub connection: CoreConnection,
    /// Injected core client, for tests and custom transports.
    pub core_client: Option<Arc<dyn CoreClient>>,
    /// Composite recipe configuration.
    pub recipe: ThirdPartyPasswordlessConfig,
}

impl AuthKitConfig {
    /// Config with the default `/auth` base path.
    pub fn new(
        app_name: impl Into<String>,
        connection: CoreConnection,
        recipe: ThirdPartyPasswordlessConfig,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            api_base_path: "/auth".to_string(),
            connection,
            core_client: None,
            recipe,
        }
    }

    /// Mount under a different base path.
    #[must_use]
    pub fn with_api_base_path(mut self, api_base_path: impl Into<String>) -> Self {
        self.api_base_path = api_base_path.into();
        self
    }

    /// Use this client instead of opening an HTTP connection.
    #[must_use]
    pub fn with_core_client(mut self, core_client: Arc<dyn CoreClient>) -> Self {
        self.core_client = Some(core_client);
        self
    }
}

/// The frozen, process-wide framework instance.
pub struct AuthKit {
    app_name: String,
    base_path: NormalisedPath,
    recipe: Arc<ThirdPartyPasswordlessRecipe>,
    modules: Vec<Arc<dyn RecipeModule>>,
}

impl AuthKit {
    fn build(config: AuthKitConfig) -> Result<Arc<Self>> {
        let base_path = NormalisedPath::new("init", &config.api_base_path)?;
        let core = match config.core_client {
            Some(client) => client,
            None => HttpCoreClient::shared(config.connection),
        };
        let recipe = ThirdPartyPasswordlessRecipe::new(core, config.recipe)?;
        let modules: Vec<Arc<dyn RecipeModule>> = vec![recipe.clone()];
        tracing::info!(
            app_name = %config.app_name,
            base_path = %base_path,
            "authkit initialized"
        );
        Ok(Arc::new(Self {
            app_name: config.app_name,
            base_path,
            recipe,
            modules,
        }))
    }

    /// Application name from the config.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// The mounted base path.
    pub fn api_base_path(&self) -> &NormalisedPath {
        &self.base_path
    }

    /// The composite recipe.
    pub fn recipe(&self) -> &Arc<ThirdPartyPasswordlessRecipe> {
        &self.recipe
    }

    /// Serve one request if it falls under the auth surface.
    ///
    /// Strips the base path, dispatches to the owning recipe, and claims
    /// recipe-raised errors. [`DispatchOutcome::NotFound`] means the hosting
    /// framework should fall through to its own routing.
    pub async fn middleware(
        &self,
        request: &Request,
        sink: &mut ResponseSink,
    ) -> Result<DispatchOutcome> {
        let Some(relative) = self.base_path.strip_prefix_of(&request.path) else {
            return Ok(DispatchOutcome::NotFound);
        };
        let mut scoped = request.clone();
        scoped.path = relative.to_string();

        match dispatch(&self.modules, &scoped, sink).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if route_error(&self.modules, &err, &scoped, sink).await? {
                    Ok(DispatchOutcome::Served)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Header names the hosting framework must allow for CORS.
    pub fn cors_headers(&self) -> Vec<String> {
        aggregate_cors_headers(&self.modules)
    }
}

/// Initialize the process-wide instance. Errors if called twice.
pub fn init(config: AuthKitConfig) -> Result<Arc<AuthKit>> {
    let mut guard = INSTANCE
        .write()
        .map_err(|_| AuthKitError::InvalidConfig("init lock poisoned".to_string()))?;
    if guard.is_some() {
        return Err(AuthKitError::AlreadyInitialized);
    }
    let instance = AuthKit::build(config)?;
    *guard = Some(instance.clone());
    Ok(instance)
}

/// Fetch the initialized instance. Errors before [`init`].
pub fn instance() -> Result<Arc<AuthKit>> {
    INSTANCE
        .read()
        .map_err(|_| AuthKitError::InvalidConfig("init lock poisoned".to_string()))?
        .clone()
        .ok_or(AuthKitError::NotInitialized)
}

/// Drop the instance so a fresh [`init`] can run. Test-only escape hatch.
pub fn reset() {
    if let Ok(mut guard) = INSTANCE.write() {
        *guard = None;
    }
}
