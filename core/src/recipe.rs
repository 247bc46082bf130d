//! The recipe module contract and the composite dispatch chain.
//!
//! A recipe module is the unit the request router sees: it declares which
//! (method, path) pairs it owns, serves requests for them, contributes CORS
//! header names, and gets first refusal on interpreting errors it raised.
//! Child recipes and composites implement the same trait, so a composite can
//! hold its children as a small ordered list of trait objects.

use crate::error::{AuthKitError, Result};
use crate::http::{Method, NormalisedPath, Request, ResponseSink};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// One route a recipe owns.
#[derive(Debug, Clone)]
pub struct ApiDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the recipe surface.
    pub path: NormalisedPath,
    /// Stable operation id, unique within the recipe.
    pub operation_id: &'static str,
    /// Disabled descriptors stay listed; the dispatcher skips them.
    pub enabled: bool,
}

impl ApiDescriptor {
    /// Build an enabled descriptor, validating the path constant.
    pub fn new(
        recipe_id: &'static str,
        method: Method,
        path: &str,
        operation_id: &'static str,
    ) -> Result<Self> {
        Ok(Self {
            method,
            path: NormalisedPath::new(recipe_id, path)?,
            operation_id,
            enabled: true,
        })
    }
}

/// Whether a module produced a response for a routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The module wrote a response to the sink.
    Served,
    /// The operation's API slot is null (deleted by an override); the caller
    /// must treat the path as unowned and render not-found.
    Refused,
}

/// The capability interface every recipe, child or composite, provides.
#[async_trait]
pub trait RecipeModule: Send + Sync {
    /// Stable recipe identifier, used for routing and core API versioning.
    fn recipe_id(&self) -> &'static str;

    /// The routes this module owns. Computed once at construction (path
    /// validation already happened there) and immutable afterwards.
    fn apis_handled(&self) -> &[ApiDescriptor];

    /// Serve a request for an operation previously reported as handled.
    ///
    /// Writes to the sink exactly once when it returns [`RequestOutcome::Served`].
    async fn handle_request(
        &self,
        operation_id: &str,
        request: &Request,
        sink: &mut ResponseSink,
    ) -> Result<RequestOutcome>;

    /// Custom header names the hosting framework must allow for CORS.
    fn cors_headers(&self) -> Vec<String>;

    /// Decide whether this module recognizes `err` and, if so, render it.
    ///
    /// Returns `Ok(false)` to let the caller try the next candidate.
    async fn handle_error(
        &self,
        err: &AuthKitError,
        request: &Request,
        sink: &mut ResponseSink,
    ) -> Result<bool>;
}

/// Result of walking the dispatch chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A module owned the path and wrote a response.
    Served,
    /// No module owns the path, or the owning slot is disabled.
    NotFound,
}

/// Find the operation a module owns for (method, path), honoring the
/// `enabled` flag.
pub fn find_operation<'a>(
    module: &'a dyn RecipeModule,
    method: Method,
    path: &str,
) -> Option<&'a ApiDescriptor> {
    module
        .apis_handled()
        .iter()
        .find(|api| api.enabled && api.method == method && api.path.as_str() == path)
}

/// Walk the modules in their fixed priority order and delegate to the first
/// owner of (method, path).
///
/// Route sets are disjoint by construction, so at most one module owns any
/// request; a module refusing its own route (disabled API slot) renders as
/// not-found rather than falling through to a sibling.
pub async fn dispatch(
    modules: &[Arc<dyn RecipeModule>],
    request: &Request,
    sink: &mut ResponseSink,
) -> Result<DispatchOutcome> {
    for module in modules {
        if let Some(api) = find_operation(module.as_ref(), request.method, &request.path) {
            tracing::debug!(
                recipe = module.recipe_id(),
                operation = api.operation_id,
                method = %request.method,
                path = %request.path,
                "dispatching request"
            );
            return match module
                .handle_request(api.operation_id, request, sink)
                .await?
            {
                RequestOutcome::Served => Ok(DispatchOutcome::Served),
                RequestOutcome::Refused => {
                    tracing::warn!(
                        recipe = module.recipe_id(),
                        operation = api.operation_id,
                        "operation disabled by override, rendering not-found"
                    );
                    Ok(DispatchOutcome::NotFound)
                }
            };
        }
    }
    Ok(DispatchOutcome::NotFound)
}

/// Offer an error to each module in priority order; the first to report
/// `handled = true` owns the response. Returns `false` when none claimed it,
/// leaving the generic fallback to the hosting adapter.
pub async fn route_error(
    modules: &[Arc<dyn RecipeModule>],
    err: &AuthKitError,
    request: &Request,
    sink: &mut ResponseSink,
) -> Result<bool> {
    for module in modules {
        if module.handle_error(err, request, sink).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Deduped union of every module's CORS header contribution, plus the headers
/// the hosting framework always allows.
pub fn aggregate_cors_headers(modules: &[Arc<dyn RecipeModule>]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers: Vec<String> = vec!["content-type".to_string()];
    seen.insert("content-type".to_string());
    for module in modules {
        for header in module.cors_headers() {
            let header = header.to_ascii_lowercase();
            if seen.insert(header.clone()) {
                headers.push(header);
            }
        }
    }
    headers
}

/// Verify no two descriptors across the modules share (method, path).
///
/// Called once at composite construction; a collision is a configuration
/// error.
pub fn ensure_disjoint_routes(modules: &[Arc<dyn RecipeModule>]) -> Result<()> {
    let mut seen: HashSet<(Method, String)> = HashSet::new();
    for module in modules {
        for api in module.apis_handled() {
            if !seen.insert((api.method, api.path.as_str().to_string())) {
                return Err(AuthKitError::InvalidConfig(format!(
                    "route {} {} is owned by more than one recipe",
                    api.method, api.path
                )));
            }
        }
    }
    Ok(())
}
