/// API reference endpoints
///
/// `/docs` serves an embedded HTML reference and `/openapi.json` the
/// matching OpenAPI document. Both are open in the `local` environment;
/// everywhere else they require an authenticated superuser and answer
/// plain 404 to everyone else, so the routes do not advertise their
/// existence on public deployments.

use crate::{app::AppState, error::ApiError};
use axum::{extract::State, response::Html, Json};
use serde_json::{json, Value as JsonValue};

use chainwatch_shared::auth::context::AuthContext;

use crate::config::Environment;

/// Decides whether the caller may see the reference pages
pub(crate) fn docs_visible(environment: Environment, auth: Option<&AuthContext>) -> bool {
    if environment.is_local() {
        return true;
    }
    auth.map(|a| a.is_superuser).unwrap_or(false)
}

/// Serve the HTML API reference
///
/// # Endpoint
///
/// ```text
/// GET /docs
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Hidden outside `local` unless the caller is a
///   superuser
pub async fn docs_page(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
) -> Result<Html<String>, ApiError> {
    if !docs_visible(state.config.api.environment, auth.as_ref()) {
        return Err(ApiError::NotFound("Not found".to_string()));
    }

    Ok(Html(
        DOCS_HTML.replace("{{version}}", env!("CARGO_PKG_VERSION")),
    ))
}

/// Serve the OpenAPI document
///
/// # Endpoint
///
/// ```text
/// GET /openapi.json
/// ```
///
/// # Errors
///
/// - `404 Not Found`: Same gating as `/docs`
pub async fn openapi_json(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
) -> Result<Json<JsonValue>, ApiError> {
    if !docs_visible(state.config.api.environment, auth.as_ref()) {
        return Err(ApiError::NotFound("Not found".to_string()));
    }

    Ok(Json(openapi_document()))
}

/// Builds the OpenAPI description of the HTTP surface
///
/// Maintained by hand alongside the routers; the integration suite
/// checks that every documented path actually exists.
pub(crate) fn openapi_document() -> JsonValue {
    fn bearer() -> JsonValue {
        json!([{ "bearerAuth": [] }])
    }
    fn any_auth() -> JsonValue {
        json!([{ "bearerAuth": [] }, { "apiKeyHeader": [] }])
    }

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Chainwatch API",
            "description": "Multi-tenant blockchain monitoring: tenants define address monitors over supported networks and attach notification triggers.",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" },
                "apiKeyHeader": { "type": "apiKey", "in": "header", "name": "X-API-Key" },
            }
        },
        "paths": {
            "/health": {
                "get": { "tags": ["system"], "summary": "Liveness and dependency connectivity", "security": [] }
            },
            "/api/v1/auth/register": {
                "post": { "tags": ["auth"], "summary": "Create a tenant and its owner account", "security": [] }
            },
            "/api/v1/auth/login": {
                "post": { "tags": ["auth"], "summary": "Exchange credentials for a JWT pair", "security": [] }
            },
            "/api/v1/auth/refresh": {
                "post": { "tags": ["auth"], "summary": "Exchange a refresh token for a new access token", "security": [] }
            },
            "/api/v1/auth/me": {
                "get": { "tags": ["auth"], "summary": "Current user profile", "security": bearer() }
            },
            "/api/v1/api-keys": {
                "get": { "tags": ["api-keys"], "summary": "List the tenant's API keys", "security": any_auth() },
                "post": { "tags": ["api-keys"], "summary": "Create an API key; the full key is returned once", "security": bearer() }
            },
            "/api/v1/api-keys/{id}": {
                "delete": { "tags": ["api-keys"], "summary": "Revoke an API key", "security": bearer() }
            },
            "/api/v1/monitors": {
                "get": { "tags": ["monitors"], "summary": "List monitors (paginated; filters: network, paused)", "security": any_auth() },
                "post": { "tags": ["monitors"], "summary": "Create a monitor (quota-gated)", "security": any_auth() }
            },
            "/api/v1/monitors/{id}": {
                "get": { "tags": ["monitors"], "summary": "Get a monitor", "security": any_auth() },
                "patch": { "tags": ["monitors"], "summary": "Update a monitor", "security": any_auth() },
                "delete": { "tags": ["monitors"], "summary": "Delete a monitor", "security": any_auth() }
            },
            "/api/v1/monitors/{id}/sync": {
                "post": { "tags": ["monitors"], "summary": "Queue an out-of-band sync job", "security": any_auth() }
            },
            "/api/v1/networks": {
                "get": { "tags": ["networks"], "summary": "List supported networks", "security": any_auth() },
                "post": { "tags": ["networks"], "summary": "Register a network (superuser)", "security": bearer() }
            },
            "/api/v1/networks/{id}": {
                "patch": { "tags": ["networks"], "summary": "Update a network (superuser)", "security": bearer() },
                "delete": { "tags": ["networks"], "summary": "Remove a network (superuser)", "security": bearer() }
            },
            "/api/v1/triggers": {
                "get": { "tags": ["triggers"], "summary": "List triggers (paginated)", "security": any_auth() },
                "post": { "tags": ["triggers"], "summary": "Create a trigger (quota-gated)", "security": any_auth() }
            },
            "/api/v1/triggers/{id}": {
                "get": { "tags": ["triggers"], "summary": "Get a trigger", "security": any_auth() },
                "patch": { "tags": ["triggers"], "summary": "Update a trigger", "security": any_auth() },
                "delete": { "tags": ["triggers"], "summary": "Delete a trigger", "security": any_auth() }
            },
            "/api/v1/triggers/{id}/test": {
                "post": { "tags": ["triggers"], "summary": "Queue a webhook test delivery", "security": any_auth() }
            },
            "/api/v1/tenants/me": {
                "get": { "tags": ["tenants"], "summary": "Own tenant with usage and ceilings", "security": any_auth() },
                "patch": { "tags": ["tenants"], "summary": "Rename or adjust settings (admin session)", "security": bearer() }
            },
            "/api/v1/tenants": {
                "get": { "tags": ["tenants"], "summary": "List tenants (superuser)", "security": bearer() },
                "post": { "tags": ["tenants"], "summary": "Create a tenant (superuser)", "security": bearer() }
            },
            "/api/v1/tenants/{id}": {
                "patch": { "tags": ["tenants"], "summary": "Update a tenant, including its plan (superuser)", "security": bearer() }
            },
            "/api/v1/tenants/{id}/suspend": {
                "post": { "tags": ["tenants"], "summary": "Suspend a tenant (superuser)", "security": bearer() }
            },
            "/api/v1/tenants/{id}/reactivate": {
                "post": { "tags": ["tenants"], "summary": "Reactivate a tenant (superuser)", "security": bearer() }
            },
            "/api/v1/audit": {
                "get": { "tags": ["audit"], "summary": "Tenant audit trail (paginated; filter: action)", "security": any_auth() }
            }
        }
    })
}

/// Embedded reference page. No scripts; styling is inline so the strict
/// content security policy holds.
const DOCS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Chainwatch API</title>
<style>
  body { font-family: ui-monospace, SFMono-Regular, Menlo, monospace; margin: 2rem auto; max-width: 56rem; padding: 0 1rem; color: #1a1a2e; }
  h1 { font-size: 1.5rem; } h2 { font-size: 1.1rem; margin-top: 2rem; border-bottom: 1px solid #ddd; padding-bottom: 0.3rem; }
  table { border-collapse: collapse; width: 100%; }
  td { padding: 0.3rem 0.6rem; vertical-align: top; }
  td.m { font-weight: bold; white-space: nowrap; width: 4rem; }
  td.p { white-space: nowrap; }
  .note { color: #555; font-size: 0.85rem; }
</style>
</head>
<body>
<h1>Chainwatch API <span class="note">v{{version}}</span></h1>
<p class="note">Authenticate with <code>Authorization: Bearer &lt;jwt&gt;</code> or <code>X-API-Key</code>.
Superusers may pin another tenant with <code>X-Tenant-ID</code>.
Machine-readable spec: <a href="/openapi.json">/openapi.json</a>.</p>

<h2>System</h2>
<table>
<tr><td class="m">GET</td><td class="p">/health</td><td>Liveness and dependency connectivity</td></tr>
</table>

<h2>Auth</h2>
<table>
<tr><td class="m">POST</td><td class="p">/api/v1/auth/register</td><td>Create a tenant and its owner account</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/auth/login</td><td>Exchange credentials for a JWT pair</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/auth/refresh</td><td>Refresh an access token</td></tr>
<tr><td class="m">GET</td><td class="p">/api/v1/auth/me</td><td>Current user profile</td></tr>
</table>

<h2>API keys</h2>
<table>
<tr><td class="m">GET</td><td class="p">/api/v1/api-keys</td><td>List the tenant's keys</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/api-keys</td><td>Create a key; the full key is shown once</td></tr>
<tr><td class="m">DELETE</td><td class="p">/api/v1/api-keys/{id}</td><td>Revoke a key</td></tr>
</table>

<h2>Monitors</h2>
<table>
<tr><td class="m">GET</td><td class="p">/api/v1/monitors</td><td>List (paginated; filters: network, paused)</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/monitors</td><td>Create (quota-gated)</td></tr>
<tr><td class="m">GET</td><td class="p">/api/v1/monitors/{id}</td><td>Get</td></tr>
<tr><td class="m">PATCH</td><td class="p">/api/v1/monitors/{id}</td><td>Update (config merges)</td></tr>
<tr><td class="m">DELETE</td><td class="p">/api/v1/monitors/{id}</td><td>Delete</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/monitors/{id}/sync</td><td>Queue an out-of-band sync</td></tr>
</table>

<h2>Networks</h2>
<table>
<tr><td class="m">GET</td><td class="p">/api/v1/networks</td><td>List supported networks</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/networks</td><td>Register (superuser)</td></tr>
<tr><td class="m">PATCH</td><td class="p">/api/v1/networks/{id}</td><td>Update (superuser)</td></tr>
<tr><td class="m">DELETE</td><td class="p">/api/v1/networks/{id}</td><td>Remove (superuser)</td></tr>
</table>

<h2>Triggers</h2>
<table>
<tr><td class="m">GET</td><td class="p">/api/v1/triggers</td><td>List (paginated)</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/triggers</td><td>Create (quota-gated)</td></tr>
<tr><td class="m">GET</td><td class="p">/api/v1/triggers/{id}</td><td>Get</td></tr>
<tr><td class="m">PATCH</td><td class="p">/api/v1/triggers/{id}</td><td>Update (config merges)</td></tr>
<tr><td class="m">DELETE</td><td class="p">/api/v1/triggers/{id}</td><td>Delete</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/triggers/{id}/test</td><td>Queue a webhook test delivery</td></tr>
</table>

<h2>Tenants</h2>
<table>
<tr><td class="m">GET</td><td class="p">/api/v1/tenants/me</td><td>Own tenant with usage and ceilings</td></tr>
<tr><td class="m">PATCH</td><td class="p">/api/v1/tenants/me</td><td>Rename / settings (admin session)</td></tr>
<tr><td class="m">GET</td><td class="p">/api/v1/tenants</td><td>List tenants (superuser)</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/tenants</td><td>Create a tenant (superuser)</td></tr>
<tr><td class="m">PATCH</td><td class="p">/api/v1/tenants/{id}</td><td>Update, incl. plan (superuser)</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/tenants/{id}/suspend</td><td>Suspend (superuser)</td></tr>
<tr><td class="m">POST</td><td class="p">/api/v1/tenants/{id}/reactivate</td><td>Reactivate (superuser)</td></tr>
</table>

<h2>Audit</h2>
<table>
<tr><td class="m">GET</td><td class="p">/api/v1/audit</td><td>Tenant audit trail (paginated; filter: action)</td></tr>
</table>

<h2>Rate limiting</h2>
<p class="note">Limits are per tenant (per IP when anonymous) in fixed hourly windows by plan tier.
Every limited response carries <code>X-RateLimit-Limit</code>, <code>X-RateLimit-Remaining</code>,
<code>X-RateLimit-Reset</code>, and <code>X-RateLimit-Period</code>; 429 responses add <code>Retry-After</code>.</p>
</body>
</html>
"#;
