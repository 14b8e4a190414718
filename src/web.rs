//! HTTP surface: the GraphQL endpoint, the optional GraphiQL page and a
//! liveness probe.
use crate::authz::{AuthError, Authenticator};
use crate::settings::Settings;
use async_graphql::dynamic::Schema;
use async_graphql::{ErrorExtensionValues, ServerError};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use miette::IntoDiagnostic;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const GRAPHQL_PATH: &str = "/graphql";

#[derive(Clone)]
pub struct AppState {
    pub schema: Schema,
    pub authenticator: Authenticator,
}

// Security headers middleware
async fn security_headers(request: Request<Body>, next: Next) -> impl IntoResponse {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );

    response
}

pub fn router(state: AppState, playground: bool) -> Router {
    let graphql = if playground {
        get(graphiql).post(graphql_handler)
    } else {
        post(graphql_handler)
    };

    Router::new()
        .route(GRAPHQL_PATH, graphql)
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub async fn serve(settings: Settings, schema: Schema, authenticator: Authenticator) -> miette::Result<()> {
    let addr: SocketAddr = settings
        .listen_addr()
        .parse()
        .map_err(|e| miette::miette!("bad listen addr: {e}"))?;

    let router = router(
        AppState {
            schema,
            authenticator,
        },
        settings.server.playground,
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, "GraphQL API listening");
    if settings.server.playground {
        tracing::info!("GraphiQL available at http://{}{}", addr, GRAPHQL_PATH);
    }
    axum::serve(listener, router).await.into_diagnostic()?;
    Ok(())
}

/// Authenticate the caller, then execute. An `Authorization` header that
/// fails verification rejects the whole request before any field resolves.
async fn graphql_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let header = match headers.get(AUTHORIZATION).map(|v| v.to_str()).transpose() {
        Ok(header) => header,
        Err(_) => {
            return unauthenticated(&AuthError::Verification(
                "authorization header is not valid UTF-8".into(),
            ))
        }
    };

    let request = match state.authenticator.authenticate(header) {
        Ok(Some(ctx)) => req.into_inner().data(ctx),
        Ok(None) => req.into_inner(),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request with invalid token");
            return unauthenticated(&e);
        }
    };

    state.schema.execute(request).await.into()
}

fn unauthenticated(err: &AuthError) -> GraphQLResponse {
    let mut extensions = ErrorExtensionValues::default();
    extensions.set("code", AuthError::CODE);

    let mut error = ServerError::new(err.to_string(), None);
    error.extensions = Some(extensions);
    async_graphql::Response::from_errors(vec![error]).into()
}

async fn graphiql() -> impl IntoResponse {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint(GRAPHQL_PATH)
            .finish(),
    )
}

async fn healthz() -> &'static str {
    "ok"
}
