//! Bearer-token attachment for outgoing HTTP requests.
//!
//! [`AuthHttpLayer`] wraps any `tower` service over `http::Request`. Requests
//! whose URL matches a rule in the configured allow list get an
//! `Authorization: Bearer <token>` header with a token fetched silently from
//! the shared client; everything else passes through untouched.
//!
//! ```rust,ignore
//! use rxauth0::client::interceptor::{AuthHttpLayer, HttpInterceptorConfig};
//! use tower::ServiceBuilder;
//!
//! let config = Auth0Config::new("tenant.auth0.com", "client_id")
//!     .with_http_interceptor(HttpInterceptorConfig::new().allow("https://api.example.com/*"));
//!
//! let service = ServiceBuilder::new()
//!     .layer(AuthHttpLayer::new(auth.clone()))
//!     .service(http_client);
//! ```

use crate::client::auth_client::GetTokenSilentlyOptions;
use crate::client::auth_service::AuthService;
use crate::error::AuthError;
use futures::future::BoxFuture;
use http::header::{AUTHORIZATION, HeaderValue};
use http::{Method, Request};
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{BoxError, Layer, Service};

pub type UriMatcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Detailed rule for a protected API route.
#[derive(Clone, Default)]
pub struct HttpInterceptorRouteConfig {
    /// Exact URL, or a prefix when it ends in `*`
    pub uri: Option<String>,
    /// Custom URL test, used when `uri` does not match
    pub uri_matcher: Option<UriMatcher>,
    /// Restricts the rule to one method; any method when `None`
    pub http_method: Option<Method>,
    /// Options for the silent token request made for this route
    pub token_options: Option<GetTokenSilentlyOptions>,
    /// Send the request without a token when none can be obtained
    pub allow_anonymous: bool,
}

impl HttpInterceptorRouteConfig {
    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn matcher<F>(matcher: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            uri_matcher: Some(Arc::new(matcher)),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.http_method = Some(method);
        self
    }

    pub fn with_token_options(mut self, options: GetTokenSilentlyOptions) -> Self {
        self.token_options = Some(options);
        self
    }

    pub fn allow_anonymous(mut self) -> Self {
        self.allow_anonymous = true;
        self
    }

    fn matches(&self, url: &str, method: &Method) -> bool {
        if let Some(expected) = &self.http_method
            && expected != method
        {
            return false;
        }

        let uri_matches = self.uri.as_deref().is_some_and(|uri| uri_matches(uri, url));
        uri_matches || self.uri_matcher.as_ref().is_some_and(|matcher| matcher(url))
    }
}

impl fmt::Debug for HttpInterceptorRouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpInterceptorRouteConfig")
            .field("uri", &self.uri)
            .field("uri_matcher", &self.uri_matcher.as_ref().map(|_| ".."))
            .field("http_method", &self.http_method)
            .field("token_options", &self.token_options)
            .field("allow_anonymous", &self.allow_anonymous)
            .finish()
    }
}

/// One entry of the interceptor's allow list.
#[derive(Clone, Debug)]
pub enum ApiRouteDefinition {
    /// Exact URL, or a prefix when it ends in `*`
    Uri(String),
    /// URL regular expression
    Pattern(Regex),
    Route(HttpInterceptorRouteConfig),
}

impl ApiRouteDefinition {
    fn matches(&self, url: &str, method: &Method) -> bool {
        match self {
            ApiRouteDefinition::Uri(uri) => uri_matches(uri, url),
            ApiRouteDefinition::Pattern(pattern) => pattern.is_match(url),
            ApiRouteDefinition::Route(route) => route.matches(url, method),
        }
    }

    fn token_options(&self) -> GetTokenSilentlyOptions {
        match self {
            ApiRouteDefinition::Route(route) => route.token_options.clone().unwrap_or_default(),
            _ => GetTokenSilentlyOptions::default(),
        }
    }

    fn allows_anonymous(&self) -> bool {
        matches!(self, ApiRouteDefinition::Route(route) if route.allow_anonymous)
    }
}

impl From<&str> for ApiRouteDefinition {
    fn from(uri: &str) -> Self {
        ApiRouteDefinition::Uri(uri.to_string())
    }
}

impl From<String> for ApiRouteDefinition {
    fn from(uri: String) -> Self {
        ApiRouteDefinition::Uri(uri)
    }
}

impl From<Regex> for ApiRouteDefinition {
    fn from(pattern: Regex) -> Self {
        ApiRouteDefinition::Pattern(pattern)
    }
}

impl From<HttpInterceptorRouteConfig> for ApiRouteDefinition {
    fn from(route: HttpInterceptorRouteConfig) -> Self {
        ApiRouteDefinition::Route(route)
    }
}

fn uri_matches(uri: &str, url: &str) -> bool {
    match uri.strip_suffix('*') {
        Some(prefix) => url.starts_with(prefix),
        None => uri == url,
    }
}

/// Routes that receive an access token. Rules are tried in order.
#[derive(Clone, Debug, Default)]
pub struct HttpInterceptorConfig {
    pub allowed_list: Vec<ApiRouteDefinition>,
}

impl HttpInterceptorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, route: impl Into<ApiRouteDefinition>) -> Self {
        self.allowed_list.push(route.into());
        self
    }

    /// First rule matching both URL and method.
    pub fn find_route(&self, url: &str, method: &Method) -> Option<&ApiRouteDefinition> {
        self.allowed_list
            .iter()
            .find(|route| route.matches(url, method))
    }
}

/// `tower` layer attaching access tokens to matching requests.
#[derive(Clone, Debug)]
pub struct AuthHttpLayer {
    auth: AuthService,
}

impl AuthHttpLayer {
    pub fn new(auth: AuthService) -> Self {
        Self { auth }
    }
}

impl<S> Layer<S> for AuthHttpLayer {
    type Service = AuthHttpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthHttpService {
            inner,
            auth: self.auth.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthHttpService<S> {
    inner: S,
    auth: AuthService,
}

impl<S, B> Service<Request<B>> for AuthHttpService<S>
where
    S: Service<Request<B>> + Clone + Send + 'static,
    S::Response: Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        // Use the instance that was polled ready
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let auth = self.auth.clone();

        Box::pin(async move {
            let request = authorize(&auth, request).await?;
            inner.call(request).await.map_err(Into::into)
        })
    }
}

async fn authorize<B>(auth: &AuthService, mut request: Request<B>) -> Result<Request<B>, AuthError> {
    let config = auth.config().get()?;
    let Some(interceptor) = config.http_interceptor.as_ref() else {
        return Ok(request);
    };

    let url = request.uri().to_string();
    if url.starts_with(&config.token_url()) {
        return Ok(request);
    }
    let Some(route) = interceptor.find_route(&url, request.method()) else {
        tracing::trace!("No interceptor rule for {} {}", request.method(), url);
        return Ok(request);
    };

    let client = auth.client().get()?;
    match client.get_token_silently(route.token_options()).await {
        Ok(result) => {
            let token = result.access_token();
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| AuthError::Client("access token is not a valid header value".to_string()))?;
            auth.state().set_access_token(token);
            request.headers_mut().insert(AUTHORIZATION, value);
            tracing::trace!("Attached access token to {}", url);
            Ok(request)
        }
        Err(error) if route.allows_anonymous() => {
            tracing::debug!("Sending {} without a token: {}", url, error);
            Ok(request)
        }
        Err(error) => {
            tracing::warn!("Could not get an access token for {}: {}", url, error);
            auth.state().set_error(error.clone());
            Err(error)
        }
    }
}
