//! Per-request state shared between filters and the handler.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};

use crate::body::{self, BodyInterchange, BodyStream, Entity, Error as BodyError, ReadTarget};
use crate::parser::HttpRequest;
use crate::router::error::Error;
use crate::router::path_spec::PathParams;
use crate::server::{HttpResponse, StatusCode};
use crate::stream::ReadMode;

/// Attribute key under which the matched route's [`PathParams`] are stored.
pub const PATH_PARAMS: &str = "microhttp.path_params";

/// Everything one request carries through the pipeline: the request
/// head, the not-yet-read body, the response once one is produced, and
/// free-form attributes filters and handlers use to talk to each other.
///
/// Created when the request head arrives and dropped once the response
/// has been sent.
pub struct RequestContext {
    request: HttpRequest,
    body: Option<BodyStream>,
    response: Option<HttpResponse>,
    attributes: HashMap<String, Box<dyn Any + Send + Sync>>,
    interchange: Arc<BodyInterchange>,
}

impl RequestContext {
    pub fn new(request: HttpRequest, body: BodyStream, interchange: Arc<BodyInterchange>) -> Self {
        Self {
            request,
            body: Some(body),
            response: None,
            attributes: HashMap::new(),
            interchange,
        }
    }

    /// A context with an empty body and the default codecs.
    pub fn from_request(request: HttpRequest) -> Self {
        Self::new(request, body::empty(), Arc::new(BodyInterchange::default()))
    }

    /// Replace the body.
    pub fn with_body(mut self, body: BodyStream) -> Self {
        self.body = Some(body);
        self
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// The request path without its query string.
    pub fn path(&self) -> &str {
        self.request.path_only()
    }

    pub fn interchange(&self) -> &Arc<BodyInterchange> {
        &self.interchange
    }

    /// Take the raw body. Only the first call succeeds.
    pub fn take_body(&mut self) -> Result<BodyStream, BodyError> {
        self.body.take().ok_or(BodyError::BodyConsumed)
    }

    pub fn attribute<T: 'static>(&self, key: &str) -> Option<&T> {
        self.attributes.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn set_attribute<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.attributes.insert(key.into(), Box::new(value));
    }

    pub fn remove_attribute(&mut self, key: &str) -> bool {
        self.attributes.remove(key).is_some()
    }

    /// Parameters captured by the matched route, if a route matched.
    pub fn path_params(&self) -> Option<&PathParams> {
        self.attribute::<PathParams>(PATH_PARAMS)
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params().and_then(|params| params.get(name))
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut HttpResponse> {
        self.response.as_mut()
    }

    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    /// Set the response and hand the context back, for use as a handler's
    /// return value.
    pub fn respond(mut self, response: HttpResponse) -> Self {
        self.response = Some(response);
        self
    }

    /// The response to send. A context nobody responded to yields an
    /// empty 200.
    pub fn into_response(self) -> HttpResponse {
        self.response
            .unwrap_or_else(|| HttpResponse::new(StatusCode::Ok).with_body_bytes(Vec::new()))
    }

    /// Decode the body as a lazy sequence of `T`.
    ///
    /// A top-level JSON array is unwrapped so each element arrives as soon
    /// as it is complete; whitespace-separated root values are emitted one
    /// by one. Raw [`bytes::Bytes`] bodies yield one item per chunk.
    pub fn read_stream<T>(&mut self) -> Result<BoxStream<'static, Result<T, BodyError>>, BodyError>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        self.read_with(ReadMode::Elements)
    }

    /// Decode the body as exactly one `T`.
    pub async fn read_body<T>(&mut self) -> Result<T, BodyError>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        let mut values = self.read_with::<T>(ReadMode::Values)?;
        let value = match values.next().await {
            Some(value) => value?,
            None => return Err(BodyError::PrematureEnd),
        };
        match values.next().await {
            None => Ok(value),
            Some(Err(err)) => Err(err),
            Some(Ok(_)) => Err(BodyError::malformed(0, "expected a single value but found more")),
        }
    }

    fn read_with<T>(&mut self, mode: ReadMode) -> Result<BoxStream<'static, Result<T, BodyError>>, BodyError>
    where
        T: serde::de::DeserializeOwned + Send + 'static,
    {
        let target = ReadTarget::of::<T>(mode);
        let reader = self.interchange.select_reader(&self.request, &target)?;
        let body = self.take_body()?;
        Ok(body::typed(reader.read(&self.request, target, body)))
    }

    /// Write `entity` through the body interchange and set it as the
    /// response with `status`.
    pub async fn respond_with(mut self, status: StatusCode, entity: Entity) -> Result<Self, Error> {
        let declared = entity.type_info();
        let interchange = self.interchange.clone();
        let response = interchange.write(&self.request, declared, entity).await?;
        self.response = Some(response.with_status(status));
        Ok(self)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("body_taken", &self.body.is_none())
            .field("responded", &self.response.is_some())
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}
