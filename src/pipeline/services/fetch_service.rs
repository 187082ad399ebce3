use crate::config::FetchSettings;
use crate::error::FetchError;
use bytes::Bytes;
use futures::future::BoxFuture;
use reqwest::header::CONTENT_TYPE;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};
use tracing::{debug, instrument};

/// Body of a successful download plus what the server claimed it was.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub url: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Single HTTP GET, no retries.
#[derive(Clone)]
pub struct HttpFetchService {
    client: reqwest::Client,
}

impl HttpFetchService {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .connect_timeout(settings.connect_timeout())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Service<String> for HttpFetchService {
    type Response = FetchedBody;
    type Error = FetchError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, url: String) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let response = match client.get(&url).send().await {
                Ok(response) => response,
                Err(source) => return Err(FetchError::Request { url, source }),
            };

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            match response.bytes().await {
                Ok(body) => Ok(FetchedBody {
                    url,
                    content_type,
                    body,
                }),
                Err(source) => Err(FetchError::Request { url, source }),
            }
        })
    }
}

/// Downloads the radar image. The request timeout is a tower layer around the
/// HTTP service rather than a client setting.
pub struct ImageFetcher {
    url: String,
    timeout: Duration,
    service: BoxService<String, FetchedBody, BoxError>,
}

impl ImageFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let http = HttpFetchService::new(settings)?;
        Ok(Self::with_service(
            settings.url.clone(),
            settings.request_timeout(),
            http,
        ))
    }

    pub fn with_service<S>(url: impl Into<String>, timeout: Duration, service: S) -> Self
    where
        S: Service<String, Response = FetchedBody, Error = FetchError> + Send + 'static,
        S::Future: Send + 'static,
    {
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .service(service);

        Self {
            url: url.into(),
            timeout,
            service: BoxService::new(service),
        }
    }

    /// Returns the body only if it looks like an image; an HTML error page
    /// served with a 200 must never replace the radar artifact.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch(&mut self) -> Result<FetchedBody, FetchError> {
        let url = self.url.clone();
        let result = match self.service.ready().await {
            Ok(service) => service.call(url.clone()).await,
            Err(error) => Err(error),
        };
        let fetched = result.map_err(|error| self.classify(error))?;

        match image::guess_format(&fetched.body) {
            Ok(format) => {
                debug!(
                    "Downloaded {} bytes ({:?}) from {}",
                    fetched.body.len(),
                    format,
                    url
                );
                Ok(fetched)
            }
            Err(_) => Err(FetchError::NotAnImage {
                url,
                content_type: fetched.content_type,
            }),
        }
    }

    fn classify(&self, error: BoxError) -> FetchError {
        if error.is::<Elapsed>() {
            return FetchError::Timeout {
                url: self.url.clone(),
                after: self.timeout,
            };
        }
        match error.downcast::<FetchError>() {
            Ok(fetch_error) => *fetch_error,
            Err(other) => FetchError::Service(other.to_string()),
        }
    }
}
