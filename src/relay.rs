use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http::StatusCode;
use reqwest::{Client, Url};

/// Something which can retrieve a page's markup.
///
/// Browsers won't let us read cross-origin pages directly, so in practice
/// this goes through a [`Relay`]. Having it as a trait means the
/// [`crate::Resolver`] doesn't care how the markup was obtained.
pub trait Fetcher: Send + Sync {
    /// Fetch the markup for `target`.
    fn fetch<'a>(
        &'a self,
        target: &'a str,
    ) -> BoxFuture<'a, Result<String, Reason>>;
}

impl<'f, F: Fetcher> Fetcher for &'f F {
    fn fetch<'a>(
        &'a self,
        target: &'a str,
    ) -> BoxFuture<'a, Result<String, Reason>> {
        (**self).fetch(target)
    }
}

/// Why a page couldn't be fetched.
#[derive(Debug, thiserror::Error)]
pub enum Reason {
    /// The request itself failed, or the relay gave back an error status.
    #[error("The relay request failed")]
    Web(#[from] reqwest::Error),
    /// The relay responded with a non-success status.
    #[error("The relay responded with {0}")]
    Status(StatusCode),
}

/// A pass-through proxy which fetches a page on our behalf.
///
/// The target is passed to the relay's endpoint as the `url` query
/// parameter, and the relay's response body is the target's markup.
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    endpoint: Url,
}

impl Relay {
    /// The User-Agent used when [`Relay::new()`] creates the [`Client`].
    pub const USER_AGENT: &'static str =
        concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

    /// Create a [`Relay`] which talks to `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        let client = Client::builder()
            .user_agent(Relay::USER_AGENT)
            .build()
            .expect("Unable to initialize the client");

        Relay::with_client(client, endpoint)
    }

    /// Create a [`Relay`] with an already initialized [`Client`].
    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Relay { client, endpoint }
    }

    /// The HTTP client being used.
    pub fn client(&self) -> &Client { &self.client }

    /// The relay's endpoint.
    pub fn endpoint(&self) -> &Url { &self.endpoint }

    /// The URL to ask the relay for when we want `target`.
    pub fn relay_url(&self, target: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("url", target);
        url
    }
}

impl Fetcher for Relay {
    fn fetch<'a>(
        &'a self,
        target: &'a str,
    ) -> BoxFuture<'a, Result<String, Reason>> {
        async move {
            let url = self.relay_url(target);
            log::debug!("Fetching \"{}\" via \"{}\"", target, url);

            let body = get(&self.client, &url).await?;

            // pages aren't always UTF-8, and a few mangled characters won't
            // stop us from finding an image
            Ok(String::from_utf8_lossy(&body).into_owned())
        }
        .boxed()
    }
}

/// Send a GET request to a particular endpoint, returning the body.
pub async fn get(
    client: &Client,
    url: &Url,
) -> Result<Bytes, reqwest::Error> {
    client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn relay() -> Relay {
        Relay::new(Url::parse("https://api.allorigins.win/raw").unwrap())
    }

    #[test]
    fn the_target_is_a_query_parameter() {
        let got = relay().relay_url("https://example.com/a/b?x=1&y=2");

        assert_eq!(
            got.as_str(),
            "https://api.allorigins.win/raw?url=https%3A%2F%2Fexample.com%2Fa%2Fb%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn existing_query_parameters_are_kept() {
        let relay = Relay::new(Url::parse("https://relay.test/get?mode=raw").unwrap());

        let got = relay.relay_url("https://example.com/");

        let pairs: Vec<_> = got.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (String::from("mode"), String::from("raw")),
                (String::from("url"), String::from("https://example.com/")),
            ]
        );
    }

    #[tokio::test]
    async fn connection_failures_are_web_errors() {
        let relay = Relay::new(Url::parse("http://127.0.0.1:1/raw").unwrap());

        let err = relay.fetch("https://example.com/").await.unwrap_err();

        assert!(matches!(err, Reason::Web(_)), "{:?}", err);
    }

    #[test]
    fn status_errors_mention_the_status() {
        let err = Reason::Status(StatusCode::BAD_GATEWAY);

        assert_eq!(err.to_string(), "The relay responded with 502 Bad Gateway");
    }
}
