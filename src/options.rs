use std::num::NonZeroUsize;
use url::{ParseError, Url};

/// Where to fetch pages from, and what to do when that doesn't work.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-1", serde(default))]
pub struct Options {
    relay: Url,
    fallback_service: Url,
    qualifier: String,
    cache_capacity: Option<NonZeroUsize>,
}

impl Options {
    /// The relay used when none is specified.
    pub const DEFAULT_RELAY: &'static str = "https://api.allorigins.win/raw";
    /// The image search service used when none is specified.
    pub const DEFAULT_FALLBACK_SERVICE: &'static str =
        "https://source.unsplash.com/1200x600/";
    /// The default [`Options::qualifier()`].
    pub const DEFAULT_QUALIFIER: &'static str = "car";

    /// Options using the default relay, fallback service and qualifier, with
    /// an unbounded cache.
    pub fn new() -> Self {
        Options {
            relay: Url::parse(Options::DEFAULT_RELAY)
                .expect("The default relay is always valid"),
            fallback_service: Url::parse(Options::DEFAULT_FALLBACK_SERVICE)
                .expect("The default fallback service is always valid"),
            qualifier: String::from(Options::DEFAULT_QUALIFIER),
            cache_capacity: None,
        }
    }

    /// The relay's endpoint. The page being fetched gets passed as the `url`
    /// query parameter.
    pub fn relay(&self) -> &Url { &self.relay }

    /// Set the [`Options::relay()`].
    pub fn with_relay(self, relay: &str) -> Result<Self, ParseError> {
        Ok(Options {
            relay: Url::parse(relay)?,
            ..self
        })
    }

    /// The image search service used when no image could be extracted.
    ///
    /// Search terms are appended to whatever query this URL already has.
    pub fn fallback_service(&self) -> &Url { &self.fallback_service }

    /// Set the [`Options::fallback_service()`].
    pub fn with_fallback_service(
        self,
        fallback_service: &str,
    ) -> Result<Self, ParseError> {
        Ok(Options {
            fallback_service: Url::parse(fallback_service)?,
            ..self
        })
    }

    /// A hint appended to every fallback search so the service knows what
    /// kind of image we're after.
    pub fn qualifier(&self) -> &str { &self.qualifier }

    /// Set the [`Options::qualifier()`].
    pub fn with_qualifier<S: Into<String>>(self, qualifier: S) -> Self {
        Options {
            qualifier: qualifier.into(),
            ..self
        }
    }

    /// The most entries the cache may hold, if it is bounded at all.
    pub fn cache_capacity(&self) -> Option<NonZeroUsize> { self.cache_capacity }

    /// Set the [`Options::cache_capacity()`].
    pub fn with_cache_capacity(
        self,
        cache_capacity: Option<NonZeroUsize>,
    ) -> Self {
        Options {
            cache_capacity,
            ..self
        }
    }
}

impl Default for Options {
    fn default() -> Self { Options::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let options = Options::default();

        assert_eq!(options.relay().as_str(), Options::DEFAULT_RELAY);
        assert_eq!(
            options.fallback_service().as_str(),
            Options::DEFAULT_FALLBACK_SERVICE
        );
        assert_eq!(options.qualifier(), "car");
        assert_eq!(options.cache_capacity(), None);
    }

    #[test]
    fn invalid_endpoints_are_rejected() {
        assert!(Options::default().with_relay("not a url").is_err());
        assert!(Options::default()
            .with_fallback_service("/relative/path")
            .is_err());
    }

    #[test]
    fn builder_methods_only_touch_their_own_field() {
        let options = Options::default()
            .with_relay("http://localhost:8080/raw")
            .unwrap()
            .with_qualifier("truck");

        assert_eq!(options.relay().as_str(), "http://localhost:8080/raw");
        assert_eq!(options.qualifier(), "truck");
        assert_eq!(
            options.fallback_service().as_str(),
            Options::DEFAULT_FALLBACK_SERVICE
        );
    }
}
