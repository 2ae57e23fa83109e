use crate::{
    cache::{Cache, LruCache, MemoryCache},
    extract::{extract_image, ImageExtractor},
    options::Options,
    relay::{Fetcher, Relay},
    Record, COMPONENT,
};
use futures::channel::oneshot;
use percent_encoding::utf8_percent_encode;
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    sync::Mutex,
};

/// Waiters for lookups which are currently in progress, keyed by their
/// resolution key.
type InFlight = Mutex<HashMap<String, Vec<oneshot::Sender<Option<String>>>>>;

/// Finds a representative image for a page, remembering what it found.
///
/// Every failure along the way (the relay being down, an error status,
/// markup without any images) is expected and handled by moving on to the
/// next fallback, so [`Resolver::resolve()`] never fails. It either gives you
/// an image URL or `None`, in which case you should keep showing whatever
/// placeholder you already had.
pub struct Resolver<F> {
    fetcher: F,
    options: Options,
    cache: Box<dyn Cache>,
    extractor: Box<dyn ImageExtractor>,
    in_flight: InFlight,
}

impl Resolver<Relay> {
    /// Create a [`Resolver`] which goes through the [`Options::relay()`].
    pub fn from_options(options: Options) -> Self {
        let relay = Relay::new(options.relay().clone());
        Resolver::new(relay, options)
    }
}

impl<F: Fetcher> Resolver<F> {
    /// Create a [`Resolver`], using a [`MemoryCache`] or [`LruCache`]
    /// depending on the [`Options::cache_capacity()`].
    pub fn new(fetcher: F, options: Options) -> Self {
        let cache: Box<dyn Cache> = match options.cache_capacity() {
            Some(capacity) => Box::new(LruCache::new(capacity)),
            None => Box::new(MemoryCache::new()),
        };

        Resolver::with_cache(fetcher, options, cache)
    }

    /// Create a [`Resolver`] which uses a particular [`Cache`].
    pub fn with_cache(
        fetcher: F,
        options: Options,
        cache: Box<dyn Cache>,
    ) -> Self {
        Resolver {
            fetcher,
            options,
            cache,
            extractor: Box::new(extract_image),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different [`ImageExtractor`] instead of [`extract_image()`].
    pub fn with_extractor<E>(self, extractor: E) -> Self
    where
        E: ImageExtractor + 'static,
    {
        Resolver {
            extractor: Box::new(extractor),
            ..self
        }
    }

    /// The [`Fetcher`] used to get markup.
    pub fn fetcher(&self) -> &F { &self.fetcher }

    /// The [`Options`] this [`Resolver`] was created with.
    pub fn options(&self) -> &Options { &self.options }

    /// Everything resolved so far.
    pub fn cache(&self) -> &dyn Cache { &*self.cache }

    /// The key a lookup is remembered under.
    ///
    /// This is the source link when there is one, otherwise it's derived from
    /// the fallback query.
    pub fn cache_key(
        source_link: Option<&str>,
        fallback_query: Option<&str>,
    ) -> String {
        match (non_empty(source_link), non_empty(fallback_query)) {
            (Some(link), _) => link.to_string(),
            (None, Some(query)) => format!("fallback:{}", query),
            (None, None) => String::from("none"),
        }
    }

    /// An image search for `query` (plus the [`Options::qualifier()`]).
    ///
    /// The terms are encoded like `encodeURIComponent()` and appended to any
    /// query the [`Options::fallback_service()`] already has. The URL is only
    /// constructed, it is never fetched.
    pub fn fallback_url(&self, query: &str) -> String {
        let terms = format!("{},{}", query, self.options.qualifier());
        let terms = utf8_percent_encode(&terms, COMPONENT);

        let mut service = self.options.fallback_service().clone();
        service.set_fragment(None);
        let separator = match service.query() {
            Some(q) if !q.is_empty() => "&",
            Some(_) => "",
            None => "?",
        };

        // Url::set_query() would re-escape characters like `'`
        format!("{}{}{}", service, separator, terms)
    }

    /// Find the image to show for a [`Record`].
    ///
    /// A [`Record::direct_image`] always wins, otherwise the image is looked
    /// up using the [`Record::source_link`], falling back to a search for the
    /// [`Record::name`].
    pub async fn resolve_record(&self, record: &Record) -> Option<String> {
        if let Some(image) = non_empty(record.direct_image.as_deref()) {
            return Some(image.to_string());
        }

        self.resolve(record.source_link.as_deref(), Some(&record.name))
            .await
    }

    /// Find an image for the page at `source_link`.
    ///
    /// Without a `source_link` there's nothing to look up and we return
    /// `None` straight away. Otherwise the page is fetched and scanned for an
    /// image. If that fails, a search for `fallback_query` is used instead.
    ///
    /// Each key is only ever looked up once. Concurrent calls for the same
    /// key wait for the first one to finish instead of fetching the page
    /// again.
    pub async fn resolve(
        &self,
        source_link: Option<&str>,
        fallback_query: Option<&str>,
    ) -> Option<String> {
        let source_link = non_empty(source_link)?;
        let fallback_query = non_empty(fallback_query);
        let key = Self::cache_key(Some(source_link), fallback_query);

        loop {
            match self.join(&key) {
                Role::Cached(image) => {
                    log::debug!("Cache hit for \"{}\"", key);
                    return image;
                },
                Role::Follower(rx) => {
                    log::debug!("Waiting on the lookup for \"{}\"", key);

                    match rx.await {
                        Ok(image) => return image,
                        // the leader gave up, try again ourselves
                        Err(oneshot::Canceled) => continue,
                    }
                },
                Role::Leader(flight) => {
                    let image = self.lookup(source_link, fallback_query).await;
                    self.cache.insert(&key, image.clone());
                    flight.finish(image.clone());

                    return image;
                },
            }
        }
    }

    /// Figure out whether we need to do the lookup for `key`.
    fn join(&self, key: &str) -> Role<'_> {
        let mut in_flight = self.in_flight.lock().expect("Mutex was poisoned");

        // the leader populates the cache before it leaves the in-flight
        // table, so checking while the table is locked can't miss a result
        if let Some(image) = self.cache.get(key) {
            return Role::Cached(image);
        }

        if let Some(waiters) = in_flight.get_mut(key) {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            return Role::Follower(rx);
        }

        in_flight.insert(key.to_string(), Vec::new());

        Role::Leader(Flight {
            key: key.to_string(),
            in_flight: &self.in_flight,
            finished: false,
        })
    }

    async fn lookup(
        &self,
        source_link: &str,
        fallback_query: Option<&str>,
    ) -> Option<String> {
        match self.fetcher.fetch(source_link).await {
            Ok(markup) => match self.extractor.extract(&markup, source_link) {
                Some(image) => return Some(image),
                None => log::debug!("No image found on \"{}\"", source_link),
            },
            Err(e) => {
                log::debug!("Unable to fetch \"{}\": {}", source_link, e)
            },
        }

        match fallback_query {
            Some(query) => {
                let url = self.fallback_url(query);
                log::debug!(
                    "Falling back to \"{}\" for \"{}\"",
                    url,
                    source_link
                );
                Some(url)
            },
            None => None,
        }
    }
}

impl<F: Debug> Debug for Resolver<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("fetcher", &self.fetcher)
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> { s.filter(|s| !s.is_empty()) }

enum Role<'r> {
    Cached(Option<String>),
    Follower(oneshot::Receiver<Option<String>>),
    Leader(Flight<'r>),
}

/// The leader's claim on a key. Dropping it without calling
/// [`Flight::finish()`] releases the key and wakes any waiters so they can
/// retry.
struct Flight<'r> {
    key: String,
    in_flight: &'r InFlight,
    finished: bool,
}

impl<'r> Flight<'r> {
    fn finish(mut self, image: Option<String>) {
        self.finished = true;

        for waiter in self.release() {
            let _ = waiter.send(image.clone());
        }
    }

    fn release(&self) -> Vec<oneshot::Sender<Option<String>>> {
        match self.in_flight.lock() {
            Ok(mut in_flight) => {
                in_flight.remove(&self.key).unwrap_or_default()
            },
            Err(_) => Vec::new(),
        }
    }
}

impl<'r> Drop for Flight<'r> {
    fn drop(&mut self) {
        if !self.finished {
            log::debug!("The lookup for \"{}\" was abandoned", self.key);
            // dropping the senders cancels the waiters
            self.release();
        }
    }
}
