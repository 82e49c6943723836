use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Include/exclude regex filters applied to a URL's path and query
///
/// Patterns are matched against the path plus query (for example
/// `/docs/intro?lang=en`), never against the host. A pattern matches if it
/// matches the canonical path or that path with a trailing slash.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl UrlFilter {
    /// Compiles the given patterns
    ///
    /// # Returns
    ///
    /// * `Ok(UrlFilter)` - All patterns compiled
    /// * `Err(ConfigError::FilterConfig)` - The first pattern that failed to compile
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    /// A filter that admits everything
    pub fn allow_all() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Returns true if the URL passes both filter lists
    ///
    /// A URL is rejected when any exclude pattern matches. When include
    /// patterns are configured, it must also match at least one of them.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagebinder::url::UrlFilter;
    /// use url::Url;
    ///
    /// let filter = UrlFilter::new(&[r".*\/docs\/.*"], &[]).unwrap();
    /// assert!(filter.allows(&Url::parse("https://site.test/docs/a").unwrap()));
    /// assert!(!filter.allows(&Url::parse("https://site.test/blog/b").unwrap()));
    /// ```
    pub fn allows(&self, url: &Url) -> bool {
        !self.is_excluded(url) && self.is_included(url)
    }

    /// Returns true if any exclude pattern matches the URL
    pub fn is_excluded(&self, url: &Url) -> bool {
        let targets = match_targets(url);
        self.exclude
            .iter()
            .any(|re| targets.iter().any(|t| re.is_match(t)))
    }

    /// Returns true if no include patterns are configured or one of them matches
    pub fn is_included(&self, url: &Url) -> bool {
        let targets = match_targets(url);
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|re| targets.iter().any(|t| re.is_match(t)))
    }
}

/// The strings the filters see: path plus query
///
/// Canonical paths have no trailing slash, so directory-style paths are also
/// offered with it restored: `/blog` is seen as `/blog` and `/blog/`.
fn match_targets(url: &Url) -> Vec<String> {
    let with_query = |path: &str| match url.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let path = url.path();
    let mut targets = vec![with_query(path)];
    if !path.ends_with('/') {
        targets.push(with_query(&format!("{}/", path)));
    }
    targets
}

fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Regex::new(pattern).map_err(|source| ConfigError::FilterConfig {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}
