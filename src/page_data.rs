//! Defines [`SiteData`] and [`PageData`]. [`SiteData`] is the process-wide
//! metadata loaded once per build; [`PageData`] is the per-file view that is
//! derived from it and rendered against.
//!
//! A [`PageData`] is a small stack of mapping layers. Reads under the `page.`
//! prefix consult, in order:
//!
//! 1. build-computed metadata (`filename`, `extension`, `path`, `url`,
//!    `baseUrl`)
//! 2. the file's front matter
//! 3. the site data
//!
//! Handlers may inject variables (e.g. `pagination`) and rewrite the page
//! path, but they do so on their own clone. The site layer is shared behind an
//! [`Arc`] and is never mutated, so nothing leaks from one file to the next.

use crate::resolver::page_url;
use gtmpl_value::Value as TemplateValue;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// The global, read-only site data (the whole project configuration file).
#[derive(Clone, Debug, Default)]
pub struct SiteData(Arc<Mapping>);

impl SiteData {
    pub fn new(data: Mapping) -> SiteData {
        SiteData(Arc::new(data))
    }

    /// Looks up a top-level key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(&Value::String(key.to_owned()))
    }

    /// The site's `baseUrl`, or the empty string when it isn't configured.
    pub fn base_url(&self) -> &str {
        self.get("baseUrl").and_then(Value::as_str).unwrap_or("")
    }

    pub fn mapping(&self) -> &Mapping {
        &self.0
    }
}

/// The metadata the builder computes for every file before dispatching it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageMetadata {
    pub filename: String,
    pub extension: String,
    pub path: String,
    pub url: String,
    pub base_url: String,
}

impl PageMetadata {
    fn to_mapping(&self) -> Mapping {
        let mut m = Mapping::new();
        m.insert("filename".into(), self.filename.clone().into());
        m.insert("extension".into(), self.extension.clone().into());
        m.insert("path".into(), self.path.clone().into());
        m.insert("url".into(), self.url.clone().into());
        m.insert("baseUrl".into(), self.base_url.clone().into());
        m
    }
}

/// The layered metadata document for a single page.
#[derive(Clone, Debug)]
pub struct PageData {
    site: SiteData,
    front_matter: Mapping,
    computed: Mapping,
    variables: Mapping,
}

impl PageData {
    /// Derives a fresh view over `site` with no page-level layers.
    pub fn new(site: &SiteData) -> PageData {
        PageData {
            site: site.clone(),
            front_matter: Mapping::new(),
            computed: Mapping::new(),
            variables: Mapping::new(),
        }
    }

    pub fn with_front_matter(mut self, front_matter: Mapping) -> PageData {
        self.front_matter = front_matter;
        self
    }

    pub fn with_page_metadata(mut self, meta: &PageMetadata) -> PageData {
        self.computed = meta.to_mapping();
        self
    }

    /// The page layers in precedence order (highest first).
    fn page_layers(&self) -> [&Mapping; 3] {
        [&self.computed, &self.front_matter, self.site.mapping()]
    }

    /// Looks up `key` as seen through `page.*`.
    pub fn page(&self, key: &str) -> Option<&Value> {
        let key = Value::String(key.to_owned());
        self.page_layers()
            .into_iter()
            .find_map(|layer| layer.get(&key))
    }

    /// Reads a dotted path such as `page.pagination.perPage` or `posts`.
    /// Paths under `page.` resolve through the page layers; any other path
    /// resolves through handler variables, then site data, then the page
    /// layers.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let head = segments.next()?;
        let root = if head == "page" {
            self.page(segments.next()?)?
        } else {
            let key = Value::String(head.to_owned());
            self.variables
                .get(&key)
                .or_else(|| self.site.mapping().get(&key))
                .or_else(|| self.page(head))?
        };
        segments.try_fold(root, |value, segment| descend(value, segment))
    }

    /// Sets a handler variable, visible at the top level of the template data.
    pub fn put(&mut self, key: &str, value: Value) {
        self.variables.insert(key.into(), value);
    }

    /// Rewrites the computed `path` (and the `url` derived from it).
    pub fn set_page_path(&mut self, path: &str) {
        let base_url = self
            .computed
            .get(&Value::from("baseUrl"))
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.site.base_url())
            .to_owned();
        self.computed.insert("path".into(), path.into());
        self.computed
            .insert("url".into(), page_url(&base_url, path).into());
    }

    /// The permalink declared in this file's front matter, if any. Only the
    /// front matter is consulted.
    pub fn permalink(&self) -> Option<&str> {
        self.front_matter
            .get(&Value::from("permalink"))
            .and_then(Value::as_str)
            .filter(|p| !p.trim().is_empty())
    }

    pub fn front_matter(&self) -> &Mapping {
        &self.front_matter
    }

    /// Converts the document into a template value: site keys and handler
    /// variables at the top level, plus a `page` object merging all page
    /// layers.
    pub fn to_template_value(&self) -> TemplateValue {
        let mut page = HashMap::new();
        for layer in self.page_layers().into_iter().rev() {
            merge_into(&mut page, layer);
        }

        let mut root = HashMap::new();
        merge_into(&mut root, self.site.mapping());
        merge_into(&mut root, &self.variables);
        root.insert("page".to_owned(), TemplateValue::Object(page));
        TemplateValue::Object(root)
    }
}

fn descend<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Mapping(m) => m.get(&Value::String(segment.to_owned())),
        Value::Sequence(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn merge_into(object: &mut HashMap<String, TemplateValue>, mapping: &Mapping) {
    for (key, value) in mapping {
        if let Some(key) = key_string(key) {
            object.insert(key, to_template_value(value));
        }
    }
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Converts YAML data into a [`TemplateValue`] for `gtmpl`.
pub fn to_template_value(value: &Value) -> TemplateValue {
    match value {
        Value::Null => TemplateValue::Nil,
        Value::Bool(b) => TemplateValue::Bool(*b),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => TemplateValue::from(i),
            (None, Some(u)) => TemplateValue::from(u),
            (None, None) => TemplateValue::from(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => TemplateValue::String(s.clone()),
        Value::Sequence(items) => {
            TemplateValue::Array(items.iter().map(to_template_value).collect())
        }
        Value::Mapping(m) => {
            let mut object = HashMap::new();
            merge_into(&mut object, m);
            TemplateValue::Object(object)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn site() -> SiteData {
        SiteData::new(
            serde_yaml::from_str(
                "baseUrl: https://example.org\ntitle: Site\nposts: [a, b, c]\nauthor: site\n",
            )
            .unwrap(),
        )
    }

    fn meta() -> PageMetadata {
        PageMetadata {
            filename: "about".to_owned(),
            extension: "md".to_owned(),
            path: "about".to_owned(),
            url: "https://example.org/about".to_owned(),
            base_url: "https://example.org".to_owned(),
        }
    }

    #[test]
    fn test_page_layer_precedence() -> Result<(), serde_yaml::Error> {
        let data = PageData::new(&site())
            .with_front_matter(serde_yaml::from_str(
                "title: Front\npath: ignored\nauthor: me\n",
            )?)
            .with_page_metadata(&meta());

        assert_eq!(Some("Front"), data.get("page.title").and_then(Value::as_str));
        assert_eq!(Some("about"), data.get("page.path").and_then(Value::as_str));
        assert_eq!(Some("me"), data.get("page.author").and_then(Value::as_str));
        assert_eq!(
            Some("https://example.org"),
            data.get("page.baseUrl").and_then(Value::as_str)
        );
        Ok(())
    }

    #[test]
    fn test_dotted_paths() -> Result<(), serde_yaml::Error> {
        let data = PageData::new(&site()).with_front_matter(serde_yaml::from_str(
            "pagination:\n  collection: posts\n  perPage: 2\n",
        )?);

        assert_eq!(
            Some(2),
            data.get("page.pagination.perPage").and_then(Value::as_i64)
        );
        assert_eq!(Some("b"), data.get("posts.1").and_then(Value::as_str));
        assert!(data.get("posts.9").is_none());
        assert!(data.get("page.missing.key").is_none());
        Ok(())
    }

    #[test]
    fn test_mutations_do_not_leak() {
        let site = site();
        let first = PageData::new(&site).with_page_metadata(&meta());
        let mut second = first.clone();
        second.put("pagination", Value::from("state"));
        second.set_page_path("about/2");

        assert!(first.get("pagination").is_none());
        assert_eq!(Some("about"), first.get("page.path").and_then(Value::as_str));
        assert_eq!(
            Some("https://example.org/about/2"),
            second.get("page.url").and_then(Value::as_str)
        );
        assert!(PageData::new(&site).get("pagination").is_none());
    }

    #[test]
    fn test_permalink() -> Result<(), serde_yaml::Error> {
        let site = site();
        assert_eq!(None, PageData::new(&site).permalink());
        let data = PageData::new(&site)
            .with_front_matter(serde_yaml::from_str("permalink: custom/out.html")?);
        assert_eq!(Some("custom/out.html"), data.permalink());
        let blank = PageData::new(&site).with_front_matter(serde_yaml::from_str("permalink: ' '")?);
        assert_eq!(None, blank.permalink());
        Ok(())
    }

    #[test]
    fn test_template_value() {
        let mut data = PageData::new(&site()).with_page_metadata(&meta());
        data.put("content", Value::from("<p>hi</p>"));
        match data.to_template_value() {
            TemplateValue::Object(root) => {
                assert!(matches!(root.get("title"), Some(TemplateValue::String(s)) if s == "Site"));
                assert!(matches!(root.get("content"), Some(TemplateValue::String(s)) if s == "<p>hi</p>"));
                match root.get("page") {
                    Some(TemplateValue::Object(page)) => {
                        assert!(matches!(page.get("path"), Some(TemplateValue::String(s)) if s == "about"));
                        assert!(matches!(page.get("title"), Some(TemplateValue::String(s)) if s == "Site"));
                    }
                    _ => panic!("missing page object"),
                }
            }
            _ => panic!("expected an object"),
        }
    }
}
