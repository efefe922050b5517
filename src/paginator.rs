//! Splits a collection into fixed-size [`Page`]s. Each page knows its own
//! link and the links of its neighbours, computed with the same
//! [`OutputPathResolver`] the builder uses to write the page.

use crate::file::InputFile;
use crate::resolver::OutputPathResolver;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::sync::Arc;

/// One page of a pagination run.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    /// The contiguous slice of the collection shown on this page.
    pub items: Vec<Value>,

    /// The 1-based number of this page.
    pub current_page: usize,

    pub total_pages: usize,
    pub per_page: usize,

    /// The link to this page.
    pub current: String,

    /// The link to the previous page, absent on the first page.
    pub previous: Option<String>,

    /// The link to the next page, absent on the last page.
    pub next: Option<String>,

    pub first: String,
    pub last: String,

    /// Links to every page of the run, in page order.
    pub pages: Vec<String>,
}

impl Page {
    pub fn has_pages(&self) -> bool {
        self.total_pages > 1
    }

    /// Converts the page into the `pagination` value templates see.
    pub fn to_value(&self) -> Value {
        let link = |l: &Option<String>| match l {
            Some(l) => Value::String(l.clone()),
            None => Value::Null,
        };

        let mut m = Mapping::new();
        m.insert("items".into(), Value::Sequence(self.items.clone()));
        m.insert("currentPage".into(), (self.current_page as u64).into());
        m.insert("totalPages".into(), (self.total_pages as u64).into());
        m.insert("perPage".into(), (self.per_page as u64).into());
        m.insert("current".into(), self.current.clone().into());
        m.insert("previous".into(), link(&self.previous));
        m.insert("next".into(), link(&self.next));
        m.insert("first".into(), self.first.clone().into());
        m.insert("last".into(), self.last.clone().into());
        m.insert(
            "pages".into(),
            Value::Sequence(self.pages.iter().cloned().map(Value::String).collect()),
        );
        m.insert("hasPages".into(), self.has_pages().into());
        Value::Mapping(m)
    }
}

/// Builds [`Page`]s. A [`Paginator`] holds no per-run state, so one instance
/// serves every file of a build.
pub struct Paginator {
    resolver: Arc<dyn OutputPathResolver>,
}

impl Paginator {
    pub fn new(resolver: Arc<dyn OutputPathResolver>) -> Paginator {
        Paginator { resolver }
    }

    /// Chunks `collection` into pages of at most `per_page` items, in
    /// collection order. An empty collection yields a single empty page.
    /// Sequences paginate their elements and mappings their values.
    pub fn paginate(
        &self,
        file: &InputFile,
        name: &str,
        collection: &Value,
        per_page: usize,
    ) -> Result<Vec<Page>> {
        self.paginate_from(file, name, collection, per_page, None)
    }

    /// Like [`Paginator::paginate`], but page 1 is linked as `first_link`
    /// rather than at its resolved location. Used for files whose permalink
    /// moves the first page.
    pub fn paginate_from(
        &self,
        file: &InputFile,
        name: &str,
        collection: &Value,
        per_page: usize,
        first_link: Option<&str>,
    ) -> Result<Vec<Page>> {
        if per_page == 0 {
            return Err(Error::InvalidPerPage("0".to_owned()));
        }

        let items: Vec<&Value> = match collection {
            Value::Sequence(items) => items.iter().collect(),
            Value::Mapping(m) => m.iter().map(|(_, v)| v).collect(),
            _ => return Err(Error::NotACollection(name.to_owned())),
        };

        let mut chunks: Vec<&[&Value]> = items.chunks(per_page).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        let total_pages = chunks.len();

        // pages[0] links to page 1
        let pages: Vec<String> = (1..=total_pages)
            .map(|page| match (page, first_link) {
                (1, Some(link)) => link.to_owned(),
                _ => self.page_link(file, page),
            })
            .collect();

        Ok(chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Page {
                items: chunk.iter().map(|&item| item.clone()).collect(),
                current_page: i + 1,
                total_pages,
                per_page,
                current: pages[i].clone(),
                previous: match i {
                    0 => None,
                    _ => Some(pages[i - 1].clone()),
                },
                next: pages.get(i + 1).cloned(),
                first: pages[0].clone(),
                last: pages[total_pages - 1].clone(),
                pages: pages.clone(),
            })
            .collect())
    }

    fn page_link(&self, file: &InputFile, page: usize) -> String {
        self.resolver
            .locate(
                file.relative_dir(),
                file.filename_without_extension(),
                file.output_extension(),
                page,
            )
            .link
    }
}

/// The result of a pagination operation.
pub type Result<T> = std::result::Result<T, Error>;

/// A misconfigured `pagination` block.
#[derive(Debug, PartialEq)]
pub enum Error {
    /// Returned when the `pagination` block is not a mapping or doesn't name
    /// a collection.
    MissingCollectionKey,

    /// Returned when the named collection doesn't exist in the page data.
    MissingCollection(String),

    /// Returned when the named collection is neither a sequence nor a
    /// mapping.
    NotACollection(String),

    /// Returned for a page size that isn't an integer of at least one.
    InvalidPerPage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingCollectionKey => {
                write!(f, "`pagination` must name a `collection`")
            }
            Error::MissingCollection(name) => {
                write!(f, "pagination collection `{}` does not exist", name)
            }
            Error::NotACollection(name) => {
                write!(f, "pagination collection `{}` is not a list", name)
            }
            Error::InvalidPerPage(per_page) => {
                write!(f, "`perPage` must be an integer of at least 1, found `{}`", per_page)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resolver::{DefaultResolver, PrettyResolver};
    use std::path::Path;

    fn collection(n: usize) -> Value {
        Value::Sequence((0..n as u64).map(Value::from).collect())
    }

    fn paginate(
        resolver: Arc<dyn OutputPathResolver>,
        relative: &str,
        n: usize,
        per_page: usize,
    ) -> Result<Vec<Page>> {
        let root = Path::new("/source");
        let file = InputFile::new(root, &root.join(relative));
        Paginator::new(resolver).paginate(&file, "items", &collection(n), per_page)
    }

    fn sizes(pages: &[Page]) -> Vec<usize> {
        pages.iter().map(|p| p.items.len()).collect()
    }

    #[test]
    fn test_partition() -> Result<()> {
        for (n, per_page) in [(25, 10), (12, 5), (10, 10), (1, 3), (7, 1), (3, 100)] {
            let pages = paginate(Arc::new(DefaultResolver), "list.blade.php", n, per_page)?;
            assert_eq!((n + per_page - 1) / per_page, pages.len());
            let flattened: Vec<Value> = pages.iter().flat_map(|p| p.items.clone()).collect();
            assert_eq!(collection(n), Value::Sequence(flattened));
            for page in &pages[..pages.len() - 1] {
                assert_eq!(per_page, page.items.len());
            }
            let last = &pages[pages.len() - 1];
            assert_eq!(n - per_page * (pages.len() - 1), last.items.len());
            assert!(pages.iter().all(|p| p.total_pages == pages.len()));
        }
        Ok(())
    }

    #[test]
    fn test_twenty_five_by_ten() -> Result<()> {
        let pages = paginate(Arc::new(DefaultResolver), "list.blade.php", 25, 10)?;
        assert_eq!(vec![10, 10, 5], sizes(&pages));
        assert_eq!(3, pages[0].total_pages);
        Ok(())
    }

    #[test]
    fn test_empty_collection_is_one_page() -> Result<()> {
        let pages = paginate(Arc::new(DefaultResolver), "list.blade.php", 0, 10)?;
        assert_eq!(1, pages.len());
        assert!(pages[0].items.is_empty());
        assert_eq!(1, pages[0].total_pages);
        assert!(!pages[0].has_pages());
        assert_eq!(None, pages[0].next);
        Ok(())
    }

    #[test]
    fn test_pretty_links() -> Result<()> {
        let pages = paginate(Arc::new(PrettyResolver), "blog/list.blade.php", 12, 5)?;
        assert_eq!(vec!["blog/list", "blog/list/2", "blog/list/3"], pages[0].pages);
        assert_eq!("blog/list/2", pages[1].current);
        assert_eq!(Some("blog/list".to_owned()), pages[1].previous);
        assert_eq!(Some("blog/list/3".to_owned()), pages[1].next);
        assert_eq!(None, pages[0].previous);
        assert_eq!(None, pages[2].next);
        assert_eq!("blog/list", pages[2].first);
        assert_eq!("blog/list/3", pages[0].last);
        Ok(())
    }

    #[test]
    fn test_default_links() -> Result<()> {
        let pages = paginate(Arc::new(DefaultResolver), "index.blade.php", 3, 2)?;
        assert_eq!(vec!["index.html", "2/index.html"], pages[0].pages);
        Ok(())
    }

    #[test]
    fn test_mapping_collection_keeps_order() -> Result<()> {
        let root = Path::new("/source");
        let file = InputFile::new(root, &root.join("list.blade.php"));
        let value: Value = serde_yaml::from_str("b: 1\na: 2\nc: 3\n").unwrap();
        let pages = Paginator::new(Arc::new(DefaultResolver)).paginate(&file, "m", &value, 2)?;
        assert_eq!(vec![Value::from(1), Value::from(2)], pages[0].items);
        assert_eq!(vec![Value::from(3)], pages[1].items);
        Ok(())
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            Err(Error::InvalidPerPage("0".to_owned())),
            paginate(Arc::new(DefaultResolver), "list.blade.php", 3, 0)
        );
        let root = Path::new("/source");
        let file = InputFile::new(root, &root.join("list.blade.php"));
        assert_eq!(
            Err(Error::NotACollection("title".to_owned())),
            Paginator::new(Arc::new(DefaultResolver)).paginate(
                &file,
                "title",
                &Value::from("x"),
                2
            )
        );
    }

    #[test]
    fn test_first_link_override() -> Result<()> {
        let root = Path::new("/source");
        let file = InputFile::new(root, &root.join("list.blade.php"));
        let pages = Paginator::new(Arc::new(PrettyResolver)).paginate_from(
            &file,
            "items",
            &collection(3),
            1,
            Some("posts"),
        )?;
        assert_eq!(vec!["posts", "list/2", "list/3"], pages[0].pages);
        assert_eq!("posts", pages[0].current);
        assert_eq!(Some("posts".to_owned()), pages[1].previous);
        assert_eq!("posts", pages[2].first);
        assert_eq!("list/3", pages[0].last);
        Ok(())
    }

    #[test]
    fn test_links_are_decoded() -> Result<()> {
        let pages = paginate(Arc::new(PrettyResolver), "a%20b.blade.php", 2, 1)?;
        assert_eq!(vec!["a b", "a b/2"], pages[0].pages);
        Ok(())
    }

    #[test]
    fn test_to_value() -> Result<()> {
        let pages = paginate(Arc::new(PrettyResolver), "list.blade.php", 3, 2)?;
        let value = pages[0].to_value();
        assert_eq!(Some(1), value.get("currentPage").and_then(Value::as_u64));
        assert_eq!(Some(2), value.get("totalPages").and_then(Value::as_u64));
        assert_eq!(Some(true), value.get("hasPages").and_then(Value::as_bool));
        assert_eq!(Some(&Value::Null), value.get("previous"));
        assert_eq!(Some("list/2"), value.get("next").and_then(Value::as_str));
        Ok(())
    }
}
