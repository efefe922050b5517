//! Splits a source file into its YAML front matter and its body.
//!
//! ```md
//! ---
//! title: Hello, world!
//! pagination:
//!   collection: posts
//!   perPage: 5
//! ---
//! # Hello
//! ```
//!
//! A file that doesn't begin with the `---` fence has no front matter; its
//! whole content is the body.

use serde_yaml::{Mapping, Value};
use std::fmt;

const FENCE: &str = "---";

/// The parsed front matter and the remaining body of a source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrontMatter {
    pub data: Mapping,
    pub body: String,
}

impl FrontMatter {
    /// Reports whether the front matter declares `key` at the top level.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(&Value::String(key.to_owned()))
    }
}

/// Parses `input` into [`FrontMatter`].
pub fn parse(input: &str) -> Result<FrontMatter> {
    let (yaml_start, yaml_stop, body_start) = match frontmatter_indices(input)? {
        Some(indices) => indices,
        None => {
            return Ok(FrontMatter {
                data: Mapping::new(),
                body: input.to_owned(),
            })
        }
    };

    let yaml = &input[yaml_start..yaml_stop];
    if yaml.trim().is_empty() {
        return Ok(FrontMatter {
            data: Mapping::new(),
            body: input[body_start..].to_owned(),
        });
    }

    let data = match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Mapping::new(),
        Value::Mapping(m) => m,
        _ => return Err(Error::NotAMapping),
    };

    Ok(FrontMatter {
        data,
        body: input[body_start..].to_owned(),
    })
}

// Returns `(yaml_start, yaml_stop, body_start)`, or `None` when the input has
// no opening fence. Both fences must sit on their own line.
fn frontmatter_indices(input: &str) -> Result<Option<(usize, usize, usize)>> {
    let first_line_end = input.find('\n').unwrap_or(input.len());
    if input[..first_line_end].trim_end() != FENCE {
        return Ok(None);
    }

    let yaml_start = (first_line_end + 1).min(input.len());
    let mut offset = yaml_start;
    for line in input[yaml_start..].split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok(Some((yaml_start, offset, offset + line.len())));
        }
        offset += line.len();
    }
    Err(Error::MissingEndFence)
}

/// The result of a front matter parse.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing front matter.
#[derive(Debug)]
pub enum Error {
    /// Returned when the opening fence was found but the closing one was
    /// missing.
    MissingEndFence,

    /// Returned when the front matter is valid YAML but not a mapping.
    NotAMapping,

    /// Returned when there was an error parsing the front matter as YAML.
    DeserializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingEndFence => write!(f, "Missing closing `---`"),
            Error::NotAMapping => write!(f, "Front matter must be a YAML mapping"),
            Error::DeserializeYaml(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingEndFence => None,
            Error::NotAMapping => None,
            Error::DeserializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() -> Result<()> {
        let fm = parse("---\ntitle: Hello\npagination:\n  perPage: 5\n---\n# Body\n")?;
        assert!(fm.contains_key("title"));
        assert!(fm.contains_key("pagination"));
        assert!(!fm.contains_key("permalink"));
        assert_eq!("# Body\n", fm.body);
        Ok(())
    }

    #[test]
    fn test_no_front_matter() -> Result<()> {
        let fm = parse("# Just a body\n---\n")?;
        assert!(fm.data.is_empty());
        assert_eq!("# Just a body\n---\n", fm.body);
        Ok(())
    }

    #[test]
    fn test_empty_front_matter() -> Result<()> {
        let fm = parse("---\n---\nbody")?;
        assert!(fm.data.is_empty());
        assert_eq!("body", fm.body);
        Ok(())
    }

    #[test]
    fn test_crlf_fences() -> Result<()> {
        let fm = parse("---\r\ntitle: x\r\n---\r\nbody")?;
        assert!(fm.contains_key("title"));
        assert_eq!("body", fm.body);
        Ok(())
    }

    #[test]
    fn test_missing_end_fence() {
        assert!(matches!(parse("---\ntitle: x\n"), Err(Error::MissingEndFence)));
    }

    #[test]
    fn test_not_a_mapping() {
        assert!(matches!(parse("---\n- a\n- b\n---\n"), Err(Error::NotAMapping)));
    }
}
