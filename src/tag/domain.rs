//! Core tag domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::Error;

/// The maximum number of characters (grapheme clusters) in a tag.
pub const MAX_TAG_LENGTH: usize = 30;

/// A validated, non-empty tag of at most [MAX_TAG_LENGTH] characters.
///
/// Tags are identified by their exact, case-sensitive text.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a tag name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyParameter] if `name` is empty
    /// after trimming, or an [Error::TagTooLong] if it has more than
    /// [MAX_TAG_LENGTH] characters.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyParameter("tag"))
        } else if name.graphemes(true).count() > MAX_TAG_LENGTH {
            Err(Error::TagTooLong(name.to_owned()))
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a tag name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// a blank tag causes incorrect behaviour but does not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TagName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagName::new(s)
    }
}

impl TryFrom<String> for TagName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TagName::new(&value)
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.0
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
