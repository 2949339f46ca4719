//! Tags for conditional output
//!
//! A tag is a colon-separated list of words (`SEGMENT:PARTS`). Tagged
//! contributions end with ` %! TAG`; a tag filter matches a contribution
//! when the filter word appears among the contribution's tag words.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tag(String);

impl Tag {
    pub fn new(text: impl Into<String>) -> Self {
        Tag(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual words of the tag
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(':').filter(|word| !word.is_empty())
    }

    /// True when every word of `filter` appears in this tag
    pub fn matches(&self, filter: &Tag) -> bool {
        filter
            .words()
            .all(|wanted| self.words().any(|word| word == wanted))
    }

    /// Join two tags, keeping word order and dropping duplicates
    pub fn append(&self, other: &Tag) -> Tag {
        let mut words: Vec<&str> = self.words().collect();
        for word in other.words() {
            if !words.contains(&word) {
                words.push(word);
            }
        }
        Tag(words.join(":"))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Tag {
    fn from(text: &str) -> Self {
        Tag::new(text)
    }
}
