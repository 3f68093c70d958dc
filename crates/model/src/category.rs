use crate::error::{ErrorKind, Result};
use derive_more::Display;
use std::str::FromStr;

/// One of the two published catalog categories.
///
/// Each category has its own shard directory, snapshot artifact, and
/// manifest entry list; builds and syncs for different categories share no
/// mutable state.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    #[display("singers")]
    Singers,
    #[display("softwares")]
    Softwares,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Singers, Category::Softwares];

    /// Shard directory name under the data root, and artifact directory
    /// name under the versioned output root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Singers => "singers",
            Category::Softwares => "softwares",
        }
    }

    /// The `kind` tag carried in the snapshot envelope.
    pub fn kind(self) -> &'static str {
        match self {
            Category::Singers => "singers-all",
            Category::Softwares => "softwares-all",
        }
    }

    /// Canonical artifact file name, relative to the versioned root.
    pub fn artifact_file(self) -> &'static str {
        match self {
            Category::Singers => "singers/all.json",
            Category::Softwares => "softwares/all.json",
        }
    }
}

impl FromStr for Category {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "singer" | "singers" => Ok(Category::Singers),
            "software" | "softwares" => Ok(Category::Softwares),
            _ => exn::bail!(ErrorKind::UnknownCategory(s.to_string())),
        }
    }
}
