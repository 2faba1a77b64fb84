//! Repository kinds and source/destination file pairs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

/// Programming language a repository is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProgrammingLanguage {
    /// Python sources (`.py`).
    Python,
    /// TypeScript sources (`.ts`).
    #[strum(serialize = "typescript")]
    #[serde(rename = "typescript")]
    TypeScript,
}

impl ProgrammingLanguage {
    /// Returns the file extension used by this language, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::TypeScript => "ts",
        }
    }
}

/// The repositories taking part in a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RepoKind {
    /// Shared engine package imported by the backend.
    Engine,
    /// Backend service exposing the HTTP API.
    Backend,
    /// Frontend application consuming the API.
    Frontend,
}

impl RepoKind {
    /// Returns the language the repository is written in.
    pub fn language(self) -> ProgrammingLanguage {
        match self {
            Self::Engine | Self::Backend => ProgrammingLanguage::Python,
            Self::Frontend => ProgrammingLanguage::TypeScript,
        }
    }
}

/// A source file in one repository and the file it converts into in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcDstFilePair {
    pub src_repo: RepoKind,
    pub src_root: PathBuf,
    pub src_relpath: PathBuf,
    pub dst_repo: RepoKind,
    pub dst_root: PathBuf,
    pub dst_relpath: PathBuf,
}

impl SrcDstFilePair {
    /// Creates a new pair.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`](crate::ErrorKind::InvalidInput) when both sides
    /// refer to the same repository.
    pub fn new(
        src_repo: RepoKind,
        src_root: impl Into<PathBuf>,
        src_relpath: impl Into<PathBuf>,
        dst_repo: RepoKind,
        dst_root: impl Into<PathBuf>,
        dst_relpath: impl Into<PathBuf>,
    ) -> Result<Self> {
        let pair = Self {
            src_repo,
            src_root: src_root.into(),
            src_relpath: src_relpath.into(),
            dst_repo,
            dst_root: dst_root.into(),
            dst_relpath: dst_relpath.into(),
        };
        pair.validate()?;
        Ok(pair)
    }

    /// Checks that the pair crosses repositories.
    pub fn validate(&self) -> Result<()> {
        if self.src_repo == self.dst_repo {
            return Err(Error::invalid_input().with_message(format!(
                "source and destination repositories must differ, both are '{}'",
                self.src_repo
            )));
        }
        Ok(())
    }

    /// Full path of the source file.
    pub fn src_path(&self) -> PathBuf {
        self.src_root.join(&self.src_relpath)
    }

    /// Full path of the destination file.
    pub fn dst_path(&self) -> PathBuf {
        self.dst_root.join(&self.dst_relpath)
    }

    /// Returns true if the pair converts between the given languages.
    pub fn converts(&self, from: ProgrammingLanguage, to: ProgrammingLanguage) -> bool {
        self.src_repo.language() == from && self.dst_repo.language() == to
    }

    /// Source root directory.
    pub fn src_root(&self) -> &Path {
        &self.src_root
    }

    /// Destination root directory.
    pub fn dst_root(&self) -> &Path {
        &self.dst_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_languages() {
        assert_eq!(RepoKind::Engine.language(), ProgrammingLanguage::Python);
        assert_eq!(RepoKind::Backend.language(), ProgrammingLanguage::Python);
        assert_eq!(RepoKind::Frontend.language(), ProgrammingLanguage::TypeScript);
        assert_eq!(RepoKind::Frontend.language().extension(), "ts");
    }

    #[test]
    fn repo_kind_parses_from_str() {
        assert_eq!("backend".parse::<RepoKind>().ok(), Some(RepoKind::Backend));
        assert_eq!(ProgrammingLanguage::TypeScript.to_string(), "typescript");
    }

    #[test]
    fn pair_rejects_same_repository() {
        let result = SrcDstFilePair::new(
            RepoKind::Backend,
            "/b",
            "app/schemas/user.py",
            RepoKind::Backend,
            "/b",
            "app/schemas/user.ts",
        );
        assert!(result.is_err());
    }

    #[test]
    fn pair_joins_paths() {
        let pair = SrcDstFilePair::new(
            RepoKind::Backend,
            "/b",
            "app/schemas/user.py",
            RepoKind::Frontend,
            "/f",
            "types/user.ts",
        )
        .unwrap();
        assert_eq!(pair.src_path(), PathBuf::from("/b/app/schemas/user.py"));
        assert_eq!(pair.dst_path(), PathBuf::from("/f/types/user.ts"));
        assert!(pair.converts(ProgrammingLanguage::Python, ProgrammingLanguage::TypeScript));
    }
}
