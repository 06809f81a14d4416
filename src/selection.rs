//! Which archive entries an import run should process.

use serde::{Deserialize, Serialize};

use crate::path::file_name;
use crate::zip::ZipFileEntry;

/// One entry picked for import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Full path of the entry inside the archive.
    pub archive_path: String,
    /// Human readable label, used in progress output.
    #[serde(default)]
    pub label: String,
    /// Extension the caller expects; informational only, content decides.
    #[serde(default)]
    pub declared_extension: Option<String>,
}

impl Selection {
    pub fn new(archive_path: impl Into<String>) -> Self {
        let archive_path = archive_path.into();
        let declared_extension = file_name(&archive_path)
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string());
        Self {
            label: file_name(&archive_path).to_string(),
            archive_path,
            declared_extension,
        }
    }
}

/// How entries are picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selections {
    /// An ordered list of explicitly chosen entries.
    Explicit(Vec<Selection>),
    /// Every file whose path contains `fragment` and, when given, whose last
    /// extension equals `extension` exactly.
    Prefix {
        fragment: String,
        extension: Option<String>,
    },
}

impl Selections {
    /// Expand into an ordered list against the archive's entries.
    ///
    /// Explicit lists are returned as given, including paths the archive does
    /// not contain; the pipeline reports those as missing.
    pub fn resolve(&self, entries: &[ZipFileEntry]) -> Vec<Selection> {
        match self {
            Selections::Explicit(list) => list.clone(),
            Selections::Prefix {
                fragment,
                extension,
            } => entries
                .iter()
                .filter(|e| !e.is_directory && e.file_name.contains(fragment.as_str()))
                .filter(|e| match extension {
                    Some(ext) => e.file_name.rsplit('.').next() == Some(ext.as_str()),
                    None => true,
                })
                .map(|e| Selection::new(e.file_name.clone()))
                .collect(),
        }
    }

    /// Build an explicit selection from glob patterns.
    ///
    /// With no include patterns every file is selected. A pattern without
    /// wildcards matches the full path or the bare file name. Exclusions
    /// match on substring or glob.
    pub fn from_patterns(entries: &[ZipFileEntry], include: &[String], exclude: &[String]) -> Self {
        let list = entries
            .iter()
            .filter(|e| !e.is_directory)
            .filter(|e| {
                include.is_empty()
                    || include.iter().any(|p| {
                        if has_glob_chars(p) {
                            glob_match(p, &e.file_name)
                        } else {
                            e.file_name == *p || e.base_name() == p
                        }
                    })
            })
            .filter(|e| {
                !exclude
                    .iter()
                    .any(|x| e.file_name.contains(x.as_str()) || glob_match(x, &e.file_name))
            })
            .map(|e| Selection::new(e.file_name.clone()))
            .collect();
        Selections::Explicit(list)
    }
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Glob matching with `*` (any run of characters) and `?` (one character).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // Iterative matcher with single-star backtracking.
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some('?') => {
                p += 1;
                t += 1;
            }
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}
