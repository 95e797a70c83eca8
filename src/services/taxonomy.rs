//! Taxonomy Provider
//!
//! Category → tag-filter mappings and the curated brand pattern table.
//! Readers take an `Arc<Taxonomy>` snapshot; a reload parses the whole file
//! and swaps the snapshot in one write, so no request ever sees a partially
//! updated taxonomy.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::utils::error::{AppError, AppResult};

/// One `(key, value)` tag equality, e.g. `("amenity", "cafe")`.
pub type TagFilter = (String, String);

/// Immutable category and brand tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    categories: IndexMap<String, Vec<TagFilter>>,
    #[serde(default)]
    brands: IndexMap<String, String>,
}

/// On-disk shape; either section may be empty or null.
#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    #[serde(default)]
    categories: Option<IndexMap<String, Vec<TagFilter>>>,
    #[serde(default)]
    brands: Option<IndexMap<String, String>>,
}

const BUILTIN_CATEGORIES: &[(&str, &str, &str)] = &[
    ("convenience", "shop", "convenience"),
    ("cafe", "amenity", "cafe"),
    ("restaurant", "amenity", "restaurant"),
    ("park", "leisure", "park"),
    ("hospital", "amenity", "hospital"),
    ("clinic", "amenity", "clinic"),
    ("pharmacy", "amenity", "pharmacy"),
    ("school", "amenity", "school"),
    ("kindergarten", "amenity", "kindergarten"),
    ("library", "amenity", "library"),
    ("station", "railway", "station"),
    ("attraction", "tourism", "attraction"),
];

const BUILTIN_BRANDS: &[(&str, &str)] = &[
    ("FamilyMart", r"(?i)(Family\s?Mart|ファミリーマート)"),
    ("7-Eleven", r"(?i)(7[-\s]?Eleven|セブン[ー\-]?イレブン)"),
    ("Lawson", r"(?i)(Lawson|ローソン)"),
];

impl Taxonomy {
    pub fn new(
        categories: IndexMap<String, Vec<TagFilter>>,
        brands: IndexMap<String, String>,
    ) -> Self {
        Self { categories, brands }
    }

    /// Tables used when no taxonomy file exists.
    pub fn builtin() -> Self {
        let categories = BUILTIN_CATEGORIES
            .iter()
            .map(|(name, k, v)| (name.to_string(), vec![(k.to_string(), v.to_string())]))
            .collect();
        let brands = BUILTIN_BRANDS
            .iter()
            .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
            .collect();
        Self { categories, brands }
    }

    pub fn from_yaml(content: &str) -> AppResult<Self> {
        let file: Option<TaxonomyFile> = serde_yaml::from_str(content)
            .map_err(|e| AppError::config(format!("taxonomy: {}", e)))?;
        let file = file.unwrap_or(TaxonomyFile {
            categories: None,
            brands: None,
        });
        let mut brands = file.brands.unwrap_or_default();
        brands.retain(|name, pattern| match Regex::new(pattern) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("[taxonomy] dropping brand {}: {}", name, e);
                false
            }
        });
        Ok(Self {
            categories: file.categories.unwrap_or_default(),
            brands,
        })
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Category names in file order; these become the schema enum.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.keys().cloned().collect()
    }

    pub fn category(&self, name: &str) -> Option<&[TagFilter]> {
        self.categories.get(name).map(Vec::as_slice)
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    /// Curated pattern for an exact brand name.
    pub fn brand_pattern(&self, name: &str) -> Option<&str> {
        self.brands.get(name).map(String::as_str)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }

    /// Backend-ready, case-insensitive brand pattern: curated entry if one
    /// exists, the normalized input otherwise.
    pub fn resolve_brand(&self, brand: &str) -> Option<String> {
        brand_regex(&self.brands, brand)
    }
}

/// Compose table lookup with normalization. `None` for a blank brand.
///
/// The returned pattern carries no inline `(?i)` flag (the backend takes
/// case-insensitivity as a filter flag) and has `"` escaped for embedding
/// in a quoted query string.
pub fn brand_regex(table: &IndexMap<String, String>, brand: &str) -> Option<String> {
    let brand = brand.trim();
    if brand.is_empty() {
        return None;
    }
    let pattern = match table.get(brand) {
        Some(curated) => curated.clone(),
        None => normalize_brand(brand),
    };
    Some(quote_safe(strip_inline_flags(&pattern)))
}

const DASH_CLASS: &str = "[-‐‑‒–—―−ー－]";

/// Turn free brand text into a substring pattern: width-fold, whitespace
/// runs to `\s*`, every dash variant to one character class, regex
/// metacharacters escaped.
pub fn normalize_brand(input: &str) -> String {
    let folded: String = input.chars().map(fold_width).collect();
    folded
        .split_whitespace()
        .map(escape_segment)
        .collect::<Vec<_>>()
        .join(r"\s*")
}

/// Full-width ASCII and the ideographic space to their half-width forms.
fn fold_width(c: char) -> char {
    match c {
        '\u{3000}' => ' ',
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        _ => c,
    }
}

fn is_dash(c: char) -> bool {
    matches!(
        c,
        '-' | '‐' | '‑' | '‒' | '–' | '—' | '―' | '−' | 'ー' | '－'
    )
}

fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        if is_dash(c) {
            out.push_str(DASH_CLASS);
        } else if "\\.^$*+?()[]{}|".contains(c) {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_inline_flags(pattern: &str) -> &str {
    pattern.strip_prefix("(?i)").unwrap_or(pattern)
}

fn quote_safe(pattern: &str) -> String {
    pattern.replace('"', "\\\"")
}

struct Loaded {
    taxonomy: Arc<Taxonomy>,
    mtime: Option<SystemTime>,
}

/// Process-wide taxonomy with modification-time based hot reload.
pub struct TaxonomyHandle {
    path: Option<PathBuf>,
    current: RwLock<Loaded>,
}

impl TaxonomyHandle {
    /// Load `path`, or fall back to the built-in tables when it does not
    /// exist yet. A present but malformed file is an error.
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let (taxonomy, mtime) = if path.exists() {
            let taxonomy = Taxonomy::from_file(&path)?;
            tracing::info!(
                "[taxonomy] loaded {} categories, {} brands from {}",
                taxonomy.categories.len(),
                taxonomy.brand_count(),
                path.display()
            );
            (taxonomy, modified(&path))
        } else {
            tracing::warn!(
                "[taxonomy] {} not found, using built-in taxonomy",
                path.display()
            );
            (Taxonomy::builtin(), None)
        };
        Ok(Self {
            path: Some(path),
            current: RwLock::new(Loaded {
                taxonomy: Arc::new(taxonomy),
                mtime,
            }),
        })
    }

    /// Fixed taxonomy with no backing file.
    pub fn fixed(taxonomy: Taxonomy) -> Self {
        Self {
            path: None,
            current: RwLock::new(Loaded {
                taxonomy: Arc::new(taxonomy),
                mtime: None,
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn snapshot(&self) -> Arc<Taxonomy> {
        self.current.read().await.taxonomy.clone()
    }

    /// Re-read the file when `force` is set or its mtime moved forward.
    /// Returns whether a new snapshot was installed. A missing file keeps
    /// the current snapshot.
    pub async fn reload(&self, force: bool) -> AppResult<bool> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }
        let mtime = modified(path);
        {
            let current = self.current.read().await;
            if !force && mtime <= current.mtime {
                return Ok(false);
            }
        }

        let taxonomy = Taxonomy::from_file(path)?;
        let mut current = self.current.write().await;
        tracing::info!(
            "[taxonomy] reloaded {} categories, {} brands",
            taxonomy.categories.len(),
            taxonomy.brand_count()
        );
        *current = Loaded {
            taxonomy: Arc::new(taxonomy),
            mtime,
        };
        Ok(true)
    }

    /// Per-request check. Failures are logged and the previous snapshot kept.
    pub async fn reload_if_changed(&self) {
        if let Err(e) = self.reload(false).await {
            tracing::warn!("[taxonomy] reload failed: {}", e);
        }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
