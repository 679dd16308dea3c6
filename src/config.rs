//! Per-type mapping policy.
use serde::Deserialize;

/// Declared visibility of a host field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// Which field visibilities take part in discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<Visibility>")]
pub struct VisibilityFilter {
    public: bool,
    protected: bool,
    private: bool,
}

impl VisibilityFilter {
    pub const PUBLIC: Self = Self { public: true, protected: false, private: false };
    pub const ALL: Self = Self { public: true, protected: true, private: true };

    pub fn with(mut self, vis: Visibility) -> Self {
        match vis {
            Visibility::Public => self.public = true,
            Visibility::Protected => self.protected = true,
            Visibility::Private => self.private = true,
        }
        self
    }

    pub fn allows(&self, vis: Visibility) -> bool {
        match vis {
            Visibility::Public => self.public,
            Visibility::Protected => self.protected,
            Visibility::Private => self.private,
        }
    }
}

impl Default for VisibilityFilter {
    fn default() -> Self { Self::PUBLIC }
}

impl From<Vec<Visibility>> for VisibilityFilter {
    fn from(list: Vec<Visibility>) -> Self {
        let none = Self { public: false, protected: false, private: false };
        list.into_iter().fold(none, Self::with)
    }
}

/// Mapping policy attached to one target type.
///
/// A type that wants to "inherit" another type's policy starts from that
/// type's config and overrides what differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperConfig {
    /// Leave absent required fields unset instead of failing `create`.
    pub ignore_missing: bool,
    /// Fields without an alias marker map from their own name.
    /// When off, only fields carrying the marker are discovered.
    pub allow_implicit_keys: bool,
    pub visibility: VisibilityFilter,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            ignore_missing: false,
            allow_implicit_keys: true,
            visibility: VisibilityFilter::PUBLIC,
        }
    }
}

impl MapperConfig {
    pub fn ignore_missing(self, on: bool) -> Self { Self { ignore_missing: on, ..self } }
    pub fn allow_implicit_keys(self, on: bool) -> Self { Self { allow_implicit_keys: on, ..self } }
    pub fn visibility(self, visibility: VisibilityFilter) -> Self { Self { visibility, ..self } }
}
