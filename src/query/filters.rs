//! Filter algebra: leaf clauses and their ordered composition
//!
//! Leaves are immutable. Composition always produces a new
//! [`CompoundFilter`]; the `+` operator is sugar over [`Filter::append`],
//! [`Filter::append_compound`], [`CompoundFilter::append`] and
//! [`CompoundFilter::concat`].

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::errors::{Result, SkywayError};
use crate::models::bbox::Bbox;

/// Tag key with an existence flag, written `key` or `!key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    pub key: String,
    pub exists: bool,
}

impl KeySpec {
    pub fn new(key: impl Into<String>, exists: bool) -> Result<Self> {
        let key = key.into();
        let (key, exists) = if key.starts_with('!') {
            if !exists {
                return Err(SkywayError::construction(format!(
                    "key '{}' is negated twice",
                    key
                )));
            }
            (key[1..].to_string(), false)
        } else {
            (key, exists)
        };

        if key.is_empty() {
            return Err(SkywayError::construction("empty tag key"));
        }
        if key.starts_with('!') {
            return Err(SkywayError::construction(format!(
                "key '!{}' has more than one '!'",
                key
            )));
        }

        Ok(Self { key, exists })
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::new(text, true)
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exists {
            write!(f, "{}", quote_token(&self.key))
        } else {
            write!(f, "!{}", quote_token(&self.key))
        }
    }
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Bare word tokens stay as they are; anything else is written as a
/// double-quoted string literal
fn quote_token(token: &str) -> String {
    let bare = !token.is_empty() && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        token.to_string()
    } else {
        format!("\"{}\"", escape_literal(token))
    }
}

/// Tag predicate on a key and optional values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    key: KeySpec,
    values: Vec<String>,
}

impl TagFilter {
    pub fn new<K, I, V>(key: K, values: I, exists: bool) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Ok(Self {
            key: KeySpec::new(key, exists)?,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// `[key]`, or `[!key]` for a `!`-prefixed key
    pub fn exists(key: impl Into<String>) -> Result<Self> {
        Self::new(key, Vec::<String>::new(), true)
    }

    /// `[!key]`
    pub fn absent(key: impl Into<String>) -> Result<Self> {
        Self::new(key, Vec::<String>::new(), false)
    }

    /// `[key=value]`
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let value: String = value.into();
        Self::new(key, [value], true)
    }

    /// `[key~"^(v1|v2)$"]`
    pub fn any_of<I, V>(key: impl Into<String>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::new(key, values, true)
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn format_values(&self, negated: bool) -> String {
        let bang = if negated { "!" } else { "" };
        match self.values.as_slice() {
            [value] => format!("{}={}", bang, quote_token(value)),
            values => {
                let escaped: Vec<String> = values.iter().map(|v| escape_literal(v)).collect();
                format!("{}~\"^({})$\"", bang, escaped.join("|"))
            }
        }
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return write!(f, "[{}]", self.key);
        }

        let key = quote_token(&self.key.key);
        if self.key.exists {
            write!(f, "[{}{}]", key, self.format_values(false))
        } else {
            write!(f, "[{}][{}{}]", key, key, self.format_values(true))
        }
    }
}

/// Command-line form: `key`, `!key`, `key=value`, `key=v1|v2`, `!key=value`
impl FromStr for TagFilter {
    type Err = SkywayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            None => Self::exists(s),
            Some((key, values)) => {
                let values: Vec<&str> = values.split('|').filter(|v| !v.is_empty()).collect();
                if values.is_empty() {
                    return Err(SkywayError::construction(format!(
                        "tag '{}' has no value after '='",
                        s
                    )));
                }
                Self::new(key, values, true)
            }
        }
    }
}

/// `(id:1,2,3)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFilter {
    ids: Vec<u64>,
}

impl IdFilter {
    pub fn new(id: u64) -> Self {
        Self { ids: vec![id] }
    }

    pub fn many(ids: impl IntoIterator<Item = u64>) -> Result<Self> {
        let ids: Vec<u64> = ids.into_iter().collect();
        if ids.is_empty() {
            return Err(SkywayError::construction("id filter needs at least one id"));
        }
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }
}

impl fmt::Display for IdFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.ids.iter().map(|id| id.to_string()).collect();
        write!(f, "(id:{})", ids.join(","))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BboxFilter {
    bbox: Bbox,
}

impl BboxFilter {
    pub fn new(bbox: Bbox) -> Self {
        Self { bbox }
    }

    pub fn from_tuple(bbox: (f64, f64, f64, f64)) -> Result<Self> {
        Ok(Self::new(Bbox::try_from(bbox)?))
    }

    pub fn bbox(&self) -> Bbox {
        self.bbox
    }
}

impl fmt::Display for BboxFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.bbox)
    }
}

/// Raw clause copied verbatim into the query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    raw: String,
}

impl UserFilter {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl fmt::Display for UserFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Tag(TagFilter),
    Id(IdFilter),
    Bbox(BboxFilter),
    User(UserFilter),
}

impl Filter {
    pub fn append(self, other: impl Into<Filter>) -> CompoundFilter {
        CompoundFilter {
            filters: vec![self, other.into()],
        }
    }

    pub fn append_compound(self, other: CompoundFilter) -> CompoundFilter {
        let mut filters = Vec::with_capacity(other.len() + 1);
        filters.push(self);
        filters.extend(other.filters);
        CompoundFilter { filters }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Tag(t) => write!(f, "{}", t),
            Filter::Id(i) => write!(f, "{}", i),
            Filter::Bbox(b) => write!(f, "{}", b),
            Filter::User(u) => write!(f, "{}", u),
        }
    }
}

impl From<TagFilter> for Filter {
    fn from(f: TagFilter) -> Self {
        Filter::Tag(f)
    }
}

impl From<IdFilter> for Filter {
    fn from(f: IdFilter) -> Self {
        Filter::Id(f)
    }
}

impl From<BboxFilter> for Filter {
    fn from(f: BboxFilter) -> Self {
        Filter::Bbox(f)
    }
}

impl From<UserFilter> for Filter {
    fn from(f: UserFilter) -> Self {
        Filter::User(f)
    }
}

impl From<&str> for Filter {
    fn from(raw: &str) -> Self {
        Filter::User(UserFilter::new(raw))
    }
}

/// Ordered sequence of filters, emitted back to back
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundFilter {
    filters: Vec<Filter>,
}

impl CompoundFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Single-shot assignment; clear first to replace a non-empty set
    pub fn set_filters(&mut self, filters: Vec<Filter>) -> Result<()> {
        if !self.filters.is_empty() {
            return Err(SkywayError::construction(
                "clear existing filters before assignment",
            ));
        }
        self.filters = filters;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn add_filter(&mut self, filter: impl Into<Filter>) {
        self.filters.push(filter.into());
    }

    pub fn extend(&mut self, other: CompoundFilter) {
        self.filters.extend(other.filters);
    }

    pub fn append(mut self, filter: impl Into<Filter>) -> CompoundFilter {
        self.filters.push(filter.into());
        self
    }

    pub fn concat(mut self, other: CompoundFilter) -> CompoundFilter {
        self.filters.extend(other.filters);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }
}

impl fmt::Display for CompoundFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for filter in &self.filters {
            write!(f, "{}", filter)?;
        }
        Ok(())
    }
}

impl From<Filter> for CompoundFilter {
    fn from(filter: Filter) -> Self {
        Self {
            filters: vec![filter],
        }
    }
}

impl FromIterator<Filter> for CompoundFilter {
    fn from_iter<T: IntoIterator<Item = Filter>>(iter: T) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CompoundFilter {
    type Item = Filter;
    type IntoIter = std::vec::IntoIter<Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.into_iter()
    }
}

impl<'a> IntoIterator for &'a CompoundFilter {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

impl Add<Filter> for Filter {
    type Output = CompoundFilter;

    fn add(self, rhs: Filter) -> CompoundFilter {
        self.append(rhs)
    }
}

impl Add<CompoundFilter> for Filter {
    type Output = CompoundFilter;

    fn add(self, rhs: CompoundFilter) -> CompoundFilter {
        self.append_compound(rhs)
    }
}

impl Add<&str> for Filter {
    type Output = CompoundFilter;

    fn add(self, rhs: &str) -> CompoundFilter {
        self.append(rhs)
    }
}

impl Add<Filter> for CompoundFilter {
    type Output = CompoundFilter;

    fn add(self, rhs: Filter) -> CompoundFilter {
        self.append(rhs)
    }
}

impl Add<CompoundFilter> for CompoundFilter {
    type Output = CompoundFilter;

    fn add(self, rhs: CompoundFilter) -> CompoundFilter {
        self.concat(rhs)
    }
}

impl Add<&str> for CompoundFilter {
    type Output = CompoundFilter;

    fn add(self, rhs: &str) -> CompoundFilter {
        self.append(rhs)
    }
}

// A string on the left becomes a user filter, then the normal add runs.
impl Add<Filter> for &str {
    type Output = CompoundFilter;

    fn add(self, rhs: Filter) -> CompoundFilter {
        Filter::from(self).append(rhs)
    }
}

impl Add<CompoundFilter> for &str {
    type Output = CompoundFilter;

    fn add(self, rhs: CompoundFilter) -> CompoundFilter {
        Filter::from(self).append_compound(rhs)
    }
}

impl std::ops::AddAssign<Filter> for CompoundFilter {
    fn add_assign(&mut self, rhs: Filter) {
        self.add_filter(rhs);
    }
}

impl std::ops::AddAssign<CompoundFilter> for CompoundFilter {
    fn add_assign(&mut self, rhs: CompoundFilter) {
        self.extend(rhs);
    }
}
