//! Full Overpass-QL programs: settings, statements, output directive

use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::debug;

use super::filters::{BboxFilter, Filter, TagFilter};
use super::settings::{PayloadFormat, QuerySettings};
use super::statement::{ElementQuery, ElementType, Statement};
use crate::errors::{Result, SkywayError};
use crate::models::bbox::Bbox;
use crate::models::element::OverpassResponse;
use crate::overpass::client::OverpassClient;

const SKELETON_DEFAULT_TIMEOUT: u32 = 25;

/// Trailing `out` directive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// `out geom;`
    Geom,
    /// `out skel qt;`
    SkeletonQt,
    /// `out;>;out skel qt;`: full elements, then the skeleton of their members
    RecurseSkeleton,
    /// `out body;`
    #[default]
    Body,
    /// `out tags;`
    Tags,
    /// `out count;`
    Count,
}

impl OutputMode {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "geom" => Ok(Self::Geom),
            "skel" => Ok(Self::SkeletonQt),
            "recurse" => Ok(Self::RecurseSkeleton),
            "body" => Ok(Self::Body),
            "tags" => Ok(Self::Tags),
            "count" => Ok(Self::Count),
            other => Err(SkywayError::construction(format!(
                "unknown output mode '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Geom => "out geom;",
            Self::SkeletonQt => "out skel qt;",
            Self::RecurseSkeleton => "out;>;out skel qt;",
            Self::Body => "out body;",
            Self::Tags => "out tags;",
            Self::Count => "out count;",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    settings: QuerySettings,
    statements: Vec<Statement>,
    output: OutputMode,
}

impl QueryBuilder {
    pub fn new(settings: QuerySettings) -> Self {
        Self {
            settings,
            statements: Vec::new(),
            output: OutputMode::default(),
        }
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_statement(mut self, statement: impl Into<Statement>) -> Self {
        self.push_statement(statement);
        self
    }

    pub fn push_statement(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
    }

    /// Add a filter to the first plain element statement, creating an
    /// `nwr` statement when there is none
    pub fn add_filter(&mut self, filter: impl Into<Filter>) {
        let filter = filter.into();
        if let Some(element) = self
            .statements
            .iter_mut()
            .find_map(|s| s.as_element_mut())
        {
            element.add_filter(filter);
            return;
        }

        let mut element = ElementQuery::nwr();
        element.add_filter(filter);
        self.statements.push(element.into());
    }

    pub fn add_tagfilter(&mut self, filter: TagFilter) {
        self.add_filter(filter);
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut QuerySettings {
        &mut self.settings
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    pub fn set_output(&mut self, output: OutputMode) {
        self.output = output;
    }

    /// Format the server will answer in; Overpass defaults to XML
    pub fn payload_format(&self) -> PayloadFormat {
        self.settings
            .payload_format()
            .cloned()
            .unwrap_or(PayloadFormat::Xml)
    }

    pub fn to_query(&self) -> String {
        self.to_string()
    }

    /// Send the query and decode the answer
    pub fn request(&self, client: &OverpassClient) -> Result<OverpassResponse> {
        let query = self.to_query();
        debug!(statements = self.statements.len(), "Requesting Overpass query");
        client.send(&query, &self.payload_format())
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.settings)?;
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        write!(f, "{}", self.output)
    }
}

/// JSON query over one `nwr` statement with `out geom;`
#[derive(Debug, Clone, PartialEq)]
pub struct GeomQueryBuilder {
    inner: QueryBuilder,
}

impl GeomQueryBuilder {
    pub fn new(bbox: Option<Bbox>) -> Self {
        let mut settings = QuerySettings::new().with_payload_format(PayloadFormat::Json);
        settings.set_bbox(bbox);

        let inner = QueryBuilder::new(settings)
            .with_statement(ElementQuery::nwr())
            .with_output(OutputMode::Geom);

        Self { inner }
    }

    pub fn into_inner(self) -> QueryBuilder {
        self.inner
    }
}

impl Deref for GeomQueryBuilder {
    type Target = QueryBuilder;

    fn deref(&self) -> &QueryBuilder {
        &self.inner
    }
}

impl DerefMut for GeomQueryBuilder {
    fn deref_mut(&mut self) -> &mut QueryBuilder {
        &mut self.inner
    }
}

impl fmt::Display for GeomQueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

/// Union of one tag filter over several element types, answered with the
/// elements followed by the skeleton of everything they reference
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonQueryBuilder {
    inner: QueryBuilder,
}

impl SkeletonQueryBuilder {
    /// One clause per `(element type, tag filter)` pair, all united
    pub fn new(selections: &[(ElementType, TagFilter)], aoi: Option<Bbox>) -> Result<Self> {
        let ((first_type, first_filter), rest) = selections
            .split_first()
            .ok_or_else(|| SkywayError::construction("skeleton query needs an element type"))?;

        let select = |element_type: ElementType, filter: &TagFilter| -> Statement {
            let mut element = ElementQuery::new(element_type);
            element.add_tagfilter(filter.clone());
            if let Some(aoi) = aoi {
                element.add_filter(BboxFilter::new(aoi));
            }
            element.into()
        };

        let union = rest.iter().fold(
            Statement::Union(vec![select(*first_type, first_filter)]),
            |acc, (element_type, filter)| acc.union(select(*element_type, filter)),
        );

        let settings = QuerySettings::new()
            .with_payload_format(PayloadFormat::Json)
            .with_timeout(SKELETON_DEFAULT_TIMEOUT);

        let inner = QueryBuilder::new(settings)
            .with_statement(union)
            .with_output(OutputMode::RecurseSkeleton);

        Ok(Self { inner })
    }

    /// The same tag filter on every element type
    pub fn uniform(elements: &[ElementType], filter: TagFilter, aoi: Option<Bbox>) -> Result<Self> {
        let selections: Vec<(ElementType, TagFilter)> = elements
            .iter()
            .map(|element_type| (*element_type, filter.clone()))
            .collect();
        Self::new(&selections, aoi)
    }

    /// Railway skeleton over node, way and relation
    pub fn railways(aoi: Option<Bbox>) -> Result<Self> {
        Self::uniform(
            &[ElementType::Node, ElementType::Way, ElementType::Relation],
            TagFilter::eq("railway", "rail")?,
            aoi,
        )
    }

    pub fn into_inner(self) -> QueryBuilder {
        self.inner
    }
}

impl Deref for SkeletonQueryBuilder {
    type Target = QueryBuilder;

    fn deref(&self) -> &QueryBuilder {
        &self.inner
    }
}

impl DerefMut for SkeletonQueryBuilder {
    fn deref_mut(&mut self) -> &mut QueryBuilder {
        &mut self.inner
    }
}

impl fmt::Display for SkeletonQueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filters::IdFilter;

    #[test]
    fn test_geom_query_end_to_end() {
        let bbox = Bbox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let mut q = GeomQueryBuilder::new(Some(bbox));
        q.add_tagfilter(TagFilter::eq("amenity", "school").unwrap());
        assert_eq!(
            q.to_query(),
            "[out:json][bbox:1.00,2.00,3.00,4.00];nwr[amenity=school];out geom;"
        );
    }

    #[test]
    fn test_geom_query_without_bbox() {
        let q = GeomQueryBuilder::new(None);
        assert_eq!(q.to_string(), "[out:json];nwr;out geom;");
    }

    #[test]
    fn test_settings_mutation_after_construction() {
        let mut q = GeomQueryBuilder::new(None);
        q.settings_mut().set_timeout(Some(60));
        q.add_tagfilter(TagFilter::eq("amenity", "school").unwrap());
        q.add_filter(BboxFilter::from_tuple((1.0, 2.0, 3.0, 4.0)).unwrap());
        assert_eq!(
            q.to_string(),
            "[out:json][timeout:60];nwr[amenity=school](1.00,2.00,3.00,4.00);out geom;"
        );
    }

    #[test]
    fn test_add_filter_creates_nwr() {
        let mut q = QueryBuilder::new(QuerySettings::new());
        q.add_filter(IdFilter::new(5));
        assert_eq!(q.to_string(), "nwr(id:5);out body;");
    }

    #[test]
    fn test_add_filter_skips_sets() {
        let union = Statement::from(ElementQuery::new(ElementType::Node))
            .union(ElementQuery::new(ElementType::Way));
        let mut q = QueryBuilder::new(QuerySettings::new())
            .with_statement(union)
            .with_statement(ElementQuery::new(ElementType::Relation))
            .with_output(OutputMode::Tags);
        q.add_tagfilter(TagFilter::exists("name").unwrap());
        assert_eq!(q.to_string(), "(node;way;);rel[name];out tags;");
    }

    #[test]
    fn test_empty_builder() {
        let q = QueryBuilder::new(QuerySettings::new().with_timeout(5))
            .with_output(OutputMode::Count);
        assert_eq!(q.to_string(), "[timeout:5];out count;");
    }

    #[test]
    fn test_skeleton_query() {
        let q = SkeletonQueryBuilder::railways(Some(Bbox::new(1.0, 2.0, 3.0, 4.0).unwrap()))
            .unwrap();
        assert_eq!(
            q.to_string(),
            "[out:json][timeout:25];(node[railway=rail](1.00,2.00,3.00,4.00);\
             way[railway=rail](1.00,2.00,3.00,4.00);\
             rel[railway=rail](1.00,2.00,3.00,4.00););out;>;out skel qt;"
        );
    }

    #[test]
    fn test_skeleton_needs_elements() {
        let err = SkeletonQueryBuilder::uniform(&[], TagFilter::exists("railway").unwrap(), None)
            .unwrap_err();
        assert!(matches!(err, SkywayError::Construction(_)));
        assert!(SkeletonQueryBuilder::new(&[], None).is_err());
    }

    #[test]
    fn test_skeleton_query_per_element_tags() {
        let q = SkeletonQueryBuilder::new(
            &[
                (ElementType::Node, TagFilter::eq("railway", "station").unwrap()),
                (ElementType::Way, TagFilter::eq("railway", "rail").unwrap()),
                (ElementType::Relation, TagFilter::eq("route", "train").unwrap()),
            ],
            None,
        )
        .unwrap();
        assert_eq!(
            q.to_string(),
            "[out:json][timeout:25];(node[railway=station];way[railway=rail];\
             rel[route=train];);out;>;out skel qt;"
        );
    }

    #[test]
    fn test_payload_format_default_is_xml() {
        let q = QueryBuilder::new(QuerySettings::new());
        assert_eq!(q.payload_format(), PayloadFormat::Xml);
        assert_eq!(GeomQueryBuilder::new(None).payload_format(), PayloadFormat::Json);
    }

    #[test]
    fn test_output_mode_parse() {
        assert_eq!(OutputMode::parse("skel").unwrap().to_string(), "out skel qt;");
        assert!(OutputMode::parse("meta").is_err());
    }
}
