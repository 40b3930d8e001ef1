//! Element selection statements and their set combinations

use std::fmt;

use super::filters::{CompoundFilter, Filter, TagFilter};
use crate::errors::{Result, SkywayError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElementType {
    Node,
    Way,
    Relation,
    #[default]
    Nwr,
}

impl ElementType {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "rel" | "relation" => Ok(Self::Relation),
            "nwr" => Ok(Self::Nwr),
            other => Err(SkywayError::construction(format!(
                "unknown element type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "rel",
            Self::Nwr => "nwr",
        };
        f.write_str(s)
    }
}

/// `<type><filters>;`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementQuery {
    element_type: ElementType,
    filters: CompoundFilter,
}

impl ElementQuery {
    pub fn new(element_type: ElementType) -> Self {
        Self {
            element_type,
            filters: CompoundFilter::new(),
        }
    }

    pub fn nwr() -> Self {
        Self::new(ElementType::Nwr)
    }

    pub fn with_filters(mut self, filters: CompoundFilter) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn add_tagfilter(&mut self, filter: TagFilter) {
        self.filters.add_filter(filter);
    }

    pub fn add_filter(&mut self, filter: impl Into<Filter>) {
        self.filters.add_filter(filter);
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn filters(&self) -> &CompoundFilter {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut CompoundFilter {
        &mut self.filters
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{};", self.element_type, self.filters)
    }
}

/// A statement of the query body
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Element(ElementQuery),
    /// `(a;b;);`
    Union(Vec<Statement>),
    /// `(a; - b;);`
    Difference(Box<Statement>, Box<Statement>),
}

impl Statement {
    pub fn union(self, other: impl Into<Statement>) -> Statement {
        match self {
            Statement::Union(mut members) => {
                members.push(other.into());
                Statement::Union(members)
            }
            first => Statement::Union(vec![first, other.into()]),
        }
    }

    pub fn difference(self, other: impl Into<Statement>) -> Statement {
        Statement::Difference(Box::new(self), Box::new(other.into()))
    }

    /// Element query of this statement, if it is a plain one
    pub fn as_element_mut(&mut self) -> Option<&mut ElementQuery> {
        match self {
            Statement::Element(e) => Some(e),
            _ => None,
        }
    }

    fn body(&self) -> String {
        match self {
            Statement::Element(e) => e.to_string(),
            Statement::Union(members) => {
                let inner: String = members.iter().map(|m| m.body()).collect();
                format!("({});", inner)
            }
            Statement::Difference(minuend, subtrahend) => format!(
                "({} - {});",
                minuend.body(),
                subtrahend.body()
            ),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body())
    }
}

impl From<ElementQuery> for Statement {
    fn from(e: ElementQuery) -> Self {
        Statement::Element(e)
    }
}

impl std::ops::Add for Statement {
    type Output = Statement;

    fn add(self, rhs: Statement) -> Statement {
        self.union(rhs)
    }
}

impl std::ops::Sub for Statement {
    type Output = Statement;

    fn sub(self, rhs: Statement) -> Statement {
        self.difference(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filters::BboxFilter;

    fn tagged(element_type: ElementType, key: &str, value: &str) -> Statement {
        let mut q = ElementQuery::new(element_type);
        q.add_tagfilter(TagFilter::eq(key, value).unwrap());
        q.into()
    }

    #[test]
    fn test_nwr_statement() {
        let mut q = ElementQuery::nwr();
        q.add_tagfilter(TagFilter::eq("amenity", "school").unwrap());
        q.add_filter(BboxFilter::from_tuple((1.0, 2.0, 3.0, 4.0)).unwrap());
        assert_eq!(q.to_string(), "nwr[amenity=school](1.00,2.00,3.00,4.00);");
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(ElementQuery::new(ElementType::Way).to_string(), "way;");
    }

    #[test]
    fn test_contradictory_filters_pass_through() {
        let mut q = ElementQuery::nwr();
        q.add_tagfilter(TagFilter::exists("name").unwrap());
        q.add_tagfilter(TagFilter::absent("name").unwrap());
        assert_eq!(q.to_string(), "nwr[name][!name];");
    }

    #[test]
    fn test_union_flattens_left() {
        let u = tagged(ElementType::Node, "a", "1")
            .union(tagged(ElementType::Way, "a", "1"))
            .union(tagged(ElementType::Relation, "a", "1"));
        assert_eq!(u.to_string(), "(node[a=1];way[a=1];rel[a=1];);");
        match u {
            Statement::Union(members) => assert_eq!(members.len(), 3),
            _ => panic!("Expected Union"),
        }
    }

    #[test]
    fn test_difference() {
        let d = tagged(ElementType::Way, "highway", "primary")
            - tagged(ElementType::Way, "access", "private");
        assert_eq!(
            d.to_string(),
            "(way[highway=primary]; - way[access=private];);"
        );
    }

    #[test]
    fn test_nested_sets() {
        let u = tagged(ElementType::Node, "a", "1") + tagged(ElementType::Node, "b", "2");
        let d = u - tagged(ElementType::Node, "c", "3");
        assert_eq!(d.to_string(), "((node[a=1];node[b=2];); - node[c=3];);");
    }

    #[test]
    fn test_element_type_parse() {
        assert_eq!(ElementType::parse("relation").unwrap(), ElementType::Relation);
        assert_eq!(ElementType::parse("REL").unwrap().to_string(), "rel");
        assert!(ElementType::parse("area").is_err());
    }
}
