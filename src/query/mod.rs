pub mod builder;
pub mod filters;
pub mod settings;
pub mod statement;

pub use builder::{GeomQueryBuilder, OutputMode, QueryBuilder, SkeletonQueryBuilder};
pub use filters::{BboxFilter, CompoundFilter, Filter, IdFilter, KeySpec, TagFilter, UserFilter};
pub use settings::{CsvFormat, PayloadFormat, QueryDate, QuerySettings, Setting};
pub use statement::{ElementQuery, ElementType, Statement};
