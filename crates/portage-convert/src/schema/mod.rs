//! Conversion of backend schema modules into frontend type declarations.
//!
//! Every `app/schemas/**/*.py` module of the backend becomes a `types/**/*.ts`
//! module of the frontend. The import block of a module is rewritten
//! deterministically; the remainder is cut into segments that are converted
//! by the model one by one and joined back in order.

mod converter;
mod planner;
mod prompt;
mod workflow;

pub use converter::{
    ConvertedSegment, SchemaImportConverter, SchemaSegment, SchemaSplitter,
    SegmentSchemaConverter, SplitSchemaFile,
};
pub use planner::{ProjectSchemaPlanner, plan_schema_files};
pub use workflow::{file_schema_graph, project_schema_graph};
