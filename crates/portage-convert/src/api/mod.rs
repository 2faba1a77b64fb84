//! Conversion of backend endpoint functions into frontend API clients.
//!
//! Every function of an `app/api/v1/endpoints` router becomes its own
//! `lib/backend-api/<router>/<function>.ts` module. Functions are sent to the
//! model one at a time, as a bare signature or together with the classes
//! their parameters are annotated with.

mod converter;
mod planner;
mod prompt;
mod workflow;

pub use converter::{FrontendCode, FunctionApiConverter};
pub use planner::{
    ApiFilePlanner, ApiFileTask, FunctionTask, ProjectApiPlanner, plan_api_files, plan_functions,
};
pub use workflow::{file_api_graph, project_api_graph};
