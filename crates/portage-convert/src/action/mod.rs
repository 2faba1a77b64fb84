//! Conversion of frontend API clients into Next.js server actions.
//!
//! Every `lib/backend-api/**/*.ts` client module becomes an
//! `actions/backend-api/**/*.ts` server action module. Clients generated
//! earlier in the same run are used even when they were not written.

mod converter;
mod planner;
mod prompt;
mod workflow;

pub use converter::{FileActionConverter, ServerActionCode};
pub use planner::{ActionFileTask, ActionRequest, ProjectActionPlanner, plan_action_files};
pub use workflow::project_action_graph;
