//! Conductor System
//!
//! Turns a question into an answer: retrieval, planning, tool execution and
//! composition, wrapped in a whole-answer cache.

pub mod cache;
pub mod composer;
pub mod executor;
pub mod pipeline;
pub mod planner;
pub mod query;
pub mod types;

pub use cache::QueryCache;
pub use composer::{eta_phrase, AnswerComposer, Composer, RemoteComposer, RuleComposer};
pub use executor::PlanExecutor;
pub use pipeline::{AnswerEngine, Collaborators, EMPTY_QUERY_ANSWER};
pub use planner::{parse_plan, PlanGenerator, Planner, RemotePlanner, RulePlanner};
pub use types::{Plan, PlanSource, StepState};
