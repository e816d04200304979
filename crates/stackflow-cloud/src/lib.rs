//! stackflow resource graph
//!
//! Provider-neutral pieces of stack synthesis: the resource graph, the
//! CloudFormation template it renders to, change plans between two
//! templates, and the on-disk output / lookup-context stores.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 stackflow CLI                    │
//! │        (synth / validate / diff / lookup)        │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                stackflow-aws                     │
//! │   ApplicationStack builder, tags, EC2 lookup     │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stackflow-cloud                    │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │ResourceGraph │─▶│   Template   │──▶ Plan      │
//! │  └──────────────┘  └──────────────┘             │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │ OutputStore  │  │ ContextStore │             │
//! │  └──────────────┘  └──────────────┘             │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod context;
pub mod error;
pub mod graph;
pub mod intrinsic;
pub mod lookup;
pub mod output;
pub mod resource;
pub mod template;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary};
pub use context::{ContextCache, ContextStore};
pub use error::{CloudError, Result};
pub use graph::{NodeKind, ResourceGraph};
pub use lookup::{NetworkLookup, StaticNetworkLookup, VpcContext, VpcLookupRequest};
pub use output::{DEFAULT_OUT_DIR, Manifest, OutputStore, TemplateFormat, WrittenFiles};
pub use resource::{ExternalResource, Output, Parameter, Resource, Tags};
pub use template::{ParameterValues, Template, TemplateResource};
