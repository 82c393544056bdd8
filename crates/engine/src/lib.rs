//! Reactive XForms binding engine.
//!
//! An [`ActionEngine`] owns models (instance documents plus a bind tree), a
//! headless UI tree of dependency-tracked elements, and the action/flush
//! driver. Mutations run inside action scopes; closing the outermost scope
//! drains every change through rebuild, recalculate, revalidate and refresh
//! until nothing changes.
//!
//! ```
//! use bindery_engine::{ActionEngine, BindSpec, BindingSpec, ElementSpec, EngineConfig};
//!
//! let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
//! let model = engine.add_model("order");
//! engine.add_instance(model, "data", "<order><qty>2</qty><price>3</price><total/></order>").unwrap();
//! engine.add_bind(model, None, &BindSpec::new("total").with_calculate("../qty * ../price")).unwrap();
//! engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("total")).named("total")).unwrap();
//! engine.start().unwrap();
//! assert_eq!(engine.presentation("total").unwrap().value.as_deref(), Some("6"));
//!
//! let qty = engine.evaluate("qty").unwrap().into_nodeset().unwrap().remove(0);
//! engine.set_value(&qty, "5").unwrap();
//! assert_eq!(engine.presentation("total").unwrap().value.as_deref(), Some("15"));
//! ```
pub mod actions;
pub mod binding;
mod changes;
pub mod config;
pub mod diagnostics;
pub mod element;
pub mod engine;
pub mod env;
pub mod error;
pub mod forms;
mod host;
pub mod model;
pub mod profiling;
pub mod ui;

pub use actions::{Action, ActionKind, InsertPosition, ValueSource};
pub use binding::{Binding, BindingSpec};
pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use element::{BoundElement, Control, ElementDeps, ElementKind, ElementSpec, Group, Presentation, Repeat};
pub use engine::{ActionEngine, EngineState};
pub use env::Env;
pub use error::EngineError;
pub use forms::FormContext;
pub use model::{Bind, BindId, BindSpec, Instance, ItemProperties, Model, NodeState};
pub use profiling::{ExpressionProfile, ProfileReport, Profiler};
pub use ui::UiTree;

pub use bindery_xpath::{ElementId, ModelId, Node};
