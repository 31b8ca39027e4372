//! Tool registry for Walletgate.
//!
//! A tool is a named remote operation with a declared parameter list, an
//! optional price, and a handler. This crate provides:
//!
//! - **[`schema`]**: statically declared parameters and argument validation
//! - **[`registry`]**: the [`ToolRegistry`] catalog and the [`ToolHandler`] seam
//! - **[`builtin`]**: the six wallet tools, bound to a [`WalletBackend`](walletgate_backend::WalletBackend)
//! - **[`error`]**: registry and handler errors
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use walletgate_tools::{handler_fn, InputSchema, ParamSpec, ToolDescriptor, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry
//!     .register(ToolDescriptor::new(
//!         "echo",
//!         "Echo a message",
//!         InputSchema::new(vec![ParamSpec::string("message", "Text to echo")]),
//!         handler_fn(|args| async move { Ok(json!(args.require_str("message")?)) }),
//!     ))
//!     .unwrap();
//!
//! let listing: Vec<_> = registry.list_tools().collect();
//! assert_eq!(listing[0].name, "echo");
//! assert_eq!(listing[0].price, "free");
//! assert!(registry.lookup("nope").is_err());
//! ```

pub mod builtin;
pub mod error;
pub mod registry;
pub mod schema;

pub use builtin::{wallet_registry, BuiltinTool, PriceOverrides};
pub use error::{RegistryError, ToolError};
pub use registry::{handler_fn, ToolDescriptor, ToolHandler, ToolListing, ToolRegistry};
pub use schema::{FieldError, InputSchema, ParamKind, ParamSpec, Presence, ValidatedArgs};
