//! The tool catalog.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use walletgate_types::{Price, FREE_LABEL};

use crate::error::{RegistryError, ToolError};
use crate::schema::{InputSchema, ValidatedArgs};

/// Executes a tool once its arguments are validated (and, for priced tools,
/// once payment is settled).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ValidatedArgs) -> Result<Value, ToolError>;
}

type HandlerFn = dyn Fn(ValidatedArgs) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync;

struct FnHandler(Box<HandlerFn>);

#[async_trait]
impl ToolHandler for FnHandler {
    async fn call(&self, args: ValidatedArgs) -> Result<Value, ToolError> {
        (self.0)(args).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(ValidatedArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    Arc::new(FnHandler(Box::new(move |args| f(args).boxed())))
}

/// A registered tool. Immutable once registered.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// `None` means free.
    pub price: Option<Price>,
    pub input_schema: InputSchema,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// A free tool.
    pub fn new(
        name: &str,
        description: &str,
        input_schema: InputSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            price: None,
            input_schema,
            handler,
        }
    }

    pub fn with_price(mut self, price: Option<Price>) -> Self {
        self.price = price;
        self
    }

    pub fn is_free(&self) -> bool {
        self.price.is_none()
    }

    /// `"free"` or the price, e.g. `"$0.05"`.
    pub fn price_label(&self) -> String {
        match self.price {
            Some(price) => price.to_string(),
            None => FREE_LABEL.to_string(),
        }
    }

    /// Validate raw arguments against this tool's parameters.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<ValidatedArgs, ToolError> {
        self.input_schema
            .validate(args)
            .map_err(ToolError::InvalidArguments)
    }

    pub fn listing(&self) -> ToolListing {
        ToolListing {
            name: self.name.clone(),
            price: self.price_label(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("price", &self.price_label())
            .field("params", &self.input_schema.params().len())
            .finish()
    }
}

/// Discovery entry for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: String,
    pub price: String,
    pub description: String,
    pub input_schema: Value,
}

/// Name → tool catalog.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<ToolDescriptor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names are unique.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateName {
                name: descriptor.name,
            });
        }
        debug!(tool = %descriptor.name, price = %descriptor.price_label(), "Registered tool");
        self.tools
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<ToolDescriptor>, RegistryError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Discovery listing. Each call starts a fresh pass over the catalog.
    pub fn list_tools(&self) -> impl Iterator<Item = ToolListing> + '_ {
        self.tools.values().map(|t| t.listing())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamSpec;
    use serde_json::json;

    fn echo(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(
            name,
            "Echo",
            InputSchema::new(vec![ParamSpec::string("message", "Text")]),
            handler_fn(|args| async move { Ok(json!(args.require_str("message")?)) }),
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("a")).unwrap();
        registry.register(echo("b").with_price(Price::from_cents(2))).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("a").unwrap().is_free());
        assert_eq!(registry.lookup("b").unwrap().price_label(), "$0.02");
        assert_eq!(
            registry.lookup("c").unwrap_err(),
            RegistryError::NotFound { name: "c".into() }
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("a")).unwrap();
        let err = registry
            .register(echo("a").with_price(Price::from_cents(1)))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName { name: "a".into() });
        // The original stays.
        assert!(registry.lookup("a").unwrap().is_free());
    }

    #[test]
    fn test_listing_is_restartable() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("a")).unwrap();
        registry.register(echo("b")).unwrap();

        let first: Vec<_> = registry.list_tools().map(|l| l.name).collect();
        let second: Vec<_> = registry.list_tools().map(|l| l.name).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["a", "b"]);
    }

    #[test]
    fn test_listing_serializes_camel_case() {
        let listing = echo("a").listing();
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["price"], "free");
        assert_eq!(json["inputSchema"]["required"], json!(["message"]));
    }

    #[tokio::test]
    async fn test_validate_then_call() {
        let tool = echo("a");
        let args = tool
            .validate(json!({"message": "hi"}).as_object().unwrap())
            .unwrap();
        assert_eq!(tool.handler.call(args).await.unwrap(), json!("hi"));

        let err = tool.validate(&Map::new()).unwrap_err();
        assert_eq!(err.error_code(), walletgate_types::ErrorCode::InvalidArguments);
    }
}
