//! Stack graph assembly.
//!
//! Builders register with declared provides/consumes sets plus optional
//! explicit ordering edges. Assembly topologically sorts them, runs each
//! builder exactly once in dependency order, and threads exported handles
//! through an [`OutputRegistry`]. A handle consumed before its producer
//! has run aborts the whole synthesis; there is no partial emission.

use super::stack::Stack;
use crate::errors::{CycleDetectedError, SynthError};
use crate::graph::Value;
use crate::stacks::{StackBuilder, SynthContext};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

/// Cross-stack handles exported so far, keyed `"{builder}/{handle}"`.
#[derive(Debug, Default)]
pub struct OutputRegistry {
    values: HashMap<String, Value>,
}

impl OutputRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle under a producer's key.
    pub fn insert(&mut self, producer: &str, handle: &str, value: Value) {
        self.values.insert(format!("{producer}/{handle}"), value);
    }

    /// Resolves a handle for a consumer.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::UnresolvedReference`] if no earlier builder
    /// exported the handle.
    pub fn get(&self, consumer: &str, key: &str) -> Result<Value, SynthError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| SynthError::UnresolvedReference {
                stack: consumer.to_string(),
                output: key.to_string(),
            })
    }
}

/// The result of a full synthesis: every stack, in realization order.
#[derive(Debug)]
pub struct Assembly {
    /// Builder names in realization order.
    pub order: Vec<String>,
    /// The synthesized stacks, parallel to `order`.
    pub stacks: Vec<Stack>,
}

impl Assembly {
    /// Looks up a synthesized stack by its builder name.
    #[must_use]
    pub fn stack(&self, builder: &str) -> Option<&Stack> {
        self.order
            .iter()
            .position(|name| name == builder)
            .map(|i| &self.stacks[i])
    }
}

/// The assembler: a registry of stack builders with ordering edges.
#[derive(Debug, Default)]
pub struct App {
    builders: Vec<Box<dyn StackBuilder>>,
    index: HashMap<String, usize>,
    explicit_deps: HashMap<String, BTreeSet<String>>,
}

impl App {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::DuplicateBuilder`] if the name is taken.
    pub fn add(&mut self, builder: Box<dyn StackBuilder>) -> Result<(), SynthError> {
        let name = builder.name().to_string();
        if self.index.contains_key(&name) {
            return Err(SynthError::DuplicateBuilder(name));
        }
        self.index.insert(name, self.builders.len());
        self.builders.push(builder);
        Ok(())
    }

    /// Declares that `dependent` must be realized after `dependency`,
    /// even when no handle flows between them.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::UnknownBuilder`] if either side is not
    /// registered.
    pub fn add_dependency(&mut self, dependent: &str, dependency: &str) -> Result<(), SynthError> {
        for name in [dependent, dependency] {
            if !self.index.contains_key(name) {
                return Err(SynthError::UnknownBuilder(name.to_string()));
            }
        }
        self.explicit_deps
            .entry(dependent.to_string())
            .or_default()
            .insert(dependency.to_string());
        Ok(())
    }

    /// Dependencies of a builder: explicit edges plus the producer of
    /// every consumed handle.
    fn dependencies_of(&self, builder: &dyn StackBuilder) -> Result<BTreeSet<String>, SynthError> {
        let mut deps = self
            .explicit_deps
            .get(builder.name())
            .cloned()
            .unwrap_or_default();
        for key in builder.consumes() {
            let producer = key.split('/').next().unwrap_or(key);
            if !self.index.contains_key(producer) {
                return Err(SynthError::UnresolvedReference {
                    stack: builder.name().to_string(),
                    output: (*key).to_string(),
                });
            }
            deps.insert(producer.to_string());
        }
        Ok(deps)
    }

    /// Computes the realization order via depth-first topological sort.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::CycleDetected`] if the edge graph has a
    /// cycle, or [`SynthError::UnresolvedReference`] if a consumed handle
    /// names an unregistered builder.
    pub fn synth_order(&self) -> Result<Vec<String>, SynthError> {
        let mut order = Vec::with_capacity(self.builders.len());
        let mut visited = HashSet::new();
        let mut in_progress = Vec::new();

        for builder in &self.builders {
            self.visit(builder.name(), &mut visited, &mut in_progress, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        in_progress: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<(), SynthError> {
        if visited.contains(name) {
            return Ok(());
        }
        if let Some(start) = in_progress.iter().position(|n| n == name) {
            let mut path = in_progress[start..].to_vec();
            path.push(name.to_string());
            return Err(CycleDetectedError::new(path).into());
        }

        in_progress.push(name.to_string());
        let index = self.index[name];
        for dep in self.dependencies_of(self.builders[index].as_ref())? {
            self.visit(&dep, visited, in_progress, order)?;
        }
        in_progress.pop();

        visited.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    /// Runs every builder once, in dependency order.
    ///
    /// # Errors
    ///
    /// Returns the first error any builder raises; nothing is emitted on
    /// failure.
    pub fn synth(&self, ctx: &SynthContext) -> Result<Assembly, SynthError> {
        let order = self.synth_order()?;
        info!(stage = %ctx.stage, stacks = order.len(), "assembling resource graph");

        let mut registry = OutputRegistry::new();
        let mut stacks = Vec::with_capacity(order.len());

        for name in &order {
            let builder = self.builders[self.index[name]].as_ref();
            debug!(builder = name, "synthesizing stack");
            let stack = builder.build(ctx, &registry)?;

            for handle in builder.provides() {
                let exported = stack.exports().iter().any(|(key, _)| key == handle);
                if !exported {
                    return Err(SynthError::MissingProvidedOutput {
                        stack: stack.name().to_string(),
                        output: (*handle).to_string(),
                    });
                }
            }
            for (key, value) in stack.exports() {
                registry.insert(name, key, value.clone());
            }

            info!(
                builder = name,
                stack = stack.name(),
                resources = stack.resources().len(),
                "synthesized stack"
            );
            stacks.push(stack);
        }

        Ok(Assembly { order, stacks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Stage;
    use crate::graph::Resource;

    #[derive(Debug)]
    struct FakeBuilder {
        name: &'static str,
        provides: &'static [&'static str],
        consumes: &'static [&'static str],
    }

    impl StackBuilder for FakeBuilder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn provides(&self) -> &'static [&'static str] {
            self.provides
        }

        fn consumes(&self) -> &'static [&'static str] {
            self.consumes
        }

        fn build(&self, ctx: &SynthContext, outputs: &OutputRegistry) -> Result<Stack, SynthError> {
            for key in self.consumes {
                outputs.get(self.name, key)?;
            }
            let mut stack = Stack::new(ctx.stack_name(self.name));
            stack.add(Resource::new("Placeholder", "AWS::CloudFormation::WaitConditionHandle"))?;
            for handle in self.provides {
                stack.export(handle, Value::str(format!("{}-{handle}", self.name)));
            }
            Ok(stack)
        }
    }

    fn fake(
        name: &'static str,
        provides: &'static [&'static str],
        consumes: &'static [&'static str],
    ) -> Box<FakeBuilder> {
        Box::new(FakeBuilder {
            name,
            provides,
            consumes,
        })
    }

    fn ctx() -> SynthContext {
        SynthContext::new(Stage::Dev, "latest").unwrap()
    }

    #[test]
    fn test_consumers_ordered_after_producers() {
        let mut app = App::new();
        app.add(fake("service", &[], &["network/vpc_id"])).unwrap();
        app.add(fake("network", &["vpc_id"], &[])).unwrap();
        let order = app.synth_order().unwrap();
        let network = order.iter().position(|n| n == "network").unwrap();
        let service = order.iter().position(|n| n == "service").unwrap();
        assert!(network < service);
    }

    #[test]
    fn test_explicit_edge_forces_ordering() {
        let mut app = App::new();
        app.add(fake("database", &[], &[])).unwrap();
        app.add(fake("network", &[], &[])).unwrap();
        app.add_dependency("database", "network").unwrap();
        let order = app.synth_order().unwrap();
        assert_eq!(order, vec!["network".to_string(), "database".to_string()]);
    }

    #[test]
    fn test_cycle_is_a_hard_error() {
        let mut app = App::new();
        app.add(fake("a", &["x"], &["b/y"])).unwrap();
        app.add(fake("b", &["y"], &["a/x"])).unwrap();
        let err = app.synth_order().unwrap_err();
        assert!(matches!(err, SynthError::CycleDetected(_)));
    }

    #[test]
    fn test_unknown_producer_is_unresolved() {
        let mut app = App::new();
        app.add(fake("service", &[], &["cache/endpoint"])).unwrap();
        let err = app.synth_order().unwrap_err();
        assert!(
            matches!(err, SynthError::UnresolvedReference { ref output, .. } if output == "cache/endpoint")
        );
    }

    #[test]
    fn test_missing_declared_export_is_an_error() {
        #[derive(Debug)]
        struct Liar;
        impl StackBuilder for Liar {
            fn name(&self) -> &'static str {
                "liar"
            }
            fn provides(&self) -> &'static [&'static str] {
                &["endpoint"]
            }
            fn build(
                &self,
                ctx: &SynthContext,
                _outputs: &OutputRegistry,
            ) -> Result<Stack, SynthError> {
                Ok(Stack::new(ctx.stack_name("Liar")))
            }
        }
        let mut app = App::new();
        app.add(Box::new(Liar)).unwrap();
        let err = app.synth(&ctx()).unwrap_err();
        assert!(matches!(err, SynthError::MissingProvidedOutput { .. }));
    }

    #[test]
    fn test_duplicate_builder_rejected() {
        let mut app = App::new();
        app.add(fake("network", &[], &[])).unwrap();
        let err = app.add(fake("network", &[], &[])).unwrap_err();
        assert!(matches!(err, SynthError::DuplicateBuilder(name) if name == "network"));
    }

    #[test]
    fn test_synth_threads_handles_through_registry() {
        let mut app = App::new();
        app.add(fake("network", &["vpc_id"], &[])).unwrap();
        app.add(fake("service", &[], &["network/vpc_id"])).unwrap();
        let assembly = app.synth(&ctx()).unwrap();
        assert_eq!(assembly.order, vec!["network", "service"]);
        assert!(assembly.stack("service").is_some());
    }
}
