//! Route discovery over layered controller trees.
//!
//! A tree is a namespace plus the Rust module its controllers live under. The
//! root ("mask") tree supplies the base controllers; override ("app") trees may
//! take over any unmasked route by defining a controller at the same relative
//! module path with a method of the same name.

use crate::http::HttpMethod;
use crate::middleware::MiddlewareRef;
use crate::routing::{Action, Controller, ControllerDescriptor, MethodDescriptor};

/// Controllers registered under one namespace.
#[derive(Debug, Clone)]
pub struct ControllerTree {
    namespace: String,
    root_module: String,
    controllers: Vec<ControllerDescriptor>,
}

impl ControllerTree {
    /// `root_module` is the module path the tree starts at, usually
    /// `module_path!()` of the module declaring the controllers' parent.
    pub fn new(namespace: impl Into<String>, root_module: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            root_module: root_module.into(),
            controllers: Vec::new(),
        }
    }

    pub fn controller<C: Controller>(mut self) -> Self {
        self.add::<C>();
        self
    }

    pub fn add<C: Controller>(&mut self) -> &mut Self {
        self.add_descriptor(ControllerDescriptor::of::<C>())
    }

    pub fn add_descriptor(&mut self, descriptor: ControllerDescriptor) -> &mut Self {
        self.controllers.push(descriptor);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn controllers(&self) -> &[ControllerDescriptor] {
        &self.controllers
    }

    /// Module path of `type_path` relative to the tree root, `None` when the
    /// type lives outside the tree.
    pub fn relative_identity<'a>(&self, type_path: &'a str) -> Option<&'a str> {
        type_path
            .strip_prefix(self.root_module.as_str())?
            .strip_prefix("::")
            .filter(|relative| !relative.is_empty())
    }

    /// Namespaced class name: the namespace followed by each relative segment
    /// with its first letter upper-cased, joined by `\`.
    pub fn class_name(&self, type_path: &str) -> Option<String> {
        let relative = self.relative_identity(type_path)?;
        let segments = relative.split("::").map(upper_first);
        Some(
            std::iter::once(self.namespace.trim_end_matches('\\').to_string())
                .filter(|namespace| !namespace.is_empty())
                .chain(segments)
                .collect::<Vec<_>>()
                .join("\\"),
        )
    }

    fn find(&self, relative: &str) -> Option<&ControllerDescriptor> {
        self.controllers
            .iter()
            .find(|controller| self.relative_identity(controller.type_path) == Some(relative))
    }
}

fn upper_first(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One route produced by discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredRoute {
    pub method: HttpMethod,
    pub path: &'static str,
    /// Namespaced class name of the controller the action is bound to.
    pub class: String,
    pub action: Action,
    pub middleware: Vec<MiddlewareRef>,
}

/// Walks a root tree and its override trees.
#[derive(Debug, Clone)]
pub struct RouteDiscovery {
    root: ControllerTree,
    overrides: Vec<ControllerTree>,
}

impl RouteDiscovery {
    pub fn new(root: ControllerTree) -> Self {
        Self {
            root,
            overrides: Vec::new(),
        }
    }

    /// Add an override tree; earlier overrides take precedence.
    pub fn with_override(mut self, tree: ControllerTree) -> Self {
        self.overrides.push(tree);
        self
    }

    pub fn root(&self) -> &ControllerTree {
        &self.root
    }

    pub fn overrides(&self) -> &[ControllerTree] {
        &self.overrides
    }

    /// Yield every declared route.
    ///
    /// Plain routes are bound to the controller declaring them, in every
    /// tree. Unmasked routes are only read from the root tree and bound to
    /// the first override defining the same controller and method, falling
    /// back to the root controller.
    pub fn discover(&self) -> impl Iterator<Item = DiscoveredRoute> + '_ {
        std::iter::once((true, &self.root))
            .chain(self.overrides.iter().map(|tree| (false, tree)))
            .flat_map(move |(is_root, tree)| {
                tree.controllers
                    .iter()
                    .flat_map(move |controller| self.routes_of(is_root, tree, controller))
            })
    }

    fn routes_of(
        &self,
        is_root: bool,
        tree: &ControllerTree,
        controller: &ControllerDescriptor,
    ) -> Vec<DiscoveredRoute> {
        let Some(class) = tree.class_name(controller.type_path) else {
            tracing::debug!(
                controller = controller.type_path,
                namespace = %tree.namespace,
                "Skipping controller outside its tree"
            );
            return Vec::new();
        };

        let mut routes = Vec::new();
        for method in &controller.methods {
            for attribute in &method.routes {
                let (class, controller, method) = if !attribute.unmasked {
                    (class.clone(), controller, method)
                } else if is_root {
                    self.resolve_unmasked(tree, controller, method)
                        .unwrap_or((class.clone(), controller, method))
                } else {
                    continue;
                };

                routes.push(DiscoveredRoute {
                    method: attribute.method,
                    path: attribute.path,
                    class,
                    action: Action::method(controller.type_path, method.name, method.invoker.clone()),
                    middleware: attribute.middleware.clone(),
                });
            }
        }
        routes
    }

    fn resolve_unmasked<'a>(
        &'a self,
        root: &ControllerTree,
        controller: &ControllerDescriptor,
        method: &MethodDescriptor,
    ) -> Option<(String, &'a ControllerDescriptor, &'a MethodDescriptor)> {
        let relative = root.relative_identity(controller.type_path)?;
        self.overrides.iter().find_map(|tree| {
            let candidate = tree.find(relative)?;
            let overriding = candidate.method(method.name)?;
            tracing::debug!(
                base = controller.type_path,
                replacement = candidate.type_path,
                method = method.name,
                "Unmasked route overridden"
            );
            Some((tree.class_name(candidate.type_path)?, candidate, overriding))
        })
    }
}
