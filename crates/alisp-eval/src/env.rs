//! Evaluation environment: frames, scopes and modules.
//!
//! The environment is a stack of frames, each frame a stack of scopes. A
//! lookup searches the current frame innermost-first, then the active
//! module's root scope, then the prime (special) table. Enclosing frames
//! are never searched.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use alisp_diagnostic::ErrorCode;

use crate::signal::Condition;
use crate::value::{props, Value};

/// One lexical binding block.
pub type Scope = HashMap<Rc<str>, Value>;

/// Shared handle to a module.
pub type ModuleRef = Rc<RefCell<Module>>;

/// Name of the module active when an environment is created.
pub const MAIN_MODULE: &str = "--main--";

/// A named namespace.
#[derive(Debug, Default)]
pub struct Module {
    pub name: String,
    /// Symbols defined at top level in this module.
    pub root: Scope,
    /// Modules imported under a local name.
    pub aliases: HashMap<String, ModuleRef>,
    /// Root bindings defined by this module itself, as opposed to copied
    /// in by `import_root_scope`.
    pub owned: HashSet<Rc<str>>,
    /// Root bindings that `update` must not change.
    pub constants: HashSet<Rc<str>>,
    /// Source texts evaluated the first time the module is instantiated.
    pub pending_sources: Vec<String>,
    /// Expression trees evaluated after `pending_sources`.
    pub pending_forms: Vec<Value>,
    /// File the module was loaded from, if any.
    pub file: Option<PathBuf>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_lazy(&self) -> bool {
        !self.pending_sources.is_empty() || !self.pending_forms.is_empty()
    }
}

pub struct Environment {
    frames: Vec<Vec<Scope>>,
    modules: HashMap<String, ModuleRef>,
    active: ModuleRef,
    prime: Scope,
}

impl Environment {
    pub fn new() -> Self {
        let main = Rc::new(RefCell::new(Module::new(MAIN_MODULE)));
        let mut modules = HashMap::new();
        modules.insert(MAIN_MODULE.to_string(), main.clone());
        Self {
            frames: vec![vec![Scope::new()]],
            modules,
            active: main,
            prime: Scope::new(),
        }
    }

    // ========== Definitions ==========

    /// Bind in the active module's root scope.
    pub fn define_variable(&mut self, name: &str, value: Value, doc: Option<&str>) {
        self.define_root(name, value, doc, false);
    }

    /// Bind a constant in the active module's root scope.
    pub fn define_constant(&mut self, name: &str, value: Value, doc: Option<&str>) {
        self.define_root(name, value, doc, true);
    }

    pub fn define_function(&mut self, name: &str, value: Value, doc: Option<&str>) {
        if !value.is_sentinel() {
            value.set_prop(props::NAME, Value::string(name));
        }
        self.define_root(name, value, doc, false);
    }

    pub fn define_macro(&mut self, name: &str, value: Value, doc: Option<&str>) {
        self.define_function(name, value, doc);
    }

    fn define_root(&mut self, name: &str, value: Value, doc: Option<&str>, constant: bool) {
        let mut module = self.active.borrow_mut();
        if !value.is_sentinel() {
            if !value.has_prop(props::MODULE) {
                value.set_prop(props::MODULE, Value::string(module.name.clone()));
            }
            if let Some(doc) = doc {
                value.set_prop(props::DOC, Value::string(doc));
            }
        }
        let name: Rc<str> = Rc::from(name);
        if constant {
            module.constants.insert(name.clone());
        } else {
            module.constants.remove(&name);
        }
        module.owned.insert(name.clone());
        module.root.insert(name, value);
    }

    /// Bind in the prime table, visible from every module.
    pub fn define_prime(&mut self, name: &str, value: Value) {
        self.prime.insert(Rc::from(name), value);
    }

    /// Bind in the innermost scope of the current frame.
    pub fn put(&mut self, name: Rc<str>, value: Value) {
        if let Some(scope) = self.frames.last_mut().and_then(|frame| frame.last_mut()) {
            scope.insert(name, value);
        }
    }

    // ========== Lookup ==========

    /// Resolve a symbol, or `None` if it is unbound.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frames.last() {
            for scope in frame.iter().rev() {
                if let Some(value) = scope.get(name) {
                    return Some(value.clone());
                }
            }
        }
        if let Some(value) = self.active.borrow().root.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.prime.get(name) {
            return Some(value.clone());
        }
        self.lookup_qualified(name)
    }

    /// Resolve a symbol; an unbound symbol logs a warning and yields `nil`.
    pub fn find(&self, name: &str) -> Value {
        self.lookup(name).unwrap_or_else(|| {
            tracing::warn!(symbol = name, module = %self.active.borrow().name, "unbound symbol");
            Value::nil()
        })
    }

    /// Mutate the nearest existing binding in place.
    pub fn update(&mut self, name: &str, value: Value) -> Result<(), Condition> {
        if let Some(frame) = self.frames.last_mut() {
            for scope in frame.iter_mut().rev() {
                if let Some(slot) = scope.get_mut(name) {
                    *slot = value;
                    return Ok(());
                }
            }
        }
        {
            let mut module = self.active.borrow_mut();
            if module.constants.contains(name) {
                return Err(Condition::environment(format!(
                    "cannot change constant `{}`",
                    name
                ))
                .with_code(ErrorCode::ConstantBinding));
            }
            if let Some(slot) = module.root.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        if let Some(slot) = self.prime.get_mut(name) {
            *slot = value;
            return Ok(());
        }
        Err(Condition::environment(format!(
            "cannot set unbound symbol `{}`",
            name
        ))
        .with_code(ErrorCode::UnboundSymbol))
    }

    /// `a.b.sym`: follow aliases from the active module.
    fn lookup_qualified(&self, name: &str) -> Option<Value> {
        let (path, symbol) = name.rsplit_once('.')?;
        if symbol.is_empty() {
            return None;
        }
        let module = self.resolve_alias_path(path.split('.'))?;
        let value = module.borrow().root.get(symbol).cloned();
        value
    }

    /// Walk a chain of alias names starting at the active module.
    pub fn resolve_alias_path<'a>(
        &self,
        path: impl IntoIterator<Item = &'a str>,
    ) -> Option<ModuleRef> {
        let mut module = self.active.clone();
        for segment in path {
            if segment.is_empty() {
                return None;
            }
            let next = module.borrow().aliases.get(segment).cloned()?;
            module = next;
        }
        Some(module)
    }

    /// Every binding visible in the current frame, outermost first.
    pub fn frame_bindings(&self) -> Vec<(Rc<str>, Value)> {
        let mut merged: HashMap<Rc<str>, Value> = HashMap::new();
        if let Some(frame) = self.frames.last() {
            for scope in frame {
                for (name, value) in scope {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        let mut bindings: Vec<_> = merged.into_iter().collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }

    // ========== Scopes and frames ==========

    pub fn new_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(Scope::new());
        }
    }

    /// Pop the innermost scope; a frame's base scope is never popped.
    pub fn destroy_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut()
            && frame.len() > 1
        {
            frame.pop();
        }
    }

    /// Push a frame holding one empty scope.
    pub fn call_function(&mut self) {
        self.frames.push(vec![Scope::new()]);
    }

    /// Pop the current frame; the root frame is never popped.
    pub fn finish_function(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames above the root frame.
    pub fn call_depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn scope_depth(&self) -> usize {
        self.frames.last().map_or(0, Vec::len)
    }

    // ========== Modules ==========

    /// Create and register a module, replacing any module of the same name.
    pub fn define_module(&mut self, name: &str) -> ModuleRef {
        tracing::debug!(module = name, "defining module");
        let module = Rc::new(RefCell::new(Module::new(name)));
        self.modules.insert(name.to_string(), module.clone());
        module
    }

    pub fn remove_module(&mut self, name: &str) -> Option<ModuleRef> {
        self.modules.remove(name)
    }

    pub fn module(&self, name: &str) -> Option<ModuleRef> {
        self.modules.get(name).cloned()
    }

    pub fn active_module(&self) -> ModuleRef {
        self.active.clone()
    }

    pub fn active_module_name(&self) -> String {
        self.active.borrow().name.clone()
    }

    /// Attach `module` under `alias` in the active module.
    pub fn alias_module(&mut self, module: &ModuleRef, alias: &str) {
        tracing::debug!(
            module = %module.borrow().name,
            alias,
            into = %self.active.borrow().name,
            "aliasing module"
        );
        self.active
            .borrow_mut()
            .aliases
            .insert(alias.to_string(), module.clone());
    }

    /// Drop `alias` from the active module if it still refers to `module`.
    pub fn unalias_module(&mut self, module: &ModuleRef, alias: &str) {
        let mut active = self.active.borrow_mut();
        if active
            .aliases
            .get(alias)
            .is_some_and(|aliased| Rc::ptr_eq(aliased, module))
        {
            active.aliases.remove(alias);
        }
    }

    /// Make `module` active and return the previously active one.
    pub fn activate_module(&mut self, module: ModuleRef) -> ModuleRef {
        std::mem::replace(&mut self.active, module)
    }

    /// Copy root symbols owned by `from` into `to`'s root scope.
    ///
    /// Symbols that `from` itself imported are skipped.
    pub fn import_root_scope(&mut self, from: &ModuleRef, to: &ModuleRef) {
        if Rc::ptr_eq(from, to) {
            return;
        }
        let from = from.borrow();
        let owned: Vec<(Rc<str>, Value)> = from
            .root
            .iter()
            .filter(|(name, _)| from.owned.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        tracing::debug!(from = %from.name, count = owned.len(), "importing root scope");
        to.borrow_mut().root.extend(owned);
    }

    /// Names bound in the active module's root scope, sorted.
    pub fn root_symbols(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .active
            .borrow()
            .root
            .keys()
            .map(|name| name.to_string())
            .collect();
        names.sort();
        names
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
