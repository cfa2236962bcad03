//! Module loading and linking.
//!
//! `import` resolves a module name in three steps: a module already
//! registered in the environment, a native module registered from Rust, and
//! finally a source file found on the module search path.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::env::ModuleRef;
use crate::eval::Evaluator;
use crate::signal::{Condition, EvalResult};
use crate::value::Value;

/// Extension of source modules.
pub const SOURCE_EXTENSION: &str = "al";

/// Prime variable mirroring the module search path.
pub const MODPATHS_VAR: &str = "--modpaths--";

/// A module implemented in Rust.
///
/// `init` runs with the new module active and typically defines natives in
/// it; `sources` are evaluated inside the module right after.
#[derive(Clone)]
pub struct NativeModule {
    pub name: String,
    pub init: fn(&mut Evaluator, &ModuleRef) -> EvalResult<()>,
    pub sources: Vec<String>,
}

/// Arguments of one `import`.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub name: String,
    pub alias: Option<String>,
    pub file: Option<String>,
    pub all: bool,
}

impl ImportRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Evaluator {
    /// Append a directory to the module search path.
    pub fn add_module_path(&mut self, path: impl Into<PathBuf>) {
        self.module_paths.push(path.into());
        let paths = self
            .module_paths
            .iter()
            .map(|path| Value::string(path.display().to_string()))
            .collect();
        self.env.define_prime(MODPATHS_VAR, Value::list(paths));
    }

    pub fn module_paths(&self) -> &[PathBuf] {
        &self.module_paths
    }

    pub fn register_native_module(&mut self, module: NativeModule) {
        self.native_modules.insert(module.name.clone(), module);
    }

    /// Register a module whose source is evaluated on first import.
    pub fn define_lazy_module(&mut self, name: &str, sources: Vec<String>) -> ModuleRef {
        let module = self.env.define_module(name);
        module.borrow_mut().pending_sources = sources;
        module
    }

    /// Read and evaluate a file; imports inside it search its directory first.
    pub fn eval_file(&mut self, path: &Path) -> EvalResult {
        let source = fs::read_to_string(path).map_err(|e| {
            Condition::module(format!("cannot read `{}`: {}", path.display(), e))
        })?;
        let previous = self.current_file.replace(path.to_path_buf());
        let result = self.eval_source(&source, &path.display().to_string());
        self.current_file = previous;
        result
    }

    /// Resolve, instantiate and alias a module into the active module.
    pub fn import(&mut self, request: &ImportRequest) -> EvalResult<ModuleRef> {
        let alias = request.alias.as_deref().unwrap_or(&request.name);
        let target = self.env.active_module();

        let module = if let Some(module) = self.env.module(&request.name) {
            self.env.alias_module(&module, alias);
            let lazy = module.borrow().is_lazy();
            if lazy && let Err(unwind) = self.load_pending(&module) {
                // The module stays registered with its unrun sources.
                self.env.unalias_module(&module, alias);
                return Err(unwind);
            }
            module
        } else if let Some(native) = self.native_modules.get(&request.name).cloned() {
            tracing::debug!(module = %request.name, "instantiating native module");
            let module = self.env.define_module(&request.name);
            self.env.alias_module(&module, alias);
            let init = {
                let mut inside = self.in_module(module.clone());
                (native.init)(&mut inside, &module)
            };
            let result = init.and_then(|()| {
                module.borrow_mut().pending_sources.extend(native.sources);
                self.load_pending(&module)
            });
            if let Err(unwind) = result {
                self.discard_module(&request.name, &module, alias);
                return Err(unwind);
            }
            module
        } else if let Some(path) = self.find_module_file(request) {
            tracing::debug!(module = %request.name, path = %path.display(), "loading source module");
            let module = self.env.define_module(&request.name);
            module.borrow_mut().file = Some(path.clone());
            self.env.alias_module(&module, alias);
            let result = self.in_module(module.clone()).eval_file(&path);
            if let Err(unwind) = result {
                self.discard_module(&request.name, &module, alias);
                return Err(unwind);
            }
            module
        } else {
            return Err(Condition::module(format!(
                "module `{}` not found (searched: {})",
                request.name,
                self.search_dirs()
                    .iter()
                    .map(|dir| dir.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .into());
        };

        if request.all {
            self.env.import_root_scope(&module, &target);
        }
        Ok(module)
    }

    /// Unregister a module whose instantiation failed so a later import
    /// starts over.
    fn discard_module(&mut self, name: &str, module: &ModuleRef, alias: &str) {
        tracing::debug!(module = name, "discarding partially loaded module");
        self.env.unalias_module(module, alias);
        if self
            .env
            .module(name)
            .is_some_and(|registered| Rc::ptr_eq(&registered, module))
        {
            self.env.remove_module(name);
        }
    }

    /// Evaluate a lazy module's pending sources and forms inside it.
    ///
    /// On failure the failing item and everything after it are put back.
    fn load_pending(&mut self, module: &ModuleRef) -> EvalResult<()> {
        let (sources, forms) = {
            let mut module = module.borrow_mut();
            (
                std::mem::take(&mut module.pending_sources),
                std::mem::take(&mut module.pending_forms),
            )
        };
        let name = module.borrow().name.clone();
        let mut inside = self.in_module(module.clone());

        for (i, source) in sources.iter().enumerate() {
            if let Err(unwind) = inside.eval_source(source, &name) {
                let mut module = module.borrow_mut();
                module.pending_sources = sources[i..].to_vec();
                module.pending_forms = forms;
                return Err(unwind);
            }
        }
        for (i, form) in forms.iter().enumerate() {
            if let Err(unwind) = inside.eval(form) {
                module.borrow_mut().pending_forms = forms[i..].to_vec();
                return Err(unwind);
            }
        }
        Ok(())
    }

    /// Directory of the current file, then the configured module paths.
    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(dir) = self.current_file.as_deref().and_then(Path::parent) {
            dirs.push(dir.to_path_buf());
        }
        dirs.extend(self.module_paths.iter().cloned());
        dirs
    }

    fn find_module_file(&self, request: &ImportRequest) -> Option<PathBuf> {
        let current = self.current_file.as_deref().and_then(|f| f.canonicalize().ok());
        let file_names: Vec<String> = match &request.file {
            Some(file) => vec![file.clone()],
            None => vec![
                request.name.clone(),
                format!("{}.{}", request.name, SOURCE_EXTENSION),
            ],
        };

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(file) = &request.file {
            candidates.push(PathBuf::from(file));
        }
        for dir in self.search_dirs() {
            for file_name in &file_names {
                candidates.push(dir.join(file_name));
            }
        }

        candidates.into_iter().find(|candidate| {
            candidate.is_file()
                && candidate.canonicalize().ok().as_ref() != current.as_ref()
        })
    }
}
