// src/hooks/registry.rs
//! Hook registry: event subscriptions and sidecar extension ownership

use super::{Hook, HookContext, HookEvent, builtin};
use crate::config::ForcedTrigger;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Loaded hooks, in the order they are notified
///
/// Built once at startup. Subscribing to an unknown event, claiming an
/// extension twice, or naming an unknown hook fails before any package is
/// touched.
#[derive(Default)]
pub struct HookRegistry {
    loaded: Vec<&'static str>,
    subscribers: BTreeMap<HookEvent, Vec<Arc<dyn Hook>>>,
    extensions: BTreeMap<String, String>,
}

/// Capability handed to [`Hook::init`]
pub struct Registrar<'a> {
    registry: &'a mut HookRegistry,
    hook: Arc<dyn Hook>,
}

impl Registrar<'_> {
    /// Subscribe the hook being initialized to `event`
    pub fn subscribe(&mut self, event: &str) -> Result<()> {
        let event: HookEvent = event.parse()?;
        let subscribers = self.registry.subscribers.entry(event).or_default();
        if !subscribers.iter().any(|h| h.name() == self.hook.name()) {
            subscribers.push(Arc::clone(&self.hook));
        }
        Ok(())
    }

    /// Claim a sidecar extension such as `.checksums` for `owner`
    pub fn declare_extension(&mut self, ext: &str, owner: &str) -> Result<()> {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(Error::Config(format!(
                "extension {:?} declared by {} must start with a dot",
                ext, owner
            )));
        }
        if let Some(existing) = self.registry.extensions.get(ext) {
            return Err(Error::DuplicateExtension {
                ext: ext.to_string(),
                owner: existing.clone(),
            });
        }
        self.registry
            .extensions
            .insert(ext.to_string(), owner.to_string());
        Ok(())
    }
}

impl HookRegistry {
    /// Create a registry with no hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Load built-in hooks by name, in the given order
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref();
            let hook = builtin(name).ok_or_else(|| Error::UnknownHook(name.to_string()))?;
            registry.load(hook)?;
        }
        Ok(registry)
    }

    /// Initialize a hook and record its subscriptions
    pub fn load(&mut self, hook: Arc<dyn Hook>) -> Result<()> {
        let name = hook.name();
        if self.loaded.contains(&name) {
            return Err(Error::Config(format!("hook {} loaded twice", name)));
        }

        let mut registrar = Registrar {
            registry: self,
            hook: Arc::clone(&hook),
        };
        hook.init(&mut registrar)?;
        self.loaded.push(name);

        debug!("Loaded hook {}", name);
        Ok(())
    }

    /// Hooks subscribed to `event`, in notification order
    pub fn subscribers(&self, event: HookEvent) -> &[Arc<dyn Hook>] {
        self.subscribers
            .get(&event)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sidecar extension -> owning hook
    pub fn extensions(&self) -> &BTreeMap<String, String> {
        &self.extensions
    }

    /// Names of loaded hooks, in load order
    pub fn hook_names(&self) -> &[&'static str] {
        &self.loaded
    }

    /// Run every subscriber of `event`.
    ///
    /// Stops at the first failing hook; hooks after it are not run for this
    /// package.
    pub fn notify(&self, event: HookEvent, ctx: &HookContext<'_>) -> Result<()> {
        for hook in self.subscribers(event) {
            debug!("{} {} for {}", hook.name(), event, ctx.pkg);
            run_hook(hook.as_ref(), event, ctx)?;
        }
        Ok(())
    }

    /// Run only the subscribers named by `triggers` for `event`
    pub fn notify_forced(
        &self,
        event: HookEvent,
        ctx: &HookContext<'_>,
        triggers: &[ForcedTrigger],
    ) -> Result<()> {
        for hook in self.subscribers(event) {
            if triggers
                .iter()
                .any(|t| t.event == event && t.hook == hook.name())
            {
                info!("notify (forced) {}/{} for {}", event, hook.name(), ctx.pkg);
                run_hook(hook.as_ref(), event, ctx)?;
            }
        }
        Ok(())
    }
}

fn run_hook(hook: &dyn Hook, event: HookEvent, ctx: &HookContext<'_>) -> Result<()> {
    hook.handle(event, ctx).map_err(|e| {
        error!("hook {} for {} on {} failed: {}", hook.name(), event, ctx.pkg, e);
        Error::Hook {
            hook: hook.name().to_string(),
            package: ctx.pkg.to_string(),
            source: Box::new(e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Passes;
    use crate::db::models::FileTable;
    use crate::mirror::SourcePackage;
    use crate::mirror::deb822::parse_str;
    use rusqlite::Connection;
    use std::path::Path;
    use std::sync::Mutex;

    /// Records every call into a shared journal
    struct Recorder {
        name: &'static str,
        events: &'static [&'static str],
        ext: Option<&'static str>,
        fail: bool,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl Hook for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn init(&self, registrar: &mut Registrar<'_>) -> Result<()> {
            for event in self.events {
                registrar.subscribe(event)?;
            }
            if let Some(ext) = self.ext {
                registrar.declare_extension(ext, self.name)?;
            }
            Ok(())
        }

        fn add_package(&self, ctx: &HookContext<'_>) -> Result<()> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:add:{}", self.name, ctx.pkg));
            if self.fail {
                return Err(Error::command("false", "exit status: 1"));
            }
            Ok(())
        }

        fn rm_package(&self, ctx: &HookContext<'_>) -> Result<()> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:rm:{}", self.name, ctx.pkg));
            Ok(())
        }
    }

    fn recorder(
        name: &'static str,
        ext: Option<&'static str>,
        fail: bool,
        journal: &Arc<Mutex<Vec<String>>>,
    ) -> Arc<dyn Hook> {
        Arc::new(Recorder {
            name,
            events: &["add-package", "rm-package"],
            ext,
            fail,
            journal: Arc::clone(journal),
        })
    }

    fn with_context<F: FnOnce(&HookContext<'_>)>(f: F) {
        let conn = Connection::open_in_memory().unwrap();
        let paragraph = parse_str("Package: hello\nVersion: 1.0\n").unwrap().remove(0);
        let pkg = SourcePackage::from_paragraph(paragraph, Path::new("/m")).unwrap();
        let table = FileTable::new();
        let passes = Passes::all();
        let ctx = HookContext {
            conn: &conn,
            pkg: &pkg,
            pkgdir: Path::new("/s/main/h/hello/1.0"),
            file_table: &table,
            passes: &passes,
        };
        f(&ctx);
    }

    #[test]
    fn test_notify_in_subscription_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.load(recorder("first", Some(".one"), false, &journal)).unwrap();
        registry.load(recorder("second", Some(".two"), false, &journal)).unwrap();

        with_context(|ctx| registry.notify(HookEvent::AddPackage, ctx).unwrap());

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["first:add:hello/1.0", "second:add:hello/1.0"]
        );
        assert_eq!(registry.extensions()[".two"], "second");
    }

    #[test]
    fn test_failure_stops_remaining_hooks() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.load(recorder("broken", None, true, &journal)).unwrap();
        registry.load(recorder("after", None, false, &journal)).unwrap();

        with_context(|ctx| {
            let err = registry.notify(HookEvent::AddPackage, ctx).unwrap_err();
            assert!(matches!(err, Error::Hook { ref hook, .. } if hook == "broken"));
        });
        assert_eq!(*journal.lock().unwrap(), vec!["broken:add:hello/1.0"]);
    }

    #[test]
    fn test_forced_trigger_only_runs_named_hook() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.load(recorder("a", None, false, &journal)).unwrap();
        registry.load(recorder("b", None, false, &journal)).unwrap();
        let triggers = vec!["rm-package/b".parse::<ForcedTrigger>().unwrap()];

        with_context(|ctx| {
            registry
                .notify_forced(HookEvent::AddPackage, ctx, &triggers)
                .unwrap();
            registry
                .notify_forced(HookEvent::RmPackage, ctx, &triggers)
                .unwrap();
        });
        assert_eq!(*journal.lock().unwrap(), vec!["b:rm:hello/1.0"]);
    }

    #[test]
    fn test_duplicate_extension_is_fatal() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.load(recorder("a", Some(".x"), false, &journal)).unwrap();
        let err = registry
            .load(recorder("b", Some(".x"), false, &journal))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateExtension { ref owner, .. } if owner == "a"));
    }

    #[test]
    fn test_extension_needs_leading_dot() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        assert!(registry.load(recorder("a", Some("x"), false, &journal)).is_err());
    }

    #[test]
    fn test_unknown_event_is_fatal() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        let hook = Arc::new(Recorder {
            name: "odd",
            events: &["upgrade-package"],
            ext: None,
            fail: false,
            journal,
        });
        assert!(matches!(registry.load(hook), Err(Error::UnknownEvent(_))));
    }

    #[test]
    fn test_from_names() {
        let registry = HookRegistry::from_names(&["checksums", "metrics"]).unwrap();
        assert_eq!(registry.hook_names(), &["checksums", "metrics"]);
        assert_eq!(registry.subscribers(HookEvent::AddPackage).len(), 2);
        assert_eq!(registry.extensions()[".checksums"], "checksums");
        assert_eq!(registry.extensions()[".stats"], "metrics");

        assert!(matches!(
            HookRegistry::from_names(&["nope"]),
            Err(Error::UnknownHook(_))
        ));
    }
}
