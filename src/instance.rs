//! Viewer instance registry and the activation toggle
//!
//! Several viewers can live on one page, but only one of them may own the
//! window-level listeners at a time. [`InstanceManager`] owns every
//! instance, keyed by a random [`Signature`], together with the single
//! active-instance slot. Restoring an instance freezes the previous holder
//! first; a frozen instance listens for pointer-over on its root element so
//! that interacting with it restores it again.
//!
//! The manager never touches the environment. Every operation returns the
//! [`InstanceEffect`]s the host must apply, in order.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, ElementHandle};
use crate::error::{ShellError, ShellResult};
use crate::event_bus::BusEvent;
use crate::options::{AppOptions, OptionValue};

/// Upper bound (exclusive) for generated signatures
pub const SIGNATURE_RANGE: u32 = 100_000;

/// Identifier of a viewer instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub u32);

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to construct a viewer instance
#[derive(Clone, Debug)]
pub struct InstanceConfig {
    pub app_config: AppConfig,
    /// User options applied on top of the defaults
    pub app_options: BTreeMap<String, OptionValue>,
    /// Whether the viewer behind this instance finished initializing
    pub initialized: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl InstanceConfig {
    pub fn new(app_config: AppConfig) -> Self {
        Self {
            app_config,
            app_options: BTreeMap::new(),
            initialized: true,
        }
    }
}

/// Side effects requested by the manager
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum InstanceEffect {
    /// Make this instance the one global helpers talk to
    SetActiveInstance { instance: Signature },
    /// Point document-wide style properties at `root` (document root when `None`)
    ApplyDocStyle {
        instance: Signature,
        root: Option<ElementHandle>,
    },
    Focus { element: ElementHandle },
    BindEvents { instance: Signature },
    BindWindowEvents { instance: Signature },
    UnbindEvents { instance: Signature },
    UnbindWindowEvents { instance: Signature },
    /// Capture-phase pointer-over listener that restores the instance
    BindAutoRestore {
        instance: Signature,
        root: ElementHandle,
    },
    UnbindAutoRestore {
        instance: Signature,
        root: ElementHandle,
    },
    Dispatch { event: BusEvent },
}

/// One viewer application on the page
#[derive(Debug)]
pub struct ViewerInstance {
    signature: Signature,
    app_config: AppConfig,
    options: AppOptions,
    initialized: bool,
    events_bound: bool,
    /// Root element currently carrying the auto-restore listener
    auto_restore: Option<ElementHandle>,
    /// Restore requested before initialization finished
    pending_restore: bool,
}

impl ViewerInstance {
    fn new(signature: Signature, config: InstanceConfig) -> Self {
        let mut options = AppOptions::new();
        options.set_all(config.app_options);
        Self {
            signature,
            app_config: config.app_config,
            options,
            initialized: config.initialized,
            events_bound: false,
            auto_restore: None,
            pending_restore: false,
        }
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    pub fn app_config(&self) -> &AppConfig {
        &self.app_config
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut AppOptions {
        &mut self.options
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn events_bound(&self) -> bool {
        self.events_bound
    }

    pub fn auto_restore_bound(&self) -> bool {
        self.auto_restore.is_some()
    }

    /// Root element for document-wide style properties
    fn doc_style_root(&self) -> Option<ElementHandle> {
        self.options
            .get_string("docStyle")
            .map(ElementHandle::new)
            .or_else(|| self.app_config.document_root_element.clone())
    }

    /// Second half of a restore, once the instance is initialized
    fn finish_restore(&mut self, effects: &mut Vec<InstanceEffect>) {
        let instance = self.signature;
        if !self.events_bound {
            self.events_bound = true;
            effects.push(InstanceEffect::BindEvents { instance });
            effects.push(InstanceEffect::BindWindowEvents { instance });
        }
        if let Some(root) = self.auto_restore.take() {
            effects.push(InstanceEffect::UnbindAutoRestore { instance, root });
        }
        effects.push(InstanceEffect::Dispatch {
            event: BusEvent::Restored { instance },
        });
    }
}

/// Owns all viewer instances and the active-instance slot
#[derive(Debug)]
pub struct InstanceManager {
    instances: HashMap<Signature, ViewerInstance>,
    active: Option<Signature>,
    rng: StdRng,
}

impl Default for InstanceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceManager {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic signatures, for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            instances: HashMap::new(),
            active: None,
            rng,
        }
    }

    fn next_signature(&mut self) -> Signature {
        loop {
            let candidate = Signature(self.rng.gen_range(0..SIGNATURE_RANGE));
            if !self.instances.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Register a new instance and restore it
    pub fn create(&mut self, config: InstanceConfig) -> (Signature, Vec<InstanceEffect>) {
        let signature = self.next_signature();
        info!("Creating viewer instance {signature}");
        self.instances
            .insert(signature, ViewerInstance::new(signature, config));
        let effects = self.activate(signature);
        (signature, effects)
    }

    pub fn restore(&mut self, signature: Signature) -> ShellResult<Vec<InstanceEffect>> {
        self.ensure_known(signature)?;
        Ok(self.activate(signature))
    }

    pub fn freeze(&mut self, signature: Signature) -> ShellResult<Vec<InstanceEffect>> {
        self.ensure_known(signature)?;
        Ok(self.deactivate(signature))
    }

    pub fn is_active(&self, signature: Signature) -> bool {
        self.active == Some(signature)
    }

    pub fn active(&self) -> Option<Signature> {
        self.active
    }

    /// Pointer entered the root element of `signature`
    pub fn pointer_over(&mut self, signature: Signature) -> ShellResult<Vec<InstanceEffect>> {
        let instance = self
            .instances
            .get(&signature)
            .ok_or(ShellError::UnknownInstance(signature))?;
        if self.is_active(signature) || !instance.auto_restore_bound() {
            return Ok(Vec::new());
        }
        debug!("Auto-restoring instance {signature}");
        Ok(self.activate(signature))
    }

    /// The viewer behind `signature` finished initializing
    ///
    /// Completes a restore that was waiting for initialization, as long as
    /// the instance is still the active one.
    pub fn mark_initialized(&mut self, signature: Signature) -> ShellResult<Vec<InstanceEffect>> {
        let still_active = self.is_active(signature);
        let instance = self
            .instances
            .get_mut(&signature)
            .ok_or(ShellError::UnknownInstance(signature))?;
        instance.initialized = true;

        let mut effects = Vec::new();
        if std::mem::take(&mut instance.pending_restore) && still_active {
            instance.finish_restore(&mut effects);
        }
        Ok(effects)
    }

    /// Freeze (if needed) and drop an instance
    pub fn remove(&mut self, signature: Signature) -> ShellResult<Vec<InstanceEffect>> {
        let mut effects = self.freeze(signature)?;
        if let Some(mut instance) = self.instances.remove(&signature) {
            if let Some(root) = instance.auto_restore.take() {
                effects.push(InstanceEffect::UnbindAutoRestore {
                    instance: signature,
                    root,
                });
            }
        }
        info!("Removed viewer instance {signature}");
        Ok(effects)
    }

    pub fn get(&self, signature: Signature) -> Option<&ViewerInstance> {
        self.instances.get(&signature)
    }

    pub fn get_mut(&mut self, signature: Signature) -> Option<&mut ViewerInstance> {
        self.instances.get_mut(&signature)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn signatures(&self) -> Vec<Signature> {
        let mut signatures: Vec<_> = self.instances.keys().copied().collect();
        signatures.sort();
        signatures
    }

    fn ensure_known(&self, signature: Signature) -> ShellResult<()> {
        if self.instances.contains_key(&signature) {
            Ok(())
        } else {
            Err(ShellError::UnknownInstance(signature))
        }
    }

    fn activate(&mut self, signature: Signature) -> Vec<InstanceEffect> {
        if self.is_active(signature) {
            return Vec::new();
        }

        let mut effects = match self.active {
            Some(previous) if self.instances.contains_key(&previous) => self.deactivate(previous),
            _ => Vec::new(),
        };

        self.active = Some(signature);
        let Some(instance) = self.instances.get_mut(&signature) else {
            return effects;
        };
        debug!("Activating instance {signature}");

        effects.push(InstanceEffect::SetActiveInstance {
            instance: signature,
        });
        effects.push(InstanceEffect::ApplyDocStyle {
            instance: signature,
            root: instance.doc_style_root(),
        });
        if let Some(element) = instance.app_config.app_container.clone() {
            effects.push(InstanceEffect::Focus { element });
        }

        if instance.initialized {
            instance.finish_restore(&mut effects);
        } else {
            debug!("Instance {signature} not initialized yet, deferring listener binding");
            instance.pending_restore = true;
        }
        effects
    }

    fn deactivate(&mut self, signature: Signature) -> Vec<InstanceEffect> {
        if !self.is_active(signature) {
            return Vec::new();
        }
        let mut effects = Vec::new();
        self.active = None;

        let Some(instance) = self.instances.get_mut(&signature) else {
            return effects;
        };
        debug!("Freezing instance {signature}");

        if instance.events_bound {
            instance.events_bound = false;
            effects.push(InstanceEffect::UnbindEvents {
                instance: signature,
            });
            effects.push(InstanceEffect::UnbindWindowEvents {
                instance: signature,
            });
        }
        instance.pending_restore = false;

        if instance.auto_restore.is_none() {
            match instance.app_config.document_root_element.clone() {
                Some(root) => {
                    instance.auto_restore = Some(root.clone());
                    effects.push(InstanceEffect::BindAutoRestore {
                        instance: signature,
                        root,
                    });
                }
                None => warn!("Instance {signature} has no root element, auto-restore disabled"),
            }
        }

        effects.push(InstanceEffect::Dispatch {
            event: BusEvent::Frozen {
                instance: signature,
            },
        });
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &str) -> InstanceConfig {
        InstanceConfig::new(AppConfig {
            document_root_element: Some(ElementHandle::new(root)),
            app_container: Some(ElementHandle::new(format!("{root}-app"))),
            ..AppConfig::default()
        })
    }

    #[test]
    fn default_config_binds_immediately() {
        let mut manager = InstanceManager::with_seed(1);
        let (sig, effects) = manager.create(InstanceConfig::default());
        assert!(manager.is_active(sig));
        assert!(effects.contains(&InstanceEffect::BindEvents { instance: sig }));
    }

    #[test]
    fn create_restores_new_instance() {
        let mut manager = InstanceManager::with_seed(1);
        let (sig, effects) = manager.create(config("a"));

        assert!(manager.is_active(sig));
        assert_eq!(
            effects,
            vec![
                InstanceEffect::SetActiveInstance { instance: sig },
                InstanceEffect::ApplyDocStyle {
                    instance: sig,
                    root: Some(ElementHandle::new("a")),
                },
                InstanceEffect::Focus {
                    element: ElementHandle::new("a-app")
                },
                InstanceEffect::BindEvents { instance: sig },
                InstanceEffect::BindWindowEvents { instance: sig },
                InstanceEffect::Dispatch {
                    event: BusEvent::Restored { instance: sig }
                },
            ]
        );
    }

    #[test]
    fn restore_on_active_instance_is_noop() {
        let mut manager = InstanceManager::with_seed(2);
        let (sig, _) = manager.create(config("a"));

        assert!(manager.restore(sig).unwrap().is_empty());
        assert!(manager.is_active(sig));
    }

    #[test]
    fn restoring_other_instance_freezes_previous_first() {
        let mut manager = InstanceManager::with_seed(3);
        let (first, _) = manager.create(config("a"));
        let (second, effects) = manager.create(config("b"));

        assert!(!manager.is_active(first));
        assert!(manager.is_active(second));
        assert_eq!(
            &effects[..4],
            &[
                InstanceEffect::UnbindEvents { instance: first },
                InstanceEffect::UnbindWindowEvents { instance: first },
                InstanceEffect::BindAutoRestore {
                    instance: first,
                    root: ElementHandle::new("a"),
                },
                InstanceEffect::Dispatch {
                    event: BusEvent::Frozen { instance: first }
                },
            ]
        );
        assert!(manager.get(first).unwrap().auto_restore_bound());
    }

    #[test]
    fn pointer_over_frozen_instance_restores_it() {
        let mut manager = InstanceManager::with_seed(4);
        let (first, _) = manager.create(config("a"));
        let (second, _) = manager.create(config("b"));

        assert!(manager.pointer_over(second).unwrap().is_empty());

        let effects = manager.pointer_over(first).unwrap();
        assert!(manager.is_active(first));
        assert!(effects.contains(&InstanceEffect::UnbindAutoRestore {
            instance: first,
            root: ElementHandle::new("a"),
        }));
        assert!(effects.contains(&InstanceEffect::Dispatch {
            event: BusEvent::Frozen { instance: second }
        }));
        assert!(!manager.get(first).unwrap().auto_restore_bound());
    }

    #[test]
    fn freeze_inactive_is_noop() {
        let mut manager = InstanceManager::with_seed(5);
        let (first, _) = manager.create(config("a"));
        manager.freeze(first).unwrap();

        assert_eq!(manager.active(), None);
        assert!(manager.freeze(first).unwrap().is_empty());
    }

    #[test]
    fn uninitialized_restore_defers_binding() {
        let mut manager = InstanceManager::with_seed(6);
        let mut cfg = config("a");
        cfg.initialized = false;
        let (sig, effects) = manager.create(cfg);

        assert!(manager.is_active(sig));
        assert!(!effects.contains(&InstanceEffect::BindEvents { instance: sig }));
        assert!(!manager.get(sig).unwrap().events_bound());

        let effects = manager.mark_initialized(sig).unwrap();
        assert_eq!(
            effects,
            vec![
                InstanceEffect::BindEvents { instance: sig },
                InstanceEffect::BindWindowEvents { instance: sig },
                InstanceEffect::Dispatch {
                    event: BusEvent::Restored { instance: sig }
                },
            ]
        );
        assert!(manager.mark_initialized(sig).unwrap().is_empty());
    }

    #[test]
    fn pending_restore_dropped_when_frozen_before_init() {
        let mut manager = InstanceManager::with_seed(7);
        let mut cfg = config("a");
        cfg.initialized = false;
        let (slow, _) = manager.create(cfg);
        let (_fast, _) = manager.create(config("b"));

        assert!(manager.mark_initialized(slow).unwrap().is_empty());
        assert!(!manager.get(slow).unwrap().events_bound());
    }

    #[test]
    fn doc_style_option_overrides_root() {
        let mut manager = InstanceManager::with_seed(8);
        let mut cfg = config("a");
        cfg.app_options
            .insert("docStyle".to_string(), OptionValue::from("#styleRoot"));
        let (sig, effects) = manager.create(cfg);

        assert!(effects.contains(&InstanceEffect::ApplyDocStyle {
            instance: sig,
            root: Some(ElementHandle::new("#styleRoot")),
        }));
    }

    #[test]
    fn remove_frees_registry_entry() {
        let mut manager = InstanceManager::with_seed(9);
        let (first, _) = manager.create(config("a"));
        let (second, _) = manager.create(config("b"));

        let effects = manager.remove(first).unwrap();
        assert_eq!(
            effects,
            vec![InstanceEffect::UnbindAutoRestore {
                instance: first,
                root: ElementHandle::new("a"),
            }]
        );
        assert_eq!(manager.len(), 1);
        assert!(matches!(
            manager.restore(first),
            Err(ShellError::UnknownInstance(s)) if s == first
        ));

        manager.remove(second).unwrap();
        assert_eq!(manager.active(), None);
        assert!(manager.is_empty());
    }

    #[test]
    fn signatures_are_unique_and_in_range() {
        let mut manager = InstanceManager::with_seed(10);
        for i in 0..50 {
            manager.create(config(&format!("root{i}")));
        }
        let signatures = manager.signatures();
        assert_eq!(signatures.len(), 50);
        assert!(signatures.iter().all(|s| s.0 < SIGNATURE_RANGE));
    }
}
