//! The application shell: instances, their sidebars and the event bus
//!
//! [`ViewerShell`] feeds host input into the components, routes their
//! effects to the [`Host`] and broadcasts any notifications on the bus.

use std::collections::HashMap;

use log::{debug, trace};
use serde::Serialize;

use crate::error::{ShellError, ShellResult};
use crate::event_bus::{BusEvent, EventBus, ResizeSource, SidebarView};
use crate::instance::{InstanceConfig, InstanceEffect, InstanceManager, Signature};
use crate::l10n::{Localization, NullL10n, TextDirection};
use crate::sidebar::{SidebarCommand, SidebarEffect, SidebarResizer, StaticMetrics};

/// An effect addressed to the host environment
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum ShellEffect {
    Instance(InstanceEffect),
    Sidebar {
        instance: Signature,
        #[serde(flatten)]
        effect: SidebarEffect,
    },
}

impl ShellEffect {
    /// Bus notification carried by this effect, if any
    pub fn event(&self) -> Option<&BusEvent> {
        match self {
            ShellEffect::Instance(InstanceEffect::Dispatch { event })
            | ShellEffect::Sidebar {
                effect: SidebarEffect::Dispatch { event },
                ..
            } => Some(event),
            _ => None,
        }
    }
}

/// The environment the shell runs in
pub trait Host {
    /// Carry out one effect (bind listeners, set styles, focus, ...)
    fn apply(&mut self, effect: &ShellEffect);

    /// Current measurements of an instance's outer container
    fn container_metrics(&self, instance: Signature) -> StaticMetrics;
}

pub struct ViewerShell<H: Host> {
    manager: InstanceManager,
    sidebars: HashMap<Signature, SidebarResizer>,
    bus: EventBus,
    host: H,
    l10n: Box<dyn Localization>,
}

impl<H: Host> ViewerShell<H> {
    pub fn new(host: H) -> Self {
        Self::with_manager(InstanceManager::new(), host, Box::new(NullL10n))
    }

    pub fn with_manager(manager: InstanceManager, host: H, l10n: Box<dyn Localization>) -> Self {
        Self {
            manager,
            sidebars: HashMap::new(),
            bus: EventBus::new(),
            host,
            l10n,
        }
    }

    pub fn manager(&self) -> &InstanceManager {
        &self.manager
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn localization(&self) -> &dyn Localization {
        self.l10n.as_ref()
    }

    pub fn sidebar(&self, signature: Signature) -> Option<&SidebarResizer> {
        self.sidebars.get(&signature)
    }

    pub fn active(&self) -> Option<Signature> {
        self.manager.active()
    }

    /// Create an instance (which restores it) with its own sidebar controller
    pub fn create_instance(&mut self, config: InstanceConfig) -> Signature {
        let (signature, effects) = self.manager.create(config);
        self.sidebars
            .insert(signature, SidebarResizer::new(self.l10n.direction()));
        self.apply_instance_effects(effects);
        signature
    }

    pub fn restore(&mut self, signature: Signature) -> ShellResult<()> {
        let effects = self.manager.restore(signature)?;
        self.apply_instance_effects(effects);
        Ok(())
    }

    pub fn freeze(&mut self, signature: Signature) -> ShellResult<()> {
        let effects = self.manager.freeze(signature)?;
        self.apply_instance_effects(effects);
        Ok(())
    }

    pub fn pointer_over(&mut self, signature: Signature) -> ShellResult<()> {
        let effects = self.manager.pointer_over(signature)?;
        self.apply_instance_effects(effects);
        Ok(())
    }

    pub fn mark_initialized(&mut self, signature: Signature) -> ShellResult<()> {
        let effects = self.manager.mark_initialized(signature)?;
        self.apply_instance_effects(effects);
        Ok(())
    }

    pub fn remove_instance(&mut self, signature: Signature) -> ShellResult<()> {
        let effects = self.manager.remove(signature)?;
        self.sidebars.remove(&signature);
        self.apply_instance_effects(effects);
        Ok(())
    }

    /// Feed a pointer or direction command to an instance's sidebar
    pub fn sidebar_command(
        &mut self,
        signature: Signature,
        cmd: SidebarCommand,
    ) -> ShellResult<()> {
        let metrics = self.host.container_metrics(signature);
        let resizer = self
            .sidebars
            .get_mut(&signature)
            .ok_or(ShellError::UnknownInstance(signature))?;
        let effects = resizer.apply(cmd, &metrics);
        self.apply_sidebar_effects(signature, effects);
        Ok(())
    }

    /// The sidebar of `signature` switched views (`None` closes it)
    pub fn set_sidebar_view(
        &mut self,
        signature: Signature,
        view: Option<SidebarView>,
    ) -> ShellResult<()> {
        let event = BusEvent::SidebarViewChanged { view };
        self.sidebar_command(signature, SidebarCommand::Notify(event.clone()))?;
        self.bus.dispatch(&event);
        Ok(())
    }

    /// The window changed size
    ///
    /// Only the active instance has its window listeners bound, so only its
    /// sidebar re-clamps.
    pub fn window_resized(&mut self) -> ShellResult<()> {
        let event = BusEvent::Resize {
            source: ResizeSource::Window,
        };
        match self.manager.active() {
            Some(signature) => {
                self.sidebar_command(signature, SidebarCommand::Notify(event.clone()))?;
            }
            None => trace!("Window resize with no active instance"),
        }
        self.bus.dispatch(&event);
        Ok(())
    }

    /// Swap the localization service, updating every sidebar's direction
    pub fn set_localization(&mut self, l10n: Box<dyn Localization>) {
        self.l10n = l10n;
        let direction = self.l10n.direction();
        self.set_direction(direction);
    }

    fn set_direction(&mut self, direction: TextDirection) {
        debug!("Layout direction is now {direction:?}");
        let signatures: Vec<Signature> = self.sidebars.keys().copied().collect();
        for signature in signatures {
            // Direction changes never produce effects
            let _ = self.sidebar_command(signature, SidebarCommand::SetDirection(direction));
        }
    }

    fn apply_instance_effects(&mut self, effects: Vec<InstanceEffect>) {
        for effect in effects {
            self.route(ShellEffect::Instance(effect));
        }
    }

    fn apply_sidebar_effects(&mut self, instance: Signature, effects: Vec<SidebarEffect>) {
        for effect in effects {
            self.route(ShellEffect::Sidebar { instance, effect });
        }
    }

    fn route(&mut self, effect: ShellEffect) {
        self.host.apply(&effect);
        if let Some(event) = effect.event() {
            self.bus.dispatch(event);
        }
    }
}

impl<H: Host + std::fmt::Debug> std::fmt::Debug for ViewerShell<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerShell")
            .field("manager", &self.manager)
            .field("sidebars", &self.sidebars)
            .field("bus", &self.bus)
            .field("host", &self.host)
            .finish()
    }
}
