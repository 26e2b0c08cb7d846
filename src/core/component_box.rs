//! Component boxes - lifecycle holders for one built instance.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use anyhow::Result;

use crate::core::component::NamedComponent;
use crate::core::customizer::ComponentCustomizer;
use crate::core::name::Name;

/// How often a box hands out its instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    /// Every pick returns the same instance.
    Reusable,
    /// The first pick returns the instance, later picks return nothing.
    SingleUse,
}

/// Owns exactly one built instance.
pub struct ComponentBox {
    name: Name,
    kind: BoxKind,
    state: Mutex<BoxState>,
}

struct BoxState {
    // kept after a single-use pick so close() can still release it
    component: Option<NamedComponent>,
    picked: bool,
    closed: bool,
}

impl ComponentBox {
    /// Create a box of the given kind.
    pub fn new(kind: BoxKind, component: NamedComponent) -> Self {
        ComponentBox {
            name: component.name(),
            kind,
            state: Mutex::new(BoxState {
                component: Some(component),
                picked: false,
                closed: false,
            }),
        }
    }

    /// A box handing out the same instance forever.
    pub fn reusable(component: NamedComponent) -> Self {
        Self::new(BoxKind::Reusable, component)
    }

    /// A box handing out its instance exactly once.
    pub fn single_use(component: NamedComponent) -> Self {
        Self::new(BoxKind::SingleUse, component)
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn kind(&self) -> BoxKind {
        self.kind
    }

    /// Take the instance out of the box.
    pub fn pick(&self) -> Option<NamedComponent> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }
        match self.kind {
            BoxKind::Reusable => state.component.clone(),
            BoxKind::SingleUse => {
                if state.picked {
                    return None;
                }
                state.picked = true;
                state.component.clone()
            }
        }
    }

    /// The instance, for introspection; never consumes a single-use box.
    pub fn peek(&self) -> Option<NamedComponent> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }
        state.component.clone()
    }

    /// Whether a pick would currently return the instance.
    pub fn is_available(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        !state.closed
            && state.component.is_some()
            && (self.kind == BoxKind::Reusable || !state.picked)
    }

    /// Apply a customizer to the instance, returning the box holding the result.
    pub fn customize(self, customizer: &dyn ComponentCustomizer) -> Result<Self> {
        let mut state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        if !state.closed {
            if let Some(component) = state.component.take() {
                state.component = Some(customizer.customize(component)?);
            }
        }
        Ok(ComponentBox {
            name: self.name,
            kind: self.kind,
            state: Mutex::new(state),
        })
    }

    /// Release the instance, closing it if it is closable.
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let component = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            state.component.take()
        };

        if let Some(component) = component {
            if let Some(closable) = component.component().as_closable() {
                tracing::debug!("closing {}", self.name);
                closable.close()?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ComponentBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBox")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Display for ComponentBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            BoxKind::Reusable => "ReusableBox",
            BoxKind::SingleUse => "SingleUseBox",
        };
        write!(f, "{}{{name={}}}", kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::{AutoClosable, Component};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counted(Arc<AtomicUsize>);

    impl AutoClosable for Counted {
        fn close(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Component for Counted {
        fn as_closable(&self) -> Option<&dyn AutoClosable> {
            Some(self)
        }
    }

    struct Suffix(&'static str);

    impl ComponentCustomizer for Suffix {
        fn customize(&self, component: NamedComponent) -> Result<NamedComponent> {
            let value = component.value::<String>().cloned().unwrap_or_default();
            Ok(component.map(value + self.0))
        }
    }

    #[test]
    fn test_reusable_box_is_never_exhausted() {
        let component = NamedComponent::of("test", "value".to_string());
        let boxed = ComponentBox::reusable(component.clone());

        let first = boxed.pick().unwrap();
        let second = boxed.pick().unwrap();
        assert!(first.same_instance(&second));
        assert!(first.same_instance(&component));
        assert!(boxed.is_available());
    }

    #[test]
    fn test_single_use_box_picks_once() {
        let boxed = ComponentBox::single_use(NamedComponent::of("test", "value".to_string()));

        assert!(boxed.is_available());
        assert!(boxed.pick().is_some());
        assert!(boxed.pick().is_none());
        assert!(!boxed.is_available());
        assert!(boxed.peek().is_some());
    }

    #[test]
    fn test_customize_replaces_instance() {
        let boxed = ComponentBox::reusable(NamedComponent::of("test", "hello".to_string()));
        let boxed = boxed.customize(&Suffix(" world")).unwrap();

        let picked = boxed.pick().unwrap();
        assert_eq!(picked.value::<String>().unwrap(), "hello world");
    }

    #[test]
    fn test_close_releases_closable_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let boxed = ComponentBox::single_use(NamedComponent::of("c", Counted(counter.clone())));

        // picked single-use instances are still closed by their box
        boxed.pick().unwrap();
        boxed.close().unwrap();
        boxed.close().unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(boxed.pick().is_none());
    }
}
