//! The default in-memory warehouse.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::core::bom::SatisfiedBOM;
use crate::core::component_box::ComponentBox;
use crate::core::name::Name;
use crate::resolver::errors::FactoryError;
use crate::warehouse::{StoredBox, Warehouse, WarehouseRef};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Thread-safe warehouse backed by a map, optionally chained to providers.
pub struct StdWarehouse {
    id: String,
    boxes: RwLock<HashMap<Name, StoredBox>>,
    providers: Vec<WarehouseRef>,
}

impl StdWarehouse {
    pub fn new() -> Self {
        Self::with_providers(Vec::new())
    }

    /// A warehouse delegating checkout misses to `providers`, in order.
    pub fn with_providers(providers: Vec<WarehouseRef>) -> Self {
        let mut id = format!("{:03}", NEXT_ID.fetch_add(1, Ordering::Relaxed));
        if !providers.is_empty() {
            let provided: Vec<&str> = providers.iter().map(|p| p.id()).collect();
            id.push_str("<<");
            id.push_str(&provided.join(","));
        }

        StdWarehouse {
            id,
            boxes: RwLock::new(HashMap::new()),
            providers,
        }
    }

    /// Names of the locally stored components only.
    pub fn local_names(&self) -> Vec<Name> {
        let boxes = self.boxes.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<Name> = boxes.keys().copied().collect();
        names.sort();
        names
    }
}

impl Default for StdWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Warehouse for StdWarehouse {
    fn id(&self) -> &str {
        &self.id
    }

    fn providers(&self) -> &[WarehouseRef] {
        &self.providers
    }

    fn stored_box(&self, name: &Name) -> Option<StoredBox> {
        {
            let boxes = self.boxes.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(stored) = boxes.get(name) {
                return Some(stored.clone());
            }
        }

        self.providers
            .iter()
            .find_map(|provider| provider.stored_box(name))
    }

    fn checkin(&self, boxed: ComponentBox, satisfied: Arc<SatisfiedBOM>, build_time: Duration) {
        let name = boxed.name();
        let stored = StoredBox::new(boxed, satisfied, build_time);

        let previous = self
            .boxes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, stored);

        if let Some(previous) = previous {
            tracing::warn!(
                "overriding {} in warehouse {}, closing previous box",
                name,
                self.id
            );
            if let Err(e) = previous.boxed().close() {
                tracing::warn!("failed to close replaced box {}: {:#}", name, e);
            }
        }
    }

    fn list_names(&self) -> Vec<Name> {
        let mut names: BTreeSet<Name> = self.local_names().into_iter().collect();
        for provider in &self.providers {
            names.extend(provider.list_names());
        }
        names.into_iter().collect()
    }

    fn close(&self) -> Result<(), FactoryError> {
        let boxes: Vec<(Name, StoredBox)> = {
            let mut boxes = self.boxes.write().unwrap_or_else(PoisonError::into_inner);
            let mut drained: Vec<_> = boxes.drain().collect();
            drained.sort_by(|a, b| a.0.cmp(&b.0));
            drained
        };

        let mut failures = Vec::new();
        for (name, stored) in boxes {
            if let Err(source) = stored.boxed().close() {
                tracing::warn!("exception raised while closing {}: {:#}", name, source);
                failures.push(FactoryError::Close {
                    name: name.to_string(),
                    source,
                });
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(FactoryError::CloseMany {
                warehouse: self.id.clone(),
                failures,
            }),
        }
    }
}

impl fmt::Debug for StdWarehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdWarehouse")
            .field("id", &self.id)
            .field("names", &self.local_names())
            .finish()
    }
}

impl fmt::Display for StdWarehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StdWarehouse{{id={}}}", self.id)
    }
}
