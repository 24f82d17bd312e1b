use crate::entities::Entity;
use crate::read_bits::DemoParserError;
use crate::sendtables::FlattenedProp;
use crate::sendtables::ServerClass;
use crate::sendtables::ServerClasses;
use crate::variants::Variant;
use ahash::AHashMap;
use tracing::debug;
use tracing::warn;

/// Context handed to property callbacks: the updated entity (already holding the new value),
/// its class, and the decoded value.
pub struct PropertyUpdate<'a> {
    pub entity: &'a Entity,
    pub class: &'a ServerClass,
    pub prop_idx: u32,
    pub prop: &'a FlattenedProp,
    pub value: &'a Variant,
}

pub type PropCallback = Box<dyn FnMut(&PropertyUpdate<'_>)>;
pub type EntityCallback = Box<dyn FnMut(&Entity)>;

enum Pending {
    Prop {
        class_name: String,
        prop_name: String,
        callback: PropCallback,
    },
    Created {
        class_name: String,
        callback: EntityCallback,
    },
}

/// Subscriptions keyed by (class id, flattened prop index).
///
/// Subscriptions made by name before the schema is known are kept pending and resolved once
/// when the data tables bind.
#[derive(Default)]
pub struct PropertyEventBus {
    pending: Vec<Pending>,
    prop_callbacks: AHashMap<(u32, u32), Vec<PropCallback>>,
    created_callbacks: AHashMap<u32, Vec<EntityCallback>>,
}

impl PropertyEventBus {
    pub fn subscribe_prop(
        &mut self,
        classes: Option<&ServerClasses>,
        class_name: &str,
        prop_name: &str,
        callback: PropCallback,
    ) -> Result<(), DemoParserError> {
        let classes = match classes {
            Some(classes) => classes,
            None => {
                self.pending.push(Pending::Prop {
                    class_name: class_name.to_string(),
                    prop_name: prop_name.to_string(),
                    callback,
                });
                return Ok(());
            }
        };
        let key = resolve_prop(classes, class_name, prop_name)?;
        self.prop_callbacks.entry(key).or_default().push(callback);
        Ok(())
    }
    pub fn subscribe_created(
        &mut self,
        classes: Option<&ServerClasses>,
        class_name: &str,
        callback: EntityCallback,
    ) -> Result<(), DemoParserError> {
        let classes = match classes {
            Some(classes) => classes,
            None => {
                self.pending.push(Pending::Created {
                    class_name: class_name.to_string(),
                    callback,
                });
                return Ok(());
            }
        };
        let cls_id = resolve_class(classes, class_name)?;
        self.created_callbacks.entry(cls_id).or_default().push(callback);
        Ok(())
    }
    /// Moves pending subscriptions onto the resolved tables, keeping registration order.
    pub fn resolve_pending(&mut self, classes: &ServerClasses) {
        let pending = std::mem::take(&mut self.pending);
        let n_pending = pending.len();
        for sub in pending {
            match sub {
                Pending::Prop {
                    class_name,
                    prop_name,
                    callback,
                } => match resolve_prop(classes, &class_name, &prop_name) {
                    Ok(key) => self.prop_callbacks.entry(key).or_default().push(callback),
                    Err(e) => warn!("dropping subscription to {}.{}: {}", class_name, prop_name, e),
                },
                Pending::Created { class_name, callback } => match resolve_class(classes, &class_name) {
                    Ok(cls_id) => self.created_callbacks.entry(cls_id).or_default().push(callback),
                    Err(e) => warn!("dropping entity subscription to {}: {}", class_name, e),
                },
            }
        }
        debug!("resolved {} pending subscriptions", n_pending);
    }
    #[inline]
    pub fn has_prop_callbacks(&self, cls_id: u32, prop_idx: u32) -> bool {
        self.prop_callbacks.contains_key(&(cls_id, prop_idx))
    }
    pub fn fire_prop(&mut self, update: &PropertyUpdate<'_>) {
        if let Some(callbacks) = self.prop_callbacks.get_mut(&(update.class.id, update.prop_idx)) {
            for callback in callbacks.iter_mut() {
                callback(update);
            }
        }
    }
    pub fn fire_created(&mut self, entity: &Entity) {
        if let Some(callbacks) = self.created_callbacks.get_mut(&entity.cls_id) {
            for callback in callbacks.iter_mut() {
                callback(entity);
            }
        }
    }
}

fn resolve_class(classes: &ServerClasses, class_name: &str) -> Result<u32, DemoParserError> {
    match classes.find_by_name(class_name) {
        Some(cls) => Ok(cls.id),
        None => Err(DemoParserError::ClassNotFound(class_name.to_string())),
    }
}

// Flattening can keep duplicate names, the first index wins.
fn resolve_prop(classes: &ServerClasses, class_name: &str, prop_name: &str) -> Result<(u32, u32), DemoParserError> {
    let cls = match classes.find_by_name(class_name) {
        Some(cls) => cls,
        None => return Err(DemoParserError::ClassNotFound(class_name.to_string())),
    };
    match cls.prop_index(prop_name) {
        Some(idx) => Ok((cls.id, idx)),
        None => Err(DemoParserError::UnknownPropName(format!("{}.{}", class_name, prop_name))),
    }
}
