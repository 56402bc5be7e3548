use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-map of externally injected collaborators (template renderers,
/// artifact writers, ...). The engine only carries these through to
/// node contexts; it never constructs or calls them itself.
#[derive(Default)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, service: Arc<T>) {
        self.entries.insert(TypeId::of::<T>(), service);
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Renderer(&'static str);

    #[test]
    fn insert_and_retrieve_by_type() {
        let mut services = Services::new();
        assert!(services.is_empty());
        services.insert(Arc::new(Renderer("hbs")));

        let renderer = services.get::<Renderer>().unwrap();
        assert_eq!(renderer.0, "hbs");
        assert!(services.get::<String>().is_none());
    }
}
