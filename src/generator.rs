//! Item Container Generator
//!
//! Index-keyed bookkeeping of the UI containers created for view items. The
//! generator doesn't know anything about visuals: it asks a host-provided
//! [`ContainerFactory`] to create containers and headers, and hands them back
//! to it for recycling.
//!
//! Indices are view indices. Inserting space or removing a range renumbers
//! every container after the affected position.

use crate::change::IndexAdjuster;
use crate::error::{Result, ViewError};
use crate::value::{ItemRef, Value};
use log::warn;
use std::collections::BTreeMap;
use std::fmt;

/// Header data for a group, handed to [`ContainerFactory::create_header`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupHeader {
    pub key: Value,
    pub level: usize,
    /// Display text produced by the level's header template, or the key's text
    pub text: String,
    pub container_style: Option<String>,
    pub item_count: usize,
}

/// Host side of container materialization.
pub trait ContainerFactory {
    type Container: Clone + PartialEq + fmt::Debug + 'static;

    fn create_container(&mut self, item: &ItemRef, index: usize) -> Self::Container;

    fn create_header(&mut self, header: &GroupHeader) -> Self::Container;

    /// Takes back a container that is no longer displayed.
    fn recycle(&mut self, _container: Self::Container) {}

    /// Called once a batch of panel changes has been applied.
    fn invalidate_measure(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemContainerInfo<C> {
    pub container: C,
    pub index: usize,
    pub item: ItemRef,
}

pub struct ItemContainerGenerator<F: ContainerFactory> {
    factory: F,
    containers: BTreeMap<usize, ItemContainerInfo<F::Container>>,
}

impl<F: ContainerFactory> ItemContainerGenerator<F> {
    pub fn new(factory: F) -> Self {
        ItemContainerGenerator {
            factory,
            containers: BTreeMap::new(),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    /// Number of materialized containers.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// One past the highest materialized index.
    pub fn end_index(&self) -> usize {
        self.containers.keys().next_back().map_or(0, |last| last + 1)
    }

    /// Creates the container for `item` at `index`. An existing container at
    /// that index is recycled first.
    pub fn materialize(&mut self, index: usize, item: &ItemRef) -> &ItemContainerInfo<F::Container> {
        if let Some(previous) = self.containers.remove(&index) {
            warn!("index {} was already materialized, recycling its container", index);
            self.factory.recycle(previous.container);
        }
        let container = self.factory.create_container(item, index);
        self.containers.entry(index).or_insert(ItemContainerInfo {
            container,
            index,
            item: item.clone(),
        })
    }

    /// Forgets the container at `index` without renumbering the others.
    pub fn dematerialize(&mut self, index: usize) -> Option<ItemContainerInfo<F::Container>> {
        self.containers.remove(&index)
    }

    /// Removes the containers in `[start, start + count)` and shifts the
    /// following ones down by `count`.
    pub fn remove_range(&mut self, start: usize, count: usize) -> Vec<ItemContainerInfo<F::Container>> {
        let mut removed = Vec::new();
        let old = std::mem::take(&mut self.containers);
        for (index, mut info) in old {
            match IndexAdjuster::adjust_for_delete(index, start, count) {
                Some(new_index) => {
                    info.index = new_index;
                    self.containers.insert(new_index, info);
                }
                None => removed.push(info),
            }
        }
        removed
    }

    /// Shifts containers at `index` and after up by `count`.
    pub fn insert_space(&mut self, index: usize, count: usize) {
        let old = std::mem::take(&mut self.containers);
        for (old_index, mut info) in old {
            let new_index = IndexAdjuster::adjust_for_insert(old_index, index, count);
            info.index = new_index;
            self.containers.insert(new_index, info);
        }
    }

    /// Forgets every container, returning them in index order.
    pub fn clear(&mut self) -> Vec<ItemContainerInfo<F::Container>> {
        std::mem::take(&mut self.containers).into_values().collect()
    }

    pub fn container_from_index(&self, index: usize) -> Option<&F::Container> {
        self.containers.get(&index).map(|info| &info.container)
    }

    /// Index of the first materialized container equal to `container`.
    /// Factories that hand out equal containers for different items should
    /// use [`ItemContainerGenerator::container_from_index`] instead.
    pub fn index_from_container(&self, container: &F::Container) -> Option<usize> {
        self.containers
            .values()
            .find(|info| info.container == *container)
            .map(|info| info.index)
    }

    pub fn info(&self, index: usize) -> Option<&ItemContainerInfo<F::Container>> {
        self.containers.get(&index)
    }

    pub fn containers(&self) -> impl Iterator<Item = &ItemContainerInfo<F::Container>> {
        self.containers.values()
    }

    pub fn create_header(&mut self, header: &GroupHeader) -> F::Container {
        self.factory.create_header(header)
    }

    pub fn recycle(&mut self, container: F::Container) {
        self.factory.recycle(container);
    }

    pub fn invalidate_measure(&mut self) {
        self.factory.invalidate_measure();
    }

    /// Fails if `index` has no container.
    pub fn require(&self, index: usize) -> Result<&ItemContainerInfo<F::Container>> {
        self.containers.get(&index).ok_or(ViewError::IndexOutOfRange {
            index,
            len: self.end_index(),
        })
    }
}

impl<F: ContainerFactory> fmt::Debug for ItemContainerGenerator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemContainerGenerator")
            .field("containers", &self.containers.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Factory producing text containers, counting what it recycles.
    #[derive(Debug, Default)]
    pub(crate) struct TextFactory {
        pub recycled: Vec<String>,
        pub measures: usize,
    }

    impl ContainerFactory for TextFactory {
        type Container = String;

        fn create_container(&mut self, item: &ItemRef, _index: usize) -> String {
            item.self_value().to_string()
        }

        fn create_header(&mut self, header: &GroupHeader) -> String {
            format!("[{}]", header.text)
        }

        fn recycle(&mut self, container: String) {
            self.recycled.push(container);
        }

        fn invalidate_measure(&mut self) {
            self.measures += 1;
        }
    }

    fn generator_with(names: &[&str]) -> ItemContainerGenerator<TextFactory> {
        let mut generator = ItemContainerGenerator::new(TextFactory::default());
        for (i, name) in names.iter().enumerate() {
            generator.materialize(i, &ItemRef::value(*name));
        }
        generator
    }

    #[test]
    fn test_materialize_and_lookup() {
        let generator = generator_with(&["a", "b"]);
        assert_eq!(generator.len(), 2);
        assert_eq!(generator.container_from_index(1).map(String::as_str), Some("b"));
        assert_eq!(generator.index_from_container(&"a".to_string()), Some(0));
        assert!(generator.require(5).is_err());
    }

    #[test]
    fn test_insert_space_renumbers() {
        let mut generator = generator_with(&["a", "b", "c"]);
        generator.insert_space(1, 2);
        let indices: Vec<usize> = generator.containers().map(|i| i.index).collect();
        assert_eq!(indices, vec![0, 3, 4]);
        assert_eq!(generator.container_from_index(3).map(String::as_str), Some("b"));
        assert_eq!(generator.end_index(), 5);
    }

    #[test]
    fn test_remove_range_renumbers() {
        let mut generator = generator_with(&["a", "b", "c", "d"]);
        let removed = generator.remove_range(1, 2);
        let names: Vec<&str> = removed.iter().map(|i| i.container.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(generator.container_from_index(1).map(String::as_str), Some("d"));
        assert_eq!(generator.len(), 2);
    }

    #[test]
    fn test_materialize_twice_recycles() {
        let mut generator = generator_with(&["a"]);
        generator.materialize(0, &ItemRef::value("z"));
        assert_eq!(generator.factory().recycled, vec!["a".to_string()]);
        assert_eq!(generator.container_from_index(0).map(String::as_str), Some("z"));
    }

    #[test]
    fn test_clear_returns_everything_in_order() {
        let mut generator = generator_with(&["a", "b"]);
        let cleared = generator.clear();
        assert_eq!(cleared.len(), 2);
        assert_eq!(cleared[0].container, "a");
        assert!(generator.is_empty());
    }
}
