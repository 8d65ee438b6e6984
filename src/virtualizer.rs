//! Item virtualizers and the presenter that drives them.
//!
//! An [`ItemVirtualizer`] owns the container generator and the panel for one
//! items control and decides which containers exist. The only strategy here is
//! [`GroupingVirtualizerNone`], which materializes a container for every item.
//! [`ItemsPresenter`] subscribes to a [`CollectionView`] and forwards each
//! change to its virtualizer.

use crate::change::ViewChange;
use crate::collection_view::CollectionView;
use crate::container_sync::ContainerSync;
use crate::error::Result;
use crate::generator::{ContainerFactory, ItemContainerGenerator};
use crate::observer::SubscriptionId;
use crate::panel::{GroupStyles, Panel};
use log::{debug, warn};
use serde::Deserialize;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualizerState {
    NoContainers,
    PopulatedFlat,
    PopulatedGrouped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VirtualizationMode {
    /// Every item gets a container
    #[default]
    None,
    /// Windowed materialization. Not implemented yet: presenters fall back to `None`.
    Simple,
}

pub trait ItemVirtualizer<F: ContainerFactory> {
    fn state(&self) -> VirtualizerState;

    /// The host attached a panel; populate it from the view.
    fn panel_attached(&mut self, view: &CollectionView) -> Result<()>;

    /// `view` is already in its post-change state.
    fn items_changed(&mut self, view: &CollectionView, change: &ViewChange) -> Result<()>;

    /// Container of the item at a view index, if materialized.
    fn scroll_into_view(&self, index: usize) -> Option<&F::Container>;

    fn panel(&self) -> Option<&Panel<F::Container>>;

    fn generator(&self) -> &ItemContainerGenerator<F>;
}

/// Non-virtualizing strategy: all containers, grouped or flat.
pub struct GroupingVirtualizerNone<F: ContainerFactory> {
    generator: ItemContainerGenerator<F>,
    panel: Option<Panel<F::Container>>,
    styles: GroupStyles,
    state: VirtualizerState,
}

impl<F: ContainerFactory> GroupingVirtualizerNone<F> {
    pub fn new(factory: F, styles: GroupStyles) -> Self {
        GroupingVirtualizerNone {
            generator: ItemContainerGenerator::new(factory),
            panel: None,
            styles,
            state: VirtualizerState::NoContainers,
        }
    }

    pub fn styles(&self) -> &GroupStyles {
        &self.styles
    }

    fn sync(&mut self, view: &CollectionView, change: &ViewChange) -> Result<()> {
        let panel = match self.panel.as_mut() {
            Some(panel) => panel,
            None => return Ok(()),
        };
        let result = ContainerSync::new(&mut self.generator, panel, &self.styles).apply(view, change);
        // explicit group headers count as content even without items
        self.state = match &self.panel {
            Some(panel) if !panel.is_empty() && view.is_grouping() => VirtualizerState::PopulatedGrouped,
            Some(panel) if !panel.is_empty() => VirtualizerState::PopulatedFlat,
            _ => VirtualizerState::NoContainers,
        };
        result
    }
}

impl<F: ContainerFactory> ItemVirtualizer<F> for GroupingVirtualizerNone<F> {
    fn state(&self) -> VirtualizerState {
        self.state
    }

    fn panel_attached(&mut self, view: &CollectionView) -> Result<()> {
        if self.panel.is_some() {
            debug!("panel re-attached, repopulating");
        }
        self.panel = Some(Panel::new());
        self.sync(view, &ViewChange::Reset)
    }

    fn items_changed(&mut self, view: &CollectionView, change: &ViewChange) -> Result<()> {
        match self.state {
            // nothing materialized yet: the view is the whole truth
            VirtualizerState::NoContainers => self.sync(view, &ViewChange::Reset),
            VirtualizerState::PopulatedFlat | VirtualizerState::PopulatedGrouped => self.sync(view, change),
        }
    }

    fn scroll_into_view(&self, index: usize) -> Option<&F::Container> {
        self.generator.container_from_index(index)
    }

    fn panel(&self) -> Option<&Panel<F::Container>> {
        self.panel.as_ref()
    }

    fn generator(&self) -> &ItemContainerGenerator<F> {
        &self.generator
    }
}

impl<F: ContainerFactory> fmt::Debug for GroupingVirtualizerNone<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupingVirtualizerNone")
            .field("state", &self.state)
            .field("generator", &self.generator)
            .field("attached", &self.panel.is_some())
            .finish()
    }
}

type SharedVirtualizer<F> = Rc<RefCell<Box<dyn ItemVirtualizer<F>>>>;

/// Connects a shared view to a virtualizer for as long as it lives.
pub struct ItemsPresenter<F: ContainerFactory + 'static> {
    view: Rc<RefCell<CollectionView>>,
    virtualizer: SharedVirtualizer<F>,
    subscription: SubscriptionId,
    mode: VirtualizationMode,
}

impl<F: ContainerFactory + 'static> ItemsPresenter<F> {
    pub fn new(
        view: &Rc<RefCell<CollectionView>>,
        factory: F,
        styles: GroupStyles,
        mode: VirtualizationMode,
    ) -> Self {
        if mode == VirtualizationMode::Simple {
            debug!("simple virtualization requested, using the non-virtualizing strategy");
        }
        let virtualizer: Box<dyn ItemVirtualizer<F>> = Box::new(GroupingVirtualizerNone::new(factory, styles));
        let virtualizer = Rc::new(RefCell::new(virtualizer));

        let target = Rc::clone(&virtualizer);
        let subscription = view
            .borrow()
            .subscribe(move |view: &CollectionView, change: &ViewChange| {
                match target.try_borrow_mut() {
                    Ok(mut virtualizer) => {
                        if let Err(e) = virtualizer.items_changed(view, change) {
                            warn!("failed to sync containers: {}", e);
                        }
                    }
                    Err(_) => warn!("virtualizer busy, dropping {:?}", change),
                }
            });

        ItemsPresenter {
            view: Rc::clone(view),
            virtualizer,
            subscription,
            mode,
        }
    }

    /// Requested mode, which may differ from the strategy in use.
    pub fn mode(&self) -> VirtualizationMode {
        self.mode
    }

    pub fn attach_panel(&self) -> Result<()> {
        let view = self.view.borrow();
        self.virtualizer.borrow_mut().panel_attached(&view)
    }

    pub fn state(&self) -> VirtualizerState {
        self.virtualizer.borrow().state()
    }

    pub fn scroll_into_view(&self, index: usize) -> Option<F::Container> {
        self.virtualizer.borrow().scroll_into_view(index).cloned()
    }

    pub fn virtualizer(&self) -> Ref<'_, Box<dyn ItemVirtualizer<F>>> {
        self.virtualizer.borrow()
    }

    pub fn view(&self) -> &Rc<RefCell<CollectionView>> {
        &self.view
    }
}

impl<F: ContainerFactory + 'static> Drop for ItemsPresenter<F> {
    fn drop(&mut self) {
        if let Ok(view) = self.view.try_borrow() {
            view.unsubscribe(self.subscription);
        }
    }
}

impl<F: ContainerFactory + 'static> fmt::Debug for ItemsPresenter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemsPresenter")
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::TextFactory;
    use crate::group::GroupDescription;
    use crate::source::ObservableList;
    use crate::storage::ViewOptions;
    use crate::value::{ItemRef, Value};

    fn bound(names: &[&str]) -> (Rc<ObservableList>, Rc<RefCell<CollectionView>>) {
        let source = Rc::new(ObservableList::from_items(
            names.iter().map(|n| ItemRef::value(*n)).collect(),
        ));
        let view = CollectionView::bind(&source, ViewOptions::default()).unwrap();
        (source, view)
    }

    #[test]
    fn test_no_panel_means_no_containers() {
        let (source, view) = bound(&["a"]);
        let presenter = ItemsPresenter::new(&view, TextFactory::default(), GroupStyles::default(), VirtualizationMode::None);
        source.push(ItemRef::value("b"));
        assert_eq!(presenter.state(), VirtualizerState::NoContainers);
        assert!(presenter.virtualizer().panel().is_none());
    }

    #[test]
    fn test_states_follow_the_view() {
        let (source, view) = bound(&[]);
        let presenter = ItemsPresenter::new(&view, TextFactory::default(), GroupStyles::default(), VirtualizationMode::None);
        presenter.attach_panel().unwrap();
        assert_eq!(presenter.state(), VirtualizerState::NoContainers);

        source.push(ItemRef::value("a"));
        assert_eq!(presenter.state(), VirtualizerState::PopulatedFlat);
        assert_eq!(presenter.scroll_into_view(0), Some("a".to_string()));

        view.borrow_mut()
            .add_group_description(GroupDescription::by_property("").unwrap())
            .unwrap();
        assert_eq!(presenter.state(), VirtualizerState::PopulatedGrouped);

        source.clear();
        assert_eq!(presenter.state(), VirtualizerState::NoContainers);
        assert_eq!(presenter.scroll_into_view(0), None);
    }

    #[test]
    fn test_explicit_headers_outlive_the_last_item() {
        let (source, view) = bound(&[]);
        view.borrow_mut()
            .add_group_description(
                GroupDescription::by_property("")
                    .unwrap()
                    .with_group_keys(vec![Value::from("x")]),
            )
            .unwrap();
        let presenter = ItemsPresenter::new(&view, TextFactory::default(), GroupStyles::default(), VirtualizationMode::None);
        presenter.attach_panel().unwrap();
        assert_eq!(presenter.state(), VirtualizerState::PopulatedGrouped);

        source.push(ItemRef::value("a"));
        source.remove_at(0).unwrap();
        assert_eq!(presenter.state(), VirtualizerState::PopulatedGrouped);

        source.push(ItemRef::value("x"));
        let virtualizer = presenter.virtualizer();
        assert_eq!(virtualizer.panel().map(|p| p.len()), Some(1));
        assert_eq!(virtualizer.panel().map(|p| p.containers().len()), Some(1));
        let recycled = &virtualizer.generator().factory().recycled;
        assert_eq!(recycled, &vec!["a".to_string(), "[a]".to_string()]);
    }

    #[test]
    fn test_simple_mode_falls_back() {
        let (source, view) = bound(&["a", "b"]);
        let presenter = ItemsPresenter::new(&view, TextFactory::default(), GroupStyles::default(), VirtualizationMode::Simple);
        presenter.attach_panel().unwrap();
        source.insert(1, ItemRef::value("c")).unwrap();

        assert_eq!(presenter.mode(), VirtualizationMode::Simple);
        let virtualizer = presenter.virtualizer();
        assert_eq!(virtualizer.generator().len(), 3);
        assert_eq!(virtualizer.panel().map(|p| p.containers().len()), Some(3));
        assert_eq!(virtualizer.scroll_into_view(1).map(String::as_str), Some("c"));
    }

    #[test]
    fn test_dropping_presenter_unsubscribes() {
        let (source, view) = bound(&["a"]);
        let presenter = ItemsPresenter::new(&view, TextFactory::default(), GroupStyles::default(), VirtualizationMode::None);
        presenter.attach_panel().unwrap();
        drop(presenter);
        source.push(ItemRef::value("b"));
        assert_eq!(view.borrow().len(), 2);
    }

    #[test]
    fn test_mode_from_json() {
        let mode: VirtualizationMode = serde_json::from_str("\"simple\"").unwrap();
        assert_eq!(mode, VirtualizationMode::Simple);
    }
}
