//! LiveGroup - Live Sorted and Grouped Collection Views
//!
//! A [`CollectionView`] presents an observable item collection sorted and
//! divided into nested groups, and keeps that presentation current as the
//! collection changes. Items-control hosts plug in through a
//! [`ContainerFactory`]: an [`ItemsPresenter`] materializes a container per
//! item and a header per group, and reconciles them against every view change.

pub mod value;
pub mod error;
pub mod property;
pub mod observer;
pub mod change;
pub mod source;
pub mod storage;
pub mod comparer;
pub mod sort;
pub mod group;
pub mod group_tree;
pub mod snapshot;
pub mod collection_view;
pub mod generator;
pub mod panel;
pub mod container_sync;
pub mod virtualizer;

pub use value::{ItemRef, Record, Value, ValueKind};
pub use error::{Result, ViewError};
pub use property::PropertyPath;
pub use observer::{Observers, SubscriptionId};
pub use change::{IndexAdjuster, SourceChange, ViewChange, ViewProperty};
pub use source::{ItemSource, ObservableList};
pub use storage::{BlockStore, ItemStore, StorageHint, VecStore, ViewOptions};
pub use comparer::{Culture, CultureSensitiveComparer, ItemComparer, ListComparer, MergedComparer};
pub use sort::{SortDescription, SortDirection, SortRule};
pub use group::{GroupDescription, GroupKey, GroupKeyRule, KeyMatch};
pub use group_tree::{Child, GroupId, GroupRef, GroupTree};
pub use snapshot::GroupSnapshot;
pub use collection_view::CollectionView;
pub use generator::{ContainerFactory, GroupHeader, ItemContainerGenerator, ItemContainerInfo};
pub use panel::{GroupItem, GroupStyle, GroupStyles, Panel, PanelChild};
pub use container_sync::ContainerSync;
pub use virtualizer::{
    GroupingVirtualizerNone, ItemVirtualizer, ItemsPresenter, VirtualizationMode, VirtualizerState,
};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug)]
    struct Employee {
        first_name: String,
        second_name: String,
        company: String,
        gender: String,
    }

    impl Record for Employee {
        fn property(&self, name: &str) -> Option<Value> {
            match name {
                "FirstName" => Some(Value::from(self.first_name.as_str())),
                "SecondName" => Some(Value::from(self.second_name.as_str())),
                "Company" => Some(Value::from(self.company.as_str())),
                "Gender" => Some(Value::from(self.gender.as_str())),
                _ => None,
            }
        }
    }

    fn employee(first: &str, second: &str, company: &str, gender: &str) -> ItemRef {
        ItemRef::new(Employee {
            first_name: first.to_string(),
            second_name: second.to_string(),
            company: company.to_string(),
            gender: gender.to_string(),
        })
    }

    fn first_names(view: &CollectionView) -> Vec<String> {
        view.iter()
            .filter_map(|e| e.property("FirstName"))
            .map(|v| v.to_string())
            .collect()
    }

    fn group_keys(view: &CollectionView) -> Vec<String> {
        view.tree().snapshot().group_keys()
    }

    fn grouped_by(source: &Rc<ObservableList>, paths: &[&str]) -> Rc<RefCell<CollectionView>> {
        let view = CollectionView::bind(source, ViewOptions::default()).unwrap();
        for path in paths {
            view.borrow_mut()
                .add_group_description(GroupDescription::by_property(path).unwrap())
                .unwrap();
        }
        view
    }

    #[test]
    fn test_distinct_companies_make_distinct_groups() {
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Ann", "Lee", "Acme", "Female"),
            employee("Bob", "Ray", "Globex", "Male"),
            employee("Cid", "Moe", "Initech", "Male"),
        ]));
        let view = grouped_by(&source, &["Company"]);
        let view = view.borrow();

        assert_eq!(group_keys(&view), vec!["Acme", "Globex", "Initech"]);
        for group in view.groups().unwrap().subgroups() {
            assert_eq!(group.item_count(), 1);
        }
    }

    #[test]
    fn test_shared_company_makes_one_group() {
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Ann", "Lee", "Acme", "Female"),
            employee("Bob", "Ray", "Acme", "Male"),
            employee("Cid", "Moe", "Acme", "Male"),
        ]));
        let view = grouped_by(&source, &["Company"]);
        let view = view.borrow();

        assert_eq!(group_keys(&view), vec!["Acme"]);
        assert_eq!(view.groups().unwrap().subgroups().next().unwrap().item_count(), 3);
        assert_eq!(first_names(&view), vec!["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn test_no_descriptions_means_no_groups() {
        let source = Rc::new(ObservableList::from_items(vec![employee("Ann", "Lee", "Acme", "Female")]));
        let view = grouped_by(&source, &[]);
        let view = view.borrow();
        assert!(!view.is_grouping());
        assert!(view.groups().is_none());
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_two_level_add_reports_leaf_index() {
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Ann", "Lee", "A", "M"),
            employee("Bob", "Ray", "B", "F"),
        ]));
        let view = grouped_by(&source, &["Company", "Gender"]);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        view.borrow()
            .subscribe(move |_v: &CollectionView, c: &ViewChange| sink.borrow_mut().push(c.clone()));

        let added = employee("Cid", "Moe", "A", "F");
        source.push(added.clone());

        let view = view.borrow();
        assert_eq!(*log.borrow(), vec![ViewChange::Add { item: added.clone(), index: 1 }]);
        assert_eq!(view.index_of(&added), Some(1));
        assert_eq!(first_names(&view), vec!["Ann", "Cid", "Bob"]);
    }

    #[test]
    fn test_empty_groups_pruned_unless_explicit() {
        let source = Rc::new(ObservableList::new());
        let view = CollectionView::bind(&source, ViewOptions::default()).unwrap();
        view.borrow_mut()
            .add_group_description(
                GroupDescription::by_property("Company")
                    .unwrap()
                    .with_group_keys(vec![Value::from("Empty Company")]),
            )
            .unwrap();
        view.borrow_mut()
            .add_group_description(
                GroupDescription::by_property("Gender")
                    .unwrap()
                    .with_group_keys(vec![Value::from("Male")]),
            )
            .unwrap();

        let ann = employee("Ann", "Lee", "Acme", "Female");
        source.push(ann.clone());
        {
            let view = view.borrow();
            assert_eq!(group_keys(&view), vec!["Empty Company", "Acme"]);
            let acme = view.tree().snapshot().groups[1].clone();
            assert_eq!(acme.group_keys(), vec!["Male", "Female"]);
        }

        source.remove(&ann);
        let view = view.borrow();
        assert_eq!(group_keys(&view), vec!["Empty Company"]);
        let snapshot = view.tree().snapshot();
        let empty = &snapshot.groups[0];
        assert_eq!(empty.item_count, 0);
        assert_eq!(empty.group_keys(), vec!["Male"]);
    }

    #[test]
    fn test_leaf_index_agrees_with_enumeration() {
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Ann", "Lee", "Globex", "Female"),
            employee("Bob", "Ray", "Acme", "Male"),
            employee("Cid", "Moe", "Globex", "Male"),
            employee("Dee", "Fox", "Acme", "Female"),
        ]));
        let view = grouped_by(&source, &["Company", "Gender"]);
        source.push(employee("Eve", "Kim", "Acme", "Male"));
        source.remove_at(0).unwrap();

        let view = view.borrow();
        for (index, item) in view.iter().enumerate() {
            assert_eq!(view.index_of(item), Some(index));
            assert_eq!(view.get(index), Some(item));
        }
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn test_composite_sort() {
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Ann", "Lee", "Globex", "Female"),
            employee("Bob", "Ray", "Acme", "Male"),
            employee("Cid", "Moe", "Globex", "Male"),
            employee("Dee", "Fox", "Acme", "Female"),
        ]));
        let view = CollectionView::bind(&source, ViewOptions::default()).unwrap();
        view.borrow_mut()
            .add_sort_description(SortDescription::from_property("Company", SortDirection::Ascending).unwrap())
            .unwrap();
        view.borrow_mut()
            .add_sort_description(SortDescription::from_property("SecondName", SortDirection::Descending).unwrap())
            .unwrap();
        assert_eq!(first_names(&view.borrow()), vec!["Bob", "Dee", "Cid", "Ann"]);

        source.push(employee("Eve", "Kim", "Acme", "Female"));
        assert_eq!(first_names(&view.borrow()), vec!["Bob", "Eve", "Dee", "Cid", "Ann"]);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Ann", "Lee", "Globex", "Female"),
            employee("Bob", "Ray", "Acme", "Male"),
        ]));
        let view = grouped_by(&source, &["Company", "Gender"]);
        let before = view.borrow().tree().snapshot().to_json().unwrap();
        view.borrow_mut().refresh().unwrap();
        view.borrow_mut().refresh().unwrap();
        assert_eq!(view.borrow().tree().snapshot().to_json().unwrap(), before);
    }

    #[test]
    fn test_reentrant_mutation_defers_one_refresh() {
        let source = Rc::new(ObservableList::new());
        let view = grouped_by(&source, &["Company"]);
        let log = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&log);
        let feeder = Rc::clone(&source);
        let fired = Cell::new(false);
        view.borrow().subscribe(move |_v: &CollectionView, change: &ViewChange| {
            sink.borrow_mut().push(change.clone());
            if matches!(change, ViewChange::Add { .. }) && !fired.replace(true) {
                feeder.push(employee("Bob", "Ray", "Globex", "Male"));
            }
        });

        source.push(employee("Ann", "Lee", "Acme", "Female"));

        let changes = log.borrow();
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], ViewChange::Add { index: 0, .. }));
        assert_eq!(changes[1], ViewChange::Reset);
        let view = view.borrow();
        assert_eq!(view.len(), 2);
        assert_eq!(group_keys(&view), vec!["Acme", "Globex"]);
    }

    /// Containers named after the employee, headers after their text.
    #[derive(Debug, Default)]
    struct NameFactory {
        recycled: Vec<String>,
    }

    impl ContainerFactory for NameFactory {
        type Container = String;

        fn create_container(&mut self, item: &ItemRef, _index: usize) -> String {
            item.property("FirstName").map(|v| v.to_string()).unwrap_or_default()
        }

        fn create_header(&mut self, header: &GroupHeader) -> String {
            header.text.clone()
        }

        fn recycle(&mut self, container: String) {
            self.recycled.push(container);
        }
    }

    fn outline(panel: &Panel<String>, lines: &mut Vec<String>) {
        for child in panel.children() {
            match child {
                PanelChild::Container(name) => lines.push(name.clone()),
                PanelChild::Group(group) => {
                    lines.push(group.header.clone());
                    outline(&group.panel, lines);
                }
            }
        }
    }

    fn presenter_outline(presenter: &ItemsPresenter<NameFactory>) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(panel) = presenter.virtualizer().panel() {
            outline(panel, &mut lines);
        }
        lines
    }

    #[test]
    fn test_presenter_keeps_headers_in_step() {
        let cid = employee("Cid", "Moe", "Globex", "Male");
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Ann", "Lee", "Acme", "Female"),
            employee("Bob", "Ray", "Acme", "Male"),
            cid.clone(),
        ]));
        let view = CollectionView::bind(&source, ViewOptions::default()).unwrap();
        view.borrow_mut()
            .add_group_description(
                GroupDescription::by_property("Company")
                    .unwrap()
                    .with_group_keys(vec![Value::from("Empty Company")]),
            )
            .unwrap();

        let styles = GroupStyles::new(vec![GroupStyle::with_header_template(|key: &Value, count: usize| {
            format!("{} ({})", key, count)
        })]);
        let presenter = ItemsPresenter::new(&view, NameFactory::default(), styles, VirtualizationMode::None);
        presenter.attach_panel().unwrap();
        assert_eq!(presenter.state(), VirtualizerState::PopulatedGrouped);
        assert_eq!(
            presenter_outline(&presenter),
            vec!["Empty Company (0)", "Acme (2)", "Ann", "Bob", "Globex (1)", "Cid"]
        );

        source.remove(&cid);
        assert_eq!(
            presenter_outline(&presenter),
            vec!["Empty Company (0)", "Acme (2)", "Ann", "Bob"]
        );

        source.push(employee("Dee", "Fox", "Empty Company", "Female"));
        source.push(employee("Eve", "Kim", "Initech", "Female"));
        assert_eq!(
            presenter_outline(&presenter),
            vec!["Empty Company (0)", "Dee", "Acme (2)", "Ann", "Bob", "Initech (1)", "Eve"]
        );
        assert_eq!(presenter.scroll_into_view(0), Some("Dee".to_string()));
        assert_eq!(presenter.scroll_into_view(3), Some("Eve".to_string()));

        let virtualizer = presenter.virtualizer();
        let recycled = &virtualizer.generator().factory().recycled;
        assert_eq!(recycled, &vec!["Cid".to_string(), "Globex (1)".to_string()]);
    }

    #[test]
    fn test_presenter_moving_lone_group_member_keeps_one_header() {
        let source = Rc::new(ObservableList::from_items(vec![
            employee("Bob", "Ray", "Globex", "Male"),
            employee("Ann", "Lee", "Acme", "Female"),
            employee("Cid", "Moe", "Globex", "Male"),
        ]));
        let view = grouped_by(&source, &["Company"]);
        let presenter = ItemsPresenter::new(&view, NameFactory::default(), GroupStyles::default(), VirtualizationMode::None);
        presenter.attach_panel().unwrap();
        assert_eq!(presenter_outline(&presenter), vec!["Globex", "Bob", "Cid", "Acme", "Ann"]);

        // Ann stays the last leaf, but her group is rebuilt
        source.move_item(1, 2).unwrap();
        assert_eq!(presenter_outline(&presenter), vec!["Globex", "Bob", "Cid", "Acme", "Ann"]);

        source.push(employee("Dee", "Fox", "Acme", "Female"));
        assert_eq!(
            presenter_outline(&presenter),
            vec!["Globex", "Bob", "Cid", "Acme", "Ann", "Dee"]
        );
        assert_eq!(group_keys(&view.borrow()), vec!["Globex", "Acme"]);
        assert_eq!(first_names(&view.borrow()), vec!["Bob", "Cid", "Ann", "Dee"]);
    }
}
